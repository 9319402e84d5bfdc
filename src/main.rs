use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bubble_strip::canvas::source::rgba_from_pixmap;
use bubble_strip::shapes::fonts::{find_system_font, SingleFileLoader};
use bubble_strip::{AssetDirLoader, BubbleCollection, BubbleStyle, FontCache};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: bubble_strip <out.png> <image>...";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(out) = args.next() else {
        bail!(USAGE);
    };
    let images: Vec<PathBuf> = args.collect();
    if images.is_empty() {
        bail!(USAGE);
    }

    let style = match std::env::var_os("BUBBLE_STRIP_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            BubbleStyle::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => BubbleStyle::default(),
    };

    // Bundled fonts when BUBBLE_STRIP_FONTS points at them, otherwise any system font.
    let fonts = match (std::env::var_os("BUBBLE_STRIP_FONTS"), find_system_font()) {
        (Some(dir), _) => FontCache::new(AssetDirLoader::new(dir)),
        (None, Some(path)) => FontCache::new(SingleFileLoader::new(path)),
        (None, None) => FontCache::new(AssetDirLoader::new("assets/fonts")),
    };

    let mut strip = BubbleCollection::new(style, Arc::new(fonts));
    for path in &images {
        strip
            .add_bubble_from_path(path)
            .with_context(|| format!("adding {}", path.display()))?;
    }

    let pixmap = strip.render()?.context("nothing to render")?;
    rgba_from_pixmap(&pixmap)?
        .save(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    info!(
        bubbles = strip.bubble_count(),
        excess = strip.excess(),
        width = pixmap.width(),
        out = %out.display(),
        "rendered strip"
    );
    Ok(())
}
