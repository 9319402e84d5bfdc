//! Font faces available to the overflow badge and the cache that loads them.
//!
//! The cache is an ordinary value handed to whoever needs fonts (usually an
//! `Arc<FontCache>` shared by every badge). Faces are loaded on first use
//! through a [`FontLoader`] and kept for the cache's lifetime.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FontError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFace {
    Regular,
    Light,
    #[default]
    Medium,
    Bold,
    Alternate,
}

impl FontFace {
    pub const ALL: [FontFace; 5] = [
        FontFace::Regular,
        FontFace::Light,
        FontFace::Medium,
        FontFace::Bold,
        FontFace::Alternate,
    ];

    /// Maps the integer style attribute (0..=4); unknown values fall back to
    /// `Regular`.
    pub fn from_attr(value: i32) -> Self {
        match value {
            1 => FontFace::Light,
            2 => FontFace::Medium,
            3 => FontFace::Bold,
            4 => FontFace::Alternate,
            _ => FontFace::Regular,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            FontFace::Regular => "OpenSans-Regular.ttf",
            FontFace::Light => "OpenSans-Light.ttf",
            FontFace::Medium => "OpenSans-Semibold.ttf",
            FontFace::Bold => "OpenSans-Bold.ttf",
            FontFace::Alternate => "FiraSans-Regular.ttf",
        }
    }
}

pub trait FontLoader: Send + Sync {
    fn load(&self, face: FontFace) -> Result<FontArc, FontError>;
}

/// Reads `<root>/<face file name>` from disk.
#[derive(Clone, Debug)]
pub struct AssetDirLoader {
    root: PathBuf,
}

impl AssetDirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FontLoader for AssetDirLoader {
    fn load(&self, face: FontFace) -> Result<FontArc, FontError> {
        let path = self.root.join(face.file_name());
        let data = fs::read(&path).map_err(|source| FontError::Io {
            face,
            path: path.clone(),
            source,
        })?;
        let font = FontArc::try_from_vec(data).map_err(|_| FontError::Parse { face })?;
        debug!(?face, ?path, "loaded font");
        Ok(font)
    }
}

pub struct FontCache {
    loader: Box<dyn FontLoader>,
    faces: HashMap<FontFace, OnceCell<FontArc>>,
}

impl FontCache {
    pub fn new(loader: impl FontLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            faces: FontFace::ALL.iter().map(|f| (*f, OnceCell::new())).collect(),
        }
    }

    /// Returns the cached face, loading it on first request. Failed loads
    /// are not cached, so a later call retries.
    pub fn get(&self, face: FontFace) -> Result<FontArc, FontError> {
        let slot = match self.faces.get(&face) {
            Some(slot) => slot,
            None => return self.loader.load(face),
        };
        slot.get_or_try_init(|| {
            self.loader.load(face).map_err(|err| {
                warn!(?face, error = %err, "font load failed");
                err
            })
        })
        .cloned()
    }

    pub fn is_loaded(&self, face: FontFace) -> bool {
        self.faces.get(&face).is_some_and(|slot| slot.get().is_some())
    }
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<_> = FontFace::ALL.into_iter().filter(|face| self.is_loaded(*face)).collect();
        f.debug_struct("FontCache").field("loaded", &loaded).finish_non_exhaustive()
    }
}

/// Looks for a font file installed on the host, for demos and tests.
pub fn find_system_font() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
        "C:\\Windows\\Fonts\\segoeui.ttf",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Loader that serves the same font file for every face.
#[derive(Clone, Debug)]
pub struct SingleFileLoader {
    path: PathBuf,
}

impl SingleFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FontLoader for SingleFileLoader {
    fn load(&self, face: FontFace) -> Result<FontArc, FontError> {
        let data = fs::read(&self.path).map_err(|source| FontError::Io {
            face,
            path: self.path.clone(),
            source,
        })?;
        FontArc::try_from_vec(data).map_err(|_| FontError::Parse { face })
    }
}
