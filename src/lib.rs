//! Overlapping circular avatar strips with a "+N" overflow badge.
//!
//! A [`BubbleCollection`] shows up to `bubble_peek` images as bordered
//! circles, recycling its bubbles through a shared [`RecyclingPool`], and
//! folds further additions into a single [`OverflowBadge`]. Rendering goes
//! through the [`RasterSurface`] trait; `tiny_skia::Pixmap` implements it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use bubble_strip::{AssetDirLoader, BubbleCollection, BubbleStyle, FontCache};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fonts = Arc::new(FontCache::new(AssetDirLoader::new("assets/fonts")));
//! let mut strip = BubbleCollection::new(BubbleStyle::default(), fonts);
//! strip.add_bubble(Arc::new(image::open("avatar.png")?))?;
//! let pixmap = strip.render()?;
//! # Ok(())
//! # }
//! ```

pub mod bubble_collection;
pub mod canvas;
pub mod config;
pub mod error;
pub mod layout;
pub mod pool;
pub mod shapes;

pub use bubble_collection::{bubble_pool, BubbleCollection};
pub use canvas::source::{ImageSource, SharedSource};
pub use canvas::surface::RasterSurface;
pub use config::{BubbleStyle, DisplayMetrics};
pub use error::{BubbleError, ConfigError, FontError, PoolError, RasterError};
pub use layout::{MeasureMode, MeasureSpec, Rect, Size};
pub use pool::{Pooled, RecyclingPool};
pub use shapes::badge::OverflowBadge;
pub use shapes::bubble::BubbleSlot;
pub use shapes::fonts::{AssetDirLoader, FontCache, FontFace, FontLoader};
