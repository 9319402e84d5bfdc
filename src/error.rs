//! Error types shared across the crate.
//!
//! Degenerate sizes and missing image sources are not errors: those paths
//! simply skip drawing. Everything here is either a contract violation or a
//! failure of an external collaborator (file system, font parser, allocator).

use std::path::PathBuf;

use thiserror::Error;

use crate::shapes::fonts::FontFace;

/// Top level error returned by collection operations.
#[derive(Debug, Error)]
pub enum BubbleError {
    /// A child that is neither a bubble slot nor the overflow badge was
    /// inserted into a collection.
    #[error("collection children must be bubble slots or the overflow badge, got {kind}")]
    StructuralViolation { kind: &'static str },
    #[error(transparent)]
    Raster(#[from] RasterError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// `checkin` received an entry that this pool does not consider locked:
    /// a double release or an entry from another pool.
    #[error("entry {entry} is not checked out of pool {pool}")]
    NotCheckedOut { pool: u64, entry: u64 },
}

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("could not allocate a {width}x{height} raster")]
    Allocation { width: u32, height: u32 },
    #[error("failed to decode image {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {face:?} from {path:?}")]
    Io {
        face: FontFace,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font file for {face:?} is not a valid TrueType/OpenType font")]
    Parse { face: FontFace },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config")]
    Toml(#[from] toml::de::Error),
    #[error("invalid color {0:?}, expected #rrggbb or #rrggbbaa")]
    Color(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}
