//! Image sources a bubble can display, and conversions between `image`
//! buffers (straight alpha) and `tiny_skia` pixmaps (premultiplied).

use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use rayon::prelude::*;
use tiny_skia::{ColorU8, Pixmap};

use crate::error::RasterError;

/// Anything that can be rasterized into a square.
pub trait ImageSource: Send + Sync {
    /// Stretches the source to exactly `size`x`size` pixels, ignoring its
    /// aspect ratio. `None` means there is nothing to draw yet.
    fn stretch_to_square(&self, size: u32) -> Option<Pixmap>;
}

pub type SharedSource = Arc<dyn ImageSource>;

impl ImageSource for RgbaImage {
    fn stretch_to_square(&self, size: u32) -> Option<Pixmap> {
        if size == 0 || self.width() == 0 || self.height() == 0 {
            return None;
        }
        let resized = if self.dimensions() == (size, size) {
            self.clone()
        } else {
            image::imageops::resize(self, size, size, FilterType::Triangle)
        };
        pixmap_from_rgba(&resized).ok()
    }
}

impl ImageSource for DynamicImage {
    fn stretch_to_square(&self, size: u32) -> Option<Pixmap> {
        if size == 0 || self.width() == 0 || self.height() == 0 {
            return None;
        }
        let resized = self.resize_exact(size, size, FilterType::Triangle);
        pixmap_from_rgba(&resized.to_rgba8()).ok()
    }
}

/// Decodes an image file into a shareable source.
pub fn load_source(path: &Path) -> Result<SharedSource, RasterError> {
    let decoded = image::open(path).map_err(|source| RasterError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Arc::new(decoded))
}

/// Premultiplies a straight-alpha buffer into a new pixmap.
pub fn pixmap_from_rgba(img: &RgbaImage) -> Result<Pixmap, RasterError> {
    let (width, height) = img.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(RasterError::Allocation { width, height })?;
    pixmap
        .pixels_mut()
        .par_iter_mut()
        .zip(img.as_raw().par_chunks_exact(4))
        .for_each(|(dst, px)| {
            *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        });
    Ok(pixmap)
}

/// Demultiplies a pixmap back into a straight-alpha buffer (PNG export).
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> Result<RgbaImage, RasterError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let raw: Vec<u8> = pixmap
        .pixels()
        .par_iter()
        .flat_map_iter(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, raw).ok_or(RasterError::Allocation { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn stretches_non_square_source_to_square() {
        let img = RgbaImage::from_pixel(30, 10, Rgba([10, 20, 30, 255]));
        let pixmap = img.stretch_to_square(16).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (16, 16));
        let px = pixmap.pixel(8, 8).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (10, 20, 30, 255));
    }

    #[test]
    fn zero_sized_requests_have_nothing_to_draw() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        assert!(img.stretch_to_square(0).is_none());
        assert!(RgbaImage::new(0, 0).stretch_to_square(8).is_none());
    }

    #[test]
    fn premultiply_and_back_keeps_opaque_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 255]));
        let pixmap = pixmap_from_rgba(&img).unwrap();
        assert_eq!(rgba_from_pixmap(&pixmap).unwrap(), img);
    }

    #[test]
    fn translucent_pixels_are_premultiplied() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 128]));
        let px = pixmap_from_rgba(&img).unwrap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert!(px.red() <= 101);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source(&dir.path().join("nope.png")).err().unwrap();
        assert!(matches!(err, RasterError::Decode { .. }));
    }
}
