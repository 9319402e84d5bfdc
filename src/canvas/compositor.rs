//! Recorte de imágenes en círculo.
//!
//! The masked bitmap is built in two passes on a transparent square: the
//! inner circle is filled as an opaque mask, then the stretched source is
//! drawn with a source-in blend so only the pixels inside the mask survive.
//! Border rings are not part of the bitmap; callers draw them first and put
//! the bitmap on top (see [`draw_composited`]).

use tiny_skia::{BlendMode, Pixmap, PixmapRef};
use tracing::trace;

use super::source::ImageSource;
use super::surface::RasterSurface;
use crate::error::RasterError;
use crate::layout::Rect;
use crate::shapes::circle::{draw_rings, CircleGeometry, CircleStyle};

/// Crops `source` into the inner circle of `geometry`.
///
/// Returns `Ok(None)` when there is no source, or the source has nothing to
/// draw yet; callers skip drawing in that case.
pub fn composite_circle(
    source: Option<&dyn ImageSource>,
    geometry: &CircleGeometry,
    back_color: [u8; 4],
) -> Result<Option<Pixmap>, RasterError> {
    let Some(source) = source else {
        return Ok(None);
    };
    let Some(stretched) = source.stretch_to_square(geometry.size) else {
        trace!(size = geometry.size, "image source produced nothing");
        return Ok(None);
    };
    let mut output = Pixmap::new(geometry.size, geometry.size).ok_or(RasterError::Allocation {
        width: geometry.size,
        height: geometry.size,
    })?;
    mask_into(&mut output, stretched.as_ref(), geometry, back_color);
    Ok(Some(output))
}

/// Clears `output`, fills the mask circle and blends `stretched` source-in.
pub fn mask_into<S: RasterSurface + ?Sized>(
    output: &mut S,
    stretched: PixmapRef<'_>,
    geometry: &CircleGeometry,
    back_color: [u8; 4],
) {
    let center = geometry.center();
    let side = geometry.size as i32;
    output.clear();
    output.fill_circle(center, center, geometry.radius as f32, back_color);
    output.draw_image(stretched, Rect::new(0, 0, side, side), BlendMode::SourceIn);
}

/// Draws the border rings at `origin` and the masked bitmap over them.
pub fn draw_composited<S: RasterSurface + ?Sized>(
    surface: &mut S,
    origin: (i32, i32),
    geometry: &CircleGeometry,
    style: &CircleStyle,
    masked: &Pixmap,
) {
    draw_rings(surface, origin, geometry, style);
    let side = geometry.size as i32;
    surface.draw_image(
        masked.as_ref(),
        Rect::new(origin.0, origin.1, origin.0 + side, origin.1 + side),
        BlendMode::SourceOver,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::surface::tests::{DrawOp, RecordingSurface};
    use image::{Rgba, RgbaImage};

    const BACK: [u8; 4] = [117, 117, 117, 255];

    fn red_source(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn mask_pass_order() {
        let g = CircleGeometry::new(30, 2).unwrap();
        let stretched = Pixmap::new(30, 30).unwrap();
        let mut out = RecordingSurface::new(30, 30);
        mask_into(&mut out, stretched.as_ref(), &g, BACK);
        assert_eq!(
            out.ops,
            vec![
                DrawOp::Clear,
                DrawOp::Circle { cx: 15.0, cy: 15.0, radius: 13.0, color: BACK },
                DrawOp::Image {
                    dest: Rect::new(0, 0, 30, 30),
                    blend: BlendMode::SourceIn,
                    size: (30, 30),
                },
            ]
        );
    }

    #[test]
    fn source_survives_only_inside_the_inner_circle() {
        let g = CircleGeometry::new(30, 2).unwrap();
        let img = red_source(60, 20);
        let masked = composite_circle(Some(&img), &g, BACK).unwrap().unwrap();
        assert_eq!((masked.width(), masked.height()), (30, 30));

        let center = masked.pixel(15, 15).unwrap();
        assert_eq!((center.red(), center.green(), center.alpha()), (255, 0, 255));
        assert_eq!(masked.pixel(0, 0).unwrap().alpha(), 0);
        // inside the ring but outside the inner radius
        assert_eq!(masked.pixel(0, 15).unwrap().alpha(), 0);
    }

    #[test]
    fn missing_source_composites_nothing() {
        let g = CircleGeometry::new(30, 2).unwrap();
        assert!(composite_circle(None, &g, BACK).unwrap().is_none());
        let empty = RgbaImage::new(0, 0);
        assert!(composite_circle(Some(&empty), &g, BACK).unwrap().is_none());
    }

    #[test]
    fn composited_bubble_draws_rings_then_bitmap() {
        let g = CircleGeometry::new(40, 3).unwrap();
        let style = CircleStyle {
            border_width: 3,
            border_color: [0, 0, 255, 255],
            back_color: BACK,
        };
        let masked = Pixmap::new(40, 40).unwrap();
        let mut surface = RecordingSurface::new(100, 40);
        draw_composited(&mut surface, (20, 0), &g, &style, &masked);
        assert_eq!(surface.ops.len(), 3);
        assert_eq!(
            surface.ops[2],
            DrawOp::Image {
                dest: Rect::new(20, 0, 60, 40),
                blend: BlendMode::SourceOver,
                size: (40, 40),
            }
        );
    }

    #[test]
    fn border_stays_visible_around_the_image() {
        let g = CircleGeometry::new(40, 4).unwrap();
        let style = CircleStyle {
            border_width: 4,
            border_color: [0, 0, 255, 255],
            back_color: BACK,
        };
        let masked = composite_circle(Some(&red_source(40, 40)), &g, BACK).unwrap().unwrap();
        let mut canvas = Pixmap::new(40, 40).unwrap();
        draw_composited(&mut canvas, (0, 0), &g, &style, &masked);

        let ring = canvas.pixel(1, 20).unwrap();
        assert_eq!((ring.blue(), ring.red()), (255, 0));
        let middle = canvas.pixel(20, 20).unwrap();
        assert_eq!((middle.red(), middle.blue()), (255, 0));
    }
}
