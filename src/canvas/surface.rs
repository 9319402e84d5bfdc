/// Superficie raster abstracta sobre la que se componen burbujas e insignias.
/// La implementación concreta es `tiny_skia::Pixmap`.
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, PixmapRef,
    Transform,
};

use crate::layout::Rect;

/// The three drawing primitives the compositor needs.
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resets every pixel to fully transparent.
    fn clear(&mut self);

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 4]);

    /// Draws `image` stretched to `dest` using `blend`.
    fn draw_image(&mut self, image: PixmapRef<'_>, dest: Rect, blend: BlendMode);
}

/// Immutable fill descriptor; a fresh `Paint` is built from it per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillStyle {
    pub color: [u8; 4],
    pub anti_alias: bool,
}

impl FillStyle {
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            color,
            anti_alias: true,
        }
    }

    pub fn to_paint(self) -> Paint<'static> {
        let [r, g, b, a] = self.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = self.anti_alias;
        paint
    }
}

impl RasterSurface for Pixmap {
    fn width(&self) -> u32 {
        Pixmap::width(self)
    }

    fn height(&self) -> u32 {
        Pixmap::height(self)
    }

    fn clear(&mut self) {
        self.fill(Color::TRANSPARENT);
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 4]) {
        if radius <= 0.0 {
            return;
        }
        let Some(path) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        self.fill_path(
            &path,
            &FillStyle::solid(color).to_paint(),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    fn draw_image(&mut self, image: PixmapRef<'_>, dest: Rect, blend: BlendMode) {
        if dest.width() <= 0 || dest.height() <= 0 {
            return;
        }
        let sx = dest.width() as f32 / image.width() as f32;
        let sy = dest.height() as f32 / image.height() as f32;
        let quality = if sx == 1.0 && sy == 1.0 {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: blend,
            quality,
        };
        let transform = Transform::from_row(sx, 0.0, 0.0, sy, dest.left as f32, dest.top as f32);
        self.draw_pixmap(0, 0, image, &paint, transform, None);
    }
}
