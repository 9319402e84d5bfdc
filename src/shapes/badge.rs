//! Overflow badge: a bordered circle with "+N" centered inside.
//!
//! The text size is derived from the measured size and the number of
//! characters, so the label keeps fitting the circle as the count grows.

use std::any::Any;
use std::sync::Arc;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use tiny_skia::{BlendMode, ColorU8, Pixmap};
use tracing::warn;

use super::circle::{draw_rings, CircleGeometry, CircleStyle};
use super::fonts::{FontCache, FontFace};
use super::{Drawable, Measurable, Placeable, Renderable};
use crate::canvas::surface::RasterSurface;
use crate::config::{
    BubbleStyle, DisplayMetrics, DEFAULT_BACK_COLOR, DEFAULT_BORDER_COLOR,
    DEFAULT_BUBBLE_SIZE_DP, DEFAULT_TEXT_COLOR,
};
use crate::error::RasterError;
use crate::layout::{MeasureMode, MeasureSpec, Rect, Size};

/// `(size / density / len) * scaled_density`; zero for empty text.
pub fn text_size_for(size: u32, metrics: &DisplayMetrics, text_len: usize) -> f32 {
    if text_len == 0 || metrics.density <= 0.0 {
        return 0.0;
    }
    (size as f32 / metrics.density / text_len as f32) * metrics.scaled_density
}

/// Text extents with ascent above the baseline negative and descent below
/// it positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl TextMetrics {
    pub fn measure(font: &FontArc, px: f32, text: &str) -> Self {
        let scaled = font.as_scaled(PxScale::from(px));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        Self {
            width,
            ascent: -scaled.ascent(),
            descent: -scaled.descent(),
        }
    }
}

/// Baseline origin that centers the text in `size`. The trailing `- 1`
/// lifts the label one pixel.
pub fn text_origin(size: Size, metrics: &TextMetrics) -> (i32, i32) {
    let dx = (size.width as i32 >> 1) - ((metrics.width as i32) >> 1);
    let dy = (size.height as i32 >> 1) - (((metrics.descent + metrics.ascent) as i32) >> 1) - 1;
    (dx, dy)
}

pub struct OverflowBadge {
    border_width: u32,
    border_color: [u8; 4],
    back_color: [u8; 4],
    text_color: [u8; 4],
    face: FontFace,
    fonts: Arc<FontCache>,
    metrics: DisplayMetrics,
    text: String,
    text_size: f32,
    geometry: Option<CircleGeometry>,
    measured: Size,
    frame: Rect,
    layout_requested: bool,
    dirty: bool,
}

impl OverflowBadge {
    pub fn new(fonts: Arc<FontCache>, metrics: DisplayMetrics) -> Self {
        Self {
            border_width: metrics.dp(1.0),
            border_color: DEFAULT_BORDER_COLOR,
            back_color: DEFAULT_BACK_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
            face: FontFace::Medium,
            fonts,
            metrics,
            text: String::new(),
            text_size: 0.0,
            geometry: None,
            measured: Size::default(),
            frame: Rect::default(),
            layout_requested: true,
            dirty: true,
        }
    }

    /// Badge configured from a collection's style.
    pub fn themed(style: &BubbleStyle, fonts: Arc<FontCache>) -> Self {
        let mut badge = Self::new(fonts, style.metrics);
        badge.set_border_color(style.border_color);
        badge.set_border_width(style.border_width);
        badge.set_back_color(style.back_color);
        badge.set_text_color(style.text_color);
        badge.set_font_face(style.font);
        badge
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.layout_requested = true;
        self.dirty = true;
    }

    /// Shows `+count`. The label length may change, so this requests a new
    /// measure as well as a redraw.
    pub fn set_count(&mut self, count: usize) {
        self.set_text(format!("+{count}"));
    }

    /// Text size computed by the last measure, in pixels.
    pub fn text_size(&self) -> f32 {
        self.text_size
    }

    pub fn border_width(&self) -> u32 {
        self.border_width
    }

    pub fn set_border_width(&mut self, width: u32) {
        self.border_width = width;
        self.dirty = true;
    }

    pub fn border_color(&self) -> [u8; 4] {
        self.border_color
    }

    pub fn set_border_color(&mut self, color: [u8; 4]) {
        self.border_color = color;
        self.dirty = true;
    }

    pub fn back_color(&self) -> [u8; 4] {
        self.back_color
    }

    pub fn set_back_color(&mut self, color: [u8; 4]) {
        self.back_color = color;
        self.dirty = true;
    }

    pub fn text_color(&self) -> [u8; 4] {
        self.text_color
    }

    pub fn set_text_color(&mut self, color: [u8; 4]) {
        self.text_color = color;
        self.dirty = true;
    }

    pub fn font_face(&self) -> FontFace {
        self.face
    }

    pub fn set_font_face(&mut self, face: FontFace) {
        self.face = face;
        self.dirty = true;
    }

    pub fn geometry(&self) -> Option<CircleGeometry> {
        self.geometry
    }

    fn style(&self) -> CircleStyle {
        CircleStyle {
            border_width: self.border_width,
            border_color: self.border_color,
            back_color: self.back_color,
        }
    }

    /// Rasterizes the label into a transparent layer the size of the badge.
    fn text_layer(&self, font: &FontArc) -> Result<Pixmap, RasterError> {
        let size = self.measured;
        let mut layer = Pixmap::new(size.width, size.height).ok_or(RasterError::Allocation {
            width: size.width,
            height: size.height,
        })?;
        let metrics = TextMetrics::measure(font, self.text_size, &self.text);
        let (x, baseline) = text_origin(size, &metrics);

        let scale = PxScale::from(self.text_size);
        let scaled = font.as_scaled(scale);
        let (w, h) = (size.width as i32, size.height as i32);
        let [r, g, b, a] = self.text_color;
        let pixels = layer.pixels_mut();

        let mut caret = x as f32;
        let mut prev = None;
        for ch in self.text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline as f32));
            caret += scaled.h_advance(id);
            prev = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px >= w || py >= h {
                    return;
                }
                let alpha = (a as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
                let idx = (py * w + px) as usize;
                if alpha > pixels[idx].alpha() {
                    pixels[idx] = ColorU8::from_rgba(r, g, b, alpha).premultiply();
                }
            });
        }
        Ok(layer)
    }
}

impl Measurable for OverflowBadge {
    /// Square of the width constraint; `AtMost` falls back to the default
    /// bubble size.
    fn measure(&mut self, width: MeasureSpec, _height: MeasureSpec) -> Size {
        let side = match width.mode {
            MeasureMode::AtMost => self.metrics.dp(DEFAULT_BUBBLE_SIZE_DP),
            MeasureMode::Exactly | MeasureMode::Unspecified => width.size,
        };
        self.text_size = text_size_for(side, &self.metrics, self.text.chars().count());
        self.measured = Size::square(side);
        self.geometry = CircleGeometry::new(side, self.border_width);
        self.layout_requested = false;
        self.measured
    }

    fn measured_size(&self) -> Size {
        self.measured
    }

    fn needs_layout(&self) -> bool {
        self.layout_requested
    }
}

impl Placeable for OverflowBadge {
    fn place(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn frame(&self) -> Rect {
        self.frame
    }
}

impl Drawable for OverflowBadge {
    fn draw(&self, surface: &mut dyn RasterSurface) -> Result<(), RasterError> {
        let Some(geometry) = self.geometry else {
            return Ok(());
        };
        let origin = (self.frame.left, self.frame.top);
        draw_rings(surface, origin, &geometry, &self.style());

        if self.text.is_empty() || self.text_size <= 0.0 {
            return Ok(());
        }
        let font = match self.fonts.get(self.face) {
            Ok(font) => font,
            Err(err) => {
                warn!(face = ?self.face, error = %err, "drawing overflow badge without its label");
                return Ok(());
            }
        };
        let layer = self.text_layer(&font)?;
        let dest = Rect::new(
            origin.0,
            origin.1,
            origin.0 + self.measured.width as i32,
            origin.1 + self.measured.height as i32,
        );
        surface.draw_image(layer.as_ref(), dest, BlendMode::SourceOver);
        Ok(())
    }

    fn needs_redraw(&self) -> bool {
        self.dirty
    }

    fn mark_drawn(&mut self) {
        self.dirty = false;
    }
}

impl Renderable for OverflowBadge {
    fn kind(&self) -> &'static str {
        "overflow badge"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
