/// Burbuja circular con imagen: un borde, un círculo de fondo y la imagen
/// recortada encima.
use std::any::Any;

use super::circle::{CircleGeometry, CircleStyle};
use super::{Drawable, Measurable, Placeable, Renderable};
use crate::canvas::compositor::{composite_circle, draw_composited};
use crate::canvas::source::SharedSource;
use crate::canvas::surface::RasterSurface;
use crate::config::{BubbleStyle, DEFAULT_BACK_COLOR, DEFAULT_BORDER_COLOR};
use crate::error::RasterError;
use crate::layout::{MeasureSpec, Rect, Size};
use crate::pool::Pooled;

pub struct BubbleSlot {
    border_width: u32,
    border_color: [u8; 4],
    back_color: [u8; 4],
    source: Option<SharedSource>,
    geometry: Option<CircleGeometry>,
    measured: Size,
    frame: Rect,
    dirty: bool,
}

impl Default for BubbleSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl BubbleSlot {
    pub fn new() -> Self {
        Self {
            border_width: 1,
            border_color: DEFAULT_BORDER_COLOR,
            back_color: DEFAULT_BACK_COLOR,
            source: None,
            geometry: None,
            measured: Size::default(),
            frame: Rect::default(),
            dirty: true,
        }
    }

    /// A slot themed the way a collection's pool factory configures it.
    pub fn themed(style: &BubbleStyle) -> Self {
        let mut slot = Self::new();
        slot.set_border_color(style.border_color);
        slot.set_border_width(style.border_width);
        slot.set_back_color(style.back_color);
        slot
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

    pub fn source(&self) -> Option<&SharedSource> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<SharedSource>) {
        self.source = source;
        self.dirty = true;
    }

    /// Radius and clamped border computed by the last measure.
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
}

impl Measurable for BubbleSlot {
    /// Always square, sized by the width constraint.
    fn measure(&mut self, width: MeasureSpec, _height: MeasureSpec) -> Size {
        self.measured = Size::square(width.size);
        self.geometry = CircleGeometry::new(self.measured.min_side(), self.border_width);
        self.measured
    }

    fn measured_size(&self) -> Size {
        self.measured
    }
}

impl Placeable for BubbleSlot {
    fn place(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn frame(&self) -> Rect {
        self.frame
    }
}

impl Drawable for BubbleSlot {
    fn draw(&self, surface: &mut dyn RasterSurface) -> Result<(), RasterError> {
        let Some(geometry) = self.geometry else {
            return Ok(());
        };
        let style = self.style();
        let Some(masked) = composite_circle(self.source.as_deref(), &geometry, style.back_color)? else {
            return Ok(());
        };
        draw_composited(surface, (self.frame.left, self.frame.top), &geometry, &style, &masked);
        Ok(())
    }

    fn needs_redraw(&self) -> bool {
        self.dirty
    }

    fn mark_drawn(&mut self) {
        self.dirty = false;
    }
}

impl Renderable for BubbleSlot {
    fn kind(&self) -> &'static str {
        "bubble"
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

impl Renderable for Pooled<BubbleSlot> {
    fn kind(&self) -> &'static str {
        "pooled bubble"
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
