pub mod badge;
pub mod bubble;
pub mod circle;
pub mod fonts;

use std::any::Any;

use crate::canvas::surface::RasterSurface;
use crate::error::RasterError;
use crate::layout::{MeasureSpec, Rect, Size};
use crate::pool::Pooled;

pub trait Measurable {
    /// Computes and stores the size for the given constraints.
    fn measure(&mut self, width: MeasureSpec, height: MeasureSpec) -> Size;

    /// Result of the last [`measure`](Self::measure).
    fn measured_size(&self) -> Size;

    /// True when a change since the last measure affects the size.
    fn needs_layout(&self) -> bool {
        false
    }
}

pub trait Placeable {
    fn place(&mut self, frame: Rect);
    fn frame(&self) -> Rect;
}

pub trait Drawable {
    /// Draws into `surface` at the placed frame. Degenerate sizes and
    /// missing images draw nothing and still return `Ok`.
    fn draw(&self, surface: &mut dyn RasterSurface) -> Result<(), RasterError>;

    fn needs_redraw(&self) -> bool {
        false
    }

    fn mark_drawn(&mut self) {}
}

/// Capability set every collection child provides.
pub trait Renderable: Measurable + Placeable + Drawable + Send + 'static {
    /// Short type label for diagnostics.
    fn kind(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Measurable> Measurable for Pooled<T> {
    fn measure(&mut self, width: MeasureSpec, height: MeasureSpec) -> Size {
        (**self).measure(width, height)
    }

    fn measured_size(&self) -> Size {
        (**self).measured_size()
    }

    fn needs_layout(&self) -> bool {
        (**self).needs_layout()
    }
}

impl<T: Placeable> Placeable for Pooled<T> {
    fn place(&mut self, frame: Rect) {
        (**self).place(frame)
    }

    fn frame(&self) -> Rect {
        (**self).frame()
    }
}

impl<T: Drawable> Drawable for Pooled<T> {
    fn draw(&self, surface: &mut dyn RasterSurface) -> Result<(), RasterError> {
        (**self).draw(surface)
    }

    fn needs_redraw(&self) -> bool {
        (**self).needs_redraw()
    }

    fn mark_drawn(&mut self) {
        (**self).mark_drawn()
    }
}
