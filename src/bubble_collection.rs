//! A horizontal strip of bubbles with a single "+N" overflow badge.
//!
//! Up to `bubble_peek` images get their own bubble, taken from a
//! [`RecyclingPool`]. Every further addition only bumps the counter shown by
//! the badge, which always sits right after the last bubble. Clearing hands
//! the bubbles back to the pool so the next round of additions reuses them.

use std::path::Path;
use std::sync::Arc;

use tiny_skia::Pixmap;
use tracing::debug;

use crate::canvas::source::{load_source, SharedSource};
use crate::canvas::surface::RasterSurface;
use crate::config::BubbleStyle;
use crate::error::{BubbleError, RasterError};
use crate::layout::{MeasureMode, MeasureSpec, Rect, Size};
use crate::pool::{Pooled, RecyclingPool};
use crate::shapes::badge::OverflowBadge;
use crate::shapes::bubble::BubbleSlot;
use crate::shapes::fonts::FontCache;
use crate::shapes::{Drawable, Measurable, Placeable, Renderable};

/// Pool that builds slots themed with `style`. Collections sharing one pool
/// should share the style too: reused slots keep the factory's border.
pub fn bubble_pool(style: &BubbleStyle) -> RecyclingPool<BubbleSlot> {
    let style = style.clone();
    RecyclingPool::from_fn(move || BubbleSlot::themed(&style))
}

pub struct BubbleCollection {
    style: BubbleStyle,
    pool: Arc<RecyclingPool<BubbleSlot>>,
    fonts: Arc<FontCache>,
    children: Vec<Box<dyn Renderable>>,
    excess: usize,
    measured: Size,
}

impl BubbleCollection {
    pub fn new(style: BubbleStyle, fonts: Arc<FontCache>) -> Self {
        let pool = Arc::new(bubble_pool(&style));
        Self::with_pool(style, pool, fonts)
    }

    pub fn with_pool(
        style: BubbleStyle,
        pool: Arc<RecyclingPool<BubbleSlot>>,
        fonts: Arc<FontCache>,
    ) -> Self {
        Self {
            style,
            pool,
            fonts,
            children: Vec::new(),
            excess: 0,
            measured: Size::default(),
        }
    }

    pub fn style(&self) -> &BubbleStyle {
        &self.style
    }

    pub fn pool(&self) -> &Arc<RecyclingPool<BubbleSlot>> {
        &self.pool
    }

    /// Bubbles plus the badge, if shown.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn bubble_count(&self) -> usize {
        self.children.len() - usize::from(self.badge().is_some())
    }

    /// Additions folded into the badge; zero while nothing overflowed.
    pub fn excess(&self) -> usize {
        self.excess
    }

    pub fn badge(&self) -> Option<&OverflowBadge> {
        self.children
            .get(self.style.bubble_peek)
            .and_then(|child| child.as_any().downcast_ref::<OverflowBadge>())
    }

    fn badge_mut(&mut self) -> Option<&mut OverflowBadge> {
        self.children
            .get_mut(self.style.bubble_peek)
            .and_then(|child| child.as_any_mut().downcast_mut::<OverflowBadge>())
    }

    /// Shows `source` in a new bubble, or counts it in the overflow badge
    /// once `bubble_peek` bubbles are showing.
    pub fn add_bubble(&mut self, source: SharedSource) -> Result<(), BubbleError> {
        if self.children.len() < self.style.bubble_peek {
            let mut slot = self.pool.checkout();
            slot.set_source(Some(source));
            debug!(entry = slot.entry_id(), index = self.children.len(), "added bubble");
            return self.insert_child(Box::new(slot));
        }

        self.excess += 1;
        if self.excess == 1 {
            let badge = OverflowBadge::themed(&self.style, self.fonts.clone());
            self.insert_child(Box::new(badge))?;
        }
        let excess = self.excess;
        let badge = self.badge_mut().ok_or(BubbleError::StructuralViolation {
            kind: "missing overflow badge",
        })?;
        badge.set_count(excess);
        debug!(excess, "bubble folded into overflow badge");
        Ok(())
    }

    pub fn add_bubble_from_path(&mut self, path: &Path) -> Result<(), BubbleError> {
        let source = load_source(path)?;
        self.add_bubble(source)
    }

    /// Appends a child, refusing anything but bubble slots and the badge.
    pub(crate) fn insert_child(&mut self, child: Box<dyn Renderable>) -> Result<(), BubbleError> {
        let any = child.as_any();
        let admissible = any.is::<Pooled<BubbleSlot>>()
            || any.is::<BubbleSlot>()
            || any.is::<OverflowBadge>();
        if !admissible {
            return Err(BubbleError::StructuralViolation { kind: child.kind() });
        }
        self.children.push(child);
        Ok(())
    }

    /// Returns every pooled bubble to the pool, drops the badge and resets
    /// the overflow counter.
    pub fn clear(&mut self) {
        let mut returned = 0usize;
        for child in self.children.drain(..) {
            if let Ok(mut slot) = child.into_any().downcast::<Pooled<BubbleSlot>>() {
                slot.set_source(None);
                self.pool.checkin(*slot);
                returned += 1;
            }
        }
        debug!(returned, excess = self.excess, "cleared bubbles");
        self.excess = 0;
    }

    /// Natural width for `n` children, capped at `u32::MAX`.
    fn natural_width(&self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let n = u64::from(n);
        let size = u64::from(self.style.bubble_size);
        let width = if self.style.use_bubble_offset {
            (size * n).saturating_sub(u64::from(self.style.bubble_offset) * (n - 1))
        } else {
            (size * n).saturating_add(u64::from(self.style.bubble_margin) * (n - 1))
        };
        u32::try_from(width).unwrap_or(u32::MAX)
    }

    /// Measures every child to exactly `bubble_size` square. The strip is
    /// `bubble_size` tall; its width is the natural width unless the
    /// constraint is exact.
    pub fn measure(&mut self, width: MeasureSpec) -> Size {
        let size = self.style.bubble_size;
        let width = match width.mode {
            MeasureMode::Exactly => width.size,
            MeasureMode::AtMost | MeasureMode::Unspecified => {
                self.natural_width(self.children.len() as u32)
            }
        };
        let child_spec = MeasureSpec::exactly(size);
        for child in &mut self.children {
            child.measure(child_spec, child_spec);
        }
        self.measured = Size {
            width,
            height: size,
        };
        self.measured
    }

    pub fn measured_size(&self) -> Size {
        self.measured
    }

    /// Places children left to right and returns their frames. Frames come
    /// from `bubble_size` alone, so placing without a fresh measure is fine.
    pub fn place(&mut self) -> Vec<Rect> {
        let size = to_coord(self.style.bubble_size);
        let offset = to_coord(self.style.bubble_offset);
        let margin = to_coord(self.style.bubble_margin);
        let use_offset = self.style.use_bubble_offset;

        let mut frames = Vec::with_capacity(self.children.len());
        for (i, child) in self.children.iter_mut().enumerate() {
            let i = i32::try_from(i).unwrap_or(i32::MAX);
            let frame = if use_offset {
                let left = i.saturating_mul(size.saturating_sub(offset));
                Rect::new(left, 0, left.saturating_add(size), size)
            } else {
                let left = i.saturating_mul(size.saturating_add(margin));
                Rect::new(left, 0, left.saturating_add(size).saturating_add(margin), size)
            };
            child.place(frame);
            frames.push(frame);
        }
        frames
    }

    pub fn needs_layout(&self) -> bool {
        self.children.iter().any(|child| child.needs_layout())
    }

    pub fn needs_redraw(&self) -> bool {
        self.children.iter().any(|child| child.needs_redraw())
    }

    /// Draws children in order, so later bubbles overlap earlier ones.
    pub fn draw(&mut self, surface: &mut dyn RasterSurface) -> Result<(), RasterError> {
        for child in &mut self.children {
            child.draw(surface)?;
            child.mark_drawn();
        }
        Ok(())
    }

    /// Measure, place and draw into a new pixmap sized to the strip. `None`
    /// when the strip is empty.
    pub fn render(&mut self) -> Result<Option<Pixmap>, BubbleError> {
        let size = self.measure(MeasureSpec::unspecified());
        self.place();
        if size.width == 0 || size.height == 0 {
            return Ok(None);
        }
        let mut pixmap = Pixmap::new(size.width, size.height).ok_or(RasterError::Allocation {
            width: size.width,
            height: size.height,
        })?;
        self.draw(&mut pixmap)?;
        Ok(Some(pixmap))
    }
}

impl Drop for BubbleCollection {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BubbleCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BubbleCollection")
            .field("children", &self.children.len())
            .field("excess", &self.excess)
            .field("measured", &self.measured)
            .finish_non_exhaustive()
    }
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
