/// Geometría compartida por burbujas e insignias: un círculo con borde
/// inscrito en un cuadrado de lado `size`.
use crate::canvas::surface::RasterSurface;

/// Caps the border at a third of the square side.
pub fn clamp_border(size: u32, border: u32) -> u32 {
    if size / 3 < border {
        size / 3
    } else {
        border
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircleGeometry {
    /// Side of the square the circle is inscribed in.
    pub size: u32,
    /// Border width after clamping.
    pub border: u32,
    /// Radius of the inner (back color) circle.
    pub radius: u32,
}

impl CircleGeometry {
    /// `None` for a zero-sized square: there is nothing to draw.
    pub fn new(size: u32, border: u32) -> Option<Self> {
        if size == 0 {
            return None;
        }
        let border = clamp_border(size, border);
        Some(Self {
            size,
            border,
            radius: (size - 2 * border) / 2,
        })
    }

    pub fn outer_radius(&self) -> u32 {
        self.radius + self.border
    }

    /// Center offset on both axes, relative to the square's origin.
    pub fn center(&self) -> f32 {
        self.outer_radius() as f32
    }
}

/// Colors and border width used to draw one circle; rebuilt per draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircleStyle {
    pub border_width: u32,
    pub border_color: [u8; 4],
    pub back_color: [u8; 4],
}

/// Outer circle in border color, then inner circle in back color, leaving a
/// ring `geometry.border` pixels wide.
pub fn draw_rings<S: RasterSurface + ?Sized>(
    surface: &mut S,
    origin: (i32, i32),
    geometry: &CircleGeometry,
    style: &CircleStyle,
) {
    let cx = origin.0 as f32 + geometry.center();
    let cy = origin.1 as f32 + geometry.center();
    surface.fill_circle(cx, cy, geometry.outer_radius() as f32, style.border_color);
    surface.fill_circle(cx, cy, geometry.radius as f32, style.back_color);
}
