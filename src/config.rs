//! Styling bundle for a bubble strip.
//!
//! Sizes are pixels. Defaults are expressed in density-independent units and
//! converted with [`DisplayMetrics`], so a strip built for a 2x display gets
//! 80px bubbles unless told otherwise.
//!
//! ```toml
//! density = 2.0
//! bubble_peek = 3
//! border_color = "#ff5722"
//! use_bubble_offset = false
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::shapes::fonts::FontFace;

pub const DEFAULT_BUBBLE_SIZE_DP: f32 = 40.0;
pub const DEFAULT_BUBBLE_MARGIN_DP: f32 = 4.0;
pub const DEFAULT_BORDER_WIDTH_DP: f32 = 1.0;
/// Bubbles overlap by `size / DEFAULT_OFFSET_DIVISOR` unless an explicit offset is set.
pub const DEFAULT_OFFSET_DIVISOR: u32 = 2;
pub const DEFAULT_BUBBLE_PEEK: usize = 4;

pub const DEFAULT_BORDER_COLOR: [u8; 4] = [0x3f, 0x51, 0xb5, 0xff];
pub const DEFAULT_BACK_COLOR: [u8; 4] = [0x75, 0x75, 0x75, 0xff];
pub const DEFAULT_TEXT_COLOR: [u8; 4] = [0xfa, 0xfa, 0xfa, 0xff];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    /// Pixels per density-independent unit.
    pub density: f32,
    /// Pixels per scale-independent unit (density times the user font scale).
    pub scaled_density: f32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density: 1.0,
            scaled_density: 1.0,
        }
    }
}

impl DisplayMetrics {
    /// Converts dp to whole pixels, truncating.
    pub fn dp(&self, value: f32) -> u32 {
        (value * self.density) as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BubbleStyle {
    pub bubble_size: u32,
    /// Pixels each bubble overlaps the previous one (offset mode).
    pub bubble_offset: u32,
    /// Image bubbles shown before additions collapse into the badge.
    pub bubble_peek: usize,
    pub border_color: [u8; 4],
    pub border_width: u32,
    /// Gap between bubbles (margin mode).
    pub bubble_margin: u32,
    pub use_bubble_offset: bool,
    pub back_color: [u8; 4],
    pub text_color: [u8; 4],
    pub font: FontFace,
    pub metrics: DisplayMetrics,
}

impl Default for BubbleStyle {
    fn default() -> Self {
        Self::with_metrics(DisplayMetrics::default())
    }
}

impl BubbleStyle {
    pub fn with_metrics(metrics: DisplayMetrics) -> Self {
        let bubble_size = metrics.dp(DEFAULT_BUBBLE_SIZE_DP);
        Self {
            bubble_size,
            bubble_offset: bubble_size / DEFAULT_OFFSET_DIVISOR,
            bubble_peek: DEFAULT_BUBBLE_PEEK,
            border_color: DEFAULT_BORDER_COLOR,
            border_width: metrics.dp(DEFAULT_BORDER_WIDTH_DP),
            bubble_margin: metrics.dp(DEFAULT_BUBBLE_MARGIN_DP),
            use_bubble_offset: true,
            back_color: DEFAULT_BACK_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
            font: FontFace::default(),
            metrics,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: StyleFile = toml::from_str(text)?;
        let style = file.resolve()?;
        style.validate()?;
        Ok(style)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects combinations that cannot lay out a strip.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bubble_size == 0 {
            return Err(ConfigError::Invalid("bubble_size must be positive".into()));
        }
        if self.use_bubble_offset && self.bubble_offset >= self.bubble_size {
            return Err(ConfigError::Invalid(format!(
                "bubble_offset {} must be smaller than bubble_size {}",
                self.bubble_offset, self.bubble_size
            )));
        }
        if !(self.metrics.density > 0.0 && self.metrics.scaled_density > 0.0) {
            return Err(ConfigError::Invalid("display densities must be positive".into()));
        }
        Ok(())
    }
}

/// On-disk shape of [`BubbleStyle`]; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StyleFile {
    density: Option<f32>,
    scaled_density: Option<f32>,
    bubble_size: Option<u32>,
    bubble_offset: Option<u32>,
    bubble_peek: Option<usize>,
    border_color: Option<String>,
    border_width: Option<u32>,
    bubble_margin: Option<u32>,
    use_bubble_offset: Option<bool>,
    back_color: Option<String>,
    text_color: Option<String>,
    font: Option<FontFace>,
}

impl StyleFile {
    fn resolve(self) -> Result<BubbleStyle, ConfigError> {
        let density = self.density.unwrap_or(1.0);
        let metrics = DisplayMetrics {
            density,
            scaled_density: self.scaled_density.unwrap_or(density),
        };
        let mut style = BubbleStyle::with_metrics(metrics);
        if let Some(size) = self.bubble_size {
            style.bubble_size = size;
            style.bubble_offset = size / DEFAULT_OFFSET_DIVISOR;
        }
        if let Some(offset) = self.bubble_offset {
            style.bubble_offset = offset;
        }
        if let Some(peek) = self.bubble_peek {
            style.bubble_peek = peek;
        }
        if let Some(width) = self.border_width {
            style.border_width = width;
        }
        if let Some(margin) = self.bubble_margin {
            style.bubble_margin = margin;
        }
        if let Some(use_offset) = self.use_bubble_offset {
            style.use_bubble_offset = use_offset;
        }
        if let Some(font) = self.font {
            style.font = font;
        }
        if let Some(hex) = self.border_color {
            style.border_color = color(&hex)?;
        }
        if let Some(hex) = self.back_color {
            style.back_color = color(&hex)?;
        }
        if let Some(hex) = self.text_color {
            style.text_color = color(&hex)?;
        }
        Ok(style)
    }
}

fn color(hex: &str) -> Result<[u8; 4], ConfigError> {
    parse_hex(hex).ok_or_else(|| ConfigError::Color(hex.to_string()))
}

/// Parse `#rrggbb` or `#rrggbbaa` into RGBA bytes.
pub fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    let s = hex.strip_prefix('#')?;
    if !s.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
    match s.len() {
        6 => Some([channel(0)?, channel(2)?, channel(4)?, 255]),
        8 => Some([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let parsed = parse_hex("#3f51b5").expect("parsed");
        assert_eq!(parsed, DEFAULT_BORDER_COLOR);

        let p2 = parse_hex("#11223344").expect("parsed2");
        assert_eq!(p2, [0x11, 0x22, 0x33, 0x44]);

        assert_eq!(parse_hex("3f51b5"), None);
        assert_eq!(parse_hex("#3f51"), None);
        assert_eq!(parse_hex("#zz51b5"), None);
        assert_eq!(parse_hex("#ééé"), None);
    }

    #[test]
    fn defaults_scale_with_density() {
        let style = BubbleStyle::with_metrics(DisplayMetrics {
            density: 2.0,
            scaled_density: 2.0,
        });
        assert_eq!(style.bubble_size, 80);
        assert_eq!(style.bubble_offset, 40);
        assert_eq!(style.bubble_margin, 8);
        assert_eq!(style.border_width, 2);
        assert_eq!(style.bubble_peek, 4);
        assert!(style.use_bubble_offset);
        assert_eq!(style.font, FontFace::Medium);
    }

    #[test]
    fn toml_overrides_defaults() {
        let style = BubbleStyle::from_toml_str(
            r##"
            density = 1.5
            bubble_size = 48
            bubble_peek = 3
            border_color = "#ff5722"
            use_bubble_offset = false
            font = "bold"
            "##,
        )
        .unwrap();
        assert_eq!(style.bubble_size, 48);
        assert_eq!(style.bubble_offset, 24);
        assert_eq!(style.bubble_peek, 3);
        assert_eq!(style.border_color, [0xff, 0x57, 0x22, 0xff]);
        assert_eq!(style.bubble_margin, 6);
        assert_eq!(style.metrics.scaled_density, 1.5);
        assert!(!style.use_bubble_offset);
        assert_eq!(style.font, FontFace::Bold);
    }

    #[test]
    fn bad_configs_are_rejected() {
        assert!(matches!(
            BubbleStyle::from_toml_str("border_color = \"red\""),
            Err(ConfigError::Color(c)) if c == "red"
        ));
        assert!(matches!(
            BubbleStyle::from_toml_str("bubble_size = 20\nbubble_offset = 20"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BubbleStyle::from_toml_str("bubble_sise = 20"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bubbles.toml");
        fs::write(&path, "bubble_margin = 10\n").unwrap();
        assert_eq!(BubbleStyle::load(&path).unwrap().bubble_margin, 10);
        assert!(matches!(
            BubbleStyle::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
