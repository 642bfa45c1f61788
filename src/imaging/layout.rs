//! Composite layout planning.
//!
//! Everything here is pure arithmetic: no decoding, no I/O. A
//! [`CompositeLayout`] is derived from the configured [`LayoutMode`] and the
//! number of images, and the compositor only follows it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ComposeError;

/// RGBA colour, written as `#rrggbb` or `#rrggbbaa` in config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    pub const TRANSPARENT: Color = Color([255, 255, 255, 0]);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !matches!(hex.len(), 6 | 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid colour '{}', expected #rrggbb or #rrggbbaa", s));
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        let alpha = if hex.len() == 8 { channel(6) } else { 255 };
        Ok(Color([channel(0), channel(2), channel(4), alpha]))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

/// Encoding of the composed canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    /// Alpha is flattened away
    #[default]
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// How multiple images are arranged on one canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// Each image cropped to fill `width×height`, placed left to right
    SideBySide { width: u32, height: u32 },

    /// Each image fitted inside a `size×size` square, padded, stacked top to bottom
    StackedSquare {
        size: u32,
        #[serde(default)]
        background: Color,
    },
}

impl Default for LayoutMode {
    fn default() -> Self {
        Self::StackedSquare {
            size: 1080,
            background: Color::WHITE,
        }
    }
}

/// How a source image is scaled into its tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// Cover the tile, cropping the overflow around the center
    Fill,
    /// Fit inside the tile keeping the aspect ratio, pad the rest
    Contain,
}

/// The slot one source image occupies on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A fully resolved layout for a given number of images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Color,
    pub fit: Fit,
    /// One tile per input image, in input order
    pub tiles: Vec<Tile>,
    pub format: OutputFormat,
}

/// Most images a source post can carry
pub const MAX_POST_IMAGES: usize = 4;

/// Largest canvas side the JPEG encoder accepts
pub const MAX_JPEG_SIDE: u32 = u16::MAX as u32;

impl LayoutMode {
    /// Tile size of one image
    pub fn tile_size(&self) -> (u32, u32) {
        match *self {
            Self::SideBySide { width, height } => (width, height),
            Self::StackedSquare { size, .. } => (size, size),
        }
    }

    /// Check that a post with the most images a feed can carry still fits
    pub fn validate(&self, format: OutputFormat) -> Result<(), ComposeError> {
        CompositeLayout::plan(self, MAX_POST_IMAGES, format).map(|_| ())
    }
}

impl CompositeLayout {
    /// Plan the canvas for `count` images
    pub fn plan(
        mode: &LayoutMode,
        count: usize,
        format: OutputFormat,
    ) -> Result<Self, ComposeError> {
        if count < 2 {
            return Err(ComposeError::TooFewImages(count));
        }

        let (tile_w, tile_h) = mode.tile_size();
        if tile_w == 0 || tile_h == 0 {
            return Err(ComposeError::EmptyTile {
                width: tile_w,
                height: tile_h,
            });
        }

        let too_large = || ComposeError::CanvasTooLarge {
            images: count,
            width: tile_w,
            height: tile_h,
        };
        let n = u32::try_from(count).map_err(|_| too_large())?;

        let layout = match *mode {
            LayoutMode::SideBySide { width, height } => Self {
                canvas_width: width.checked_mul(n).ok_or_else(too_large)?,
                canvas_height: height,
                background: Color::TRANSPARENT,
                fit: Fit::Fill,
                tiles: (0..n)
                    .map(|i| Tile {
                        x: i * width,
                        y: 0,
                        width,
                        height,
                    })
                    .collect(),
                format,
            },
            LayoutMode::StackedSquare { size, background } => Self {
                canvas_width: size,
                canvas_height: size.checked_mul(n).ok_or_else(too_large)?,
                background,
                fit: Fit::Contain,
                tiles: (0..n)
                    .map(|i| Tile {
                        x: 0,
                        y: i * size,
                        width: size,
                        height: size,
                    })
                    .collect(),
                format,
            },
        };

        if format == OutputFormat::Jpeg
            && layout.canvas_width.max(layout.canvas_height) > MAX_JPEG_SIDE
        {
            return Err(too_large());
        }

        Ok(layout)
    }
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
///
/// Scales up as well as down. Each side is at least 1 px and never exceeds
/// the bound.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Offset that centers `inner` inside `outer` along one axis
pub fn center_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}
