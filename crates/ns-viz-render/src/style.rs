//! Colors, paints and fonts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGB color with opacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    /// Same color at opacity `alpha`.
    pub const fn alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    fn is_opaque(&self) -> bool {
        (self.alpha - 1.0).abs() < 1e-6
    }
}

impl FromStr for Color {
    type Err = String;

    /// `#rrggbb`, with or without the `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        let channel = |at: usize| {
            digits
                .get(at..at + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .ok_or_else(|| format!("invalid color '{s}', expected #rrggbb"))
        };
        if digits.len() != 6 {
            return Err(format!("invalid color '{s}', expected #rrggbb"));
        }
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
    }
}

/// SVG paint value: `#rrggbb` when opaque, `rgba(..)` otherwise.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({},{},{},{:.3})", self.r, self.g, self.b, self.alpha)
        }
    }
}

/// Fill and stroke of a shape.
#[derive(Debug, Clone, Default)]
pub struct Paint {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub width: f64,
    pub dash: Option<&'static str>,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self { fill: Some(color), ..Self::default() }
    }

    pub fn stroke(color: Color, width: f64) -> Self {
        Self { stroke: Some(color), width, ..Self::default() }
    }

    pub fn with_stroke(self, color: Color, width: f64) -> Self {
        Self { stroke: Some(color), width, ..self }
    }

    pub fn dashed(self, pattern: &'static str) -> Self {
        Self { dash: Some(pattern), ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Baseline {
    #[default]
    Alphabetic,
    Central,
    Hanging,
}

/// Text appearance.
#[derive(Debug, Clone)]
pub struct Font {
    pub size: f64,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub anchor: Anchor,
    pub baseline: Baseline,
}

impl Font {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            color: Color::BLACK,
            bold: false,
            italic: false,
            anchor: Anchor::Start,
            baseline: Baseline::Alphabetic,
        }
    }

    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub fn italic(self) -> Self {
        Self { italic: true, ..self }
    }

    pub fn color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    pub fn anchor(self, anchor: Anchor) -> Self {
        Self { anchor, ..self }
    }

    pub fn baseline(self, baseline: Baseline) -> Self {
        Self { baseline, ..self }
    }
}
