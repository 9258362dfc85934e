//! Embedded DejaVu Sans faces and glyph metrics.

use ab_glyph::{Font as _, FontRef, ScaleFont};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::style::Font;

static DEJAVU_REGULAR: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
static DEJAVU_BOLD: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");
static DEJAVU_OBLIQUE: &[u8] = include_bytes!("../fonts/DejaVuSans-Oblique.ttf");

/// Family name written into `font-family`.
pub const FAMILY: &str = "DejaVu Sans";

pub struct FontHandle {
    pub regular: FontRef<'static>,
    pub bold: FontRef<'static>,
    pub italic: FontRef<'static>,
}

impl FontHandle {
    pub fn embedded() -> crate::Result<Self> {
        let load = |bytes: &'static [u8]| {
            FontRef::try_from_slice(bytes).map_err(|e| crate::RenderError::Font(e.to_string()))
        };
        Ok(Self {
            regular: load(DEJAVU_REGULAR)?,
            bold: load(DEJAVU_BOLD)?,
            italic: load(DEJAVU_OBLIQUE)?,
        })
    }

    /// Bold wins over italic; there is no bold-oblique face.
    pub fn select(&self, font: &Font) -> &FontRef<'static> {
        if font.bold {
            &self.bold
        } else if font.italic {
            &self.italic
        } else {
            &self.regular
        }
    }

    pub fn measure(&self, text: &str, font: &Font) -> TextMetrics {
        measure_text(self.select(font), text, font.size)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub ascent: f64,
}

/// Kerned advance width and line height of `text` at `size_pt`.
pub fn measure_text(font: &FontRef<'_>, text: &str, size_pt: f64) -> TextMetrics {
    let scaled = font.as_scaled(ab_glyph::PxScale::from(size_pt as f32));

    let mut width = 0.0_f32;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    let ascent = scaled.ascent();
    TextMetrics {
        width: width as f64,
        height: (ascent - scaled.descent()) as f64,
        ascent: ascent as f64,
    }
}

/// `<style>` block declaring the three faces as base64 data URLs.
pub fn svg_font_style() -> String {
    let face = |bytes: &[u8], weight: u16, style: &str| {
        format!(
            "@font-face {{ font-family: '{FAMILY}'; font-weight: {weight}; font-style: {style}; \
             src: url('data:font/ttf;base64,{}') format('truetype'); }}\n",
            STANDARD.encode(bytes)
        )
    };
    let mut out = String::from("<style>\n");
    out.push_str(&face(DEJAVU_REGULAR, 400, "normal"));
    out.push_str(&face(DEJAVU_BOLD, 700, "normal"));
    out.push_str(&face(DEJAVU_OBLIQUE, 400, "italic"));
    out.push_str("</style>\n");
    out
}
