//! Streaming SVG writer. Coordinates are points (1/72 inch).

use crate::font::{FAMILY, FontHandle, TextMetrics, svg_font_style};
use crate::style::{Anchor, Baseline, Color, Font, Paint};
use std::fmt::Write;

pub struct Svg {
    pub width: f64,
    pub height: f64,
    fonts: FontHandle,
    embed_fonts: bool,
    defs: String,
    body: String,
    n_clips: usize,
    open_groups: usize,
}

impl Svg {
    pub fn new(width: f64, height: f64) -> crate::Result<Self> {
        Ok(Self {
            width,
            height,
            fonts: FontHandle::embedded()?,
            embed_fonts: false,
            defs: String::new(),
            body: String::with_capacity(16 * 1024),
            n_clips: 0,
            open_groups: 0,
        })
    }

    /// Write the faces into the document so it renders identically without
    /// DejaVu Sans installed.
    pub fn set_embed_fonts(&mut self, embed: bool) {
        self.embed_fonts = embed;
    }

    pub fn measure(&self, text: &str, font: &Font) -> TextMetrics {
        self.fonts.measure(text, font)
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, paint: &Paint) {
        let _ = write!(self.body, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#);
        self.paint_attrs(paint);
        self.body.push_str(" />\n");
    }

    pub fn line(&mut self, (x1, y1): (f64, f64), (x2, y2): (f64, f64), paint: &Paint) {
        let _ = write!(self.body, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#);
        self.paint_attrs(paint);
        self.body.push_str(" />\n");
    }

    /// Open or closed path through `points`.
    pub fn path(&mut self, points: &[(f64, f64)], closed: bool, paint: &Paint) {
        let tag = if closed { "polygon" } else { "polyline" };
        let _ = write!(self.body, r#"<{tag} points=""#);
        for (i, (x, y)) in points.iter().enumerate() {
            let sep = if i == 0 { "" } else { " " };
            let _ = write!(self.body, "{sep}{x:.2},{y:.2}");
        }
        self.body.push('"');
        self.paint_attrs(paint);
        self.body.push_str(" />\n");
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, font: &Font) {
        self.text_at(x, y, content, font, None);
    }

    /// Text rotated by `degrees` around its anchor point.
    pub fn text_rotated(&mut self, x: f64, y: f64, content: &str, font: &Font, degrees: f64) {
        self.text_at(x, y, content, font, Some(degrees));
    }

    fn text_at(&mut self, x: f64, y: f64, content: &str, font: &Font, rotate: Option<f64>) {
        let anchor = match font.anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        };
        let baseline = match font.baseline {
            Baseline::Alphabetic => "auto",
            Baseline::Central => "central",
            Baseline::Hanging => "hanging",
        };
        let _ = write!(
            self.body,
            r#"<text x="{x:.2}" y="{y:.2}" font-family="{FAMILY}, sans-serif" font-size="{:.1}" fill="{}" text-anchor="{anchor}" dominant-baseline="{baseline}""#,
            font.size, font.color,
        );
        if font.bold {
            self.body.push_str(r#" font-weight="bold""#);
        }
        if font.italic {
            self.body.push_str(r#" font-style="italic""#);
        }
        if let Some(deg) = rotate {
            let _ = write!(self.body, r#" transform="rotate({deg:.1},{x:.2},{y:.2})""#);
        }
        self.body.push('>');
        for ch in content.chars() {
            match ch {
                '<' => self.body.push_str("&lt;"),
                '>' => self.body.push_str("&gt;"),
                '&' => self.body.push_str("&amp;"),
                '"' => self.body.push_str("&quot;"),
                _ => self.body.push(ch),
            }
        }
        self.body.push_str("</text>\n");
    }

    /// Clip what follows to a rectangle, until [`end_clip`](Self::end_clip).
    pub fn begin_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.n_clips);
        self.n_clips += 1;
        let _ = writeln!(
            self.defs,
            r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
        );
        let _ = writeln!(self.body, r#"<g clip-path="url(#{id})">"#);
        self.open_groups += 1;
        id
    }

    pub fn end_clip(&mut self) {
        if self.open_groups > 0 {
            self.open_groups -= 1;
            self.body.push_str("</g>\n");
        }
    }

    fn paint_attrs(&mut self, paint: &Paint) {
        match paint.fill {
            Some(fill) => {
                let _ = write!(self.body, r#" fill="{fill}""#);
            }
            None => self.body.push_str(r#" fill="none""#),
        }
        if let Some(stroke) = paint.stroke {
            let _ = write!(self.body, r#" stroke="{stroke}" stroke-width="{:.2}""#, paint.width);
        }
        if let Some(dash) = paint.dash {
            let _ = write!(self.body, r#" stroke-dasharray="{dash}""#);
        }
    }

    /// Complete document on a white background; open clips are closed.
    pub fn finish(mut self) -> String {
        while self.open_groups > 0 {
            self.end_clip();
        }
        let (w, h) = (self.width, self.height);
        let mut out = String::with_capacity(self.body.len() + self.defs.len() + 256);
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        if self.embed_fonts {
            out.push_str(&svg_font_style());
        }
        if !self.defs.is_empty() {
            let _ = write!(out, "<defs>\n{}</defs>\n", self.defs);
        }
        let _ = writeln!(out, r#"<rect width="{w}" height="{h}" fill="{}" />"#, Color::WHITE);
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_size_and_background() {
        let svg = Svg::new(100.0, 50.0).unwrap().finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 100 50""#));
        assert!(svg.contains(r##"fill="#ffffff""##));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn paths_and_paints() {
        let mut svg = Svg::new(200.0, 100.0).unwrap();
        svg.rect(10.0, 20.0, 50.0, 30.0, &Paint::fill(Color::rgb(255, 0, 0)));
        svg.path(&[(0.0, 0.0), (1.0, 2.0)], false, &Paint::stroke(Color::BLACK, 1.0).dashed("3 3"));
        svg.path(&[(0.0, 0.0), (1.0, 2.0), (2.0, 0.0)], true, &Paint::fill(Color::BLACK));
        let out = svg.finish();
        assert!(out.contains(r##"fill="#ff0000""##));
        assert!(out.contains(r#"points="0.00,0.00 1.00,2.00" fill="none""#));
        assert!(out.contains(r#"stroke-dasharray="3 3""#));
        assert!(out.contains("<polygon"));
    }

    #[test]
    fn text_is_escaped_and_styled() {
        let mut svg = Svg::new(200.0, 100.0).unwrap();
        svg.text(10.0, 20.0, "S+B <toys>", &Font::new(10.0).bold().anchor(Anchor::End));
        let out = svg.finish();
        assert!(out.contains("S+B &lt;toys&gt;"));
        assert!(out.contains(r#"text-anchor="end""#));
        assert!(out.contains(r#"font-weight="bold""#));
        assert!(out.contains(r#"font-family="DejaVu Sans, sans-serif""#));
    }

    #[test]
    fn fonts_are_embedded_on_request() {
        let plain = Svg::new(10.0, 10.0).unwrap().finish();
        assert!(!plain.contains("@font-face"));
        let mut svg = Svg::new(10.0, 10.0).unwrap();
        svg.set_embed_fonts(true);
        let out = svg.finish();
        assert_eq!(out.matches("@font-face").count(), 3);
        assert!(out.find("<style>").unwrap() < out.find("<rect").unwrap());
    }

    #[test]
    fn measured_width_follows_the_glyphs() {
        let svg = Svg::new(10.0, 10.0).unwrap();
        let font = Font::new(10.0);
        let narrow = svg.measure("iiiiii", &font).width;
        let wide = svg.measure("MMMMMM", &font).width;
        assert!(wide > 2.0 * narrow);
    }

    #[test]
    fn clip_groups_only_enclosed_elements() {
        let mut svg = Svg::new(200.0, 100.0).unwrap();
        let id = svg.begin_clip(0.0, 0.0, 50.0, 50.0);
        svg.line((0.0, 0.0), (100.0, 100.0), &Paint::stroke(Color::BLACK, 1.0));
        svg.end_clip();
        svg.line((0.0, 0.0), (1.0, 1.0), &Paint::stroke(Color::BLACK, 1.0));
        let out = svg.finish();

        assert!(out.contains(&format!(r#"<clipPath id="{id}">"#)));
        let open = out.find("<g clip-path").unwrap();
        let close = out.find("</g>").unwrap();
        assert!(out[open..close].contains(r#"x2="100.00""#));
        assert!(!out[open..close].contains(r#"x2="1.00""#));
    }
}
