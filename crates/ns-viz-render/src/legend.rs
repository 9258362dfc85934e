use crate::frame::PlotArea;
use crate::style::{Baseline, Color, Font, Paint};
use crate::svg::Svg;

/// What is drawn left of a legend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swatch {
    /// Translucent box with an outline
    Box,
    /// Short solid line
    Line,
    /// Nothing; the label starts at the swatch column
    None,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub label: String,
    pub color: Color,
    pub swatch: Swatch,
}

impl Entry {
    pub fn new(label: impl Into<String>, color: Color, swatch: Swatch) -> Self {
        Self { label: label.into(), color, swatch }
    }
}

const PAD: f64 = 6.0;
const SWATCH_W: f64 = 14.0;

/// Framed legend in the top-right corner of `area`.
pub fn draw(svg: &mut Svg, area: &PlotArea, entries: &[Entry], font_size: f64) {
    if entries.is_empty() {
        return;
    }
    let row = font_size + 4.0;
    let font = Font::new(0.85 * font_size).baseline(Baseline::Central);
    let text_w = entries.iter().map(|e| svg.measure(&e.label, &font).width).fold(0.0, f64::max);

    let w = 2.0 * PAD + SWATCH_W + PAD + text_w;
    let h = 2.0 * PAD + row * entries.len() as f64;
    let (x0, y0) = (area.right() - w - 5.0, area.top + 5.0);
    svg.rect(x0, y0, w, h, &Paint::fill(Color::WHITE.alpha(0.9)).with_stroke(Color::rgb(200, 200, 200), 0.5));

    let sx = x0 + PAD;
    for (i, entry) in entries.iter().enumerate() {
        let cy = y0 + PAD + row * (i as f64 + 0.5);
        match entry.swatch {
            Swatch::Box => {
                let sh = font_size - 2.0;
                let paint = Paint::fill(entry.color.alpha(0.3)).with_stroke(entry.color, 1.0);
                svg.rect(sx, cy - 0.5 * sh, SWATCH_W, sh, &paint);
            }
            Swatch::Line => svg.line((sx, cy), (sx + SWATCH_W, cy), &Paint::stroke(entry.color, 1.5)),
            Swatch::None => {}
        }
        let tx = if entry.swatch == Swatch::None { sx } else { sx + SWATCH_W + PAD };
        svg.text(tx, cy, &entry.label, &font.clone().color(entry.color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_entry() {
        let mut svg = Svg::new(300.0, 200.0).unwrap();
        let area = PlotArea { left: 40.0, top: 30.0, width: 240.0, height: 140.0 };
        let entries = [
            Entry::new("B Model", Color::rgb(0, 0, 255), Swatch::Box),
            Entry::new("Observed", Color::BLACK, Swatch::Line),
            Entry::new("p = 0.1", Color::BLACK, Swatch::None),
        ];
        draw(&mut svg, &area, &entries, 10.0);
        let out = svg.finish();
        assert_eq!(out.matches("<text").count(), 3);
        // page and legend backgrounds plus one box swatch
        assert_eq!(out.matches("<rect").count(), 3);
        assert_eq!(out.matches("<line").count(), 1);
    }

    fn legend_width(label: &str) -> f64 {
        let mut svg = Svg::new(300.0, 200.0).unwrap();
        let area = PlotArea { left: 40.0, top: 30.0, width: 240.0, height: 140.0 };
        draw(&mut svg, &area, &[Entry::new(label, Color::BLACK, Swatch::None)], 10.0);
        let out = svg.finish();
        // second rect: the first one is the page background
        let rect = out.match_indices("<rect").nth(1).unwrap().0;
        let attr = &out[rect..];
        let start = attr.find("width=\"").unwrap() + 7;
        let end = start + attr[start..].find('"').unwrap();
        attr[start..end].parse().unwrap()
    }

    #[test]
    fn frame_width_follows_glyph_metrics() {
        // same character count, different advances
        assert!(legend_width("WWWWWW") > legend_width("iiiiii") + 20.0);
        assert!(legend_width("CL_s+b = 0.75") > legend_width("CL_b"));
    }

    #[test]
    fn empty_legend_draws_nothing() {
        let mut svg = Svg::new(100.0, 100.0).unwrap();
        let area = PlotArea { left: 0.0, top: 0.0, width: 100.0, height: 100.0 };
        draw(&mut svg, &area, &[], 10.0);
        assert!(!svg.finish().contains("<text"));
    }
}
