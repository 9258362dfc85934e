use ns_viz::{HistogramSeries, HypoTestPlotArtifact};

use crate::axis::Axis;
use crate::config::VizConfig;
use crate::frame::{PlotArea, draw_axes, draw_header};
use crate::legend::{self, Entry, Swatch};
use crate::style::{Color, Paint};
use crate::svg::Svg;

/// Null and alternate test-statistic histograms with the observed value.
///
/// With `hypotest.shade_tails` both distributions are filled above the observed
/// value, the regions their p-values integrate.
pub fn render(artifact: &HypoTestPlotArtifact, config: &VizConfig) -> crate::Result<String> {
    let edges = artifact.bin_edges.as_slice();
    let n = edges.len().saturating_sub(1);
    if n == 0 || artifact.null.density.len() != n || artifact.alt.density.len() != n {
        return placeholder();
    }

    let all = || artifact.null.density.iter().chain(&artifact.alt.density).copied();
    let top = all().fold(0.0, f64::max).max(1e-12);
    let y = if artifact.log_y {
        let smallest = all().filter(|&d| d > 0.0).fold(f64::INFINITY, f64::min);
        let floor = if smallest.is_finite() { 0.5 * smallest } else { 1e-3 * top };
        Axis::log(floor, 3.0 * top)
    } else {
        Axis::linear(0.0, 1.2 * top, 5)
    }
    .labelled("Probability density");
    let x = Axis::linear(edges[0], edges[n], 6).labelled(artifact.x_label.as_str());

    let mut svg = Svg::new(config.figure.width, config.figure.height)?;
    svg.set_embed_fonts(config.font.embed);
    let area = PlotArea::fit(&svg, &x, &y, config);
    draw_header(&mut svg, &area, config, &artifact.title);
    draw_axes(&mut svg, &area, &x, &y, config);

    let colors = &config.colors;
    let hist = Histograms { area, x: &x, y: &y, edges };
    svg.begin_clip(area.left, area.top, area.width, area.height);
    if config.hypotest.shade_tails {
        let alpha = config.hypotest.tail_alpha;
        hist.fill_between(&mut svg, &artifact.null, artifact.observed, f64::INFINITY, colors.null.alpha(alpha));
        hist.fill_between(&mut svg, &artifact.alt, artifact.observed, f64::INFINITY, colors.alt.alpha(alpha));
    }
    hist.outline(&mut svg, &artifact.null, colors.null);
    hist.outline(&mut svg, &artifact.alt, colors.alt);
    let obs = hist.px(artifact.observed);
    svg.line((obs, area.top), (obs, area.bottom()), &Paint::stroke(colors.observed, 1.5));
    svg.end_clip();

    let mut entries = vec![
        Entry::new(artifact.null.name.as_str(), colors.null, Swatch::Box),
        Entry::new(artifact.alt.name.as_str(), colors.alt, Swatch::Box),
        Entry::new(format!("Observed = {:.3}", artifact.observed), colors.observed, Swatch::Line),
    ];
    if config.hypotest.show_p_values {
        let grey = Color::rgb(60, 60, 60);
        entries.push(Entry::new(format!("p(null) = {:.4}", artifact.null_p_value), grey, Swatch::None));
        entries.push(Entry::new(format!("p(alt) = {:.4}", artifact.alt_p_value), grey, Swatch::None));
    }
    legend::draw(&mut svg, &area, &entries, config.font.size);

    Ok(svg.finish())
}

struct Histograms<'a> {
    area: PlotArea,
    x: &'a Axis,
    y: &'a Axis,
    edges: &'a [f64],
}

impl Histograms<'_> {
    fn px(&self, v: f64) -> f64 {
        self.x.map(v, self.area.left, self.area.right())
    }

    /// Empty bins, and bins below a log axis, sit on the frame bottom.
    fn py(&self, density: f64) -> f64 {
        let below = density <= 0.0 || (self.y.log && density < self.y.min);
        if below { self.area.bottom() } else { self.y.map(density, self.area.bottom(), self.area.top) }
    }

    /// Step outline over a faint fill.
    fn outline(&self, svg: &mut Svg, series: &HistogramSeries, color: Color) {
        let floor = self.area.bottom();
        let mut points = vec![(self.px(self.edges[0]), floor)];
        for (bin, &d) in series.density.iter().enumerate() {
            let h = self.py(d);
            points.push((self.px(self.edges[bin]), h));
            points.push((self.px(self.edges[bin + 1]), h));
        }
        if let Some(&last) = self.edges.last() {
            points.push((self.px(last), floor));
        }
        svg.path(&points, true, &Paint::fill(color.alpha(0.08)));
        svg.path(&points, false, &Paint::stroke(color, 1.2));
    }

    /// Bars for the part of `series` with `lo < x < hi`.
    fn fill_between(&self, svg: &mut Svg, series: &HistogramSeries, lo: f64, hi: f64, color: Color) {
        let paint = Paint::fill(color);
        for (bin, &d) in series.density.iter().enumerate() {
            let (a, b) = (self.edges[bin].max(lo), self.edges[bin + 1].min(hi));
            if d > 0.0 && b > a {
                let (xa, xb, h) = (self.px(a), self.px(b), self.py(d));
                svg.rect(xa, h, xb - xa, self.area.bottom() - h, &paint);
            }
        }
    }
}

fn placeholder() -> crate::Result<String> {
    let mut svg = Svg::new(100.0, 50.0)?;
    svg.text(10.0, 30.0, "No toy distributions", &crate::style::Font::new(10.0));
    Ok(svg.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_viz::hypotest_plot::SCHEMA_VERSION;

    fn artifact(log_y: bool) -> HypoTestPlotArtifact {
        HypoTestPlotArtifact {
            schema_version: SCHEMA_VERSION.to_string(),
            title: "HypoTestCalculator_result".into(),
            x_label: "-log \u{03BB}".into(),
            log_y,
            bin_edges: vec![0.0, 1.0, 2.0, 3.0],
            null: HistogramSeries { name: "B Model".into(), density: vec![0.7, 0.3, 0.0], n_entries: 10 },
            alt: HistogramSeries { name: "S+B Model".into(), density: vec![0.1, 0.4, 0.5], n_entries: 10 },
            observed: 1.5,
            null_p_value: 0.15,
            alt_p_value: 0.3,
        }
    }

    #[test]
    fn draws_both_hypotheses_and_observed_value() {
        let svg = render(&artifact(false), &VizConfig::default()).unwrap();
        for needle in ["B Model", "S+B Model", "Observed = 1.500", "p(null) = 0.1500", "p(alt) = 0.3000"] {
            assert!(svg.contains(needle), "missing {needle}");
        }
        assert!(svg.contains(">HypoTestCalculator_result</text>"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<polygon").count(), 2);
    }

    #[test]
    fn log_y_uses_decade_ticks() {
        let svg = render(&artifact(true), &VizConfig::default()).unwrap();
        assert!(svg.contains("10\u{207B}\u{00B9}"));
    }

    #[test]
    fn tail_shading_is_optional() {
        let mut cfg = VizConfig::default();
        let shaded = render(&artifact(false), &cfg).unwrap();
        cfg.hypotest.shade_tails = false;
        let plain = render(&artifact(false), &cfg).unwrap();
        // null above 1.5: half of [1,2] ([2,3] is empty); alt above 1.5: half of [1,2] and [2,3]
        assert_eq!(shaded.matches("<rect").count(), plain.matches("<rect").count() + 3);
    }

    #[test]
    fn font_embedding_is_configurable() {
        let default = render(&artifact(false), &VizConfig::default()).unwrap();
        assert!(!default.contains("@font-face"));
        let cfg = crate::resolve_config(Some("font:\n  embed: true\n")).unwrap();
        let embedded = render(&artifact(false), &cfg).unwrap();
        assert_eq!(embedded.matches("@font-face").count(), 3);
    }

    #[test]
    fn inconsistent_binning_gives_placeholder() {
        let mut art = artifact(false);
        art.alt.density.pop();
        let svg = render(&art, &VizConfig::default()).unwrap();
        assert!(svg.contains("No toy distributions"));
    }
}
