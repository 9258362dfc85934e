//! Plot area layout, header line, and the framed axes around it.

use crate::axis::Axis;
use crate::config::{TickDirection, VizConfig};
use crate::style::{Anchor, Baseline, Color, Font, Paint};
use crate::svg::Svg;

/// Inner rectangle holding the data, in canvas points.
#[derive(Debug, Clone, Copy)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

const OUTER_PAD: f64 = 15.0;
const MIN_SIDE: f64 = 50.0;

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Largest area leaving room for tick labels, axis labels and the header.
    pub fn fit(svg: &Svg, x: &Axis, y: &Axis, config: &VizConfig) -> Self {
        let tick_font = Font::new(config.font.tick_size);
        let label_room = |axis: &Axis| if axis.label.is_empty() { 0.0 } else { config.font.label_size + 6.0 };

        let widest_tick = y.ticks.iter().map(|t| svg.measure(&t.label, &tick_font).width).fold(0.0, f64::max);
        let left = OUTER_PAD + widest_tick + 8.0 + label_room(y);
        let bottom = OUTER_PAD + config.font.tick_size + 6.0 + label_room(x);
        let top = config.font.label_size * 1.3 + 20.0;

        Self {
            left,
            top,
            width: (svg.width - left - OUTER_PAD).max(MIN_SIDE),
            height: (svg.height - top - bottom).max(MIN_SIDE),
        }
    }
}

/// Experiment name and status on the left, `title` on the right.
pub fn draw_header(svg: &mut Svg, area: &PlotArea, config: &VizConfig, title: &str) {
    let size = config.font.label_size * 1.3;
    let y = area.top - 6.0;
    let mut x = area.left + 0.02 * area.width;

    let experiment = &config.experiment;
    if !experiment.name.is_empty() {
        let bold = Font::new(size).bold();
        svg.text(x, y, &experiment.name, &bold);
        x += svg.measure(&experiment.name, &bold).width + 5.0;
        if !experiment.status.is_empty() {
            svg.text(x, y, &experiment.status, &Font::new(0.85 * size).italic());
        }
    }

    if !title.is_empty() {
        let font = Font::new(config.font.tick_size).color(Color::rgb(80, 80, 80)).anchor(Anchor::End);
        svg.text(area.right(), y, title, &font);
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Bottom,
    Top,
    Left,
    Right,
}

struct Ticker<'a> {
    area: &'a PlotArea,
    inward: bool,
}

impl Ticker<'_> {
    fn draw(&self, svg: &mut Svg, edge: Edge, at: f64, len: f64, paint: &Paint) {
        let d = if self.inward { len } else { -len };
        let a = self.area;
        let (from, to) = match edge {
            Edge::Bottom => ((at, a.bottom()), (at, a.bottom() - d)),
            Edge::Top => ((at, a.top), (at, a.top + d)),
            Edge::Left => ((a.left, at), (a.left + d, at)),
            Edge::Right => ((a.right(), at), (a.right() - d, at)),
        };
        svg.line(from, to, paint);
    }
}

fn inside(p: f64, lo: f64, hi: f64) -> bool {
    p >= lo - 0.5 && p <= hi + 0.5
}

/// Frame, grid, ticks, tick labels and axis labels.
pub fn draw_axes(svg: &mut Svg, area: &PlotArea, x: &Axis, y: &Axis, config: &VizConfig) {
    let axes = &config.axes;
    let major = Paint::stroke(Color::BLACK, 0.6);
    let minor = Paint::stroke(Color::BLACK, 0.4);
    let grid = Paint::stroke(config.grid.color.alpha(config.grid.alpha), 0.5).dashed("3 3");
    let ticker = Ticker { area, inward: axes.tick_direction == TickDirection::In };
    let gap = if ticker.inward { 3.0 } else { axes.tick_length + 3.0 };

    svg.rect(area.left, area.top, area.width, area.height, &Paint::stroke(Color::BLACK, 0.8));

    let x_font = Font::new(config.font.tick_size).anchor(Anchor::Middle).baseline(Baseline::Hanging);
    for tick in &x.ticks {
        let px = x.map(tick.value, area.left, area.right());
        if !inside(px, area.left, area.right()) {
            continue;
        }
        if config.grid.show {
            svg.line((px, area.top), (px, area.bottom()), &grid);
        }
        ticker.draw(svg, Edge::Bottom, px, axes.tick_length, &major);
        if axes.mirror_ticks {
            ticker.draw(svg, Edge::Top, px, axes.tick_length, &major);
        }
        svg.text(px, area.bottom() + gap, &tick.label, &x_font);
    }
    for &v in &x.minor {
        let px = x.map(v, area.left, area.right());
        if inside(px, area.left, area.right()) {
            ticker.draw(svg, Edge::Bottom, px, axes.minor_tick_length, &minor);
        }
    }

    let y_font = Font::new(config.font.tick_size).anchor(Anchor::End).baseline(Baseline::Central);
    for tick in &y.ticks {
        let py = y.map(tick.value, area.bottom(), area.top);
        if !inside(py, area.top, area.bottom()) {
            continue;
        }
        if config.grid.show {
            svg.line((area.left, py), (area.right(), py), &grid);
        }
        ticker.draw(svg, Edge::Left, py, axes.tick_length, &major);
        if axes.mirror_ticks {
            ticker.draw(svg, Edge::Right, py, axes.tick_length, &major);
        }
        svg.text(area.left - gap - 1.0, py, &tick.label, &y_font);
    }
    for &v in &y.minor {
        let py = y.map(v, area.bottom(), area.top);
        if inside(py, area.top, area.bottom()) {
            ticker.draw(svg, Edge::Left, py, axes.minor_tick_length, &minor);
        }
    }

    let label_font = Font::new(config.font.label_size).anchor(Anchor::Middle);
    if !x.label.is_empty() {
        let ly = area.bottom() + gap + config.font.tick_size + 11.0;
        svg.text(area.left + 0.5 * area.width, ly, &x.label, &label_font);
    }
    if !y.label.is_empty() {
        let widest = y.ticks.iter().map(|t| svg.measure(&t.label, &y_font).width).fold(0.0, f64::max);
        let lx = area.left - gap - widest - config.font.label_size;
        svg.text_rotated(lx, area.top + 0.5 * area.height, &y.label, &label_font, -90.0);
    }
}
