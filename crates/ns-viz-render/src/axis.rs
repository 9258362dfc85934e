//! Axis ranges, ticks and the data-to-pixel mapping.

/// A labelled major tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub log: bool,
    pub label: String,
    pub ticks: Vec<Tick>,
    pub minor: Vec<f64>,
}

/// Floor for log-scale values.
const LOG_FLOOR: f64 = 1e-20;

impl Axis {
    /// Linear axis rounded out to a 1-2-5 step, about `n_ticks` major ticks.
    pub fn linear(lo: f64, hi: f64, n_ticks: usize) -> Self {
        let (lo, hi) = if (hi - lo).abs() < 1e-15 { (lo - 1.0, hi + 1.0) } else { (lo, hi) };
        let step = round_step((hi - lo) / n_ticks.saturating_sub(1).max(1) as f64);
        let first = (lo / step).floor() as i64;
        let last = (hi / step).ceil() as i64;
        let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };

        let ticks = (first..=last)
            .map(|k| {
                let value = k as f64 * step;
                Tick { value, label: format!("{:.*}", decimals, if k == 0 { 0.0 } else { value }) }
            })
            .collect();
        let minor = (first * 5..last * 5)
            .filter(|k| k % 5 != 0)
            .map(|k| k as f64 * step / 5.0)
            .collect();

        Self {
            min: first as f64 * step,
            max: last as f64 * step,
            log: false,
            label: String::new(),
            ticks,
            minor,
        }
    }

    /// Log axis covering whole decades, at least one.
    pub fn log(lo: f64, hi: f64) -> Self {
        let first = lo.max(LOG_FLOOR).log10().floor() as i32;
        let last = (hi.max(LOG_FLOOR).log10().ceil() as i32).max(first + 1);

        let ticks = (first..=last)
            .map(|e| Tick { value: 10f64.powi(e), label: format!("10{}", superscript(e)) })
            .collect();
        let minor = (first..last)
            .flat_map(|e| (2..=9).map(move |m| f64::from(m) * 10f64.powi(e)))
            .collect();

        Self {
            min: 10f64.powi(first),
            max: 10f64.powi(last),
            log: true,
            label: String::new(),
            ticks,
            minor,
        }
    }

    pub fn labelled(self, label: impl Into<String>) -> Self {
        Self { label: label.into(), ..self }
    }

    /// Position of `value` between pixel coordinates `from` (axis min) and
    /// `to` (axis max).
    pub fn map(&self, value: f64, from: f64, to: f64) -> f64 {
        let t = if self.log {
            let l = |v: f64| v.max(LOG_FLOOR).log10();
            (l(value) - l(self.min)) / (l(self.max) - l(self.min))
        } else {
            (value - self.min) / (self.max - self.min)
        };
        from + t * (to - from)
    }
}

/// Closest of 1, 2, 5 or 10 times a power of ten.
fn round_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.abs().log10().floor());
    let mantissa = raw / magnitude;
    let nice = [(1.5, 1.0), (3.5, 2.0), (7.5, 5.0)]
        .iter()
        .find(|(limit, _)| mantissa <= *limit)
        .map_or(10.0, |&(_, n)| n);
    nice * magnitude
}

fn superscript(n: i32) -> String {
    const DIGITS: [char; 10] = [
        '\u{2070}', '\u{00B9}', '\u{00B2}', '\u{00B3}', '\u{2074}', '\u{2075}', '\u{2076}',
        '\u{2077}', '\u{2078}', '\u{2079}',
    ];
    n.to_string()
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => DIGITS[d as usize],
            None => '\u{207B}',
        })
        .collect()
}
