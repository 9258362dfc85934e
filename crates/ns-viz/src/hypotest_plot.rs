//! Hypothesis-test plot artifact: null and alternate test-statistic
//! distributions with the observed value.
//!
//! Both distributions are histogrammed on common bin edges and normalised to
//! unit area. Rendering (SVG) is handled downstream by `ns-viz-render`.

use ns_core::{Error, Result};
use ns_inference::{HypoTestResult, SamplingDistribution};
use serde::{Deserialize, Serialize};

/// Schema tag written into every artifact.
pub const SCHEMA_VERSION: &str = "nextstat_hypotest_v0";

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 100;

/// One histogrammed sampling distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSeries {
    /// Distribution name (hypothesis).
    pub name: String,
    /// Bin densities, normalised to unit area.
    pub density: Vec<f64>,
    /// Number of entries histogrammed.
    pub n_entries: usize,
}

/// Plot-friendly artifact of a toy-based hypothesis test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypoTestPlotArtifact {
    pub schema_version: String,
    /// Result name, used as the plot title.
    pub title: String,
    pub x_label: String,
    pub log_y: bool,
    /// Common bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    pub null: HistogramSeries,
    pub alt: HistogramSeries,
    /// Test statistic on the observed data.
    pub observed: f64,
    pub null_p_value: f64,
    pub alt_p_value: f64,
}

/// Builder for a [`HypoTestPlotArtifact`] from a toy-based result.
#[derive(Debug, Clone)]
pub struct HypoTestPlot<'a> {
    result: &'a HypoTestResult,
    n_bins: usize,
    log_y: bool,
}

impl<'a> HypoTestPlot<'a> {
    /// Plot of `result` with [`DEFAULT_BINS`] bins on a linear y axis.
    pub fn new(result: &'a HypoTestResult) -> Self {
        Self { result, n_bins: DEFAULT_BINS, log_y: false }
    }

    /// Logarithmic y axis.
    pub fn set_log_y_axis(&mut self, on: bool) {
        self.log_y = on;
    }

    /// Whether the y axis is logarithmic.
    pub fn log_y_axis(&self) -> bool {
        self.log_y
    }

    /// Number of bins (at least one).
    pub fn set_n_bins(&mut self, n_bins: usize) {
        self.n_bins = n_bins.max(1);
    }

    /// Histogram both distributions.
    ///
    /// Fails for results without sampled distributions (asymptotic results).
    pub fn artifact(&self) -> Result<HypoTestPlotArtifact> {
        let (null, alt) = match (self.result.null_distribution(), self.result.alt_distribution()) {
            (Some(n), Some(a)) => (n, a),
            _ => {
                return Err(Error::Validation(format!(
                    "result '{}' has no sampled distributions to plot",
                    self.result.name()
                )));
            }
        };

        let observed = self.result.test_statistic_data();
        let bin_edges = common_edges(null, alt, observed, self.n_bins);

        Ok(HypoTestPlotArtifact {
            schema_version: SCHEMA_VERSION.to_string(),
            title: self.result.name().to_string(),
            x_label: "-log \u{03BB}".to_string(),
            log_y: self.log_y,
            null: histogram(null, &bin_edges),
            alt: histogram(alt, &bin_edges),
            bin_edges,
            observed,
            null_p_value: self.result.null_p_value(),
            alt_p_value: self.result.alternate_p_value(),
        })
    }
}

fn common_edges(
    null: &SamplingDistribution,
    alt: &SamplingDistribution,
    observed: f64,
    n_bins: usize,
) -> Vec<f64> {
    let mut lo = observed;
    let mut hi = observed;
    for (a, b) in [null.range(), alt.range()].into_iter().flatten() {
        lo = lo.min(a);
        hi = hi.max(b);
    }
    if !(hi - lo).is_finite() || hi - lo < 1e-12 {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / n_bins as f64;
    (0..=n_bins).map(|i| lo + i as f64 * width).collect()
}

/// Unit-area histogram on `edges`; the last bin is closed on the right.
fn histogram(dist: &SamplingDistribution, edges: &[f64]) -> HistogramSeries {
    let n_bins = edges.len() - 1;
    let lo = edges[0];
    let hi = edges[n_bins];
    let width = (hi - lo) / n_bins as f64;

    let mut counts = vec![0usize; n_bins];
    for &v in dist.values() {
        if v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    let total = dist.len() as f64;
    let density = counts
        .iter()
        .map(|&c| if total > 0.0 { c as f64 / (total * width) } else { 0.0 })
        .collect();

    HistogramSeries { name: dist.name().to_string(), density, n_entries: dist.len() }
}
