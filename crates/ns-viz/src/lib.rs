//! # ns-viz
//!
//! Visualization data artifacts for NextStat.
//!
//! This crate is intentionally dependency-light and focuses on emitting
//! plot-friendly JSON structures (arrays instead of nested objects).

#![warn(clippy::all)]

/// Hypothesis-test distribution plots.
pub mod hypotest_plot;

pub use hypotest_plot::{HistogramSeries, HypoTestPlot, HypoTestPlotArtifact};
