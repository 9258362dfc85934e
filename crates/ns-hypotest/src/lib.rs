//! # ns-hypotest
//!
//! Discovery hypothesis test over a HistFactory workspace file: asymptotic
//! formulae first, then toy Monte Carlo, with the toy test-statistic
//! distributions rendered as an SVG plot.

#![warn(missing_docs)]

pub mod simple_hypotest;

pub use simple_hypotest::{HypoTestReport, Inputs, Loaded, RunOptions, load, run};
