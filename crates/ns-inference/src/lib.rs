//! # ns-inference
//!
//! Frequentist hypothesis testing for NextStat.
//!
//! This crate provides:
//! - Maximum Likelihood Estimation (MLE) via L-BFGS-B
//! - Model configurations with POI snapshots
//! - Profile-likelihood test statistics
//! - Asymptotic and toy-based hypothesis tests
//!
//! ## Example
//!
//! ```no_run
//! use ns_inference::{AsymptoticCalculator, ModelConfig, derive_hypotheses};
//! use ns_translate::pyhf::WorkspaceFile;
//! use std::sync::Arc;
//!
//! # fn main() -> ns_core::Result<()> {
//! let file = WorkspaceFile::open("workspace.json")?;
//! let ws = file.workspace("combined").ok_or_else(|| ns_core::Error::not_found("workspace", "combined"))?;
//! let data = ws.data("obsData").ok_or_else(|| ns_core::Error::not_found("dataset", "obsData"))?;
//! let config = ModelConfig::new("ModelConfig", Arc::new(ws.model("ModelConfig")?))?;
//!
//! let (sb, b) = derive_hypotheses(config);
//! let mut calc = AsymptoticCalculator::new(&data, &sb, &b)?;
//! calc.set_one_sided_discovery(true);
//! println!("{}", calc.get_hypo_test()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

/// Asymptotic hypothesis test.
pub mod asymptotic;
/// Toy-based hypothesis test.
pub mod frequentist;
/// Maximum-likelihood estimation via L-BFGS-B.
pub mod mle;
/// Model configurations and hypothesis derivation.
pub mod model_config;
/// Generic numerical optimizer (L-BFGS-B backend).
pub mod optimizer;
/// Hypothesis-test results.
pub mod result;
/// Test statistics.
pub mod test_statistic;
/// Toy Monte Carlo sampling.
pub mod toymc;

pub use asymptotic::AsymptoticCalculator;
pub use frequentist::FrequentistCalculator;
pub use mle::MaximumLikelihoodEstimator;
pub use model_config::{B_MODEL_NAME, ModelConfig, SB_MODEL_NAME, Snapshot, derive_hypotheses};
pub use optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizationResult, OptimizerConfig};
pub use result::HypoTestResult;
pub use test_statistic::{ProfileLikelihoodTestStat, Sidedness, TestStatistic};
pub use toymc::{GlobalObservables, SamplingDistribution, Toy, ToyMcSampler};
