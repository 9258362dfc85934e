//! Shared result types.

use serde::{Deserialize, Serialize};

/// Maximum-likelihood estimate with Hessian-based uncertainties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Best-fit values, in model parameter order
    pub parameters: Vec<f64>,
    /// One-sigma uncertainties; zero for fixed parameters
    pub uncertainties: Vec<f64>,
    /// Row-major N×N covariance, absent when the Hessian could not be inverted
    pub covariance: Option<Vec<f64>>,
    /// NLL at the minimum
    pub nll: f64,
    /// Whether the minimizer reported convergence
    pub converged: bool,
    /// Minimizer iterations
    pub n_iter: usize,
}

impl FitResult {
    /// Value and uncertainty of parameter `idx`.
    pub fn value(&self, idx: usize) -> Option<(f64, f64)> {
        Some((*self.parameters.get(idx)?, *self.uncertainties.get(idx)?))
    }

    /// Covariance element `(i, j)`.
    pub fn covariance(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.parameters.len();
        if i >= n || j >= n {
            return None;
        }
        self.covariance.as_ref().map(|c| c[i * n + j])
    }
}
