//! Core traits for NextStat
//!
//! Inference code (fits, test statistics, calculators) talks to models through
//! these traits so that it does not depend on a concrete model format.

use crate::Result;

/// A parametric model with a negative log-likelihood.
pub trait LogDensityModel: Send + Sync {
    /// Number of parameters.
    fn dim(&self) -> usize;

    /// Parameter names, in parameter order.
    fn parameter_names(&self) -> Vec<String>;

    /// Parameter bounds `(min, max)`.
    fn parameter_bounds(&self) -> Vec<(f64, f64)>;

    /// Initial parameter values for a fit.
    fn parameter_init(&self) -> Vec<f64>;

    /// Negative log-likelihood at `params`.
    fn nll(&self, params: &[f64]) -> Result<f64>;

    /// Gradient of the NLL.
    ///
    /// Defaults to central differences with a step scaled to `max(|x_i|, 1)`.
    fn grad_nll(&self, params: &[f64]) -> Result<Vec<f64>> {
        let mut grad = vec![0.0; params.len()];
        let mut work = params.to_vec();
        for i in 0..params.len() {
            let eps = 1e-6 * params[i].abs().max(1.0);
            work[i] = params[i] + eps;
            let f_plus = self.nll(&work)?;
            work[i] = params[i] - eps;
            let f_minus = self.nll(&work)?;
            work[i] = params[i];
            grad[i] = (f_plus - f_minus) / (2.0 * eps);
        }
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Parabola;

    impl LogDensityModel for Parabola {
        fn dim(&self) -> usize {
            2
        }

        fn parameter_names(&self) -> Vec<String> {
            vec!["x".into(), "y".into()]
        }

        fn parameter_bounds(&self) -> Vec<(f64, f64)> {
            vec![(-10.0, 10.0); 2]
        }

        fn parameter_init(&self) -> Vec<f64> {
            vec![0.0; 2]
        }

        fn nll(&self, params: &[f64]) -> Result<f64> {
            Ok((params[0] - 1.0).powi(2) + 3.0 * params[1].powi(2))
        }
    }

    #[test]
    fn test_default_gradient_matches_analytic() {
        let g = Parabola.grad_nll(&[2.0, -1.0]).unwrap();
        assert!((g[0] - 2.0).abs() < 1e-6);
        assert!((g[1] + 6.0).abs() < 1e-6);
    }
}
