//! Maximum-likelihood fits.
//!
//! The covariance comes from the finite-difference Hessian of the NLL,
//! restricted to the free parameters. Fixed parameters report zero
//! uncertainty and no covariance.

use crate::optimizer::{LbfgsbOptimizer, NllObjective, OptimizationResult, OptimizerConfig};
use nalgebra::DMatrix;
use ns_core::traits::LogDensityModel;
use ns_core::{Error, FitResult, Result};

/// Minimizes a model's negative log-likelihood within its parameter bounds.
#[derive(Debug, Clone, Default)]
pub struct MaximumLikelihoodEstimator {
    config: OptimizerConfig,
}

impl MaximumLikelihoodEstimator {
    /// Estimator with the default optimizer settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator with custom optimizer settings.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Optimizer settings in use.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Full fit: minimum plus uncertainties.
    pub fn fit<M: LogDensityModel>(&self, model: &M) -> Result<FitResult> {
        let min = self.fit_minimum(model)?;
        if !min.converged {
            log::warn!("fit did not converge: {}", min.message);
        }

        let n = min.parameters.len();
        let free: Vec<usize> = model
            .parameter_bounds()
            .iter()
            .enumerate()
            .filter(|(_, (lo, hi))| lo < hi)
            .map(|(i, _)| i)
            .collect();

        let mut uncertainties = vec![0.0; n];
        let mut covariance = None;
        if !free.is_empty() {
            let hessian = free_hessian(model, &min.parameters, &free)?;
            match invert(&hessian) {
                Some(inv) => {
                    let mut flat = vec![0.0; n * n];
                    for (a, &i) in free.iter().enumerate() {
                        uncertainties[i] = inv[(a, a)].sqrt();
                        for (b, &j) in free.iter().enumerate() {
                            flat[i * n + j] = inv[(a, b)];
                        }
                    }
                    covariance = Some(flat);
                }
                None => {
                    log::warn!("Hessian is not invertible; uncertainties from its diagonal");
                    for (a, &i) in free.iter().enumerate() {
                        uncertainties[i] = hessian[(a, a)].abs().max(1e-12).sqrt().recip();
                    }
                }
            }
        }

        Ok(FitResult {
            parameters: min.parameters,
            uncertainties,
            covariance,
            nll: min.fval,
            converged: min.converged,
            n_iter: min.n_iter as usize,
        })
    }

    /// Minimum only, starting from the model's initial values.
    pub fn fit_minimum(&self, model: &impl LogDensityModel) -> Result<OptimizationResult> {
        self.fit_minimum_from(model, &model.parameter_init())
    }

    /// Minimum only, starting from `init`.
    pub fn fit_minimum_from(
        &self,
        model: &impl LogDensityModel,
        init: &[f64],
    ) -> Result<OptimizationResult> {
        if init.len() != model.dim() {
            return Err(Error::Validation(format!(
                "starting point has {} values, model has {} parameters",
                init.len(),
                model.dim()
            )));
        }
        LbfgsbOptimizer::new(self.config.clone()).minimize(
            &NllObjective(model),
            init,
            &model.parameter_bounds(),
        )
    }
}

/// Symmetrized forward-difference Hessian over the `free` coordinates.
fn free_hessian(
    model: &impl LogDensityModel,
    at: &[f64],
    free: &[usize],
) -> Result<DMatrix<f64>> {
    let g0 = model.grad_nll(at)?;
    let k = free.len();
    let mut h = DMatrix::zeros(k, k);
    let mut x = at.to_vec();
    for (col, &j) in free.iter().enumerate() {
        let step = 1e-4 * at[j].abs().max(1.0);
        x[j] = at[j] + step;
        let g = model.grad_nll(&x)?;
        x[j] = at[j];
        for (row, &i) in free.iter().enumerate() {
            h[(row, col)] = (g[i] - g0[i]) / step;
        }
    }
    Ok((&h + h.transpose()) * 0.5)
}

/// Inverse via Cholesky with growing diagonal damping, then plain inversion.
/// `None` unless every variance is positive and finite.
fn invert(h: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let k = h.nrows();
    let scale = h.diagonal().iter().fold(1.0_f64, |m, d| m.max(d.abs()));
    let mut damping = 0.0_f64;
    for _ in 0..10 {
        let damped = h + DMatrix::<f64>::identity(k, k) * damping;
        if let Some(chol) = damped.cholesky() {
            return Some(chol.inverse());
        }
        damping = if damping == 0.0 { 1e-9 * scale } else { 10.0 * damping };
    }
    let inv = h.clone().try_inverse()?;
    inv.diagonal().iter().all(|v| v.is_finite() && *v > 0.0).then_some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ns_translate::pyhf::{HistFactoryModel, Workspace, simplemodels};

    fn simple_model() -> HistFactoryModel {
        let json = include_str!("../../../tests/fixtures/simple_workspace.json");
        let ws: Workspace = serde_json::from_str(json).unwrap();
        HistFactoryModel::from_workspace(&ws).unwrap()
    }

    #[test]
    fn test_fit_simple_workspace() {
        let model = simple_model();
        let result = MaximumLikelihoodEstimator::new().fit(&model).unwrap();
        assert!(result.converged);

        let (mu, sigma) = result.value(0).unwrap();
        assert!(mu > 0.0 && mu < 2.0, "mu = {}", mu);
        assert!(sigma > 0.0 && sigma < 1e5, "sigma = {}", sigma);

        let n = result.parameters.len();
        let cov = result.covariance.as_ref().expect("covariance");
        assert_eq!(cov.len(), n * n);
        for i in 0..n {
            assert_relative_eq!(cov[i * n + i], result.uncertainties[i].powi(2), max_relative = 1e-10);
            for j in 0..i {
                assert!((cov[i * n + j] - cov[j * n + i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_counting_experiment_matches_closed_form() {
        // n ~ Pois(mu*s + b): mu_hat = (n - b)/s, sigma = sqrt(n)/s
        let ws = simplemodels::counting_experiment(10.0, 50.0, 70.0);
        let model = HistFactoryModel::from_workspace(&ws).unwrap();
        let result = MaximumLikelihoodEstimator::new().fit(&model).unwrap();

        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.uncertainties[0], 70f64.sqrt() / 10.0, epsilon = 1e-2);
    }

    #[test]
    fn test_fixed_poi_has_no_uncertainty() {
        let ws = simplemodels::counting_experiment(10.0, 50.0, 70.0);
        let model = HistFactoryModel::from_workspace(&ws).unwrap().with_fixed_param(0, 1.0);
        let result = MaximumLikelihoodEstimator::new().fit(&model).unwrap();

        assert_eq!(result.value(0), Some((1.0, 0.0)));
        assert!(result.covariance.iter().flatten().all(|c| *c == 0.0));
    }

    #[test]
    fn test_wrong_starting_length_is_rejected() {
        let err = MaximumLikelihoodEstimator::new().fit_minimum_from(&simple_model(), &[1.0]);
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn test_invert_diagonal() {
        let h = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.25]);
        let inv = invert(&h).unwrap();
        assert_relative_eq!(inv[(0, 0)], 0.25, epsilon = 1e-12);
        assert_relative_eq!(inv[(1, 1)], 4.0, epsilon = 1e-12);
    }
}
