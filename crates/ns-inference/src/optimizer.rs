//! Box-constrained L-BFGS on top of argmin.
//!
//! Parameters with equal bounds are taken out of the search space. The
//! remaining ones are clamped into their bounds before every evaluation, and
//! gradient components that push against an active bound are zeroed.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ns_core::traits::LogDensityModel;
use ns_core::{Error, Result};
use std::fmt;

/// L-BFGS settings.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of iterations
    pub max_iter: u64,
    /// Gradient-norm tolerance
    pub tol: f64,
    /// History size of the inverse-Hessian approximation
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iter: 1000, tol: 1e-6, m: 10 }
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Parameters at the minimum, full length
    pub parameters: Vec<f64>,
    /// Objective at the minimum
    pub fval: f64,
    /// Iterations
    pub n_iter: u64,
    /// Objective evaluations
    pub n_fev: u64,
    /// Gradient evaluations
    pub n_gev: u64,
    /// Whether the solver reported convergence
    pub converged: bool,
    /// Termination status as reported by the solver
    pub message: String,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fval={:.6} after {} iterations ({} cost / {} gradient calls), {}",
            self.fval, self.n_iter, self.n_fev, self.n_gev, self.message
        )
    }
}

/// Function to minimize.
pub trait ObjectiveFunction: Send + Sync {
    /// Value at `params`.
    fn eval(&self, params: &[f64]) -> Result<f64>;

    /// Gradient at `params`; central differences unless overridden.
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        let mut x = params.to_vec();
        let mut grad = Vec::with_capacity(params.len());
        for i in 0..params.len() {
            let h = 1e-8 * params[i].abs().max(1.0);
            x[i] = params[i] + h;
            let up = self.eval(&x)?;
            x[i] = params[i] - h;
            let down = self.eval(&x)?;
            x[i] = params[i];
            grad.push((up - down) / (2.0 * h));
        }
        Ok(grad)
    }
}

/// A model's negative log-likelihood as an [`ObjectiveFunction`].
pub struct NllObjective<'a, M: LogDensityModel + ?Sized>(pub &'a M);

impl<M: LogDensityModel + ?Sized> ObjectiveFunction for NllObjective<'_, M> {
    fn eval(&self, params: &[f64]) -> Result<f64> {
        self.0.nll(params)
    }

    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        self.0.grad_nll(params)
    }
}

/// The free coordinates of a bounded problem.
#[derive(Clone)]
struct Subspace<'a> {
    /// Starting point, clamped; frozen coordinates keep these values
    start: Vec<f64>,
    free: Vec<usize>,
    bounds: &'a [(f64, f64)],
}

impl<'a> Subspace<'a> {
    fn new(init: &[f64], bounds: &'a [(f64, f64)]) -> Self {
        let start = init.iter().zip(bounds).map(|(&x, &(lo, hi))| x.clamp(lo, hi)).collect();
        let free = bounds.iter().enumerate().filter(|(_, (lo, hi))| lo < hi).map(|(i, _)| i).collect();
        Self { start, free, bounds }
    }

    fn restrict(&self, full: &[f64]) -> Vec<f64> {
        self.free.iter().map(|&i| full[i]).collect()
    }

    fn expand(&self, x: &[f64]) -> Vec<f64> {
        let mut full = self.start.clone();
        for (&i, &v) in self.free.iter().zip(x) {
            let (lo, hi) = self.bounds[i];
            full[i] = v.clamp(lo, hi);
        }
        full
    }
}

struct BoundedProblem<'a> {
    objective: &'a dyn ObjectiveFunction,
    space: Subspace<'a>,
}

fn to_argmin(e: Error) -> argmin::core::Error {
    argmin::core::Error::msg(e.to_string())
}

impl CostFunction for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        self.objective.eval(&self.space.expand(x)).map_err(to_argmin)
    }
}

impl Gradient for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, x: &Self::Param) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        const AT_BOUND: f64 = 1e-12;
        let full = self.space.expand(x);
        let g = self.objective.gradient(&full).map_err(to_argmin)?;
        Ok(self
            .space
            .free
            .iter()
            .map(|&i| {
                let (lo, hi) = self.space.bounds[i];
                let blocked = (full[i] <= lo + AT_BOUND && g[i] > 0.0)
                    || (full[i] >= hi - AT_BOUND && g[i] < 0.0);
                if blocked { 0.0 } else { g[i] }
            })
            .collect())
    }
}

/// L-BFGS with box constraints.
#[derive(Debug, Clone, Default)]
pub struct LbfgsbOptimizer {
    config: OptimizerConfig,
}

impl LbfgsbOptimizer {
    /// Optimizer with the given settings.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` inside `bounds`, starting from `init`.
    pub fn minimize(
        &self,
        objective: &dyn ObjectiveFunction,
        init: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<OptimizationResult> {
        if init.len() != bounds.len() {
            return Err(Error::Validation(format!(
                "{} starting values for {} bounds",
                init.len(),
                bounds.len()
            )));
        }

        let space = Subspace::new(init, bounds);
        if space.free.is_empty() {
            let fval = objective.eval(&space.start)?;
            return Ok(OptimizationResult {
                parameters: space.start,
                fval,
                n_iter: 0,
                n_fev: 1,
                n_gev: 0,
                converged: true,
                message: "all parameters fixed".to_string(),
            });
        }

        let config_err = |e: argmin::core::Error| Error::Validation(format!("optimizer config: {e}"));
        // argmin's default cost tolerance is machine epsilon, too strict for NLL scales.
        let tol_cost = if self.config.tol > 0.0 { (0.1 * self.config.tol).max(1e-12) } else { 0.0 };
        let solver = LBFGS::new(MoreThuenteLineSearch::new(), self.config.m)
            .with_tolerance_grad(self.config.tol)
            .map_err(config_err)?
            .with_tolerance_cost(tol_cost)
            .map_err(config_err)?;

        let x0 = space.restrict(&space.start);
        let problem = BoundedProblem { objective, space: space.clone() };
        let res = Executor::new(problem, solver)
            .configure(|state| state.param(x0).max_iters(self.config.max_iter))
            .run()
            .map_err(|e| Error::Computation(format!("minimization failed: {e}")))?;

        let state = res.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| Error::Computation("minimizer returned no parameters".to_string()))?;
        let status = state.get_termination_status();
        let counts = state.get_func_counts();

        Ok(OptimizationResult {
            parameters: space.expand(best),
            fval: state.get_best_cost(),
            n_iter: state.get_iter(),
            n_fev: counts.get("cost_count").copied().unwrap_or(0),
            n_gev: counts.get("gradient_count").copied().unwrap_or(0),
            converged: matches!(
                status,
                TerminationStatus::Terminated(
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                )
            ),
            message: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// (x - 2)^2 + (y - 3)^2
    struct Bowl;

    impl ObjectiveFunction for Bowl {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            Ok((p[0] - 2.0).powi(2) + (p[1] - 3.0).powi(2))
        }

        fn gradient(&self, p: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![2.0 * (p[0] - 2.0), 2.0 * (p[1] - 3.0)])
        }
    }

    #[test]
    fn test_unconstrained_minimum() {
        let r = LbfgsbOptimizer::default()
            .minimize(&Bowl, &[0.0, 0.0], &[(-10.0, 10.0), (-10.0, 10.0)])
            .unwrap();
        assert!(r.converged, "{}", r);
        assert_relative_eq!(r.parameters[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(r.parameters[1], 3.0, epsilon = 1e-4);
        assert_relative_eq!(r.fval, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_minimum_outside_box_lands_on_corner() {
        let r = LbfgsbOptimizer::default()
            .minimize(&Bowl, &[4.0, 1.5], &[(3.0, 5.0), (1.0, 2.0)])
            .unwrap();
        assert_relative_eq!(r.parameters[0], 3.0, epsilon = 1e-4);
        assert_relative_eq!(r.parameters[1], 2.0, epsilon = 1e-4);
        assert!(r.converged, "{}", r);
    }

    #[test]
    fn test_numerical_gradient_at_lower_bound() {
        /// (x + 1)^2 on [0, 10]
        struct Shifted;

        impl ObjectiveFunction for Shifted {
            fn eval(&self, p: &[f64]) -> Result<f64> {
                Ok((p[0] + 1.0).powi(2))
            }
        }

        let r = LbfgsbOptimizer::default().minimize(&Shifted, &[5.0], &[(0.0, 10.0)]).unwrap();
        assert_relative_eq!(r.parameters[0], 0.0, epsilon = 1e-8);
        assert_relative_eq!(r.fval, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_frozen_coordinate_is_left_alone() {
        let r = LbfgsbOptimizer::default()
            .minimize(&Bowl, &[7.0, 0.0], &[(1.5, 1.5), (-10.0, 10.0)])
            .unwrap();
        assert_eq!(r.parameters[0], 1.5);
        assert_relative_eq!(r.parameters[1], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_all_fixed_short_circuits() {
        let r = LbfgsbOptimizer::default()
            .minimize(&Bowl, &[1.0, 1.0], &[(1.0, 1.0), (1.0, 1.0)])
            .unwrap();
        assert!(r.converged);
        assert_eq!(r.n_iter, 0);
        assert_relative_eq!(r.fval, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_validation_error() {
        let err = LbfgsbOptimizer::default().minimize(&Bowl, &[0.0], &[(0.0, 1.0), (0.0, 1.0)]);
        assert!(matches!(err, Err(Error::Validation(_))));
    }
}
