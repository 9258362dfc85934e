//! Asymptotic hypothesis test.
//!
//! The observed statistic `q` is the profile-likelihood ratio of the data at the
//! null POI. Its sensitivity `q_A` is the same statistic evaluated on the
//! Asimov dataset of the alternate hypothesis, whose nuisance parameters are
//! profiled on the data at the alternate POI. The p-values then follow from
//! the asymptotic (half-)χ² forms: for a one-sided statistic
//!
//! - `p_null = Φ(-√q)`
//! - `p_alt  = Φ(√q - √q_A)`
//!
//! and for the two-sided statistic `p_null = 2Φ(-√q)` and
//! `p_alt = Φ(√q - √q_A) - Φ(-√q - √q_A)`.

use crate::mle::MaximumLikelihoodEstimator;
use crate::model_config::ModelConfig;
use crate::optimizer::OptimizerConfig;
use crate::result::{HypoTestResult, normal_cdf};
use crate::test_statistic::{ProfileLikelihoodTestStat, Sidedness};
use ns_core::{Error, Result};
use ns_translate::pyhf::{Dataset, HistFactoryModel};

/// Name of results produced by [`AsymptoticCalculator`].
pub const ASYMPTOTIC_RESULT_NAME: &str = "HypoTestAsymptotic_result";

/// Hypothesis test from the asymptotic distributions of the profile likelihood.
#[derive(Debug, Clone)]
pub struct AsymptoticCalculator {
    data_name: String,
    data_main: Vec<f64>,
    alt: ModelConfig,
    null: ModelConfig,
    sidedness: Sidedness,
    print_level: i32,
    mle: MaximumLikelihoodEstimator,
}

impl AsymptoticCalculator {
    /// Set up a test of `null` against `alt` on `data`.
    ///
    /// Both configurations need a POI snapshot and the dataset must match the
    /// channel layout of the null density.
    pub fn new(data: &Dataset, alt: &ModelConfig, null: &ModelConfig) -> Result<Self> {
        alt.require_snapshot()?;
        null.require_snapshot()?;
        if alt.poi_name() != null.poi_name() {
            return Err(Error::Validation(format!(
                "hypotheses test different parameters: '{}' vs '{}'",
                alt.poi_name(),
                null.poi_name()
            )));
        }
        let data_main = null.pdf().main_from_observations(&data.observations)?;
        Ok(Self {
            data_name: data.name.clone(),
            data_main,
            alt: alt.clone(),
            null: null.clone(),
            sidedness: Sidedness::TwoSided,
            print_level: 0,
            mle: MaximumLikelihoodEstimator::new(),
        })
    }

    /// Use the one-sided discovery statistic (`q = 0` when `μ̂ < μ_null`).
    pub fn set_one_sided_discovery(&mut self, on: bool) {
        self.sidedness = if on { Sidedness::OneSidedDiscovery } else { Sidedness::TwoSided };
    }

    /// Use the one-sided upper-limit statistic (`q = 0` when `μ̂ > μ_null`).
    pub fn set_one_sided(&mut self, on: bool) {
        self.sidedness = if on { Sidedness::OneSidedLimit } else { Sidedness::TwoSided };
    }

    /// Current sidedness.
    pub fn sidedness(&self) -> Sidedness {
        self.sidedness
    }

    /// Verbosity of the calculator: `-1` silences it, `0` logs a summary,
    /// `1` and above add the fit details.
    pub fn set_print_level(&mut self, level: i32) {
        self.print_level = level;
    }

    /// Current print level.
    pub fn print_level(&self) -> i32 {
        self.print_level
    }

    /// Replace the optimizer configuration.
    pub fn set_optimizer_config(&mut self, config: OptimizerConfig) {
        self.mle = MaximumLikelihoodEstimator::with_config(config);
    }

    /// Run the test.
    pub fn get_hypo_test(&self) -> Result<HypoTestResult> {
        let null_poi = self.null.require_snapshot()?;
        let alt_poi = self.alt.require_snapshot()?;
        let poi = self.null.poi_index();

        let data_model = self.null.pdf().with_observed_main(&self.data_main)?;
        let mut stat = ProfileLikelihoodTestStat::new(self.null.pdf().clone());
        stat.set_optimizer_config(self.mle.config().clone());
        match self.sidedness {
            Sidedness::OneSidedDiscovery => stat.set_one_sided_discovery(true),
            Sidedness::OneSidedLimit => stat.set_one_sided(true),
            Sidedness::TwoSided => {}
        }

        let observed = stat.evaluate_model(&data_model, null_poi)?;
        if !observed.converged {
            log::warn!("asymptotic: fits on '{}' did not converge", self.data_name);
        }
        let q = observed.q();

        let asimov_model = self.asimov_model(&data_model, poi, alt_poi)?;
        let asimov = stat.evaluate_model(&asimov_model, null_poi)?;
        // Sensitivity is taken without the sidedness cut.
        let q_a = (2.0 * (asimov.nll_fixed - asimov.nll_free)).max(0.0);

        let (p_null, p_alt) = self.p_values(q, q_a);
        let z_expected = q_a.sqrt();

        if self.print_level >= 0 {
            log::info!(
                "asymptotic: mu_hat = {:.4}, q_obs = {:.4}, q_A = {:.4} (tested {} = {} against {})",
                observed.mu_hat,
                q,
                q_a,
                self.null.poi_name(),
                null_poi,
                alt_poi
            );
        }
        if self.print_level > 0 {
            log::info!(
                "asymptotic: nll free = {:.6}, nll fixed = {:.6}, Asimov mu_hat = {:.4}",
                observed.nll_free,
                observed.nll_fixed,
                asimov.mu_hat
            );
        }

        Ok(HypoTestResult::from_p_values(
            ASYMPTOTIC_RESULT_NAME,
            observed.value,
            p_null,
            p_alt,
            null_poi > alt_poi,
        )
        .with_expected_significance(z_expected))
    }

    /// Asimov dataset of the alternate hypothesis, nuisances profiled on data.
    fn asimov_model(
        &self,
        data_model: &HistFactoryModel,
        poi: usize,
        alt_poi: f64,
    ) -> Result<HistFactoryModel> {
        let mut init = data_model.parameters().iter().map(|p| p.init).collect::<Vec<_>>();
        init[poi] = alt_poi;
        let conditional = self.mle.fit_minimum_from(&data_model.with_fixed_param(poi, alt_poi), &init)?;
        if !conditional.converged {
            log::warn!(
                "asymptotic: conditional fit at {} = {} did not converge: {}",
                self.alt.poi_name(),
                alt_poi,
                conditional.message
            );
        }

        let expected = data_model.expected_data(&conditional.parameters)?;
        data_model
            .with_observed_main(&expected)?
            .with_constraint_centers(&conditional.parameters)?
            .with_shapesys_aux_observed_from_params(&conditional.parameters)
    }

    fn p_values(&self, q: f64, q_a: f64) -> (f64, f64) {
        let (sq, sqa) = (q.sqrt(), q_a.sqrt());
        match self.sidedness {
            Sidedness::OneSidedDiscovery | Sidedness::OneSidedLimit => {
                (normal_cdf(-sq), normal_cdf(sqa - sq))
            }
            Sidedness::TwoSided => {
                (2.0 * normal_cdf(-sq), normal_cdf(-sq - sqa) + normal_cdf(sqa - sq))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_config::derive_hypotheses;
    use approx::assert_relative_eq;
    use ns_translate::pyhf::{NamedWorkspace, OBSERVED_DATASET, simplemodels};
    use std::sync::Arc;

    fn setup(observed: f64) -> (Dataset, ModelConfig, ModelConfig) {
        let nws = NamedWorkspace {
            name: "combined".to_string(),
            workspace: simplemodels::counting_experiment(10.0, 50.0, observed),
        };
        let data = nws.data(OBSERVED_DATASET).unwrap();
        let pdf = Arc::new(nws.model("ModelConfig").unwrap());
        let (sb, b) = derive_hypotheses(ModelConfig::new("ModelConfig", pdf).unwrap());
        (data, sb, b)
    }

    // q0 for n ~ Pois(mu*s + b) at mu_hat = (n-b)/s.
    fn q0(n: f64, b: f64) -> f64 {
        2.0 * (n * (n / b).ln() - (n - b))
    }

    #[test]
    fn test_discovery_matches_closed_form() {
        let (data, sb, b) = setup(70.0);
        let mut calc = AsymptoticCalculator::new(&data, &sb, &b).unwrap();
        calc.set_one_sided_discovery(true);
        calc.set_print_level(-1);
        let r = calc.get_hypo_test().unwrap();

        let q = q0(70.0, 50.0);
        let q_a = q0(60.0, 50.0);
        assert_eq!(r.name(), "HypoTestAsymptotic_result");
        assert_relative_eq!(r.test_statistic_data(), q / 2.0, epsilon = 1e-4);
        assert_relative_eq!(r.null_p_value(), normal_cdf(-q.sqrt()), max_relative = 1e-3);
        assert_relative_eq!(r.alternate_p_value(), normal_cdf(q_a.sqrt() - q.sqrt()), epsilon = 1e-3);
        assert_relative_eq!(r.cl_splusb(), r.alternate_p_value());
        assert_relative_eq!(r.cl_s(), r.alternate_p_value() / r.null_p_value());
        assert_relative_eq!(r.significance(), q.sqrt(), epsilon = 1e-3);
        assert_relative_eq!(r.expected_significance().unwrap(), q_a.sqrt(), epsilon = 1e-3);
        assert!(!r.background_is_alt());
        assert_eq!(r.cl_b(), r.null_p_value());
    }

    #[test]
    fn test_downward_fluctuation_gives_half() {
        let (data, sb, b) = setup(45.0);
        let mut calc = AsymptoticCalculator::new(&data, &sb, &b).unwrap();
        calc.set_one_sided_discovery(true);
        let r = calc.get_hypo_test().unwrap();

        assert_relative_eq!(r.null_p_value(), 0.5, epsilon = 1e-3);
        assert_relative_eq!(r.significance(), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_two_sided_doubles_null_p_value() {
        let (data, sb, b) = setup(70.0);
        let mut one = AsymptoticCalculator::new(&data, &sb, &b).unwrap();
        one.set_one_sided_discovery(true);
        let two = AsymptoticCalculator::new(&data, &sb, &b).unwrap();
        assert_eq!(two.sidedness(), Sidedness::TwoSided);

        let p1 = one.get_hypo_test().unwrap().null_p_value();
        let p2 = two.get_hypo_test().unwrap().null_p_value();
        assert_relative_eq!(p2, 2.0 * p1, max_relative = 1e-3);
    }

    #[test]
    fn test_requires_snapshots() {
        let (data, sb, _) = setup(70.0);
        let bare = ModelConfig::new("bare", sb.pdf().clone()).unwrap();
        let err = AsymptoticCalculator::new(&data, &sb, &bare).unwrap_err();
        assert!(err.to_string().contains("no POI snapshot"));
    }

    #[test]
    fn test_rejects_mismatched_dataset() {
        let (_, sb, b) = setup(70.0);
        let nws = NamedWorkspace {
            name: "other".to_string(),
            workspace: simplemodels::uncorrelated_background(&[1.0, 2.0], &[5.0, 6.0], &[1.0, 1.0]),
        };
        let data = nws.data(OBSERVED_DATASET).unwrap();
        assert!(AsymptoticCalculator::new(&data, &sb, &b).is_err());
    }
}
