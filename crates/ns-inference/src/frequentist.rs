//! Toy-based (frequentist) hypothesis test.
//!
//! Nuisance parameters are profiled on the observed data at each hypothesis'
//! POI snapshot; toys are then generated from the density at those values and
//! the test statistic is evaluated on each toy at the null POI.

use crate::mle::MaximumLikelihoodEstimator;
use crate::model_config::ModelConfig;
use crate::result::HypoTestResult;
use crate::test_statistic::{ProfileLikelihoodTestStat, TestStatistic};
use crate::toymc::ToyMcSampler;
use ns_core::{Error, Result};
use ns_translate::pyhf::{Dataset, HistFactoryModel};
use std::sync::Arc;

/// Name of results produced by [`FrequentistCalculator`].
pub const FREQUENTIST_RESULT_NAME: &str = "HypoTestCalculator_result";

/// Seed offset of the alternate ensemble relative to the null one.
const ALT_SEED_OFFSET: u64 = 1_000_000_000;

/// Default number of null-hypothesis toys.
pub const DEFAULT_TOYS_NULL: usize = 1000;
/// Default number of alternate-hypothesis toys.
pub const DEFAULT_TOYS_ALT: usize = 1000;

/// Hypothesis test from sampled test-statistic distributions.
#[derive(Debug, Clone)]
pub struct FrequentistCalculator {
    data_name: String,
    data_main: Vec<f64>,
    alt: ModelConfig,
    null: ModelConfig,
    n_toys_null: usize,
    n_toys_alt: usize,
    sampler: ToyMcSampler,
    mle: MaximumLikelihoodEstimator,
}

impl FrequentistCalculator {
    /// Set up a test of `null` against `alt` on `data`.
    pub fn new(data: &Dataset, alt: &ModelConfig, null: &ModelConfig) -> Result<Self> {
        let data_main = null.pdf().main_from_observations(&data.observations)?;
        Ok(Self {
            data_name: data.name.clone(),
            data_main,
            alt: alt.clone(),
            null: null.clone(),
            n_toys_null: DEFAULT_TOYS_NULL,
            n_toys_alt: DEFAULT_TOYS_ALT,
            sampler: ToyMcSampler::new(),
            mle: MaximumLikelihoodEstimator::new(),
        })
    }

    /// Number of toys generated under each hypothesis.
    pub fn set_toys(&mut self, n_null: usize, n_alt: usize) {
        self.n_toys_null = n_null;
        self.n_toys_alt = n_alt;
    }

    /// Toys generated under the null hypothesis.
    pub fn n_toys_null(&self) -> usize {
        self.n_toys_null
    }

    /// Toys generated under the alternate hypothesis.
    pub fn n_toys_alt(&self) -> usize {
        self.n_toys_alt
    }

    /// The toy sampler.
    pub fn test_stat_sampler(&self) -> &ToyMcSampler {
        &self.sampler
    }

    /// Mutable access to the toy sampler, to set its statistic or event count.
    pub fn test_stat_sampler_mut(&mut self) -> &mut ToyMcSampler {
        &mut self.sampler
    }

    /// Run the test.
    pub fn get_hypo_test(&self) -> Result<HypoTestResult> {
        let null_poi = self.null.require_snapshot()?;
        let alt_poi = self.alt.require_snapshot()?;
        if self.n_toys_null == 0 || self.n_toys_alt == 0 {
            return Err(Error::Validation(format!(
                "need toys under both hypotheses, got {} null / {} alt",
                self.n_toys_null, self.n_toys_alt
            )));
        }

        let test_statistic: Arc<dyn TestStatistic> = match self.sampler.test_statistic() {
            Some(ts) => ts.clone(),
            None => Arc::new(ProfileLikelihoodTestStat::new(self.null.pdf().clone())),
        };

        let t_obs = test_statistic.evaluate(&self.data_main, null_poi)?;
        log::info!("{} on '{}': {:.6}", test_statistic.name(), self.data_name, t_obs);

        let null_params = self.profile_on_data(&self.null, null_poi)?;
        let alt_params = self.profile_on_data(&self.alt, alt_poi)?;

        let seed = self.sampler.seed();
        log::info!(
            "generating {} toys under '{}' and {} under '{}' (seed {})",
            self.n_toys_null,
            self.null.name(),
            self.n_toys_alt,
            self.alt.name(),
            seed
        );
        let null_dist = self.sampler.sampling_distribution(
            self.null.name(),
            test_statistic.as_ref(),
            self.null.pdf(),
            &null_params,
            null_poi,
            self.n_toys_null,
            seed,
        )?;
        let alt_dist = self.sampler.sampling_distribution(
            self.alt.name(),
            test_statistic.as_ref(),
            self.alt.pdf(),
            &alt_params,
            null_poi,
            self.n_toys_alt,
            seed.wrapping_add(ALT_SEED_OFFSET),
        )?;

        for dist in [&null_dist, &alt_dist] {
            if dist.is_empty() {
                return Err(Error::Computation(format!(
                    "all {} toys of '{}' failed",
                    dist.n_failed(),
                    dist.name()
                )));
            }
        }

        Ok(HypoTestResult::from_distributions(
            FREQUENTIST_RESULT_NAME,
            t_obs,
            null_dist,
            alt_dist,
            null_poi > alt_poi,
        ))
    }

    /// Conditional best-fit parameters on data with the POI at `poi_value`.
    fn profile_on_data(&self, config: &ModelConfig, poi_value: f64) -> Result<Vec<f64>> {
        let poi = config.poi_index();
        let data_model: HistFactoryModel = config.pdf().with_observed_main(&self.data_main)?;
        let fixed = data_model.with_fixed_param(poi, poi_value);

        let mut init = fixed.parameters().iter().map(|p| p.init).collect::<Vec<_>>();
        init[poi] = poi_value;
        let fit = self.mle.fit_minimum_from(&fixed, &init)?;
        if !fit.converged {
            log::warn!(
                "conditional fit of '{}' at {} = {} did not converge: {}",
                config.name(),
                config.poi_name(),
                poi_value,
                fit.message
            );
        }
        Ok(fit.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_config::derive_hypotheses;
    use approx::assert_relative_eq;
    use ns_translate::pyhf::{NamedWorkspace, OBSERVED_DATASET, Workspace, simplemodels};

    fn setup(ws: Workspace) -> (Dataset, ModelConfig, ModelConfig) {
        let nws = NamedWorkspace { name: "combined".to_string(), workspace: ws };
        let data = nws.data(OBSERVED_DATASET).unwrap();
        let pdf = Arc::new(nws.model("ModelConfig").unwrap());
        let (sb, b) = derive_hypotheses(ModelConfig::new("ModelConfig", pdf).unwrap());
        (data, sb, b)
    }

    fn discovery_stat(sb: &ModelConfig) -> Arc<dyn TestStatistic> {
        let mut stat = ProfileLikelihoodTestStat::new(sb.pdf().clone());
        stat.set_one_sided_discovery(true);
        Arc::new(stat)
    }

    #[test]
    fn test_set_toys_is_inspectable() {
        let (data, sb, b) = setup(simplemodels::counting_experiment(10.0, 50.0, 70.0));
        let mut calc = FrequentistCalculator::new(&data, &sb, &b).unwrap();
        assert_eq!((calc.n_toys_null(), calc.n_toys_alt()), (1000, 1000));
        calc.set_toys(2000, 1000);
        assert_eq!(calc.n_toys_null(), 2000);
        assert_eq!(calc.n_toys_alt(), 1000);
        assert!(calc.test_stat_sampler().test_statistic().is_none());
    }

    #[test]
    fn test_counting_discovery_toys() {
        let (data, sb, b) = setup(simplemodels::counting_experiment(10.0, 50.0, 62.0));
        let mut calc = FrequentistCalculator::new(&data, &sb, &b).unwrap();
        calc.set_toys(200, 100);
        calc.test_stat_sampler_mut().set_test_statistic(discovery_stat(&sb));

        let r = calc.get_hypo_test().unwrap();
        assert_eq!(r.name(), "HypoTestCalculator_result");
        assert_eq!(r.null_distribution().unwrap().len(), 200);
        assert_eq!(r.alt_distribution().unwrap().len(), 100);

        // n = 62 over b = 50 is roughly a 1.6 sigma excess, p_null near 0.05.
        let p_null = r.null_p_value();
        assert!(p_null > 0.0 && p_null < 0.2, "p_null = {}", p_null);
        assert!(r.null_p_value_error() > 0.0);
        // Observed sits near the middle of the S+B ensemble (mean 60).
        let p_alt = r.alternate_p_value();
        assert!(p_alt > 0.2 && p_alt < 0.8, "p_alt = {}", p_alt);
        assert_relative_eq!(r.cl_b(), p_null);
        assert_relative_eq!(r.cl_splusb(), p_alt);

        // Discovery statistic vanishes for downward toys.
        let zeros = r.null_distribution().unwrap().values().iter().filter(|&&v| v < 1e-6).count();
        assert!(zeros > 40, "expected about half of the null toys at zero, got {}", zeros);
    }

    #[test]
    fn test_same_seed_same_result() {
        let (data, sb, b) = setup(simplemodels::counting_experiment(10.0, 50.0, 62.0));
        let mut calc = FrequentistCalculator::new(&data, &sb, &b).unwrap();
        calc.set_toys(40, 20);
        calc.test_stat_sampler_mut().set_test_statistic(discovery_stat(&sb));

        let a = calc.get_hypo_test().unwrap();
        let b = calc.get_hypo_test().unwrap();
        assert_eq!(a.null_p_value(), b.null_p_value());
        assert_eq!(a.null_distribution().unwrap().values(), b.null_distribution().unwrap().values());
    }

    #[test]
    fn test_shape_only_needs_event_count() {
        let ws = simplemodels::shape_only(&[2.0, 6.0, 12.0], &[30.0, 20.0, 10.0], &[31.0, 27.0, 20.0]);
        let (data, sb, b) = setup(ws);
        assert!(!sb.pdf().can_be_extended());

        let mut calc = FrequentistCalculator::new(&data, &sb, &b).unwrap();
        calc.set_toys(20, 20);
        calc.test_stat_sampler_mut().set_test_statistic(discovery_stat(&sb));
        let err = calc.get_hypo_test().unwrap_err();
        assert!(err.to_string().contains("cannot be extended"));

        calc.test_stat_sampler_mut().set_n_events_per_toy(1);
        assert_eq!(calc.test_stat_sampler().n_events_per_toy(), Some(1));
        let r = calc.get_hypo_test().unwrap();
        assert_eq!(r.null_distribution().unwrap().len() + r.null_distribution().unwrap().n_failed(), 20);
    }

    #[test]
    fn test_zero_toys_is_an_error() {
        let (data, sb, b) = setup(simplemodels::counting_experiment(10.0, 50.0, 70.0));
        let mut calc = FrequentistCalculator::new(&data, &sb, &b).unwrap();
        calc.set_toys(0, 10);
        assert!(calc.get_hypo_test().is_err());
    }
}
