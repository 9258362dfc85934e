//! Test statistics for hypothesis tests.
//!
//! Values follow the `-ln λ` convention: the profile-likelihood statistic is
//! `nll(μ0, θ̂̂) - nll(μ̂, θ̂)`, i.e. half of the usual `q`.

use crate::mle::MaximumLikelihoodEstimator;
use crate::optimizer::OptimizerConfig;
use crate::toymc::Toy;
use ns_core::{Error, Result};
use ns_translate::pyhf::HistFactoryModel;
use std::sync::Arc;

/// A test statistic evaluated on a main-bin dataset at a tested POI value.
pub trait TestStatistic: Send + Sync {
    /// Evaluate on `observed_main` (flattened main bins) at `null_poi`.
    fn evaluate(&self, observed_main: &[f64], null_poi: f64) -> Result<f64>;

    /// Evaluate on a generated toy. Statistics that only look at the main
    /// bins ignore regenerated global observables.
    fn evaluate_toy(&self, toy: &Toy, null_poi: f64) -> Result<f64> {
        self.evaluate(&toy.main, null_poi)
    }

    /// Display name.
    fn name(&self) -> String;

    /// Whether large values are signal-like (p-values from the right tail).
    fn pvalue_is_right_tail(&self) -> bool {
        true
    }
}

/// Which side of `μ̂ - μ0` the statistic is sensitive to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sidedness {
    /// Both directions.
    #[default]
    TwoSided,
    /// Upper-limit: zero when `μ̂ > μ0`.
    OneSidedLimit,
    /// Discovery: zero when `μ̂ < μ0`.
    OneSidedDiscovery,
}

impl Sidedness {
    /// Apply the one-sided cut to a raw likelihood-ratio value.
    pub fn clip(self, value: f64, mu_hat: f64, mu_test: f64) -> f64 {
        match self {
            Sidedness::OneSidedLimit if mu_hat > mu_test => 0.0,
            Sidedness::OneSidedDiscovery if mu_hat < mu_test => 0.0,
            _ => value,
        }
    }
}

/// Both fits behind one profile-likelihood evaluation.
#[derive(Debug, Clone)]
pub struct ProfileLikelihoodValue {
    /// `-ln λ` after the sidedness cut
    pub value: f64,
    /// Unconditional best-fit POI
    pub mu_hat: f64,
    /// Unconditional minimum NLL
    pub nll_free: f64,
    /// Conditional minimum NLL at the tested POI
    pub nll_fixed: f64,
    /// Conditional best-fit parameters (POI at the tested value)
    pub conditional_params: Vec<f64>,
    /// Both fits converged
    pub converged: bool,
}

impl ProfileLikelihoodValue {
    /// The conventional `q = 2 (-ln λ)`.
    pub fn q(&self) -> f64 {
        2.0 * self.value
    }
}

/// Profile-likelihood ratio `-ln λ(μ0)` of a fixed density.
#[derive(Debug, Clone)]
pub struct ProfileLikelihoodTestStat {
    pdf: Arc<HistFactoryModel>,
    sidedness: Sidedness,
    mle: MaximumLikelihoodEstimator,
}

impl ProfileLikelihoodTestStat {
    /// Two-sided statistic on `pdf`.
    pub fn new(pdf: Arc<HistFactoryModel>) -> Self {
        Self { pdf, sidedness: Sidedness::TwoSided, mle: MaximumLikelihoodEstimator::new() }
    }

    /// Switch to (or away from) the upper-limit variant.
    pub fn set_one_sided(&mut self, on: bool) {
        self.sidedness = if on { Sidedness::OneSidedLimit } else { Sidedness::TwoSided };
    }

    /// Switch to (or away from) the discovery variant.
    pub fn set_one_sided_discovery(&mut self, on: bool) {
        self.sidedness = if on { Sidedness::OneSidedDiscovery } else { Sidedness::TwoSided };
    }

    /// Current sidedness.
    pub fn sidedness(&self) -> Sidedness {
        self.sidedness
    }

    /// Replace the optimizer configuration used for both fits.
    pub fn set_optimizer_config(&mut self, config: OptimizerConfig) {
        self.mle = MaximumLikelihoodEstimator::with_config(config);
    }

    /// The density the statistic is built on.
    pub fn pdf(&self) -> &Arc<HistFactoryModel> {
        &self.pdf
    }

    /// Evaluate on a model that already carries its data.
    pub fn evaluate_model(
        &self,
        data_model: &HistFactoryModel,
        null_poi: f64,
    ) -> Result<ProfileLikelihoodValue> {
        let poi = data_model
            .poi_index()
            .ok_or_else(|| Error::Validation("No POI defined".to_string()))?;

        let free = self.mle.fit_minimum(data_model)?;
        let mu_hat = free.parameters[poi];

        let mut init_fixed = free.parameters.clone();
        init_fixed[poi] = null_poi;
        let fixed_model = data_model.with_fixed_param(poi, null_poi);
        let fixed = self.mle.fit_minimum_from(&fixed_model, &init_fixed)?;

        // The free fit can land above the conditional one by optimizer noise.
        let raw = (fixed.fval - free.fval).max(0.0);
        let value = self.sidedness.clip(raw, mu_hat, null_poi);
        if !value.is_finite() {
            return Err(Error::Computation(format!(
                "non-finite profile likelihood at mu={}: {}",
                null_poi, value
            )));
        }

        Ok(ProfileLikelihoodValue {
            value,
            mu_hat,
            nll_free: free.fval,
            nll_fixed: fixed.fval,
            conditional_params: fixed.parameters,
            converged: free.converged && fixed.converged,
        })
    }
}

impl TestStatistic for ProfileLikelihoodTestStat {
    fn evaluate(&self, observed_main: &[f64], null_poi: f64) -> Result<f64> {
        let data_model = self.pdf.with_observed_main(observed_main)?;
        Ok(self.evaluate_model(&data_model, null_poi)?.value)
    }

    fn evaluate_toy(&self, toy: &Toy, null_poi: f64) -> Result<f64> {
        let mut data_model = self.pdf.with_observed_main(&toy.main)?;
        if let Some(globals) = &toy.globals {
            data_model = data_model
                .with_constraint_centers(&globals.constraint_centers)?
                .with_shapesys_aux_observed(&globals.shapesys_counts)?;
        }
        Ok(self.evaluate_model(&data_model, null_poi)?.value)
    }

    fn name(&self) -> String {
        match self.sidedness {
            Sidedness::TwoSided => "Profile Likelihood Ratio".to_string(),
            Sidedness::OneSidedLimit => "One-sided Profile Likelihood Ratio".to_string(),
            Sidedness::OneSidedDiscovery => "Discovery Profile Likelihood Ratio".to_string(),
        }
    }
}
