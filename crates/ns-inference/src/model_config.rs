//! Model configurations: a named view on a shared density with a POI snapshot.
//!
//! Cloning a [`ModelConfig`] copies the name and the snapshot but shares the
//! underlying [`HistFactoryModel`], so every configuration derived from the same
//! workspace agrees on the nuisance-parameter definitions.

use ns_core::{Error, Result};
use ns_translate::pyhf::HistFactoryModel;
use serde::Serialize;
use std::sync::Arc;

/// Name given to the signal-plus-background configuration.
pub const SB_MODEL_NAME: &str = "S+B Model";
/// Name given to the background-only configuration.
pub const B_MODEL_NAME: &str = "B Model";

/// A stored value of the parameter of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// POI name
    pub poi_name: String,
    /// POI value
    pub value: f64,
}

/// Named view on a density: the POI and an optional snapshot of its value.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    name: String,
    pdf: Arc<HistFactoryModel>,
    poi_index: usize,
    snapshot: Option<Snapshot>,
}

impl ModelConfig {
    /// Wrap a density. Fails if the density has no parameter of interest.
    pub fn new(name: impl Into<String>, pdf: Arc<HistFactoryModel>) -> Result<Self> {
        let name = name.into();
        let poi_index = pdf.poi_index().ok_or_else(|| {
            Error::Validation(format!("model config '{}' has no parameter of interest", name))
        })?;
        Ok(Self { name, pdf, poi_index, snapshot: None })
    }

    /// Configuration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the configuration.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The shared density.
    pub fn pdf(&self) -> &Arc<HistFactoryModel> {
        &self.pdf
    }

    /// Index of the parameter of interest.
    pub fn poi_index(&self) -> usize {
        self.poi_index
    }

    /// Name of the parameter of interest.
    pub fn poi_name(&self) -> &str {
        &self.pdf.parameters()[self.poi_index].name
    }

    /// Store `value` as the POI snapshot.
    pub fn set_snapshot(&mut self, value: f64) {
        self.snapshot = Some(Snapshot { poi_name: self.poi_name().to_string(), value });
    }

    /// The stored snapshot, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// POI value of the snapshot.
    pub fn snapshot_value(&self) -> Option<f64> {
        self.snapshot.as_ref().map(|s| s.value)
    }

    /// POI value of the snapshot, or an error naming this configuration.
    pub fn require_snapshot(&self) -> Result<f64> {
        self.snapshot_value().ok_or_else(|| {
            Error::Validation(format!("model config '{}' has no POI snapshot", self.name))
        })
    }

    /// Whether both configurations view the same density instance.
    pub fn shares_pdf_with(&self, other: &ModelConfig) -> bool {
        Arc::ptr_eq(&self.pdf, &other.pdf)
    }
}

/// Split a loaded configuration into signal-plus-background and background-only
/// hypotheses.
///
/// The input becomes `S+B Model` with POI snapshot 1; a clone named `B Model`
/// gets POI snapshot 0. Both share the density.
pub fn derive_hypotheses(mut sb: ModelConfig) -> (ModelConfig, ModelConfig) {
    sb.set_name(SB_MODEL_NAME);
    sb.set_snapshot(1.0);

    let mut b = sb.clone();
    b.set_name(B_MODEL_NAME);
    b.set_snapshot(0.0);

    (sb, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_translate::pyhf::simplemodels;

    fn config() -> ModelConfig {
        let ws = simplemodels::uncorrelated_background(&[5.0], &[50.0], &[5.0]);
        let pdf = Arc::new(HistFactoryModel::from_workspace(&ws).unwrap());
        ModelConfig::new("ModelConfig", pdf).unwrap()
    }

    #[test]
    fn test_derive_sets_independent_snapshots() {
        let (sb, b) = derive_hypotheses(config());

        assert_eq!(sb.name(), "S+B Model");
        assert_eq!(b.name(), "B Model");
        assert_eq!(sb.snapshot_value(), Some(1.0));
        assert_eq!(b.snapshot_value(), Some(0.0));
        assert_eq!(b.snapshot().unwrap().poi_name, "mu");
    }

    #[test]
    fn test_derived_configs_share_pdf() {
        let (sb, b) = derive_hypotheses(config());
        assert!(sb.shares_pdf_with(&b));
        assert_eq!(sb.poi_index(), b.poi_index());

        let unrelated = config();
        assert!(!sb.shares_pdf_with(&unrelated));
    }

    #[test]
    fn test_snapshot_ignores_prior_poi_init() {
        let mut cfg = config();
        cfg.set_snapshot(7.5);
        let (sb, b) = derive_hypotheses(cfg);
        assert_eq!(sb.snapshot_value(), Some(1.0));
        assert_eq!(b.snapshot_value(), Some(0.0));
    }

    #[test]
    fn test_require_snapshot_errors_when_missing() {
        let err = config().require_snapshot().unwrap_err();
        assert!(err.to_string().contains("no POI snapshot"));
    }
}
