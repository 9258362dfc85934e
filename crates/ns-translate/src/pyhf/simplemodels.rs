//! Small workspaces for tests and quick experiments.

use super::schema::{
    Channel, Measurement, MeasurementConfig, Modifier, Observation, ParameterConfig, Sample,
    Workspace,
};

fn single_channel(samples: Vec<Sample>, observed: Vec<f64>, config: MeasurementConfig) -> Workspace {
    Workspace {
        channels: vec![Channel { name: "singlechannel".to_string(), samples }],
        observations: vec![Observation { name: "singlechannel".to_string(), data: observed }],
        measurements: vec![Measurement { name: "Measurement".to_string(), config }],
        datasets: Vec::new(),
        version: Some("1.0.0".to_string()),
    }
}

fn signal_sample(signal: &[f64]) -> Sample {
    Sample {
        name: "signal".to_string(),
        data: signal.to_vec(),
        modifiers: vec![Modifier::NormFactor { name: "mu".to_string(), data: None }],
    }
}

/// Single channel with a signal sample scaled by `mu` and a background whose
/// per-bin uncertainties are uncorrelated (`shapesys`).
///
/// The observed data is `signal + bkg`.
///
/// # Panics
/// Panics if the three slices have different lengths or are empty.
pub fn uncorrelated_background(signal: &[f64], bkg: &[f64], bkg_uncertainty: &[f64]) -> Workspace {
    assert!(!signal.is_empty(), "signal must not be empty");
    assert_eq!(signal.len(), bkg.len(), "signal and bkg must have the same length");
    assert_eq!(
        signal.len(),
        bkg_uncertainty.len(),
        "signal and bkg_uncertainty must have the same length"
    );

    single_channel(
        vec![
            signal_sample(signal),
            Sample {
                name: "background".to_string(),
                data: bkg.to_vec(),
                modifiers: vec![Modifier::ShapeSys {
                    name: "uncorr_bkguncrt".to_string(),
                    data: bkg_uncertainty.to_vec(),
                }],
            },
        ],
        bkg.iter().zip(signal).map(|(b, s)| b + s).collect(),
        MeasurementConfig { poi: "mu".to_string(), parameters: vec![], extended: true },
    )
}

/// Counting experiment without systematics: `n ~ Pois(mu * s + b)`.
pub fn counting_experiment(signal: f64, bkg: f64, observed: f64) -> Workspace {
    single_channel(
        vec![
            signal_sample(&[signal]),
            Sample { name: "background".to_string(), data: vec![bkg], modifiers: vec![] },
        ],
        vec![observed],
        MeasurementConfig { poi: "mu".to_string(), parameters: vec![], extended: true },
    )
}

/// Shape-only model: the main bins follow a multinomial in the bin fractions
/// of `mu * signal + bkg`.
///
/// # Panics
/// Panics if the slices have different lengths or are empty.
pub fn shape_only(signal: &[f64], bkg: &[f64], observed: &[f64]) -> Workspace {
    assert!(!signal.is_empty(), "signal must not be empty");
    assert_eq!(signal.len(), bkg.len(), "signal and bkg must have the same length");
    assert_eq!(signal.len(), observed.len(), "signal and observed must have the same length");

    single_channel(
        vec![
            signal_sample(signal),
            Sample { name: "background".to_string(), data: bkg.to_vec(), modifiers: vec![] },
        ],
        observed.to_vec(),
        MeasurementConfig {
            poi: "mu".to_string(),
            parameters: vec![ParameterConfig {
                name: "mu".to_string(),
                inits: vec![1.0],
                bounds: vec![[0.0, 20.0]],
                fixed: false,
                auxdata: vec![],
                sigmas: vec![],
            }],
            extended: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pyhf::HistFactoryModel;
    use ns_core::traits::LogDensityModel;

    #[test]
    fn test_uncorrelated_background_builds() {
        let ws = uncorrelated_background(&[5.0, 10.0], &[50.0, 60.0], &[7.0, 8.0]);
        assert_eq!(ws.observations[0].data, vec![55.0, 70.0]);

        let model = HistFactoryModel::from_workspace(&ws).unwrap();
        assert_eq!(model.poi_index(), Some(0));
        assert_eq!(model.n_params(), 3);
    }

    #[test]
    fn test_counting_experiment_has_only_poi() {
        let model = HistFactoryModel::from_workspace(&counting_experiment(5.0, 10.0, 12.0)).unwrap();
        assert_eq!(model.parameter_names(), vec!["mu".to_string()]);
        assert_eq!(model.expected_data(&[2.0]).unwrap(), vec![20.0]);
    }

    #[test]
    fn test_shape_only_applies_measurement_bounds() {
        let ws = shape_only(&[1.0, 4.0], &[10.0, 10.0], &[3.0, 5.0]);
        let model = HistFactoryModel::from_workspace(&ws).unwrap();
        assert!(!model.can_be_extended());
        assert_eq!(model.parameter_bounds()[0], (0.0, 20.0));
    }

    #[test]
    #[should_panic(expected = "signal must not be empty")]
    fn test_uncorrelated_empty_panics() {
        uncorrelated_background(&[], &[], &[]);
    }
}
