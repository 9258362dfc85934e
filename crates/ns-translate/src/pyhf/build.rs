//! Construction of a [`HistFactoryModel`] from workspace JSON.

use super::model::{
    BarlowBeeston, GaussianConstraint, HistFactoryModel, ModelChannel, ModelModifier, ModelSample,
    Parameter,
};
use super::schema::{Measurement, Modifier, ParameterConfig, Workspace};
use ns_core::{Error, Result};
use std::collections::HashMap;

/// Upper bound of normalization-like parameters.
const SCALE_MAX: f64 = 10.0;
/// Lower bound of per-bin gammas.
const GAMMA_MIN: f64 = 1e-10;
/// Default relative width of the luminosity constraint.
const LUMI_WIDTH: f64 = 0.02;

/// Parameters in declaration order, deduplicated by name.
#[derive(Default)]
struct Registry {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl Registry {
    fn declare(&mut self, param: Parameter) -> usize {
        if let Some(&idx) = self.index.get(&param.name) {
            return idx;
        }
        let idx = self.params.len();
        self.index.insert(param.name.clone(), idx);
        self.params.push(param);
        idx
    }

    /// One parameter per bin, named `<name>[<bin>]`.
    fn declare_bins(
        &mut self,
        name: &str,
        n_bins: usize,
        make: impl Fn(String) -> Parameter,
    ) -> Vec<usize> {
        (0..n_bins).map(|bin| self.declare(make(format!("{}[{}]", name, bin)))).collect()
    }
}

fn scale(name: String) -> Parameter {
    Parameter { name, init: 1.0, bounds: (0.0, SCALE_MAX), constraint: None }
}

fn gamma(name: String) -> Parameter {
    Parameter { name, init: 1.0, bounds: (GAMMA_MIN, SCALE_MAX), constraint: None }
}

fn alpha(name: String) -> Parameter {
    Parameter {
        name,
        init: 0.0,
        bounds: (-5.0, 5.0),
        constraint: Some(GaussianConstraint { center: 0.0, width: 1.0 }),
    }
}

/// Per-bin sums feeding the relative staterror widths.
struct StatErrorSums {
    nominal: Vec<f64>,
    variance: Vec<f64>,
    gammas: Vec<usize>,
}

pub(super) fn build(ws: &Workspace, measurement: Option<&Measurement>) -> Result<HistFactoryModel> {
    let mut registry = Registry::default();

    let poi_name = measurement.map(|m| m.config.poi.as_str()).unwrap_or("mu");
    let poi_index = registry.declare(scale(poi_name.to_string()));

    let mut staterrors: HashMap<String, StatErrorSums> = HashMap::new();
    let mut channels = Vec::with_capacity(ws.channels.len());

    for channel in &ws.channels {
        let observed = ws
            .observations
            .iter()
            .find(|o| o.name == channel.name)
            .map(|o| o.data.clone())
            .ok_or_else(|| {
                Error::Validation(format!("no observations for channel '{}'", channel.name))
            })?;

        let n_bins = channel.samples.first().map_or(0, |s| s.data.len());
        if n_bins == 0 {
            return Err(Error::Validation(format!("channel '{}' has no bins", channel.name)));
        }
        if observed.len() != n_bins {
            return Err(Error::Validation(format!(
                "channel '{}': {} observed bins, expected {}",
                channel.name,
                observed.len(),
                n_bins
            )));
        }

        let mut samples = Vec::with_capacity(channel.samples.len());
        let mut aux = Vec::new();
        for sample in &channel.samples {
            let bin_mismatch = |what: &str, len: usize| {
                Error::Validation(format!(
                    "channel '{}' sample '{}': {} has {} bins, expected {}",
                    channel.name, sample.name, what, len, n_bins
                ))
            };
            if sample.data.len() != n_bins {
                return Err(bin_mismatch("data", sample.data.len()));
            }

            let mut modifiers = Vec::with_capacity(sample.modifiers.len());
            for modifier in &sample.modifiers {
                let built = match modifier {
                    Modifier::NormFactor { name, .. } => {
                        ModelModifier::Scale(registry.declare(scale(name.clone())))
                    }
                    Modifier::Lumi { name, .. } => ModelModifier::Scale(registry.declare(Parameter {
                        constraint: Some(GaussianConstraint { center: 1.0, width: LUMI_WIDTH }),
                        ..scale(name.clone())
                    })),
                    Modifier::NormSys { name, data } => ModelModifier::NormSys {
                        alpha: registry.declare(alpha(name.clone())),
                        hi: data.hi,
                        lo: data.lo,
                    },
                    Modifier::HistoSys { name, data } => {
                        for len in [data.hi_data.len(), data.lo_data.len()] {
                            if len != n_bins {
                                return Err(bin_mismatch(&format!("histosys '{}'", name), len));
                            }
                        }
                        ModelModifier::HistoSys {
                            alpha: registry.declare(alpha(name.clone())),
                            hi: data.hi_data.clone(),
                            lo: data.lo_data.clone(),
                        }
                    }
                    Modifier::ShapeSys { name, data } => {
                        if data.len() != n_bins {
                            return Err(bin_mismatch(&format!("shapesys '{}'", name), data.len()));
                        }
                        let gammas = registry.declare_bins(name, n_bins, gamma);
                        let tau: Vec<f64> = sample
                            .data
                            .iter()
                            .zip(data)
                            .map(|(&nom, &sigma)| {
                                if nom > 0.0 && sigma > 0.0 { (nom / sigma).powi(2) } else { 1.0 }
                            })
                            .collect();
                        aux.push(BarlowBeeston { gammas: gammas.clone(), observed: tau.clone(), tau });
                        ModelModifier::BinScale(gammas)
                    }
                    Modifier::StatError { name, data } => {
                        if data.len() != n_bins {
                            return Err(bin_mismatch(&format!("staterror '{}'", name), data.len()));
                        }
                        let gammas = registry.declare_bins(name, n_bins, gamma);
                        let sums = staterrors.entry(name.clone()).or_insert_with(|| StatErrorSums {
                            nominal: vec![0.0; n_bins],
                            variance: vec![0.0; n_bins],
                            gammas: gammas.clone(),
                        });
                        if sums.nominal.len() != n_bins {
                            return Err(Error::Validation(format!(
                                "staterror '{}' spans channels with {} and {} bins",
                                name,
                                sums.nominal.len(),
                                n_bins
                            )));
                        }
                        for (bin, (&nom, &sigma)) in sample.data.iter().zip(data).enumerate() {
                            sums.nominal[bin] += nom;
                            sums.variance[bin] += sigma * sigma;
                        }
                        ModelModifier::BinScale(gammas)
                    }
                    Modifier::ShapeFactor { name, .. } => {
                        ModelModifier::BinScale(registry.declare_bins(name, n_bins, scale))
                    }
                };
                modifiers.push(built);
            }
            samples.push(ModelSample { nominal: sample.data.clone(), modifiers });
        }

        channels.push(ModelChannel { name: channel.name.clone(), samples, observed, aux });
    }

    for sums in staterrors.values() {
        for (bin, &idx) in sums.gammas.iter().enumerate() {
            let width = if sums.nominal[bin] > 0.0 {
                sums.variance[bin].sqrt() / sums.nominal[bin]
            } else {
                0.0
            };
            let p = &mut registry.params[idx];
            if width > 0.0 {
                p.constraint = Some(GaussianConstraint { center: 1.0, width });
            } else {
                // No MC uncertainty: the gamma is frozen at 1.
                p.init = 1.0;
                p.bounds = (1.0, 1.0);
            }
        }
    }

    let mut parameters = registry.params;
    if let Some(m) = measurement {
        for cfg in &m.config.parameters {
            apply_parameter_config(&mut parameters, cfg);
        }
    }

    // Main data is flattened in lexicographic channel order.
    channels.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(HistFactoryModel::from_parts(
        parameters,
        poi_index,
        channels,
        measurement.is_none_or(|m| m.config.extended),
    ))
}

/// Index of `param_name` within the parameter set configured as `cfg_name`:
/// `0` for a scalar, `i` for `cfg_name[i]`.
fn element_index(param_name: &str, cfg_name: &str) -> Option<usize> {
    if param_name == cfg_name {
        return Some(0);
    }
    param_name.strip_prefix(cfg_name)?.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
}

fn apply_parameter_config(parameters: &mut [Parameter], cfg: &ParameterConfig) {
    for p in parameters.iter_mut() {
        let Some(i) = element_index(&p.name, &cfg.name) else { continue };
        // A single entry applies to every element.
        let pick = |values: &[f64]| -> Option<f64> {
            if values.len() == 1 { values.first().copied() } else { values.get(i).copied() }
        };

        if let Some(init) = pick(&cfg.inits) {
            p.init = init;
        }
        let bounds = if cfg.bounds.len() == 1 { cfg.bounds.first() } else { cfg.bounds.get(i) };
        if let Some(&[lo, hi]) = bounds {
            p.bounds = (lo, hi);
        }
        if let (Some(center), Some(width)) = (pick(&cfg.auxdata), pick(&cfg.sigmas))
            && width > 0.0
        {
            p.constraint = Some(GaussianConstraint { center, width });
        }
        if cfg.fixed {
            p.bounds = (p.init, p.init);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_index_matches_scalars_and_bins() {
        assert_eq!(element_index("mu", "mu"), Some(0));
        assert_eq!(element_index("gamma[3]", "gamma"), Some(3));
        assert_eq!(element_index("gamma_sr[3]", "gamma"), None);
        assert_eq!(element_index("mu2", "mu"), None);
    }

    #[test]
    fn registry_deduplicates_by_name() {
        let mut r = Registry::default();
        let a = r.declare(scale("mu".into()));
        let b = r.declare(alpha("syst".into()));
        assert_eq!(r.declare(scale("mu".into())), a);
        assert_eq!(r.declare_bins("g", 2, gamma), vec![2, 3]);
        assert_eq!(r.declare_bins("g", 2, gamma), vec![2, 3]);
        assert_eq!((a, b), (0, 1));
        assert_eq!(r.params.len(), 4);
    }

    #[test]
    fn parameter_config_broadcasts_single_values() {
        let mut params = vec![gamma("g[0]".into()), gamma("g[1]".into()), scale("mu".into())];
        let cfg = ParameterConfig {
            name: "g".into(),
            inits: vec![1.5],
            bounds: vec![[0.5, 2.0]],
            fixed: false,
            auxdata: vec![1.0],
            sigmas: vec![0.1],
        };
        apply_parameter_config(&mut params, &cfg);
        for p in &params[..2] {
            assert_eq!(p.init, 1.5);
            assert_eq!(p.bounds, (0.5, 2.0));
            assert_eq!(p.constraint, Some(GaussianConstraint { center: 1.0, width: 0.1 }));
        }
        assert_eq!(params[2].init, 1.0);
    }

    #[test]
    fn fixed_parameter_collapses_bounds_on_init() {
        let mut params = vec![scale("bkg_norm".into())];
        let cfg = ParameterConfig {
            name: "bkg_norm".into(),
            inits: vec![2.0],
            bounds: vec![],
            fixed: true,
            auxdata: vec![],
            sigmas: vec![],
        };
        apply_parameter_config(&mut params, &cfg);
        assert_eq!(params[0].bounds, (2.0, 2.0));
    }
}
