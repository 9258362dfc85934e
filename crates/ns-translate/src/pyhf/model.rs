//! HistFactory probability density.
//!
//! Expected yields per bin are `(nominal + Σ additive shifts) · Π factors`
//! summed over samples. The likelihood is a product of Poisson terms over
//! main bins (or a multinomial in the bin fractions for non-extended
//! densities), Barlow-Beeston Poisson terms for `shapesys`, and Gaussian
//! constraints on the remaining constrained nuisance parameters.

use super::build;
use super::interp::{histosys_delta, normsys_factor};
use super::schema::{Observation, Workspace};
use ns_core::traits::LogDensityModel;
use ns_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

/// Floor applied to expected yields before taking logarithms.
const MIN_EXPECTED: f64 = 1e-10;

/// Gaussian constraint term `N(center | value, width)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianConstraint {
    /// Auxiliary measurement
    pub center: f64,
    /// Standard deviation
    pub width: f64,
}

impl GaussianConstraint {
    fn nll(&self, value: f64) -> f64 {
        let pull = (value - self.center) / self.width;
        0.5 * pull * pull + self.width.ln() + 0.5 * (2.0 * std::f64::consts::PI).ln()
    }
}

/// A model parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name; per-bin parameters are `<modifier>[<bin>]`
    pub name: String,
    /// Initial value
    pub init: f64,
    /// Bounds (min, max); equal bounds freeze the parameter
    pub bounds: (f64, f64),
    /// Gaussian constraint, if any
    pub constraint: Option<GaussianConstraint>,
}

impl Parameter {
    /// Whether the bounds pin the parameter to a single value.
    pub fn is_fixed(&self) -> bool {
        self.bounds.0 == self.bounds.1
    }
}

#[derive(Debug, Clone)]
pub(super) struct ModelChannel {
    pub(super) name: String,
    pub(super) samples: Vec<ModelSample>,
    pub(super) observed: Vec<f64>,
    pub(super) aux: Vec<BarlowBeeston>,
}

impl ModelChannel {
    fn n_bins(&self) -> usize {
        self.observed.len()
    }
}

/// Poisson auxiliary measurement of a `shapesys` modifier:
/// `Pois(observed_i | gamma_i · tau_i)` with `tau_i = (nominal_i / sigma_i)^2`.
#[derive(Debug, Clone)]
pub(super) struct BarlowBeeston {
    pub(super) gammas: Vec<usize>,
    pub(super) tau: Vec<f64>,
    pub(super) observed: Vec<f64>,
}

impl BarlowBeeston {
    fn nll(&self, params: &[f64]) -> Result<f64> {
        let mut nll = 0.0;
        for ((&gamma_idx, &tau), &obs) in self.gammas.iter().zip(&self.tau).zip(&self.observed) {
            nll += poisson_nll(obs, param(params, gamma_idx)? * tau);
        }
        Ok(nll)
    }
}

#[derive(Debug, Clone)]
pub(super) struct ModelSample {
    pub(super) nominal: Vec<f64>,
    pub(super) modifiers: Vec<ModelModifier>,
}

#[derive(Debug, Clone)]
pub(super) enum ModelModifier {
    /// Overall scale by one parameter (normfactor, lumi).
    Scale(usize),
    /// One scale parameter per bin (shapesys, staterror, shapefactor).
    BinScale(Vec<usize>),
    /// Interpolated normalization.
    NormSys { alpha: usize, hi: f64, lo: f64 },
    /// Interpolated additive shape shift.
    HistoSys { alpha: usize, hi: Vec<f64>, lo: Vec<f64> },
}

impl ModelSample {
    /// Add this sample's expected yields to `out`.
    fn add_expected(&self, params: &[f64], out: &mut [f64]) -> Result<()> {
        let mut shifted = self.nominal.clone();
        let mut factor = vec![1.0; self.nominal.len()];

        for modifier in &self.modifiers {
            match modifier {
                ModelModifier::Scale(idx) => {
                    let k = param(params, *idx)?;
                    factor.iter_mut().for_each(|f| *f *= k);
                }
                ModelModifier::BinScale(indices) => {
                    for (f, &idx) in factor.iter_mut().zip(indices) {
                        *f *= param(params, idx)?;
                    }
                }
                ModelModifier::NormSys { alpha, hi, lo } => {
                    let k = normsys_factor(param(params, *alpha)?, *hi, *lo);
                    factor.iter_mut().for_each(|f| *f *= k);
                }
                ModelModifier::HistoSys { alpha, hi, lo } => {
                    let a = param(params, *alpha)?;
                    for (bin, s) in shifted.iter_mut().enumerate() {
                        *s += histosys_delta(a, lo[bin], self.nominal[bin], hi[bin]);
                    }
                }
            }
        }

        for ((o, s), f) in out.iter_mut().zip(shifted).zip(factor) {
            *o += s * f;
        }
        Ok(())
    }
}

fn param(params: &[f64], idx: usize) -> Result<f64> {
    params.get(idx).copied().ok_or_else(|| {
        Error::Validation(format!("parameter index {} out of range (len {})", idx, params.len()))
    })
}

/// `-ln Pois(obs | exp)`.
fn poisson_nll(obs: f64, exp: f64) -> f64 {
    let exp = exp.max(MIN_EXPECTED);
    if obs > 0.0 { exp - obs * exp.ln() + ln_gamma(obs + 1.0) } else { exp }
}

/// `-ln Mult(obs | n, exp / Σexp)`.
fn multinomial_nll(observed: impl Iterator<Item = f64>, expected: &[f64]) -> Result<f64> {
    let total: f64 = expected.iter().map(|e| e.max(MIN_EXPECTED)).sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(Error::Computation(format!("total expected yield is {}", total)));
    }
    let mut n = 0.0;
    let mut nll = 0.0;
    for (obs, &exp) in observed.zip(expected) {
        if obs > 0.0 {
            nll += ln_gamma(obs + 1.0) - obs * (exp.max(MIN_EXPECTED) / total).ln();
        }
        n += obs;
    }
    Ok(nll - ln_gamma(n + 1.0))
}

/// HistFactory density built from a pyhf workspace.
#[derive(Debug, Clone)]
pub struct HistFactoryModel {
    parameters: Vec<Parameter>,
    poi_index: Option<usize>,
    /// Sorted by name
    channels: Vec<ModelChannel>,
    /// Poisson main-bin likelihood; multinomial shape term otherwise
    extended: bool,
}

impl HistFactoryModel {
    pub(super) fn from_parts(
        parameters: Vec<Parameter>,
        poi_index: usize,
        channels: Vec<ModelChannel>,
        extended: bool,
    ) -> Self {
        Self { parameters, poi_index: Some(poi_index), channels, extended }
    }

    /// Build from a workspace using its first measurement.
    pub fn from_workspace(ws: &Workspace) -> Result<Self> {
        build::build(ws, ws.measurements.first())
    }

    /// Build from a workspace using the named measurement.
    pub fn from_workspace_with_measurement(ws: &Workspace, measurement: &str) -> Result<Self> {
        let m = ws
            .measurements
            .iter()
            .find(|m| m.name == measurement)
            .ok_or_else(|| Error::not_found("measurement", measurement))?;
        build::build(ws, Some(m))
    }

    /// Number of parameters.
    pub fn n_params(&self) -> usize {
        self.parameters.len()
    }

    /// Total number of main bins across all channels.
    pub fn n_main_bins(&self) -> usize {
        self.channels.iter().map(ModelChannel::n_bins).sum()
    }

    /// Channel names in main-data order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether the main-bin likelihood is extended (Poisson in the total
    /// yield) rather than a multinomial in the bin fractions.
    pub fn can_be_extended(&self) -> bool {
        self.extended
    }

    /// Observed main data, flattened in channel order.
    pub fn observed_main(&self) -> Vec<f64> {
        self.channels.iter().flat_map(|c| c.observed.iter().copied()).collect()
    }

    /// Flatten per-channel observations into main-data order.
    pub fn main_from_observations(&self, observations: &[Observation]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.n_main_bins());
        for channel in &self.channels {
            let obs = observations.iter().find(|o| o.name == channel.name).ok_or_else(|| {
                Error::Validation(format!("dataset has no observations for channel '{}'", channel.name))
            })?;
            if obs.data.len() != channel.n_bins() {
                return Err(Error::Validation(format!(
                    "channel '{}': dataset has {} bins, expected {}",
                    channel.name,
                    obs.data.len(),
                    channel.n_bins()
                )));
            }
            out.extend_from_slice(&obs.data);
        }
        Ok(out)
    }

    /// Copy with the main-bin observations replaced. Auxiliary data is kept.
    pub fn with_observed_main(&self, observed_main: &[f64]) -> Result<Self> {
        if observed_main.len() != self.n_main_bins() {
            return Err(Error::Validation(format!(
                "{} main bins given, expected {}",
                observed_main.len(),
                self.n_main_bins()
            )));
        }
        let mut out = self.clone();
        let mut rest = observed_main;
        for channel in &mut out.channels {
            let (head, tail) = rest.split_at(channel.n_bins());
            channel.observed.copy_from_slice(head);
            rest = tail;
        }
        Ok(out)
    }

    /// Index of the parameter of interest.
    pub fn poi_index(&self) -> Option<usize> {
        self.poi_index
    }

    /// Name of the parameter of interest.
    pub fn poi_name(&self) -> Option<&str> {
        self.poi_index.and_then(|i| self.parameters.get(i)).map(|p| p.name.as_str())
    }

    /// Model parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Copy with parameter `idx` frozen at `value`.
    pub fn with_fixed_param(&self, idx: usize, value: f64) -> Self {
        let mut out = self.clone();
        if let Some(p) = out.parameters.get_mut(idx) {
            p.init = value;
            p.bounds = (value, value);
        }
        out
    }

    /// Copy with the Gaussian auxiliary measurements moved to `centers`.
    ///
    /// Entries of unconstrained parameters are ignored.
    pub fn with_constraint_centers(&self, centers: &[f64]) -> Result<Self> {
        self.check_len(centers.len())?;
        let mut out = self.clone();
        for (p, &center) in out.parameters.iter_mut().zip(centers) {
            if let Some(c) = p.constraint.as_mut() {
                c.center = center;
            }
        }
        Ok(out)
    }

    /// Copy with every Barlow-Beeston auxiliary count set to `gamma_i · tau_i`
    /// at `params`.
    pub fn with_shapesys_aux_observed_from_params(&self, params: &[f64]) -> Result<Self> {
        self.with_shapesys_aux_observed(&self.expected_shapesys_aux(params)?)
    }

    /// Expected Barlow-Beeston auxiliary counts `gamma_i · tau_i` at `params`,
    /// flattened in channel order.
    pub fn expected_shapesys_aux(&self, params: &[f64]) -> Result<Vec<f64>> {
        self.check_len(params.len())?;
        self.channels
            .iter()
            .flat_map(|c| &c.aux)
            .flat_map(|aux| aux.gammas.iter().zip(&aux.tau))
            .map(|(&idx, &tau)| Ok(param(params, idx)? * tau))
            .collect()
    }

    /// Copy with the Barlow-Beeston auxiliary counts replaced, in the order of
    /// [`expected_shapesys_aux`](Self::expected_shapesys_aux).
    pub fn with_shapesys_aux_observed(&self, counts: &[f64]) -> Result<Self> {
        let n_aux: usize = self.channels.iter().flat_map(|c| &c.aux).map(|a| a.gammas.len()).sum();
        if counts.len() != n_aux {
            return Err(Error::Validation(format!(
                "{} auxiliary counts given, model has {}",
                counts.len(),
                n_aux
            )));
        }
        let mut out = self.clone();
        let mut rest = counts;
        for aux in out.channels.iter_mut().flat_map(|c| c.aux.iter_mut()) {
            let (head, tail) = rest.split_at(aux.gammas.len());
            aux.observed = head.to_vec();
            rest = tail;
        }
        Ok(out)
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got != self.parameters.len() {
            return Err(Error::Validation(format!(
                "{} parameter values given, model has {}",
                got,
                self.parameters.len()
            )));
        }
        Ok(())
    }

    /// Negative log-likelihood at `params`.
    pub fn nll(&self, params: &[f64]) -> Result<f64> {
        let expected = self.expected_data(params)?;
        let observed = self.channels.iter().flat_map(|c| c.observed.iter().copied());

        let mut nll = if self.extended {
            observed.zip(&expected).map(|(obs, &exp)| poisson_nll(obs, exp)).sum()
        } else {
            multinomial_nll(observed, &expected)?
        };
        for aux in self.channels.iter().flat_map(|c| &c.aux) {
            nll += aux.nll(params)?;
        }
        nll += self
            .parameters
            .iter()
            .zip(params)
            .filter_map(|(p, &v)| p.constraint.map(|c| c.nll(v)))
            .sum::<f64>();
        Ok(nll)
    }

    /// Expected main data at `params`, flattened in channel order.
    pub fn expected_data(&self, params: &[f64]) -> Result<Vec<f64>> {
        self.check_len(params.len())?;
        let mut out = vec![0.0; self.n_main_bins()];
        let mut offset = 0;
        for channel in &self.channels {
            let bins = &mut out[offset..offset + channel.n_bins()];
            for sample in &channel.samples {
                sample.add_expected(params, bins)?;
            }
            offset += channel.n_bins();
        }
        Ok(out)
    }
}

impl LogDensityModel for HistFactoryModel {
    fn dim(&self) -> usize {
        self.n_params()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(|p| p.bounds).collect()
    }

    fn parameter_init(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.init).collect()
    }

    fn nll(&self, params: &[f64]) -> Result<f64> {
        HistFactoryModel::nll(self, params)
    }
}
