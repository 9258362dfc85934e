//! Toy Monte Carlo sampling of test-statistic distributions.
//!
//! By default toys fluctuate the **main** bins only; auxiliary observations stay
//! as stored in the model. With global-observable generation switched on, every
//! toy also draws Gaussian constraint centers around the generating values and
//! Poisson Barlow-Beeston counts. Extended densities get independent Poisson
//! counts per bin. A fixed number of events per toy produces a multinomial draw
//! over the bin fractions instead. Toy `i` of an ensemble is seeded with
//! `seed + i`, so results do not depend on the thread count.

use crate::test_statistic::TestStatistic;
use ns_core::{Error, Result};
use ns_translate::pyhf::HistFactoryModel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Distribution, Normal, Poisson};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

/// Default base seed for toy ensembles.
pub const DEFAULT_SEED: u64 = 42;

/// Test-statistic values sampled under one hypothesis.
#[derive(Debug, Clone, Serialize)]
pub struct SamplingDistribution {
    name: String,
    values: Vec<f64>,
    n_failed: usize,
}

impl SamplingDistribution {
    /// Build from sampled values.
    pub fn new(name: impl Into<String>, values: Vec<f64>, n_failed: usize) -> Self {
        Self { name: name.into(), values, n_failed }
    }

    /// Distribution name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sampled values, in toy order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// No valid samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Toys dropped because the generation or the evaluation failed.
    pub fn n_failed(&self) -> usize {
        self.n_failed
    }

    /// Fraction of samples `>= threshold`, with its binomial error.
    pub fn upper_tail(&self, threshold: f64) -> (f64, f64) {
        self.fraction(|v| v >= threshold)
    }

    fn fraction(&self, pred: impl Fn(f64) -> bool) -> (f64, f64) {
        let n = self.values.len();
        if n == 0 {
            return (f64::NAN, f64::NAN);
        }
        let k = self.values.iter().filter(|&&v| pred(v)).count();
        let p = k as f64 / n as f64;
        (p, (p * (1.0 - p) / n as f64).sqrt())
    }

    /// Smallest and largest sampled value.
    pub fn range(&self) -> Option<(f64, f64)> {
        let mut it = self.values.iter().copied();
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Regenerated auxiliary measurements of one toy.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalObservables {
    /// Gaussian constraint centers, one per parameter (unconstrained entries unused)
    pub constraint_centers: Vec<f64>,
    /// Barlow-Beeston auxiliary counts, flattened in channel order
    pub shapesys_counts: Vec<f64>,
}

/// One generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Toy {
    /// Main-bin counts, flattened in channel order
    pub main: Vec<f64>,
    /// Present when global observables were regenerated
    pub globals: Option<GlobalObservables>,
}

/// Draws toy datasets from a density and evaluates a test statistic on each.
#[derive(Clone)]
pub struct ToyMcSampler {
    test_statistic: Option<Arc<dyn TestStatistic>>,
    n_events_per_toy: Option<u64>,
    generate_global_observables: bool,
    seed: u64,
}

impl std::fmt::Debug for ToyMcSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToyMcSampler")
            .field("test_statistic", &self.test_statistic.as_ref().map(|t| t.name()))
            .field("n_events_per_toy", &self.n_events_per_toy)
            .field("generate_global_observables", &self.generate_global_observables)
            .field("seed", &self.seed)
            .finish()
    }
}

impl Default for ToyMcSampler {
    fn default() -> Self {
        Self {
            test_statistic: None,
            n_events_per_toy: None,
            generate_global_observables: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl ToyMcSampler {
    /// Sampler without a test statistic, generating extended toys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statistic evaluated on every toy.
    pub fn set_test_statistic(&mut self, test_statistic: Arc<dyn TestStatistic>) {
        self.test_statistic = Some(test_statistic);
    }

    /// The configured statistic, if any.
    pub fn test_statistic(&self) -> Option<&Arc<dyn TestStatistic>> {
        self.test_statistic.as_ref()
    }

    /// Generate exactly `n` events per toy. `0` restores extended generation.
    pub fn set_n_events_per_toy(&mut self, n: u64) {
        self.n_events_per_toy = (n > 0).then_some(n);
    }

    /// Fixed number of events per toy, if set.
    pub fn n_events_per_toy(&self) -> Option<u64> {
        self.n_events_per_toy
    }

    /// Also regenerate auxiliary measurements for every toy (unconditional ensemble).
    pub fn set_generate_global_observables(&mut self, on: bool) {
        self.generate_global_observables = on;
    }

    /// Whether toys carry regenerated global observables.
    pub fn generates_global_observables(&self) -> bool {
        self.generate_global_observables
    }

    /// Set the base seed.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Base seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate one toy main dataset from `pdf` at `params`.
    pub fn generate_toy(
        &self,
        pdf: &HistFactoryModel,
        params: &[f64],
        toy_seed: u64,
    ) -> Result<Toy> {
        let expected = pdf.expected_data(params)?;
        let mut rng = StdRng::seed_from_u64(toy_seed);
        let main = match self.n_events_per_toy {
            Some(n) => multinomial_main(&expected, n, &mut rng)?,
            None if pdf.can_be_extended() => poisson_main(&expected, &mut rng)?,
            None => {
                return Err(Error::Validation(
                    "density cannot be extended: set a number of events per toy".to_string(),
                ));
            }
        };
        let globals = if self.generate_global_observables {
            Some(generate_globals(pdf, params, &mut rng)?)
        } else {
            None
        };
        Ok(Toy { main, globals })
    }

    /// Sample `n_toys` values of `test_statistic` from `pdf` at `gen_params`,
    /// each evaluated at `null_poi`.
    ///
    /// Failed toys are dropped and counted.
    pub fn sampling_distribution(
        &self,
        name: &str,
        test_statistic: &dyn TestStatistic,
        pdf: &HistFactoryModel,
        gen_params: &[f64],
        null_poi: f64,
        n_toys: usize,
        seed: u64,
    ) -> Result<SamplingDistribution> {
        // Surface configuration errors once instead of per toy.
        self.generate_toy(pdf, gen_params, seed)?;

        let results: Vec<Result<f64>> = (0..n_toys)
            .into_par_iter()
            .with_min_len(16)
            .map(|toy_idx| {
                let toy = self.generate_toy(pdf, gen_params, seed.wrapping_add(toy_idx as u64))?;
                test_statistic.evaluate_toy(&toy, null_poi)
            })
            .collect();

        let mut values = Vec::with_capacity(n_toys);
        let mut n_failed = 0usize;
        for r in results {
            match r {
                Ok(v) if v.is_finite() => values.push(v),
                Ok(_) => n_failed += 1,
                Err(e) => {
                    log::debug!("toy failed: {}", e);
                    n_failed += 1;
                }
            }
        }
        if n_failed > 0 {
            log::warn!("{}: {} of {} toys failed and were dropped", name, n_failed, n_toys);
        }

        Ok(SamplingDistribution::new(name, values, n_failed))
    }
}

/// Constraint centers ~ N(value, width) and Barlow-Beeston counts ~ Pois(gamma · tau).
fn generate_globals(
    pdf: &HistFactoryModel,
    params: &[f64],
    rng: &mut StdRng,
) -> Result<GlobalObservables> {
    let constraint_centers = pdf
        .parameters()
        .iter()
        .zip(params)
        .map(|(p, &value)| {
            let Some(c) = p.constraint else {
                return Ok(value);
            };
            let normal = Normal::new(value, c.width).map_err(|e| {
                Error::Computation(format!("Normal({}, {}) invalid: {}", value, c.width, e))
            })?;
            Ok(normal.sample(rng))
        })
        .collect::<Result<Vec<_>>>()?;
    let shapesys_counts = poisson_main(&pdf.expected_shapesys_aux(params)?, rng)?;
    Ok(GlobalObservables { constraint_centers, shapesys_counts })
}

fn poisson_main(expected: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
    expected
        .iter()
        .map(|&lam| {
            // Poisson(0) is deterministically 0; treat invalid yields the same way.
            if !lam.is_finite() || lam <= 0.0 {
                return Ok(0.0);
            }
            let pois = Poisson::new(lam)
                .map_err(|e| Error::Computation(format!("Poisson({}) invalid: {}", lam, e)))?;
            Ok(pois.sample(rng))
        })
        .collect()
}

/// Multinomial draw of `n_events` over the bin fractions of `expected`,
/// as a chain of conditional binomials.
fn multinomial_main(expected: &[f64], n_events: u64, rng: &mut StdRng) -> Result<Vec<f64>> {
    let weights: Vec<f64> =
        expected.iter().map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 }).collect();
    let mut mass_left: f64 = weights.iter().sum();
    if mass_left <= 0.0 {
        return Err(Error::Computation(
            "cannot generate events from a density with zero total yield".to_string(),
        ));
    }

    let mut out = vec![0.0; weights.len()];
    let mut events_left = n_events;
    for (slot, &w) in out.iter_mut().zip(&weights) {
        if events_left == 0 {
            break;
        }
        let p = (w / mass_left).clamp(0.0, 1.0);
        let k = Binomial::new(events_left, p)
            .map_err(|e| Error::Computation(format!("Binomial({}, {}) invalid: {}", events_left, p, e)))?
            .sample(rng);
        *slot = k as f64;
        events_left -= k;
        mass_left -= w;
    }
    Ok(out)
}
