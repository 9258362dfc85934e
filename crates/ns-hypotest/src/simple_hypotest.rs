//! Load a workspace, derive S+B and B hypotheses, run both calculators and
//! report.

use anyhow::{Context, Result};
use ns_core::Error;
use ns_inference::{
    AsymptoticCalculator, FrequentistCalculator, HypoTestResult, MaximumLikelihoodEstimator,
    ModelConfig, ProfileLikelihoodTestStat, derive_hypotheses,
};
use ns_translate::pyhf::{
    DEFAULT_MODEL_CONFIG, DEFAULT_WORKSPACE, Dataset, OBSERVED_DATASET, WorkspaceFile,
};
use ns_viz::{HypoTestPlot, HypoTestPlotArtifact};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Workspace file used when none is given.
pub const DEFAULT_INFILE: &str = "workspaces/final/hh_nos_nonisol_ebz_mva_fixed/hh_12_combination_125/measurement_hh_12_combination_125.json";

/// Banner printed between the asymptotic and the toy-based result.
pub const FREQUENTIST_BANNER: &str = "\n\nRun now FrequentistCalculator.....\n";

/// What to load.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Workspace file
    pub infile: PathBuf,
    /// Workspace name inside the file
    pub workspace: String,
    /// Model-config name
    pub model_config: String,
    /// Dataset name
    pub data: String,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            infile: PathBuf::from(DEFAULT_INFILE),
            workspace: DEFAULT_WORKSPACE.to_string(),
            model_config: DEFAULT_MODEL_CONFIG.to_string(),
            data: OBSERVED_DATASET.to_string(),
        }
    }
}

/// How to run the calculators.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Null-hypothesis toys
    pub n_toys_null: usize,
    /// Alternate-hypothesis toys
    pub n_toys_alt: usize,
    /// Toy seed
    pub seed: u64,
    /// Stop after the asymptotic result
    pub asymptotic_only: bool,
    /// Silence the asymptotic calculator's own log lines
    pub quiet_asymptotic: bool,
    /// Histogram bins of the plot (`None` keeps the plot default)
    pub plot_bins: Option<usize>,
    /// Regenerate auxiliary measurements per toy (unconditional ensemble)
    pub global_observables: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            n_toys_null: 2000,
            n_toys_alt: 1000,
            seed: 42,
            asymptotic_only: false,
            quiet_asymptotic: false,
            plot_bins: None,
            global_observables: false,
        }
    }
}

/// Dataset and model configuration read from a workspace file.
#[derive(Debug, Clone)]
pub struct Loaded {
    /// The selected dataset
    pub data: Dataset,
    /// The selected model configuration, as stored
    pub model_config: ModelConfig,
}

/// Open the file and look up workspace, dataset and model configuration.
///
/// Every missing piece is an error; nothing is printed.
pub fn load(inputs: &Inputs) -> Result<Loaded> {
    tracing::info!(path = %inputs.infile.display(), "opening workspace file");
    let file = WorkspaceFile::open(&inputs.infile)
        .with_context(|| format!("cannot open workspace file {}", inputs.infile.display()))?;

    let ws = file
        .workspace(&inputs.workspace)
        .ok_or_else(|| Error::not_found("workspace", &inputs.workspace))?;
    let data = ws
        .data(&inputs.data)
        .ok_or_else(|| Error::not_found("dataset", &inputs.data))
        .with_context(|| format!("in workspace '{}'", ws.name))?;

    let pdf = ws
        .model(&inputs.model_config)
        .with_context(|| format!("in workspace '{}'", ws.name))?;
    let model_config = ModelConfig::new(inputs.model_config.clone(), Arc::new(pdf))?;
    tracing::info!(
        workspace = %ws.name,
        dataset = %data.name,
        poi = model_config.poi_name(),
        "workspace loaded"
    );

    Ok(Loaded { data, model_config })
}

/// Best-fit POI on the selected dataset.
#[derive(Debug, Clone, Serialize)]
pub struct PoiFit {
    /// POI name
    pub poi: String,
    /// Best-fit value
    pub value: f64,
    /// Hessian uncertainty
    pub uncertainty: f64,
    /// Whether the minimizer converged
    pub converged: bool,
}

/// Everything the procedure produced.
#[derive(Debug, Clone, Serialize)]
pub struct HypoTestReport {
    /// Dataset name
    pub data: String,
    /// Best-fit POI, when the full fit succeeded
    pub poi_fit: Option<PoiFit>,
    /// Asymptotic result
    pub asymptotic: HypoTestResult,
    /// Toy-based result, absent with `asymptotic_only`
    pub frequentist: Option<HypoTestResult>,
    /// Plot of the toy distributions
    #[serde(skip)]
    pub plot: Option<HypoTestPlotArtifact>,
}

/// Derive the hypotheses, run both calculators and print their results to `out`.
pub fn run(loaded: Loaded, options: &RunOptions, out: &mut impl Write) -> Result<HypoTestReport> {
    let Loaded { data, model_config } = loaded;
    let (sb_model, b_model) = derive_hypotheses(model_config);

    let poi_fit = fit_poi(&data, &sb_model);

    let mut ac = AsymptoticCalculator::new(&data, &sb_model, &b_model)?;
    ac.set_one_sided_discovery(true);
    if options.quiet_asymptotic {
        ac.set_print_level(-1);
    }
    let asymptotic = ac.get_hypo_test().context("asymptotic calculator failed")?;
    write!(out, "{}", asymptotic)?;

    if options.asymptotic_only {
        return Ok(HypoTestReport {
            data: data.name,
            poi_fit,
            asymptotic,
            frequentist: None,
            plot: None,
        });
    }

    writeln!(out, "{}", FREQUENTIST_BANNER)?;

    let mut fc = FrequentistCalculator::new(&data, &sb_model, &b_model)?;
    fc.set_toys(options.n_toys_null, options.n_toys_alt);

    let mut profll = ProfileLikelihoodTestStat::new(sb_model.pdf().clone());
    profll.set_one_sided_discovery(true);
    let sampler = fc.test_stat_sampler_mut();
    sampler.set_test_statistic(Arc::new(profll));
    sampler.set_seed(options.seed);
    sampler.set_generate_global_observables(options.global_observables);
    if !sb_model.pdf().can_be_extended() {
        sampler.set_n_events_per_toy(1);
    }

    tracing::info!(
        n_null = fc.n_toys_null(),
        n_alt = fc.n_toys_alt(),
        seed = options.seed,
        "running toys"
    );
    let frequentist = fc.get_hypo_test().context("frequentist calculator failed")?;
    write!(out, "{}", frequentist)?;

    let mut plot = HypoTestPlot::new(&frequentist);
    plot.set_log_y_axis(true);
    if let Some(n_bins) = options.plot_bins {
        plot.set_n_bins(n_bins);
    }
    let artifact = plot.artifact()?;

    Ok(HypoTestReport {
        data: data.name,
        poi_fit,
        asymptotic,
        frequentist: Some(frequentist),
        plot: Some(artifact),
    })
}

/// Unconditional fit of the S+B density on the dataset. Failures only warn.
fn fit_poi(data: &Dataset, sb_model: &ModelConfig) -> Option<PoiFit> {
    let pdf = sb_model.pdf();
    let fitted = pdf
        .main_from_observations(&data.observations)
        .and_then(|main| pdf.with_observed_main(&main))
        .and_then(|model| MaximumLikelihoodEstimator::new().fit(&model));
    match fitted {
        Ok(fit) => {
            let (value, uncertainty) = fit.value(sb_model.poi_index())?;
            let report = PoiFit {
                poi: sb_model.poi_name().to_string(),
                value,
                uncertainty,
                converged: fit.converged,
            };
            tracing::info!(
                poi = %report.poi,
                value = report.value,
                uncertainty = report.uncertainty,
                "best fit on '{}'",
                data.name
            );
            Some(report)
        }
        Err(e) => {
            tracing::warn!("best fit on '{}' failed: {}", data.name, e);
            None
        }
    }
}
