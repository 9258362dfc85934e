//! ns-hypotest CLI

use anyhow::{Context, Result};
use clap::Parser;
use ns_hypotest::simple_hypotest::{self, DEFAULT_INFILE, Inputs, RunOptions};
use ns_translate::pyhf::{DEFAULT_MODEL_CONFIG, DEFAULT_WORKSPACE, OBSERVED_DATASET};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ns-hypotest")]
#[command(about = "Discovery hypothesis test: asymptotic formulae, then toy Monte Carlo")]
#[command(version)]
struct Cli {
    /// Workspace file (pyhf JSON or a container of named workspaces)
    #[arg(default_value = DEFAULT_INFILE)]
    infile: PathBuf,

    /// Workspace name inside the file
    #[arg(default_value = DEFAULT_WORKSPACE)]
    workspace: String,

    /// Model configuration (measurement) name
    #[arg(default_value = DEFAULT_MODEL_CONFIG)]
    model_config: String,

    /// Dataset name
    #[arg(default_value = OBSERVED_DATASET)]
    data: String,

    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,

    /// Toy seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Threads (0 = auto). Use 1 for deterministic parity.
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Toys under the null (B) hypothesis
    #[arg(long, default_value = "2000")]
    ntoys_null: usize,

    /// Toys under the alternate (S+B) hypothesis
    #[arg(long, default_value = "1000")]
    ntoys_alt: usize,

    /// Stop after the asymptotic result
    #[arg(long)]
    asymptotic_only: bool,

    /// Also fluctuate auxiliary measurements in every toy
    #[arg(long)]
    global_observables: bool,

    /// Silence the asymptotic calculator's log output
    #[arg(long)]
    quiet_asymptotic: bool,

    /// Write the test-statistic plot (SVG)
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Histogram bins of the plot
    #[arg(long)]
    plot_bins: Option<usize>,

    /// YAML overrides for the plot style
    #[arg(long)]
    viz_config: Option<PathBuf>,

    /// Output file for both results (pretty JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(version = ns_core::VERSION, infile = %cli.infile.display(), "ns-hypotest");

    if cli.threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(cli.threads).build_global();
    }

    let viz_yaml = cli
        .viz_config
        .as_ref()
        .map(|p| {
            std::fs::read_to_string(p)
                .with_context(|| format!("cannot read viz config {}", p.display()))
        })
        .transpose()?;
    let viz_config = ns_viz_render::resolve_config(viz_yaml.as_deref())?;

    let inputs = Inputs {
        infile: cli.infile,
        workspace: cli.workspace,
        model_config: cli.model_config,
        data: cli.data,
    };
    let options = RunOptions {
        n_toys_null: cli.ntoys_null,
        n_toys_alt: cli.ntoys_alt,
        seed: cli.seed,
        asymptotic_only: cli.asymptotic_only,
        quiet_asymptotic: cli.quiet_asymptotic,
        plot_bins: cli.plot_bins,
        global_observables: cli.global_observables,
    };

    let loaded = simple_hypotest::load(&inputs)?;
    let report = simple_hypotest::run(loaded, &options, &mut std::io::stdout().lock())?;

    if let Some(artifact) = &report.plot {
        let svg = ns_viz_render::plots::hypotest::render(artifact, &viz_config)?;
        match &cli.plot {
            Some(path) => {
                ns_viz_render::save_svg(&svg, path)
                    .with_context(|| format!("cannot write plot {}", path.display()))?;
                tracing::info!(path = %path.display(), "plot written");
            }
            None => tracing::debug!(bytes = svg.len(), "plot rendered, not written"),
        }
    }

    if let Some(path) = &cli.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    Ok(())
}
