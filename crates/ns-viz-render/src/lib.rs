//! # ns-viz-render
//!
//! SVG rendering of `ns-viz` artifacts. Styling comes from a [`VizConfig`],
//! built from a theme plus optional YAML overrides.

pub mod axis;
pub mod config;
pub mod font;
pub mod frame;
pub mod legend;
pub mod plots;
pub mod style;
pub mod svg;
pub mod theme;

pub use config::{VizConfig, resolve_config};

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown artifact kind: {0}")]
    UnknownKind(String),
    #[error("invalid artifact: {0}")]
    Artifact(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render a JSON artifact of the given `kind` to an SVG document.
pub fn render_svg(artifact_json: &str, kind: &str, config: &VizConfig) -> Result<String> {
    match kind {
        "hypotest" => plots::hypotest::render(&serde_json::from_str(artifact_json)?, config),
        other => Err(RenderError::UnknownKind(other.to_string())),
    }
}

/// Write `svg` to `path`, creating missing parent directories.
pub fn save_svg(svg: &str, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, svg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_inference::{HypoTestResult, SamplingDistribution};
    use ns_viz::HypoTestPlot;

    fn artifact_json() -> String {
        let null = SamplingDistribution::new("B Model", vec![0.0, 0.1, 0.4, 1.2], 0);
        let alt = SamplingDistribution::new("S+B Model", vec![0.8, 1.5, 2.5, 3.1], 0);
        let result = HypoTestResult::from_distributions("r", 1.0, null, alt, false);
        let mut plot = HypoTestPlot::new(&result);
        plot.set_log_y_axis(true);
        serde_json::to_string(&plot.artifact().unwrap()).unwrap()
    }

    #[test]
    fn renders_hypotest_artifacts() {
        let svg = render_svg(&artifact_json(), "hypotest", &VizConfig::default()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("S+B Model"));
    }

    #[test]
    fn rejects_unknown_kinds_and_bad_json() {
        let cfg = VizConfig::default();
        assert!(matches!(render_svg("{}", "pulls", &cfg), Err(RenderError::UnknownKind(_))));
        assert!(matches!(render_svg("{", "hypotest", &cfg), Err(RenderError::Artifact(_))));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("ns_viz_render_{}", std::process::id()));
        let path = dir.join("nested/plot.svg");
        save_svg("<svg/>", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
