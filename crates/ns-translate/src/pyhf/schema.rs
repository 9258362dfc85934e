//! Serde mirror of the pyhf workspace JSON.
//!
//! Two fields go beyond the published schema: a top-level `datasets` list of
//! extra named observations, and `extended` in a measurement config.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level workspace document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Regions with their samples
    pub channels: Vec<Channel>,
    /// Observed counts; exposed as the `obsData` dataset
    pub observations: Vec<Observation>,
    /// Named model configurations
    pub measurements: Vec<Measurement>,
    /// Extra datasets beyond `observations`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<NamedObservations>,
    /// Schema version string, if present
    #[serde(default)]
    pub version: Option<String>,
}

/// One region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Region name
    pub name: String,
    /// Contributing processes
    pub samples: Vec<Sample>,
}

/// One process within a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Process name
    pub name: String,
    /// Nominal expected counts per bin
    pub data: Vec<f64>,
    /// Variations applied to the nominal counts
    pub modifiers: Vec<Modifier>,
}

/// A variation of a sample, tagged by `type`.
///
/// Variants without a meaningful payload still accept (and keep) whatever
/// `data` the file carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Modifier {
    /// Unconstrained overall scale
    NormFactor {
        /// Parameter name
        name: String,
        /// Ignored payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Constrained overall scale with up/down factors
    NormSys {
        /// Nuisance parameter name
        name: String,
        /// Factors at ±1σ
        data: NormSysData,
    },
    /// Constrained shape variation with up/down templates
    HistoSys {
        /// Nuisance parameter name
        name: String,
        /// Templates at ±1σ
        data: HistoSysData,
    },
    /// Per-bin Poisson-constrained scale (Barlow-Beeston)
    ShapeSys {
        /// Parameter set name
        name: String,
        /// Absolute per-bin uncertainties
        data: Vec<f64>,
    },
    /// Unconstrained per-bin scale
    ShapeFactor {
        /// Parameter set name
        name: String,
        /// Ignored payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Per-bin Gaussian-constrained scale shared across samples
    StatError {
        /// Parameter set name
        name: String,
        /// Absolute per-bin uncertainties
        data: Vec<f64>,
    },
    /// Luminosity scale
    Lumi {
        /// Parameter name
        name: String,
        /// Ignored payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl Modifier {
    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NormFactor { .. } => "normfactor",
            Self::NormSys { .. } => "normsys",
            Self::HistoSys { .. } => "histosys",
            Self::ShapeSys { .. } => "shapesys",
            Self::ShapeFactor { .. } => "shapefactor",
            Self::StatError { .. } => "staterror",
            Self::Lumi { .. } => "lumi",
        }
    }
}

/// `normsys` payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormSysData {
    /// Factor at +1σ
    pub hi: f64,
    /// Factor at -1σ
    pub lo: f64,
}

/// `histosys` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoSysData {
    /// Template at +1σ
    pub hi_data: Vec<f64>,
    /// Template at -1σ
    pub lo_data: Vec<f64>,
}

/// Observed counts of one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Channel the counts belong to
    pub name: String,
    /// Counts per bin
    pub data: Vec<f64>,
}

/// An extra dataset from the `datasets` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedObservations {
    /// Dataset name
    pub name: String,
    /// Counts per channel
    pub observations: Vec<Observation>,
}

/// A named model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    /// Configuration name
    pub name: String,
    /// POI and parameter settings
    pub config: MeasurementConfig,
}

/// Body of a [`Measurement`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Parameter of interest
    pub poi: String,
    /// Per-parameter overrides
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    /// `false` makes the main-bin term shape-only (multinomial)
    #[serde(default = "extended_by_default", skip_serializing_if = "is_default_extended")]
    pub extended: bool,
}

fn extended_by_default() -> bool {
    true
}

fn is_default_extended(extended: &bool) -> bool {
    *extended
}

/// Overrides for one parameter or parameter set.
///
/// Single-element lists apply to every element of a per-bin set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Parameter (or parameter set) name
    pub name: String,
    /// Starting values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inits: Vec<f64>,
    /// `[lo, hi]` pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<[f64; 2]>,
    /// Held at its starting value in every fit
    #[serde(default)]
    pub fixed: bool,
    /// Constraint centers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auxdata: Vec<f64>,
    /// Constraint widths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sigmas: Vec<f64>,
}
