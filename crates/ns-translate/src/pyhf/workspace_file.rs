//! Workspace files on disk.
//!
//! A file holds either a single pyhf workspace (registered as
//! [`DEFAULT_WORKSPACE`]) or a container of named workspaces:
//!
//! ```json
//! {"workspaces": [{"name": "combined", "workspace": { ... }}]}
//! ```

use super::model::HistFactoryModel;
use super::schema::{Measurement, Observation, Workspace};
use ns_core::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the dataset backed by the workspace's `observations` block.
pub const OBSERVED_DATASET: &str = "obsData";
/// Name a bare workspace is registered under.
pub const DEFAULT_WORKSPACE: &str = "combined";
/// Model-config name that resolves to the first measurement.
pub const DEFAULT_MODEL_CONFIG: &str = "ModelConfig";

/// A named set of per-channel observed counts.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    /// Dataset name
    pub name: String,
    /// Per-channel observations
    pub observations: Vec<Observation>,
}

impl Dataset {
    /// Total number of observed events across all channels.
    pub fn n_events(&self) -> f64 {
        self.observations.iter().flat_map(|o| o.data.iter()).sum()
    }
}

/// A workspace together with the name it is stored under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedWorkspace {
    /// Workspace name
    pub name: String,
    /// pyhf workspace
    pub workspace: Workspace,
}

impl NamedWorkspace {
    /// Look up a dataset by name.
    pub fn data(&self, name: &str) -> Option<Dataset> {
        if name == OBSERVED_DATASET {
            return Some(Dataset {
                name: name.to_string(),
                observations: self.workspace.observations.clone(),
            });
        }
        self.workspace
            .datasets
            .iter()
            .find(|d| d.name == name)
            .map(|d| Dataset { name: d.name.clone(), observations: d.observations.clone() })
    }

    /// Look up a measurement by model-config name.
    ///
    /// [`DEFAULT_MODEL_CONFIG`] resolves to the first measurement unless a
    /// measurement carries that exact name.
    pub fn measurement(&self, name: &str) -> Option<&Measurement> {
        let measurements = &self.workspace.measurements;
        measurements
            .iter()
            .find(|m| m.name == name)
            .or_else(|| if name == DEFAULT_MODEL_CONFIG { measurements.first() } else { None })
    }

    /// Build the probability model of the named model config.
    pub fn model(&self, name: &str) -> Result<HistFactoryModel> {
        let measurement =
            self.measurement(name).ok_or_else(|| ns_core::Error::not_found("model config", name))?;
        HistFactoryModel::from_workspace_with_measurement(&self.workspace, &measurement.name)
    }
}

#[derive(Deserialize)]
struct Container {
    workspaces: Vec<NamedWorkspace>,
}

/// A workspace file opened from disk.
#[derive(Debug, Clone)]
pub struct WorkspaceFile {
    path: PathBuf,
    workspaces: Vec<NamedWorkspace>,
}

impl WorkspaceFile {
    /// Open and parse a workspace file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ns_core::Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let workspaces = Self::parse(&text)?;
        log::debug!("opened {} ({} workspace(s))", path.display(), workspaces.len());
        Ok(Self { path: path.to_path_buf(), workspaces })
    }

    /// Parse workspace-file JSON that did not come from disk.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self { path: PathBuf::new(), workspaces: Self::parse(json)? })
    }

    fn parse(json: &str) -> Result<Vec<NamedWorkspace>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.get("workspaces").is_some() {
            let container: Container = serde_json::from_value(value)?;
            Ok(container.workspaces)
        } else {
            let workspace: Workspace = serde_json::from_value(value)?;
            Ok(vec![NamedWorkspace { name: DEFAULT_WORKSPACE.to_string(), workspace }])
        }
    }

    /// Path the file was opened from (empty for in-memory sources).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a workspace by name.
    pub fn workspace(&self, name: &str) -> Option<&NamedWorkspace> {
        self.workspaces.iter().find(|w| w.name == name)
    }

    /// Names of all workspaces in the file.
    pub fn workspace_names(&self) -> Vec<&str> {
        self.workspaces.iter().map(|w| w.name.as_str()).collect()
    }
}
