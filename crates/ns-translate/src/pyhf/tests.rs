//! Tests for pyhf parser and workspace files

use super::*;
use ns_core::traits::LogDensityModel;

fn fixture_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

#[test]
fn test_parse_simple_workspace() {
    let json = include_str!("../../../../tests/fixtures/simple_workspace.json");
    let ws: Workspace = serde_json::from_str(json).expect("Failed to parse simple_workspace.json");

    assert_eq!(ws.channels.len(), 1);
    assert_eq!(ws.channels[0].name, "singlechannel");
    assert_eq!(ws.channels[0].samples.len(), 2);

    let signal = &ws.channels[0].samples[0];
    assert_eq!(signal.name, "signal");
    assert_eq!(signal.data, vec![5.0, 10.0]);

    assert_eq!(ws.observations[0].data, vec![53.0, 65.0]);
    assert_eq!(ws.measurements[0].name, "GaussExample");
    assert_eq!(ws.measurements[0].config.poi, "mu");
    assert!(ws.measurements[0].config.extended);
    assert_eq!(ws.datasets.len(), 1);
}

#[test]
fn test_parse_all_modifier_types() {
    let json = include_str!("../../../../tests/fixtures/complex_workspace.json");
    let ws: Workspace = serde_json::from_str(json).unwrap();

    let found: std::collections::HashSet<&str> = ws
        .channels
        .iter()
        .flat_map(|c| c.samples.iter())
        .flat_map(|s| s.modifiers.iter())
        .map(Modifier::kind)
        .collect();

    for kind in ["normfactor", "lumi", "normsys", "histosys", "staterror", "shapefactor"] {
        assert!(found.contains(kind), "missing modifier type {kind}");
    }
}

#[test]
fn test_complex_model_parameters_and_channel_order() {
    let json = include_str!("../../../../tests/fixtures/complex_workspace.json");
    let ws: Workspace = serde_json::from_str(json).unwrap();
    let model = HistFactoryModel::from_workspace(&ws).unwrap();

    // mu, lumi, ttbar_norm, bkg_shape, staterror_SR[0..2], shapefactor_CR[0..2]
    assert_eq!(model.n_params(), 8);
    assert_eq!(model.channel_names(), vec!["CR", "SR"]);
    assert_eq!(model.observed_main(), vec![103.0, 88.0, 47.0, 41.0]);

    let names = model.parameter_names();
    let lumi = names.iter().position(|n| n == "lumi").unwrap();
    let p = &model.parameters()[lumi];
    assert_eq!(p.bounds, (0.9, 1.1));
    assert_eq!(p.constraint.map(|c| c.width), Some(0.02));

    let nll = model.nll(&model.parameter_init()).unwrap();
    assert!(nll.is_finite());
}

#[test]
fn test_parameter_fixed_is_applied_as_bounds_clamp() {
    let json = include_str!("../../../../tests/fixtures/shape_only_workspace.json");
    let ws: Workspace = serde_json::from_str(json).unwrap();
    let model = HistFactoryModel::from_workspace(&ws).unwrap();

    let names = model.parameter_names();
    let idx = names.iter().position(|n| n == "bkg_norm").expect("bkg_norm param exists");
    assert_eq!(model.parameter_bounds()[idx], (1.0, 1.0));
}

#[test]
fn test_observation_length_mismatch_is_rejected() {
    let json = include_str!("../../../../tests/fixtures/simple_workspace.json");
    let mut ws: Workspace = serde_json::from_str(json).unwrap();
    ws.observations[0].data.push(1.0);

    let msg = HistFactoryModel::from_workspace(&ws).unwrap_err().to_string().to_lowercase();
    assert!(msg.contains("3 observed bins, expected 2"), "unexpected error: {msg}");
}

#[test]
fn test_open_bare_workspace_registers_default_name() {
    let file = WorkspaceFile::open(fixture_path("simple_workspace.json")).unwrap();
    assert_eq!(file.workspace_names(), vec![DEFAULT_WORKSPACE]);
    assert!(file.path().ends_with("simple_workspace.json"));

    let ws = file.workspace(DEFAULT_WORKSPACE).unwrap();
    let obs = ws.data(OBSERVED_DATASET).unwrap();
    assert_eq!(obs.n_events(), 118.0);

    let extra = ws.data("bkgOnlyData").unwrap();
    assert_eq!(extra.observations[0].data, vec![50.0, 60.0]);
    assert!(ws.data("missing").is_none());
}

#[test]
fn test_open_missing_file_is_file_not_found() {
    let err = WorkspaceFile::open(fixture_path("does_not_exist.json")).unwrap_err();
    assert!(matches!(err, ns_core::Error::FileNotFound(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let err = WorkspaceFile::from_json_str("{\"channels\": [").unwrap_err();
    assert!(matches!(err, ns_core::Error::Json(_)));
}

#[test]
fn test_container_file_lookup() {
    let file = WorkspaceFile::open(fixture_path("container_workspace.json")).unwrap();
    assert_eq!(file.workspace_names(), vec!["combined", "control"]);
    assert!(file.workspace("nope").is_none());

    let ws = file.workspace("combined").unwrap();
    assert_eq!(ws.measurement(DEFAULT_MODEL_CONFIG).unwrap().name, "NormalMeasurement");

    let wide = ws.model("WideMeasurement").unwrap();
    assert_eq!(wide.parameter_bounds()[0], (0.0, 50.0));

    let err = ws.model("NoSuchConfig").unwrap_err();
    assert_eq!(err.to_string(), "model config 'NoSuchConfig' not found");
}

#[test]
fn test_datasets_extension_roundtrips() {
    let json = include_str!("../../../../tests/fixtures/simple_workspace.json");
    let ws: Workspace = serde_json::from_str(json).unwrap();
    let back: Workspace = serde_json::from_str(&serde_json::to_string(&ws).unwrap()).unwrap();
    assert_eq!(back.datasets.len(), 1);
    assert_eq!(back.datasets[0].name, "bkgOnlyData");
}

#[test]
fn test_main_from_observations_follows_channel_order() {
    let json = include_str!("../../../../tests/fixtures/complex_workspace.json");
    let ws: Workspace = serde_json::from_str(json).unwrap();
    let model = HistFactoryModel::from_workspace(&ws).unwrap();

    let main = model.main_from_observations(&ws.observations).unwrap();
    assert_eq!(main, model.observed_main());

    let partial = vec![ws.observations[0].clone()];
    assert!(model.main_from_observations(&partial).is_err());
}
