//! Configuration file loading.

use std::io::Write;

use deskpilot::config::{ConfigError, EngineConfig};

#[test]
fn test_load_full_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[engine]
name = "support-desk"
max_steps_per_turn = 6

[thresholds]
entity_confidence = 0.6
retrieval_top_k = 3
collaborator_timeout_ms = 2500

[evaluation]
sample_size = 25
dataset_path = "data/queries.json"
report_path = "out/report.json"
"#
    )
    .unwrap();

    let config = EngineConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.engine.name, "support-desk");
    assert_eq!(config.engine.max_steps_per_turn, 6);
    assert_eq!(config.thresholds.entity_confidence, 0.6);
    assert_eq!(config.thresholds.retrieval_top_k, 3);
    assert_eq!(config.thresholds.collaborator_timeout_ms, 2500);
    assert_eq!(config.evaluation.sample_size, Some(25));
    assert_eq!(config.evaluation.dataset_path.as_deref(), Some("data/queries.json"));
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = EngineConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_invalid_threshold_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[thresholds]
entity_confidence = 2.0
"#
    )
    .unwrap();

    let result = EngineConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_malformed_toml_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "this is not toml [[[").unwrap();

    let result = EngineConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = EngineConfig::load_from_file("/nonexistent/deskpilot.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
