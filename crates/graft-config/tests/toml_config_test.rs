//! File-based configuration loading

use graft_config::{ConfigError, ConfigLoader, GraftConfig, ListPredicate};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
[auth]
bind_predicate = "any"
forbidden_message = "Access denied"
roles_claim = "realm.roles"

[query]
root_variable = "root"
max_depth = 8
indent = 2
"#,
    );

    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.auth.bind_predicate, ListPredicate::Any);
    assert_eq!(config.auth.forbidden_message, "Access denied");
    assert_eq!(config.auth.roles_claim, "realm.roles");
    assert_eq!(config.query.root_variable, "root");
    assert_eq!(config.query.max_depth, 8);
    assert_eq!(config.query.indent, 2);
}

#[test]
fn test_load_empty_file_gives_defaults() {
    let file = write_temp(".toml", "");
    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config, GraftConfig::default());
}

#[test]
fn test_load_json_file() {
    let file = write_temp(".json", r#"{"query": {"max_depth": 4}}"#);
    let config = ConfigLoader::load_from_file(file.path()).unwrap();
    assert_eq!(config.query.max_depth, 4);
    assert_eq!(config.auth.forbidden_message, "Forbidden");
}

#[test]
fn test_missing_file_is_io_error() {
    let result = ConfigLoader::load_from_file("/nonexistent/graft.toml");
    match result {
        Err(ConfigError::Io { path, .. }) => assert!(path.ends_with("graft.toml")),
        other => panic!("expected Io error, got {other:?}"),
    }
}
