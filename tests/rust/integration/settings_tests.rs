use std::io::Write;

use ormgraph::config::{self, ConfigError};
use ormgraph::OrmSettings;
use serial_test::serial;
use tempfile::NamedTempFile;

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_settings_from_yaml_file() {
    let file = yaml_file("case_insensitive: true\nin_batch_size: 250\n");
    let settings = OrmSettings::from_yaml_file(file.path()).unwrap();
    assert!(settings.case_insensitive);
    assert!(!settings.strict_column_mapping);
    assert_eq!(settings.in_batch_size, 250);
}

#[test]
fn test_yaml_batch_size_out_of_range() {
    let file = yaml_file("in_batch_size: 0\n");
    let err = OrmSettings::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_malformed_yaml() {
    let file = yaml_file("in_batch_size: [1, 2\n");
    let err = OrmSettings::from_yaml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "yaml_content"));
}

#[test]
fn test_missing_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = OrmSettings::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "yaml_file"));
}

#[test]
#[serial]
fn test_settings_from_env() {
    std::env::set_var("ORMGRAPH_STRICT_COLUMN_MAPPING", "true");
    std::env::set_var("ORMGRAPH_IN_BATCH_SIZE", "50");
    let settings = OrmSettings::from_env();
    std::env::remove_var("ORMGRAPH_STRICT_COLUMN_MAPPING");
    std::env::remove_var("ORMGRAPH_IN_BATCH_SIZE");

    let settings = settings.unwrap();
    assert!(settings.strict_column_mapping);
    assert_eq!(settings.in_batch_size, 50);
}

#[test]
#[serial]
fn test_unparsable_env_value() {
    std::env::set_var("ORMGRAPH_IN_BATCH_SIZE", "lots");
    let err = OrmSettings::from_env().unwrap_err();
    std::env::remove_var("ORMGRAPH_IN_BATCH_SIZE");
    assert!(matches!(err, ConfigError::Parse { ref field, .. } if field == "ORMGRAPH_IN_BATCH_SIZE"));
}

#[test]
#[serial]
fn test_applied_settings_are_visible_until_guard_drops() {
    let before = config::current();
    let guard = OrmSettings {
        in_batch_size: 7,
        ..Default::default()
    }
    .apply()
    .unwrap();
    assert_eq!(config::current().in_batch_size, 7);
    drop(guard);
    assert_eq!(config::current(), before);
}

#[test]
#[serial]
fn test_param_name_filter_round_trip() {
    config::set_param_name_filter(|name| name.trim_start_matches('@').to_lowercase());
    assert_eq!(config::param_name("@UserName"), "username");
    config::clear_param_name_filter();
    assert_eq!(config::param_name("@UserName"), "@UserName");
}
