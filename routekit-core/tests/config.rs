use routekit_core::config::{ApiConfig, ConfigError};
use serial_test::serial;
use std::io::Write;

#[test]
#[serial]
fn load_reads_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "openapi:\n  title: Users API\n  version: 2.1.0\n  servers:\n    - https://api.example.com\npagination:\n  default_per_page: 10\n  max_per_page: 50\nstorage:\n  dialect: postgres"
    )
    .unwrap();

    let config = ApiConfig::load(file.path()).unwrap();
    assert_eq!(config.openapi.title, "Users API");
    assert_eq!(config.openapi.version, "2.1.0");
    assert_eq!(config.openapi.servers, vec!["https://api.example.com".to_string()]);
    assert_eq!(config.pagination.default_per_page, 10);
    assert_eq!(config.pagination.max_per_page, 50);
    assert_eq!(config.storage.dialect, "postgres");
}

#[test]
#[serial]
fn environment_overrides_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "pagination:\n  max_per_page: 50").unwrap();

    std::env::set_var("ROUTEKIT_PAGINATION_MAX_PER_PAGE", "75");
    let config = ApiConfig::load(file.path());
    std::env::remove_var("ROUTEKIT_PAGINATION_MAX_PER_PAGE");

    assert_eq!(config.unwrap().pagination.max_per_page, 75);
}

#[test]
#[serial]
fn missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ApiConfig::load(dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.pagination.default_per_page, 20);
    assert_eq!(config.openapi.title, "API");
}

#[test]
fn invalid_yaml_is_a_load_error() {
    let err = ApiConfig::from_yaml_str("openapi: [unclosed").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
