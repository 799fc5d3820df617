//! Config Validation Tests
//!
//! Typo detection and range validation for `estimator.toml`, exercised
//! through the public config API and real files on disk.

use project_estimator::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use project_estimator::config::{AppConfig, ConfigError};
use std::io::Write;

// ============================================================================
// Typo detection
// ============================================================================

#[test]
fn typo_in_estimation_section_warns_with_suggestion() {
    let toml_str = r#"
[estimation]
top_kk = 4
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("top_kk"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("estimation.top_k"));
}

#[test]
fn typo_in_auth_section_warns() {
    let toml_str = r#"
[auth]
token_ttl_dyas = 7
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("auth.token_ttl_days"));
    assert!(warnings[0].to_string().contains("did you mean 'auth.token_ttl_days'"));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[server]
addr = "127.0.0.1:8080"
cors_origins = ["http://localhost:5173"]

[database]
max_connections = 5

[auth]
cookie_secure = true

[llm]
generation_model = "gemini-1.5-flash"
temperature = 0.4

[estimation]
top_k = 5
output_language = "English"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let warnings = validate_unknown_keys("[telemetry]\nendpoint = \"x\"\n");
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn suggestion_ignores_distant_keys() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("server.adr", &known).as_deref(), Some("server.addr"));
    assert!(suggest_correction("completely.different.key", &known).is_none());
}

// ============================================================================
// Loading and range validation
// ============================================================================

#[test]
fn load_from_file_applies_values_and_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[estimation]
top_k = 4
output_language = "English"

[auth]
max_login_failures = 3
"#
    )
    .unwrap();

    let config = AppConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.estimation.top_k, 4);
    assert_eq!(config.estimation.output_language, "English");
    assert_eq!(config.auth.max_login_failures, 3);
    // Untouched sections keep their defaults
    assert_eq!(config.server.addr, "0.0.0.0:3000");
    assert_eq!(config.auth.token_ttl_days, 30);
}

#[test]
fn load_from_file_reports_path_on_syntax_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server\naddr = ").unwrap();

    match AppConfig::load_from_file(file.path()) {
        Err(ConfigError::Parse(path, _)) => assert_eq!(path, file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = AppConfig::load_from_file(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_, _))));
}

#[test]
fn out_of_range_values_are_all_reported() {
    let toml_str = r#"
[server]
addr = "not-an-address"

[llm]
temperature = 3.5

[estimation]
top_k = 0
"#;
    match AppConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3, "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("server.addr")));
            assert!(errors.iter().any(|e| e.contains("llm.temperature")));
            assert!(errors.iter().any(|e| e.contains("estimation.top_k")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn serialized_defaults_load_back() {
    let toml_str = AppConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&toml_str).is_empty());
    let config = AppConfig::from_toml_str(&toml_str).unwrap();
    assert_eq!(config.estimation.top_k, 3);
}

#[test]
fn environment_overrides_secrets() {
    let mut config = AppConfig::default();
    assert!(config.require_secrets().is_err());

    config.apply_env_with(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/estimator".to_string()),
        "JWT_SECRET" => Some("s3cret".to_string()),
        "GEMINI_API_KEY" => Some("key".to_string()),
        "CORS_ORIGINS" => Some("http://a.test, ,http://b.test".to_string()),
        _ => None,
    });

    assert!(config.require_secrets().is_ok());
    assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
}
