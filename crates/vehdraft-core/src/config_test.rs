use std::collections::HashMap;

use super::*;

fn config_with(overrides: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(API_BASE_URL.to_owned(), "https://api.example.test/v1".to_owned());
    for (key, value) in overrides {
        vars.insert((*key).to_owned(), (*value).to_owned());
    }
    build_app_config(|key| vars.get(key).cloned().ok_or(VarError::NotPresent))
}

fn rejected_var(result: Result<AppConfig, ConfigError>) -> String {
    match result {
        Err(ConfigError::InvalidEnvVar { var, .. }) => var,
        other => panic!("expected InvalidEnvVar, got {other:?}"),
    }
}

#[test]
fn environment_names() {
    let cases = [
        ("development", Environment::Development),
        ("dev", Environment::Development),
        ("test", Environment::Test),
        (" Production ", Environment::Production),
        ("prod", Environment::Production),
    ];
    for (raw, expected) in cases {
        assert_eq!(parse_environment(raw).unwrap(), expected, "input {raw:?}");
    }
}

#[test]
fn unknown_environment_is_rejected() {
    assert_eq!(rejected_var(config_with(&[(ENV, "producton")])), ENV);
}

#[test]
fn base_url_is_required() {
    let result = build_app_config(|_| Err(VarError::NotPresent));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == API_BASE_URL),
        "got {result:?}"
    );
}

#[test]
fn base_url_must_be_http() {
    let result = config_with(&[(API_BASE_URL, "ftp://api.example.test")]);
    assert_eq!(rejected_var(result), API_BASE_URL);
}

#[test]
fn defaults_apply_when_only_base_url_is_set() {
    let cfg = config_with(&[]).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.field_schema_path, PathBuf::from("./config/fields.yaml"));
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.field_sync_debounce_ms, 300);
    assert_eq!(cfg.autosave_interval_secs, 60);
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.retry_backoff_base_ms, 500);
}

#[test]
fn overrides_are_read() {
    let cfg = config_with(&[
        (LOG_LEVEL, "vehdraft_engine=debug"),
        (FIELD_SCHEMA_PATH, "/etc/vehdraft/fields.yaml"),
        (USER_AGENT, "custom-agent/2.0"),
        (FIELD_SYNC_DEBOUNCE_MS, "150"),
        (AUTOSAVE_INTERVAL_SECS, "120"),
        (MAX_RETRIES, " 0 "),
    ])
    .unwrap();
    assert_eq!(cfg.log_level, "vehdraft_engine=debug");
    assert_eq!(cfg.field_schema_path, PathBuf::from("/etc/vehdraft/fields.yaml"));
    assert_eq!(cfg.user_agent, "custom-agent/2.0");
    assert_eq!(cfg.field_sync_debounce_ms, 150);
    assert_eq!(cfg.autosave_interval_secs, 120);
    assert_eq!(cfg.max_retries, 0);
}

#[test]
fn malformed_numbers_name_their_variable() {
    for var in [FIELD_SYNC_DEBOUNCE_MS, REQUEST_TIMEOUT_SECS, MAX_RETRIES] {
        assert_eq!(rejected_var(config_with(&[(var, "-1")])), var);
    }
    assert_eq!(
        rejected_var(config_with(&[(RETRY_BACKOFF_BASE_MS, "soon")])),
        RETRY_BACKOFF_BASE_MS
    );
}

#[test]
fn zero_autosave_interval_is_rejected() {
    let result = config_with(&[(AUTOSAVE_INTERVAL_SECS, "0")]);
    assert_eq!(rejected_var(result), AUTOSAVE_INTERVAL_SECS);
}
