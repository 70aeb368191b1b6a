use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = BackendConfig::from_lookup(lookup(&[]));
    assert!(cfg.url.is_none());
    assert!(cfg.anon_key.is_none());
    assert!(cfg.service_role_key.is_none());
    assert_eq!(cfg.metrics_rpc, DEFAULT_METRICS_RPC_NAME);
    assert_eq!(
        cfg.timeouts,
        BackendTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn from_lookup_trims_url_and_parses_overrides() {
    let cfg = BackendConfig::from_lookup(lookup(&[
        ("BACKEND_URL", "https://project.example.test/"),
        ("BACKEND_ANON_KEY", "anon"),
        ("METRICS_RPC_NAME", "fleet_stats"),
        ("BACKEND_REQUEST_TIMEOUT_SECS", "5"),
        ("BACKEND_CONNECT_TIMEOUT_SECS", "2"),
    ]));
    assert_eq!(cfg.url.as_deref(), Some("https://project.example.test"));
    assert_eq!(cfg.metrics_rpc, "fleet_stats");
    assert_eq!(cfg.timeouts, BackendTimeouts { request_secs: 5, connect_secs: 2 });
}

#[test]
fn from_lookup_bad_timeout_falls_back_to_default() {
    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_REQUEST_TIMEOUT_SECS", "soon")]));
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn blank_values_count_as_missing() {
    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "   "), ("BACKEND_ANON_KEY", "")]));
    assert!(cfg.url.is_none());
    assert!(cfg.anon_key.is_none());
}

#[test]
fn public_credentials_require_url_and_anon_key() {
    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_ANON_KEY", "anon")]));
    assert_eq!(cfg.public_credentials(), Err(ConfigError::Missing { var: URL_VAR }));

    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "https://p.test")]));
    assert_eq!(cfg.public_credentials(), Err(ConfigError::Missing { var: ANON_KEY_VAR }));

    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "https://p.test"), ("BACKEND_ANON_KEY", "anon")]));
    let creds = cfg.public_credentials().unwrap();
    assert_eq!(creds.url, "https://p.test");
    assert_eq!(creds.anon_key, "anon");
}

#[test]
fn admin_credentials_need_service_key_not_anon_key() {
    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "https://p.test"), ("BACKEND_ANON_KEY", "anon")]));
    assert_eq!(cfg.admin_credentials(), Err(ConfigError::Missing { var: SERVICE_ROLE_KEY_VAR }));

    let cfg = BackendConfig::from_lookup(lookup(&[("BACKEND_SERVICE_ROLE_KEY", "svc")]));
    assert_eq!(cfg.admin_credentials(), Err(ConfigError::Missing { var: URL_VAR }));

    let cfg =
        BackendConfig::from_lookup(lookup(&[("BACKEND_URL", "https://p.test"), ("BACKEND_SERVICE_ROLE_KEY", "svc")]));
    assert_eq!(cfg.admin_credentials().unwrap().service_role_key, "svc");
}

#[test]
fn config_error_display_names_variable() {
    let err = ConfigError::Missing { var: SERVICE_ROLE_KEY_VAR };
    assert!(err.to_string().contains("BACKEND_SERVICE_ROLE_KEY"));
    assert_eq!(err.error_code(), "E_CONFIG");
    assert!(!err.retryable());
}
