use std::{collections::HashMap, time::Duration};

use utafm::{
    config::{Config, DEFAULT_API_URL, DEFAULT_AUTH_URL},
    error::ConfigError,
};

fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = config_from(&[("FMKEY", "key"), ("FMSECRET", "secret")]).unwrap();

    assert_eq!(config.api_key, "key");
    assert_eq!(config.api_secret, "secret");
    assert_eq!(config.api_url, DEFAULT_API_URL);
    assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
    assert_eq!(config.callback_url, None);
    assert_eq!(config.port, 3001);
    assert_eq!(config.max_alt_accounts, 2);
    assert_eq!(config.link_expiry, Duration::from_secs(300));
    assert_eq!(config.poll_interval, Duration::from_secs(3));
    assert_eq!(config.cache_max_entries, 5000);
    assert_eq!(config.cache_ttls.recent, Duration::from_secs(60));
    assert_eq!(config.cache_ttls.top, Duration::from_secs(1800));
    assert_eq!(config.cache_ttls.metadata, Duration::from_secs(3600));
    assert_eq!(config.cache_ttls.default, Duration::from_secs(300));
    assert!(config.users_file.ends_with("users.json"));
}

#[test]
fn test_missing_credentials() {
    assert_eq!(
        config_from(&[("FMSECRET", "secret")]).unwrap_err(),
        ConfigError::Missing("FMKEY")
    );
    assert_eq!(
        config_from(&[("FMKEY", "key"), ("FMSECRET", "  ")]).unwrap_err(),
        ConfigError::Missing("FMSECRET")
    );
}

#[test]
fn test_overrides() {
    let config = config_from(&[
        ("FMKEY", "key"),
        ("FMSECRET", "secret"),
        ("OAUTH_CALLBACK_URL", "https://bot.example/callback"),
        ("OAUTH_HOST", "127.0.0.1"),
        ("OAUTH_PORT", "8080"),
        ("MAX_ALT_ACCOUNTS", "5"),
        ("CACHE_TTL_RECENT_SECS", "30"),
        ("UTAFM_USERS_FILE", "/tmp/utafm-users.json"),
    ])
    .unwrap();

    assert_eq!(
        config.callback_url.as_deref(),
        Some("https://bot.example/callback")
    );
    assert_eq!(config.max_alt_accounts, 5);
    assert_eq!(config.cache_ttls.recent, Duration::from_secs(30));
    assert_eq!(
        config.server_addr().unwrap(),
        "127.0.0.1:8080".parse().unwrap()
    );
    assert_eq!(
        config.users_file,
        std::path::PathBuf::from("/tmp/utafm-users.json")
    );
}

#[test]
fn test_invalid_number() {
    let err = config_from(&[("FMKEY", "key"), ("FMSECRET", "secret"), ("OAUTH_PORT", "http")])
        .unwrap_err();

    assert_eq!(
        err,
        ConfigError::Invalid {
            var: "OAUTH_PORT",
            value: "http".to_string()
        }
    );
}

#[test]
fn test_ipv6_host() {
    let config = config_from(&[("FMKEY", "key"), ("FMSECRET", "secret"), ("OAUTH_HOST", "::1")])
        .unwrap();

    assert_eq!(config.server_addr().unwrap(), "[::1]:3001".parse().unwrap());
}
