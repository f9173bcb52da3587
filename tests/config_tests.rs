// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use std::time::Duration;
use tryon::Config;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(
        config.dispatch.offload_enabled,
        "Offload should be enabled by default"
    );
    assert_eq!(config.cache.ttl(), Duration::from_secs(300));
}

#[test]
fn test_partial_config_fills_defaults() {
    // Only one field set, everything else comes from Default
    let config: Config = serde_json::from_str(r#"{"cache": {"ttl_secs": 60}}"#).unwrap();

    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.cache.low_res_max_dimension, 64);
    assert!(config.cache.cdn_rewrite);
    assert_eq!(config.dispatch, Config::default().dispatch);
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.dispatch.offload_enabled = false;
    config.cache.low_res_quality = 55;
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_malformed_config_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}
