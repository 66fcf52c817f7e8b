//! Integration tests for environment configuration and the kill switch.

use std::collections::HashMap;

use snapstash_app::{AppConfig, ConfigError, capture_enabled_from_value};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn config_tests_applies_defaults() {
    let config = AppConfig::from_lookup(lookup(&[
        ("SNAPSTASH_BUCKET_PATH", "bucket/path"),
        ("SNAPSTASH_DOCUMENT_URL", "https://docs.example.com/test.pdf"),
    ]))
    .expect("config should load");

    assert_eq!(
        config,
        AppConfig::new("bucket/path", "https://docs.example.com/test.pdf")
    );
    assert_eq!(config.artifact_name, "test");
    assert_eq!(config.download_suffix, "test.pdf");
    assert!(config.download_dir.is_none());
    assert!(config.capture_enabled);
}

#[test]
fn config_tests_reads_overrides() {
    let config = AppConfig::from_lookup(lookup(&[
        ("SNAPSTASH_BUCKET_PATH", " media/uploads "),
        ("SNAPSTASH_DOCUMENT_URL", "http://localhost:8080/doc.pdf"),
        ("SNAPSTASH_DOWNLOAD_DIR", "/var/tmp/docs"),
        ("SNAPSTASH_ARTIFACT_NAME", "receipt"),
        ("SNAPSTASH_DOWNLOAD_SUFFIX", "doc.pdf"),
        ("SNAPSTASH_CAPTURE_ENABLED", "OFF"),
    ]))
    .expect("config should load");

    assert_eq!(config.bucket_path, "media/uploads");
    assert_eq!(config.download_dir.as_deref(), Some("/var/tmp/docs"));
    assert_eq!(config.artifact_name, "receipt");
    assert_eq!(config.download_suffix, "doc.pdf");
    assert!(!config.capture_enabled);
}

#[test]
fn config_tests_rejects_missing_and_invalid_values() {
    assert_eq!(
        AppConfig::from_lookup(lookup(&[(
            "SNAPSTASH_DOCUMENT_URL",
            "https://docs.example.com/test.pdf"
        )])),
        Err(ConfigError::Missing("SNAPSTASH_BUCKET_PATH"))
    );
    assert_eq!(
        AppConfig::from_lookup(lookup(&[
            ("SNAPSTASH_BUCKET_PATH", "bucket"),
            ("SNAPSTASH_DOCUMENT_URL", "   "),
        ])),
        Err(ConfigError::Missing("SNAPSTASH_DOCUMENT_URL"))
    );
    assert!(matches!(
        AppConfig::from_lookup(lookup(&[
            ("SNAPSTASH_BUCKET_PATH", "bucket"),
            ("SNAPSTASH_DOCUMENT_URL", "ftp://docs.example.com/test.pdf"),
        ])),
        Err(ConfigError::Invalid {
            name: "SNAPSTASH_DOCUMENT_URL",
            ..
        })
    ));
    assert!(matches!(
        AppConfig::from_lookup(lookup(&[
            ("SNAPSTASH_BUCKET_PATH", "bucket"),
            ("SNAPSTASH_DOCUMENT_URL", "https://docs.example.com/test.pdf"),
            ("SNAPSTASH_ARTIFACT_NAME", "../escape"),
        ])),
        Err(ConfigError::Invalid {
            name: "SNAPSTASH_ARTIFACT_NAME",
            ..
        })
    ));
}

#[test]
fn config_tests_kill_switch_values() {
    assert!(capture_enabled_from_value(None));
    assert!(capture_enabled_from_value(Some("1")));
    assert!(capture_enabled_from_value(Some("yes")));
    assert!(!capture_enabled_from_value(Some("0")));
    assert!(!capture_enabled_from_value(Some(" False ")));
    assert!(!capture_enabled_from_value(Some("off")));
}
