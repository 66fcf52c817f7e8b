//! Integration tests for log redaction.

use snapstash_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_obvious_secret_markers() {
    let raw = "authorization=Bearer abc123";
    let redacted = redact_sensitive(raw);

    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_strips_presigned_query_material() {
    let raw = "403 Forbidden: https://bucket.s3.amazonaws.com/k?X-Amz-Credential=AKIA123&X-Amz-Signature=deadbeef";
    let redacted = redact_sensitive(raw);

    assert!(redacted.starts_with("403 Forbidden: https://bucket.s3.amazonaws.com/k?"));
    assert!(!redacted.contains("AKIA123"));
    assert!(!redacted.contains("deadbeef"));
}

#[test]
fn log_redaction_tests_leaves_plain_reasons_alone() {
    assert_eq!(redact_sensitive("connection reset"), "connection reset");
}
