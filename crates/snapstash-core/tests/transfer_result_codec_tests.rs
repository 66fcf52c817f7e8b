//! Tests the serialized shape of transfer outcomes handed to UI bridges.

use snapstash_core::{FailureClass, PermissionState, TransferResult};

#[test]
fn transfer_result_codec_tests_tags_outcome() {
    let failure = TransferResult::Failure {
        reason: "network timeout".to_string(),
        class: FailureClass::Retriable,
    };

    let encoded = serde_json::to_value(&failure).expect("encoding should succeed");
    assert_eq!(encoded["outcome"], "failure");
    assert_eq!(encoded["class"], "retriable");
    assert_eq!(failure.failure_reason(), Some("network timeout"));
    assert!(!failure.is_success());
}

#[test]
fn transfer_result_codec_tests_success_has_no_reason() {
    let success = TransferResult::Success {
        location: "uploads/1_test.jpg".to_string(),
    };

    let encoded = serde_json::to_string(&success).expect("encoding should succeed");
    assert_eq!(
        encoded,
        r#"{"outcome":"success","location":"uploads/1_test.jpg"}"#
    );
    assert_eq!(success.failure_reason(), None);
}

#[test]
fn transfer_result_codec_tests_permission_state_is_snake_case() {
    let encoded =
        serde_json::to_string(&PermissionState::NotDetermined).expect("encoding should succeed");
    assert_eq!(encoded, r#""not_determined""#);
}
