//! Tests for the domain error payload and its conversions.

use super::*;
use super::DomainError as Error;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn persist_error() -> Error {
    Error::persist_failed("profile store rejected the write")
        .with_details(json!({ "accountId": "u42" }))
}

#[rstest]
#[case(Error::provider_unavailable("down"), ErrorCode::ProviderUnavailable)]
#[case(Error::provisioning_failed("insert failed"), ErrorCode::ProvisioningFailed)]
#[case(Error::validation_failed("bad"), ErrorCode::ValidationFailed)]
#[case(Error::persist_failed("write failed"), ErrorCode::PersistFailed)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::unauthenticated("signed out"), ErrorCode::Unauthenticated)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::NotFound, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn serialises_with_snake_case_code(persist_error: Error) {
    let value = serde_json::to_value(&persist_error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "persist_failed",
            "message": "profile store rejected the write",
            "details": { "accountId": "u42" },
        })
    );
}

#[rstest]
fn omits_absent_details() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise error");
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let result: Result<Error, _> =
        serde_json::from_value(json!({ "code": "not_found", "message": " " }));
    assert!(result.is_err());
}

#[rstest]
fn profile_validation_errors_become_validation_failures() {
    let error = Error::from(ProfileValidationError::EmptyDisplayName);
    assert_eq!(error.code(), ErrorCode::ValidationFailed);
    assert_eq!(error.message(), "display name must not be empty");
    assert_eq!(
        error.details(),
        Some(&json!({ "field": "displayName", "code": "empty" }))
    );
}

#[rstest]
fn error_code_display_matches_wire_format() {
    for code in [
        ErrorCode::ProviderUnavailable,
        ErrorCode::ProvisioningFailed,
        ErrorCode::ValidationFailed,
        ErrorCode::PersistFailed,
        ErrorCode::NotFound,
        ErrorCode::Unauthenticated,
        ErrorCode::InternalError,
    ] {
        let encoded = serde_json::to_value(code).expect("serialise code");
        assert_eq!(encoded, json!(code.to_string()));
    }
}
