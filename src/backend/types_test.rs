use super::*;

// =============================================================================
// Session / User serde
// =============================================================================

#[test]
fn session_deserializes_token_grant_response() {
    let json = r#"{
        "access_token": "at",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1700000000,
        "refresh_token": "rt",
        "user": {"id": "00000000-0000-0000-0000-000000000001", "email": "a@fleet.test", "aud": "authenticated"}
    }"#;
    let session: Session = serde_json::from_str(json).unwrap();
    assert_eq!(session.access_token, "at");
    assert_eq!(session.refresh_token.as_deref(), Some("rt"));
    assert_eq!(session.expires_at, Some(1_700_000_000));
    assert_eq!(session.user.email.as_deref(), Some("a@fleet.test"));
}

#[test]
fn session_optional_fields_default() {
    let json = r#"{"access_token": "at", "user": {"id": "00000000-0000-0000-0000-000000000002"}}"#;
    let session: Session = serde_json::from_str(json).unwrap();
    assert!(session.refresh_token.is_none());
    assert!(session.expires_at.is_none());
    assert!(session.user.email.is_none());
}

#[test]
fn profile_row_keeps_raw_role() {
    let json = r#"{"id": "00000000-0000-0000-0000-000000000003", "role": "floor-manager"}"#;
    let row: ProfileRow = serde_json::from_str(json).unwrap();
    assert_eq!(row.role, "floor-manager");
}

// =============================================================================
// BackendError
// =============================================================================

#[test]
fn backend_error_codes() {
    assert_eq!(BackendError::Request("x".into()).error_code(), "E_BACKEND_REQUEST");
    assert_eq!(BackendError::InvalidCredentials.error_code(), "E_INVALID_CREDENTIALS");
    assert_eq!(BackendError::Parse("x".into()).error_code(), "E_BACKEND_PARSE");
}

#[test]
fn backend_error_retryable_only_for_transient_failures() {
    assert!(BackendError::Request("timeout".into()).retryable());
    assert!(BackendError::Response { status: 503, body: String::new() }.retryable());
    assert!(BackendError::Response { status: 429, body: String::new() }.retryable());
    assert!(!BackendError::Response { status: 409, body: "duplicate key".into() }.retryable());
    assert!(!BackendError::InvalidCredentials.retryable());
}

#[test]
fn backend_error_response_display_includes_body() {
    let err = BackendError::Response { status: 422, body: "email exists".into() };
    let msg = err.to_string();
    assert!(msg.contains("422"));
    assert!(msg.contains("email exists"));
}
