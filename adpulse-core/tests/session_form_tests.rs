//! Integration tests for the session form of credentials and row schemas.

use adpulse_core::{
    AuthError, Credential, ReportError, ReportQuery, DateRange, ScopeValidator, StoredCredential,
    normalize_account_id,
};

#[test]
fn test_session_json_parses_into_credential() {
    let json = r#"{
        "token": "ya29.access",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "secret",
        "scopes": [
            "https://www.googleapis.com/auth/analytics.readonly",
            "https://www.googleapis.com/auth/adwords"
        ]
    }"#;

    let stored: StoredCredential = serde_json::from_str(json).unwrap();
    let creds = Credential::try_from(stored).unwrap();

    assert_eq!(creds.access_token(), "ya29.access");
    assert_eq!(creds.token_endpoint().host_str(), Some("oauth2.googleapis.com"));
    assert!(ScopeValidator::reporting().validate(&creds).is_ok());
}

#[test]
fn test_session_json_without_token_is_auth_error() {
    let json = r#"{"token_uri": "https://oauth2.googleapis.com/token", "scopes": ["x"]}"#;
    let stored: StoredCredential = serde_json::from_str(json).unwrap();

    let err = Credential::try_from(stored).unwrap_err();
    assert_eq!(err, ReportError::Auth(AuthError::MissingToken));
    assert!(err.requires_reauthorization());
}

#[test]
fn test_query_account_matches_normalizer() {
    let raw = " '123-456-7890' ";
    let query = ReportQuery::campaign_performance(raw, DateRange::last_days(30)).unwrap();
    assert_eq!(query.account_id.as_str(), normalize_account_id(raw));
}
