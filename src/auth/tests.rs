//! Tests for the auth module

use super::*;

fn build(auth: &Authenticator) -> reqwest::Request {
    let client = reqwest::Client::new();
    auth.apply(client.get("https://example.com/_search"))
        .build()
        .unwrap()
}

#[test]
fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let built = build(&auth);
    assert!(built.headers().get("Authorization").is_none());
}

#[test]
fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::basic("elastic", "changeme"));
    let built = build(&auth);

    // base64("elastic:changeme")
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Basic ZWxhc3RpYzpjaGFuZ2VtZQ=="
    );
}

#[test]
fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::bearer("tok-123"));
    let built = build(&auth);
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer tok-123"
    );
}

#[test]
fn test_api_key_defaults() {
    let auth = Authenticator::new(AuthConfig::api_key("aWQ6a2V5"));
    let built = build(&auth);
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "ApiKey aWQ6a2V5"
    );
}

#[test]
fn test_api_key_custom_header() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        header_name: Some("X-API-Key".to_string()),
        prefix: Some(String::new()),
        value: "secret".to_string(),
    });
    let built = build(&auth);
    assert_eq!(built.headers().get("X-API-Key").unwrap(), "secret");
    assert!(built.headers().get("Authorization").is_none());
}

#[test]
fn test_auth_config_from_yaml() {
    let yaml = r#"
type: basic
username: elastic
password: changeme
"#;
    let auth: AuthConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(auth, AuthConfig::basic("elastic", "changeme"));
    assert_eq!(auth.scheme(), "basic");

    let auth: AuthConfig = serde_yaml::from_str("type: none").unwrap();
    assert!(auth.is_none());
}

#[test]
fn test_debug_hides_secrets() {
    let auth = AuthConfig::basic("elastic", "hunter2");
    let rendered = format!("{auth:?}");
    assert!(rendered.contains("elastic"));
    assert!(!rendered.contains("hunter2"));

    let rendered = format!("{:?}", AuthConfig::bearer("tok-123"));
    assert!(!rendered.contains("tok-123"));
}
