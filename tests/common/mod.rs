use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use factpod_gateway::{Config, FactPodOAuthService, OpenIdClient, SledRepository};

pub const WELL_KNOWN: &str = "/.well-known/openprofile.json";
pub const REGISTER: &str = "/openprofile/oauth/register";
pub const JWKS: &str = "/openprofile/oauth/jwks";

/// Discovery document whose endpoints all live on `base_url`.
#[allow(dead_code)]
pub fn discovery_body(base_url: &str) -> Value {
    json!({
        "issuer": base_url,
        "authorization_endpoint": format!("{}/oauth/authorize", base_url),
        "token_endpoint": format!("{}/oauth/token", base_url),
        "registration_endpoint": format!("{}{}", base_url, REGISTER),
        "jwks_uri": format!("{}{}", base_url, JWKS),
        "scopes_supported": ["facts:read", "facts:make-irrelevant"]
    })
}

#[allow(dead_code)]
pub fn registration_body() -> Value {
    json!({
        "client_id": "client-123",
        "client_secret": "secret-456",
        "client_id_issued_at": 1_700_000_000,
        "client_secret_expires_at": 0,
        "client_name": "Gateway for pod",
        "redirect_uris": ["https://gateway.test/callback"],
        "grant_types": ["authorization_code", "refresh_token"],
        "response_types": ["code"],
        "token_endpoint_auth_method": "client_secret_post",
        "scope": "facts:read facts:make-irrelevant"
    })
}

/// Config with its database inside `dir` and a short discovery timeout.
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.path = Some(dir.path().join("factpod.sled"));
    config.oauth.redirect_template = "https://gateway.test/callback?site={site}".to_string();
    config.discovery.timeout_seconds = 2;
    config
}

/// Service wired to a real sled repository and HTTP discovery client.
#[allow(dead_code)]
pub fn build_service(config: &Config) -> (FactPodOAuthService, Arc<SledRepository>) {
    let repository = Arc::new(SledRepository::open(config).expect("failed to open repository"));
    let discovery = Arc::new(OpenIdClient::new(config).expect("failed to build discovery client"));
    let service = FactPodOAuthService::new(repository.clone(), discovery, config.clone());
    (service, repository)
}

#[allow(dead_code)]
pub async fn mount_discovery(server: &MockServer, body: Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub async fn mount_registration(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(REGISTER))
        .respond_with(ResponseTemplate::new(201).set_body_json(registration_body()))
        .expect(expected_calls)
        .mount(server)
        .await;
}
