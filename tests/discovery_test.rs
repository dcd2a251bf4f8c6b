//! Discovery and registration integration tests using wiremock
//!
//! Verifies the behaviour of `OpenIdClient`:
//!
//! - the discovery document is fetched from the well-known path and every
//!   required field is validated
//! - registration POSTs the fixed request body with JSON headers and
//!   surfaces the upstream status on failure
//! - sites that advertise `mcp` get registration routed through the MCP
//!   endpoint as a `tools/call`
//! - slow sites fail with a transport error instead of hanging

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use factpod_gateway::discovery::{DiscoveryClient, OpenIdClient, Protocol};
use factpod_gateway::{Config, GatewayError, ServiceError, ServiceErrorKind};

use common::{discovery_body, registration_body, REGISTER, WELL_KNOWN};

fn client(timeout_seconds: u64) -> OpenIdClient {
    let mut config = Config::default();
    config.discovery.timeout_seconds = timeout_seconds;
    OpenIdClient::new(&config).unwrap()
}

// ---------------------------------------------------------------------------
// get_config
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_config_fetches_well_known_document() {
    let server = MockServer::start().await;
    common::mount_discovery(&server, discovery_body(&server.uri()), 1).await;

    let doc = client(5).get_config(&server.uri()).await.unwrap();

    assert_eq!(doc.issuer, server.uri());
    assert_eq!(doc.registration_endpoint, format!("{}{}", server.uri(), REGISTER));
    assert_eq!(doc.protocol(), Protocol::Https);
}

#[tokio::test]
async fn test_get_config_missing_jwks_uri_is_configuration_error() {
    let server = MockServer::start().await;
    let mut body = discovery_body(&server.uri());
    body.as_object_mut().unwrap().remove("jwks_uri");
    common::mount_discovery(&server, body, 1).await;

    let err = client(5).get_config(&server.uri()).await.unwrap_err();

    let missing = err
        .chain()
        .find_map(|e| e.downcast_ref::<GatewayError>())
        .expect("error chain must carry a GatewayError");
    match missing {
        GatewayError::MissingDiscoveryFields(fields) => {
            assert_eq!(fields, &vec!["jwks_uri".to_string()]);
        }
        other => panic!("expected MissingDiscoveryFields, got {:?}", other),
    }

    let service = ServiceError::from_anyhow(err);
    assert_eq!(service.kind, ServiceErrorKind::Configuration);
    assert!(service.message.contains("jwks_uri"));
}

#[tokio::test]
async fn test_get_config_malformed_json_is_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client(5).get_config(&server.uri()).await.unwrap_err();
    assert_eq!(
        ServiceError::from_anyhow(err).kind,
        ServiceErrorKind::Configuration
    );
}

#[tokio::test]
async fn test_get_config_not_found_is_transport_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(5).get_config(&server.uri()).await.unwrap_err();
    let service = ServiceError::from_anyhow(err);
    assert_eq!(service.kind, ServiceErrorKind::Transport);
    assert_eq!(service.status, Some(404));
}

#[tokio::test]
async fn test_get_config_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(WELL_KNOWN))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(discovery_body(&server.uri()))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client(1).get_config(&server.uri()).await.unwrap_err();
    let service = ServiceError::from_anyhow(err);
    assert_eq!(service.kind, ServiceErrorKind::Transport);
    assert!(service.message.contains("timed out"));
}

// ---------------------------------------------------------------------------
// register_client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_register_client_posts_fixed_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REGISTER))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "application/json"))
        .and(body_json(json!({
            "client_name": "Gateway for pod.example",
            "redirect_uris": ["https://pod.example/oauth/callback"],
            "grant_types": ["authorization_code", "refresh_token"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "client_secret_post",
            "scope": "facts:read facts:make-irrelevant"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(registration_body()))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(5)
        .register_client(
            &format!("{}{}", server.uri(), REGISTER),
            &["https://pod.example/oauth/callback".to_string()],
            "Gateway for pod.example",
            Protocol::Https,
        )
        .await
        .unwrap();

    assert_eq!(response.client_id, "client-123");
    assert_eq!(response.client_secret, "secret-456");
    assert_eq!(response.client_id_issued_at, Some(1_700_000_000));
}

#[tokio::test]
async fn test_register_client_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REGISTER))
        .respond_with(ResponseTemplate::new(403).set_body_string("registration closed"))
        .mount(&server)
        .await;

    let err = client(5)
        .register_client(
            &format!("{}{}", server.uri(), REGISTER),
            &["https://pod.example/oauth/callback".to_string()],
            "Gateway for pod.example",
            Protocol::Https,
        )
        .await
        .unwrap_err();

    let service = ServiceError::from_anyhow(err);
    assert_eq!(service.kind, ServiceErrorKind::Transport);
    assert_eq!(service.status, Some(403));
    assert!(service.message.contains("registration closed"));
}

#[tokio::test]
async fn test_register_client_over_mcp_uses_tool_call() {
    let server = MockServer::start().await;

    // The direct endpoint must not be hit.
    Mock::given(method("POST"))
        .and(path(REGISTER))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("\"method\":\"tools/call\""))
        .and(body_string_contains("RegisterClientHandler"))
        .and(body_string_contains(REGISTER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "content": [{"type": "text", "text": registration_body().to_string()}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(5)
        .register_client(
            &format!("{}{}", server.uri(), REGISTER),
            &["https://pod.example/oauth/callback".to_string()],
            "Gateway for pod.example",
            Protocol::Mcp,
        )
        .await
        .unwrap();

    assert_eq!(response.client_id, "client-123");
}

// ---------------------------------------------------------------------------
// fetch_jwks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fetch_jwks_over_mcp_reads_structured_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_string_contains("JWKSHandler"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "content": [],
                "structuredContent": {
                    "keys": [{
                        "kty": "RSA",
                        "use": "sig",
                        "kid": "k1",
                        "alg": "RS256",
                        "n": "abc",
                        "e": "AQAB"
                    }]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let jwks = client(5)
        .fetch_jwks(&format!("{}/openprofile/oauth/jwks", server.uri()), Protocol::Mcp)
        .await
        .unwrap();

    assert_eq!(jwks.keys.len(), 1);
    assert_eq!(jwks.keys[0].kid.as_deref(), Some("k1"));
}
