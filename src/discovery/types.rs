//! Discovery document, client registration and JWKS types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Fields a discovery document must carry to be usable.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "issuer",
    "authorization_endpoint",
    "token_endpoint",
    "registration_endpoint",
    "jwks_uri",
];

// ---------------------------------------------------------------------------
// Discovery document
// ---------------------------------------------------------------------------

/// A Fact Pod's published OAuth metadata (`.well-known/openprofile.json`).
///
/// Unknown fields are kept in [`extra`](Self::extra). Absent optional
/// fields take the defaults below, so a re-serialized document carries them.
///
/// # Examples
///
/// ```
/// use factpod_gateway::discovery::{DiscoveryDocument, Protocol};
///
/// let doc = DiscoveryDocument::from_value(serde_json::json!({
///     "issuer": "https://pod.example",
///     "authorization_endpoint": "https://pod.example/oauth/authorize",
///     "token_endpoint": "https://pod.example/oauth/token",
///     "registration_endpoint": "https://pod.example/openprofile/oauth/register",
///     "jwks_uri": "https://pod.example/openprofile/oauth/jwks",
///     "protocol": ["https", "mcp"]
/// })).unwrap();
///
/// assert_eq!(doc.protocol(), Protocol::Mcp);
/// assert_eq!(doc.response_types_supported, vec!["code".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    pub jwks_uri: String,

    #[serde(default)]
    pub scopes_supported: Vec<String>,

    #[serde(default = "default_response_types")]
    pub response_types_supported: Vec<String>,

    #[serde(default = "default_grant_types")]
    pub grant_types_supported: Vec<String>,

    #[serde(default = "default_auth_methods")]
    pub token_endpoint_auth_methods_supported: Vec<String>,

    #[serde(default = "default_subject_types")]
    pub subject_types_supported: Vec<String>,

    /// Transports the site accepts, e.g. `["https", "mcp"]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Vec<String>>,

    /// Fields this gateway does not interpret
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn default_response_types() -> Vec<String> {
    vec!["code".to_string()]
}

fn default_grant_types() -> Vec<String> {
    vec!["authorization_code".to_string(), "refresh_token".to_string()]
}

fn default_auth_methods() -> Vec<String> {
    vec![
        "client_secret_basic".to_string(),
        "client_secret_post".to_string(),
    ]
}

fn default_subject_types() -> Vec<String> {
    vec!["public".to_string()]
}

impl DiscoveryDocument {
    /// Validate and parse a raw discovery document
    ///
    /// Required fields are checked on the raw JSON first so that every
    /// missing field is reported at once, in sorted order. A field that is
    /// absent, `null` or an empty string counts as missing.
    ///
    /// # Errors
    ///
    /// - `GatewayError::MissingDiscoveryFields` naming the missing fields
    /// - `GatewayError::InvalidDiscoveryDocument` if the value is not an
    ///   object or a field has the wrong type
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(GatewayError::InvalidDiscoveryDocument(
                "discovery document is not a JSON object".to_string(),
            )
            .into());
        };

        let mut missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| match object.get(**field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            })
            .map(|field| field.to_string())
            .collect();

        if !missing.is_empty() {
            missing.sort();
            return Err(GatewayError::MissingDiscoveryFields(missing).into());
        }

        serde_json::from_value(value)
            .map_err(|e| GatewayError::InvalidDiscoveryDocument(e.to_string()).into())
    }

    /// Transport the site asks for.
    pub fn protocol(&self) -> Protocol {
        match &self.protocol {
            Some(list) if list.iter().any(|p| p == "mcp") => Protocol::Mcp,
            _ => Protocol::Https,
        }
    }
}

/// Transport used to reach a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Https,
    Mcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Https => f.write_str("https"),
            Protocol::Mcp => f.write_str("mcp"),
        }
    }
}

// ---------------------------------------------------------------------------
// Dynamic client registration
// ---------------------------------------------------------------------------

/// Body of a dynamic client registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistrationRequest {
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub scope: String,
}

impl ClientRegistrationRequest {
    /// Request for an authorization-code client using `client_secret_post`.
    pub fn new(
        client_name: impl Into<String>,
        redirect_uris: Vec<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            redirect_uris,
            grant_types: default_grant_types(),
            response_types: default_response_types(),
            token_endpoint_auth_method: "client_secret_post".to_string(),
            scope: scope.into(),
        }
    }
}

/// Credentials issued by a dynamic client registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub client_id_issued_at: Option<i64>,
    /// `0` means the secret does not expire
    #[serde(default)]
    pub client_secret_expires_at: i64,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

// ---------------------------------------------------------------------------
// JWKS
// ---------------------------------------------------------------------------

/// A single JSON Web Key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// RSA modulus, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent, base64url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// A JSON Web Key Set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}
