//! Fact Pod discovery and dynamic client registration
//!
//! [`OpenIdClient`] fetches a site's `.well-known/openprofile.json`,
//! validates the required endpoints, and registers OAuth clients against
//! the advertised registration endpoint. Registration and JWKS calls pick
//! their transport per call from the site's [`Protocol`].

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::transport::{Exchange, HttpExchange, McpExchange};

pub use types::{
    ClientRegistrationRequest, ClientRegistrationResponse, DiscoveryDocument, Jwk, Jwks, Protocol,
    REQUIRED_FIELDS,
};

/// Discovery and registration operations the orchestrator depends on
///
/// Implementations perform a single request per call; retries are the
/// caller's concern.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Fetch and validate the discovery document of `site`
    ///
    /// # Errors
    ///
    /// - `GatewayError::MissingDiscoveryFields` naming absent required fields
    /// - `GatewayError::InvalidDiscoveryDocument` for malformed JSON
    /// - `GatewayError::Transport` for non-2xx statuses and connection failures
    async fn get_config(&self, site: &str) -> Result<DiscoveryDocument>;

    /// Register an OAuth client at `registration_endpoint`
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` carrying the upstream status on
    /// non-2xx responses
    async fn register_client(
        &self,
        registration_endpoint: &str,
        redirect_uris: &[String],
        client_name: &str,
        protocol: Protocol,
    ) -> Result<ClientRegistrationResponse>;

    /// Fetch the site's signing keys
    async fn fetch_jwks(&self, jwks_uri: &str, protocol: Protocol) -> Result<Jwks>;
}

/// Base URL for a site: used as-is when it carries a scheme, otherwise HTTPS.
///
/// # Examples
///
/// ```
/// use factpod_gateway::discovery::site_base_url;
///
/// assert_eq!(site_base_url("pod.example"), "https://pod.example");
/// assert_eq!(site_base_url("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
/// ```
pub fn site_base_url(site: &str) -> String {
    if site.contains("://") {
        site.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", site.trim_end_matches('/'))
    }
}

/// HTTP-backed discovery client with an MCP route for sites that ask for it
#[derive(Debug, Clone)]
pub struct OpenIdClient {
    http: Arc<dyn Exchange>,
    mcp: Arc<dyn Exchange>,
    well_known_path: String,
    scope: String,
}

impl OpenIdClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpExchange::new(Duration::from_secs(config.discovery.timeout_seconds))?;
        let mcp = McpExchange::new(http.clone(), config.discovery.mcp_path.clone());
        Ok(Self::with_exchanges(
            Arc::new(http),
            Arc::new(mcp),
            config,
        ))
    }

    /// Build a client on explicit transports
    pub fn with_exchanges(
        http: Arc<dyn Exchange>,
        mcp: Arc<dyn Exchange>,
        config: &Config,
    ) -> Self {
        Self {
            http,
            mcp,
            well_known_path: config.discovery.well_known_path.clone(),
            scope: config.oauth.scope.clone(),
        }
    }

    /// Full URL of the discovery document for `site`.
    pub fn well_known_url(&self, site: &str) -> String {
        format!(
            "{}/{}",
            site_base_url(site),
            self.well_known_path.trim_start_matches('/')
        )
    }

    fn exchange_for(&self, protocol: Protocol) -> &dyn Exchange {
        match protocol {
            Protocol::Https => self.http.as_ref(),
            Protocol::Mcp => self.mcp.as_ref(),
        }
    }
}

#[async_trait]
impl DiscoveryClient for OpenIdClient {
    async fn get_config(&self, site: &str) -> Result<DiscoveryDocument> {
        let url = self.well_known_url(site);
        tracing::debug!(site, url = %url, "Fetching discovery document");

        let raw = self
            .http
            .exchange(&url, None)
            .await
            .with_context(|| format!("Discovery for {} failed", site))?;

        let document = DiscoveryDocument::from_value(raw)
            .with_context(|| format!("Discovery document from {} rejected", url))?;
        tracing::info!(
            site,
            issuer = %document.issuer,
            protocol = %document.protocol(),
            "Discovered fact pod"
        );
        Ok(document)
    }

    async fn register_client(
        &self,
        registration_endpoint: &str,
        redirect_uris: &[String],
        client_name: &str,
        protocol: Protocol,
    ) -> Result<ClientRegistrationResponse> {
        let request =
            ClientRegistrationRequest::new(client_name, redirect_uris.to_vec(), self.scope.clone());
        let body = serde_json::to_value(&request)?;

        tracing::debug!(
            endpoint = registration_endpoint,
            protocol = %protocol,
            "Registering OAuth client"
        );
        let response = self
            .exchange_for(protocol)
            .exchange(registration_endpoint, Some(&body))
            .await
            .with_context(|| format!("Client registration at {} failed", registration_endpoint))?;

        serde_json::from_value(response).map_err(|e| {
            GatewayError::InvalidDiscoveryDocument(format!(
                "Registration response from {} is malformed: {}",
                registration_endpoint, e
            ))
            .into()
        })
    }

    async fn fetch_jwks(&self, jwks_uri: &str, protocol: Protocol) -> Result<Jwks> {
        let response = self
            .exchange_for(protocol)
            .exchange(jwks_uri, None)
            .await
            .with_context(|| format!("Fetching JWKS from {} failed", jwks_uri))?;

        let jwks: Jwks = serde_json::from_value(response).map_err(|e| {
            GatewayError::InvalidDiscoveryDocument(format!(
                "JWKS from {} is malformed: {}",
                jwks_uri, e
            ))
        })?;
        tracing::debug!(jwks_uri, keys = jwks.keys.len(), "Fetched JWKS");
        Ok(jwks)
    }
}
