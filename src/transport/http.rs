//! Direct HTTP(S) exchange

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::Exchange;
use crate::error::{GatewayError, Result};

/// JSON-over-HTTP transport with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpExchange {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpExchange {
    /// Create a new exchange
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound for each request, connect included
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GatewayError::transport(None, format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client, timeout })
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn send_error(&self, endpoint: &str, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::transport(
                None,
                format!(
                    "Request to {} timed out after {}s",
                    endpoint,
                    self.timeout.as_secs()
                ),
            )
        } else {
            GatewayError::transport(
                err.status().map(|s| s.as_u16()),
                format!("Request to {} failed: {}", endpoint, err),
            )
        }
    }
}

#[async_trait]
impl Exchange for HttpExchange {
    async fn exchange(&self, endpoint: &str, payload: Option<&Value>) -> Result<Value> {
        let request = match payload {
            Some(body) => self
                .client
                .post(endpoint)
                .header("Content-Type", "application/json")
                .json(body),
            None => self.client.get(endpoint),
        };

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.send_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = status.as_u16(), "Upstream returned error status");
            return Err(GatewayError::transport(
                Some(status.as_u16()),
                format!("{} returned {}: {}", endpoint, status, body),
            )
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.send_error(endpoint, e))?;

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::InvalidDiscoveryDocument(format!(
                "Response from {} is not valid JSON: {}",
                endpoint, e
            ))
            .into()
        })
    }
}
