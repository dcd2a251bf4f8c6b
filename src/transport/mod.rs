//! Request/response transports for talking to Fact Pod sites
//!
//! Every call the discovery client makes goes through the single
//! [`Exchange`] capability. Two implementations exist:
//!
//! - [`http::HttpExchange`] -- plain JSON over HTTP(S) with a bounded timeout.
//! - [`mcp::McpExchange`] -- the same request wrapped in a JSON-RPC
//!   `tools/call` and posted to the site's MCP endpoint.
//!
//! Which one is used is decided per call from the site's advertised
//! protocol list; request and response shapes are identical either way.

pub mod http;
pub mod mcp;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use http::HttpExchange;
pub use mcp::McpExchange;

/// A single JSON request/response round trip against an endpoint.
///
/// `payload == None` issues a read (HTTP GET); `Some` sends the JSON body
/// (HTTP POST).
///
/// # Errors
///
/// - `GatewayError::Transport` for connection failures, timeouts and
///   non-2xx statuses (the status is carried when one was received).
/// - `GatewayError::InvalidDiscoveryDocument` when the body is not JSON.
#[async_trait]
pub trait Exchange: Send + Sync + std::fmt::Debug {
    async fn exchange(&self, endpoint: &str, payload: Option<&Value>) -> Result<Value>;
}
