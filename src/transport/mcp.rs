//! MCP exchange: path-based tool invocation over JSON-RPC
//!
//! A request for `https://pod.example/openprofile/oauth/register` becomes a
//! `tools/call` for `RegisterClientHandler` posted to
//! `https://pod.example{mcp_path}`. The payload fields travel as tool
//! arguments next to the original `path`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::{Exchange, HttpExchange};
use crate::error::{GatewayError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: CallToolParams,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Result of a `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

/// One content item of a tool result; only text is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Maps an endpoint path to the tool that serves it.
///
/// Known OpenProfile OAuth paths map to their handlers; anything else uses
/// the last non-empty path segment.
///
/// # Examples
///
/// ```
/// use factpod_gateway::transport::mcp::tool_name_for_path;
///
/// assert_eq!(tool_name_for_path("/openprofile/oauth/register"), "RegisterClientHandler");
/// assert_eq!(tool_name_for_path("/openprofile/oauth/jwks"), "JWKSHandler");
/// assert_eq!(tool_name_for_path("/custom/thing/"), "thing");
/// ```
pub fn tool_name_for_path(path: &str) -> String {
    match path.trim_end_matches('/') {
        "/openprofile/oauth/register" => "RegisterClientHandler".to_string(),
        "/openprofile/oauth/jwks" => "JWKSHandler".to_string(),
        other => other
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("root")
            .to_string(),
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Routes requests through a site's MCP endpoint
#[derive(Debug)]
pub struct McpExchange {
    http: HttpExchange,
    mcp_path: String,
    next_id: AtomicU64,
}

impl McpExchange {
    /// Create an MCP exchange on top of an HTTP exchange
    ///
    /// # Arguments
    ///
    /// * `http` - Transport used for the JSON-RPC POST
    /// * `mcp_path` - Path of the MCP endpoint on every site (e.g. `/mcp`)
    pub fn new(http: HttpExchange, mcp_path: impl Into<String>) -> Self {
        Self {
            http,
            mcp_path: mcp_path.into(),
            next_id: AtomicU64::new(1),
        }
    }

    fn build_request(&self, url: &Url, payload: Option<&Value>) -> JsonRpcRequest {
        let mut arguments = Map::new();
        arguments.insert("path".to_string(), Value::String(url.path().to_string()));
        match payload {
            Some(Value::Object(fields)) => {
                arguments.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(other) => {
                arguments.insert("payload".to_string(), other.clone());
            }
            None => {}
        }

        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: "tools/call".to_string(),
            params: CallToolParams {
                name: tool_name_for_path(url.path()),
                arguments,
            },
        }
    }
}

fn unwrap_tool_result(tool: &str, response: Value) -> Result<Value> {
    let response: JsonRpcResponse = serde_json::from_value(response).map_err(|e| {
        GatewayError::InvalidDiscoveryDocument(format!("Malformed JSON-RPC response: {}", e))
    })?;

    if let Some(err) = response.error {
        return Err(GatewayError::transport(
            None,
            format!("MCP tool {} failed with JSON-RPC error {}: {}", tool, err.code, err.message),
        )
        .into());
    }

    let result: CallToolResult = serde_json::from_value(response.result.unwrap_or_default())
        .map_err(|e| {
            GatewayError::InvalidDiscoveryDocument(format!("Malformed tool result: {}", e))
        })?;

    let first_text = result.content.iter().find_map(|c| match c {
        ToolContent::Text { text } => Some(text.as_str()),
        ToolContent::Other => None,
    });

    if result.is_error {
        return Err(GatewayError::transport(
            None,
            format!(
                "MCP tool {} reported an error: {}",
                tool,
                first_text.unwrap_or("no details")
            ),
        )
        .into());
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }

    let text = first_text.ok_or_else(|| {
        GatewayError::InvalidDiscoveryDocument(format!("MCP tool {} returned no content", tool))
    })?;
    serde_json::from_str(text).map_err(|e| {
        GatewayError::InvalidDiscoveryDocument(format!(
            "MCP tool {} returned non-JSON text: {}",
            tool, e
        ))
        .into()
    })
}

#[async_trait]
impl Exchange for McpExchange {
    async fn exchange(&self, endpoint: &str, payload: Option<&Value>) -> Result<Value> {
        let url = Url::parse(endpoint).map_err(|e| {
            GatewayError::InvalidDiscoveryDocument(format!(
                "Invalid endpoint URL '{}': {}",
                endpoint, e
            ))
        })?;

        let rpc_url = format!("{}{}", url.origin().ascii_serialization(), self.mcp_path);
        let request = self.build_request(&url, payload);
        let tool = request.params.name.clone();
        tracing::debug!(tool = %tool, rpc_url = %rpc_url, "Routing request through MCP");

        let body = serde_json::to_value(&request)?;
        let response = self.http.exchange(&rpc_url, Some(&body)).await?;
        unwrap_tool_result(&tool, response)
    }
}
