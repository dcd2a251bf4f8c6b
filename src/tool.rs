//! Enable tool adapter
//!
//! Translates a tool invocation into an orchestrator call and folds every
//! outcome, errors included, into one response shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::discovery::Protocol;
use crate::error::{ServiceError, ServiceErrorKind};
use crate::oauth::{EnableOutcome, FactPodOAuthService};

/// Tool input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnableInput {
    pub user_id: String,
    pub site: String,
}

/// Tool output
///
/// `status` is `"enabled"` or `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnableResponse {
    pub status: String,
    pub message: String,
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_used: Option<Protocol>,
}

impl EnableResponse {
    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            auth_url: None,
            supported_scopes: None,
            protocol_used: None,
        }
    }

    /// Maps an orchestrator result to the tool response.
    pub fn from_result(
        result: std::result::Result<EnableOutcome, ServiceError>,
        input: &EnableInput,
    ) -> Self {
        match result {
            Ok(EnableOutcome::Enabled(grant)) => Self {
                status: "enabled".to_string(),
                message: "Authorization URL generated successfully".to_string(),
                auth_url: Some(grant.auth_url),
                supported_scopes: Some(grant.supported_scopes),
                protocol_used: Some(grant.protocol_used),
            },
            Ok(EnableOutcome::AlreadyEnabled) => Self {
                status: "enabled".to_string(),
                message: format!(
                    "Fact Pod for {} is already enabled for user {}",
                    input.site, input.user_id
                ),
                auth_url: None,
                supported_scopes: None,
                protocol_used: None,
            },
            Ok(EnableOutcome::ConfigMissing) => {
                Self::error(format!("Fact Pod for {} is not configured", input.site))
            }
            Err(err) => Self::error(err.to_string()),
        }
    }
}

/// The `enable_fact_pod` tool
#[derive(Debug, Clone)]
pub struct EnableFactPodTool {
    service: Arc<FactPodOAuthService>,
}

impl EnableFactPodTool {
    /// Tool name as registered with a tool host.
    pub const NAME: &'static str = "enable_fact_pod";

    pub fn new(service: Arc<FactPodOAuthService>) -> Self {
        Self { service }
    }

    /// JSON schema of the tool input.
    pub fn input_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string", "description": "User enabling the Fact Pod"},
                "site": {"type": "string", "description": "Fact Pod site"}
            },
            "required": ["user_id", "site"]
        })
    }

    /// Run the tool. Never fails; errors become `status: "error"`.
    pub async fn call(&self, input: EnableInput) -> EnableResponse {
        if input.user_id.trim().is_empty() || input.site.trim().is_empty() {
            let err = ServiceError::new(
                ServiceErrorKind::InvalidInput,
                "user_id and site are required",
            );
            return EnableResponse::error(err.to_string());
        }

        tracing::info!(
            tool = Self::NAME,
            user_id = %input.user_id,
            site = %input.site,
            "Tool invoked"
        );
        let result = self.service.enable(&input.user_id, &input.site).await;
        EnableResponse::from_result(result, &input)
    }

    /// Run the tool on raw JSON arguments.
    pub async fn call_json(&self, arguments: serde_json::Value) -> EnableResponse {
        match serde_json::from_value::<EnableInput>(arguments) {
            Ok(input) => self.call(input).await,
            Err(e) => EnableResponse::error(
                ServiceError::new(ServiceErrorKind::InvalidInput, e.to_string()).to_string(),
            ),
        }
    }
}
