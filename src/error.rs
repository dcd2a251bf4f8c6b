//! Error types for the Fact Pod gateway
//!
//! Leaf modules (storage, transport, discovery) raise [`GatewayError`]
//! values through the crate-wide [`Result`] alias. The OAuth orchestrator
//! folds every lower-level failure into a single [`ServiceError`] before
//! it crosses the service boundary.

use std::fmt;

use thiserror::Error;

/// Main error type for gateway operations
///
/// Variants are grouped by the failure families callers care about:
/// configuration problems with a site's discovery document, transport
/// failures talking to a site, and backing-store faults.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Invalid local configuration (config file, templates, table names)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Discovery document is missing one or more required fields
    #[error("Missing required fields in discovery document: {}", .0.join(", "))]
    MissingDiscoveryFields(Vec<String>),

    /// Discovery document or upstream response is not valid JSON for its schema
    #[error("Invalid discovery document: {0}")]
    InvalidDiscoveryDocument(String),

    /// Non-2xx response or connection failure talking to a site
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        /// Upstream HTTP status, when a response was received
        status: Option<u16>,
        /// Failure detail
        message: String,
    },

    /// Backing-store fault (open, read, write, malformed item)
    #[error("Repository error: {0}")]
    Repository(String),

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Embedded database errors
    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl GatewayError {
    /// Builds a transport error carrying the upstream status.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Returns the service-level family this error belongs to.
    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            GatewayError::Config(_)
            | GatewayError::MissingDiscoveryFields(_)
            | GatewayError::InvalidDiscoveryDocument(_)
            | GatewayError::Yaml(_) => ServiceErrorKind::Configuration,
            GatewayError::Transport { .. } | GatewayError::Http(_) => ServiceErrorKind::Transport,
            GatewayError::Repository(_) | GatewayError::Sled(_) => ServiceErrorKind::Repository,
            GatewayError::InvalidInput(_) => ServiceErrorKind::InvalidInput,
            GatewayError::Io(_) | GatewayError::Serialization(_) => ServiceErrorKind::Internal,
        }
    }
}

/// Result type alias for gateway operations
///
/// Uses `anyhow::Error` so leaf modules can attach context while still
/// carrying a [`GatewayError`] that the service boundary can classify.
pub type Result<T> = anyhow::Result<T>;

/// Failure family reported across the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Discovery document missing fields or malformed, or bad local config
    Configuration,
    /// Upstream site unreachable or answered with a non-2xx status
    Transport,
    /// Backing store fault
    Repository,
    /// Empty user id or site
    InvalidInput,
    /// Anything else
    Internal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceErrorKind::Configuration => "Configuration",
            ServiceErrorKind::Transport => "Transport",
            ServiceErrorKind::Repository => "Repository",
            ServiceErrorKind::InvalidInput => "Invalid input",
            ServiceErrorKind::Internal => "Internal",
        };
        f.write_str(label)
    }
}

/// The single error shape returned by the OAuth orchestrator.
///
/// # Examples
///
/// ```
/// use factpod_gateway::error::{GatewayError, ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::from_anyhow(GatewayError::Repository("disk full".into()).into());
/// assert_eq!(err.kind, ServiceErrorKind::Repository);
/// assert!(err.message.contains("disk full"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct ServiceError {
    /// Failure family
    pub kind: ServiceErrorKind,
    /// Original message of the lower-level error
    pub message: String,
    /// Upstream HTTP status for transport failures
    pub status: Option<u16>,
}

impl ServiceError {
    /// Creates a service error with no upstream status.
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Classifies an arbitrary error by looking for a [`GatewayError`] in
    /// its chain. The full chain is kept in the message.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        match err.chain().find_map(|e| e.downcast_ref::<GatewayError>()) {
            Some(gateway) => {
                let status = match gateway {
                    GatewayError::Transport { status, .. } => *status,
                    GatewayError::Http(e) => e.status().map(|s| s.as_u16()),
                    _ => None,
                };
                Self {
                    kind: gateway.kind(),
                    message,
                    status,
                }
            }
            None => Self::new(ServiceErrorKind::Internal, message),
        }
    }
}
