//! factpod-gateway - OAuth enablement for Fact Pod sites
//!
//! This library discovers a Fact Pod's OAuth metadata, registers an OAuth
//! client per user, stores the credentials, and produces a one-time
//! authorization URL protected by a short-lived CSRF state.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: Repository contract and the sled-backed implementation
//! - `transport`: HTTP and MCP request/response exchanges
//! - `discovery`: Discovery document validation and client registration
//! - `oauth`: The enablement orchestrator, URL/state helpers and metrics
//! - `tool`: Adapter mapping enable results to the tool response shape
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use factpod_gateway::{Config, FactPodOAuthService, OpenIdClient, SledRepository};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let repository = Arc::new(SledRepository::open(&config)?);
//!     let discovery = Arc::new(OpenIdClient::new(&config)?);
//!     let service = FactPodOAuthService::new(repository, discovery, config);
//!
//!     let outcome = service.enable("user-1", "pod.example").await?;
//!     println!("{:?}", outcome.auth_url());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod oauth;
pub mod storage;
pub mod tool;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use discovery::{DiscoveryClient, DiscoveryDocument, OpenIdClient, Protocol};
pub use error::{GatewayError, Result, ServiceError, ServiceErrorKind};
pub use oauth::{EnableOutcome, EnabledGrant, FactPodOAuthService};
pub use storage::{Repository, SledRepository};
pub use tool::{EnableFactPodTool, EnableInput, EnableResponse};
