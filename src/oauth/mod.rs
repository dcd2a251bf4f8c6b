//! OAuth enablement for Fact Pod sites
//!
//! [`FactPodOAuthService`] drives discovery, client registration and
//! authorization URL generation on top of a [`Repository`](crate::storage::Repository)
//! and a [`DiscoveryClient`](crate::discovery::DiscoveryClient).

pub mod authorize;
pub mod metrics;
pub mod service;

pub use authorize::{build_authorization_url, generate_state};
pub use metrics::EnablementMetrics;
pub use service::{EnableOutcome, EnabledGrant, FactPodOAuthService};
