//! Durable storage for Fact Pod site configs, user connections and CSRF state
//!
//! The [`Repository`] trait is the contract the OAuth orchestrator talks to.
//! Every operation is independently atomic; there are no cross-operation
//! transactions. [`SledRepository`] is the embedded-database implementation.

pub mod sled_store;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use sled_store::{Clock, SledRepository};
pub use types::{FactPodConfig, OAuthState, StateClaim, UserSiteConnection};

/// Persistent key-value contract for enablement records
///
/// All methods fail with a [`GatewayError::Repository`](crate::error::GatewayError::Repository)
/// (or a wrapped backing-store error) on storage faults. No retries happen
/// inside an implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stored discovery configuration for `site`, if any.
    async fn get_fact_pod_config(&self, site: &str) -> Result<Option<FactPodConfig>>;

    /// Upserts a site configuration.
    ///
    /// `updated_at` is always refreshed. `created_at` is kept from an
    /// existing record and only taken from `config` on first insert.
    async fn store_fact_pod_config(&self, config: &FactPodConfig) -> Result<FactPodConfig>;

    /// Stored connection for a user and site, if any.
    async fn get_user_site_connection(
        &self,
        user_id: &str,
        site: &str,
    ) -> Result<Option<UserSiteConnection>>;

    /// Upserts the OAuth client credentials for a user and site.
    ///
    /// Retrying with the same inputs yields the same stored row apart from
    /// `updated_at`.
    async fn store_oauth_config(
        &self,
        user_id: &str,
        site: &str,
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
    ) -> Result<UserSiteConnection>;

    /// Stores a state token expiring after the configured TTL.
    async fn store_oauth_state(&self, state: &str, user_id: &str, site: &str)
        -> Result<OAuthState>;

    /// Checks a state token without consuming it.
    ///
    /// An unexpired state returns its claim and stays stored. An expired
    /// state is deleted and reported as absent.
    async fn verify_oauth_state(&self, state: &str) -> Result<Option<StateClaim>>;

    /// Removes a state token. Returns whether it existed.
    async fn delete_oauth_state(&self, state: &str) -> Result<bool>;

    /// Verifies and removes a state token in one atomic step.
    ///
    /// Of two concurrent consumers of the same token at most one receives
    /// the claim.
    async fn consume_oauth_state(&self, state: &str) -> Result<Option<StateClaim>>;
}
