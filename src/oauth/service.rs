//! Fact Pod enablement orchestration
//!
//! One [`FactPodOAuthService::enable`] call walks a fixed sequence:
//!
//! 1. short-circuit when the user already has a connection for the site
//! 2. reuse the stored site configuration, or discover and store it
//! 3. register an OAuth client with the site
//! 4. generate and store a CSRF state
//! 5. store the client credentials for the user, build the authorization URL
//!
//! Any failure in 2-5 aborts the call. A site configuration stored in step
//! 2 survives a later failure. Credentials are written only once the state
//! is stored, so a call abandoned at any point never leaves a connection
//! without a delivered authorization URL.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::authorize::{build_authorization_url, generate_state, preview};
use super::metrics::EnablementMetrics;
use crate::config::Config;
use crate::discovery::{DiscoveryClient, DiscoveryDocument, Protocol};
use crate::error::{Result, ServiceError, ServiceErrorKind};
use crate::storage::{FactPodConfig, Repository, StateClaim, UserSiteConnection};

/// Everything the caller needs to send the user to the site's consent page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnabledGrant {
    pub auth_url: String,
    pub client_id: String,
    #[serde(skip)]
    pub state: String,
    pub state_expires_at: DateTime<Utc>,
    pub supported_scopes: Vec<String>,
    pub protocol_used: Protocol,
}

/// Result of an enable call
#[derive(Debug, Clone, PartialEq)]
pub enum EnableOutcome {
    /// A new client was registered and an authorization URL produced
    Enabled(EnabledGrant),
    /// The user already has a connection for the site; nothing was done
    AlreadyEnabled,
    /// No usable configuration is stored for the site and discovery is off,
    /// or the stored configuration is disabled
    ConfigMissing,
}

impl EnableOutcome {
    /// Authorization URL, present only for a fresh enablement.
    pub fn auth_url(&self) -> Option<&str> {
        match self {
            EnableOutcome::Enabled(grant) => Some(&grant.auth_url),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EnableOutcome::Enabled(_) => "enabled",
            EnableOutcome::AlreadyEnabled => "already_enabled",
            EnableOutcome::ConfigMissing => "config_missing",
        }
    }
}

/// OAuth enablement orchestrator
///
/// Holds no locks; concurrent calls for the same user and site converge
/// through the repository's conditional writes.
#[derive(Clone)]
pub struct FactPodOAuthService {
    repository: Arc<dyn Repository>,
    discovery: Arc<dyn DiscoveryClient>,
    config: Config,
}

impl std::fmt::Debug for FactPodOAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactPodOAuthService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FactPodOAuthService {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `repository` - Durable store for configs, connections and states
    /// * `discovery` - Discovery and registration client
    /// * `config` - Gateway configuration, read once here
    pub fn new(
        repository: Arc<dyn Repository>,
        discovery: Arc<dyn DiscoveryClient>,
        config: Config,
    ) -> Self {
        Self {
            repository,
            discovery,
            config,
        }
    }

    /// Enable a Fact Pod site for a user
    ///
    /// # Arguments
    ///
    /// * `user_id` - User enabling the site; must be non-empty
    /// * `site` - Site host name or origin; must be non-empty
    ///
    /// # Returns
    ///
    /// The [`EnableOutcome`] for this call
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] classifying the first failure
    /// (`Configuration`, `Transport`, `Repository`, `InvalidInput`) with the
    /// original message preserved
    pub async fn enable(
        &self,
        user_id: &str,
        site: &str,
    ) -> std::result::Result<EnableOutcome, ServiceError> {
        let metrics = EnablementMetrics::start();

        if user_id.trim().is_empty() || site.trim().is_empty() {
            let err = ServiceError::new(
                ServiceErrorKind::InvalidInput,
                "user_id and site must not be empty",
            );
            metrics.record_error(err.kind);
            return Err(err);
        }

        match self.run_enable(user_id, site).await {
            Ok(outcome) => {
                metrics.record_outcome(outcome.label());
                Ok(outcome)
            }
            Err(e) => {
                let err = ServiceError::from_anyhow(e);
                tracing::error!(
                    user_id,
                    site,
                    kind = %err.kind,
                    status = ?err.status,
                    "Fact pod enablement failed: {}",
                    err.message
                );
                metrics.record_error(err.kind);
                Err(err)
            }
        }
    }

    async fn run_enable(&self, user_id: &str, site: &str) -> Result<EnableOutcome> {
        if self
            .repository
            .get_user_site_connection(user_id, site)
            .await
            .context("Looking up existing connection")?
            .is_some()
        {
            tracing::info!(user_id, site, "Fact pod already enabled");
            return Ok(EnableOutcome::AlreadyEnabled);
        }

        let Some(document) = self.resolve_config(site).await? else {
            return Ok(EnableOutcome::ConfigMissing);
        };
        let protocol = document.protocol();

        let redirect_uri = self.config.oauth.redirect_uri(site);
        let client_name = self.config.oauth.client_name(site);
        let registration = self
            .discovery
            .register_client(
                &document.registration_endpoint,
                std::slice::from_ref(&redirect_uri),
                &client_name,
                protocol,
            )
            .await?;
        tracing::info!(
            user_id,
            site,
            client_id = %registration.client_id,
            protocol = %protocol,
            "Registered OAuth client"
        );

        // The connection is the last write. An abandoned call leaves at most
        // an orphan state, which expires.
        let state = generate_state();
        let stored_state = self
            .repository
            .store_oauth_state(&state, user_id, site)
            .await
            .context("Storing OAuth state")?;

        if let Err(e) = self
            .repository
            .store_oauth_config(
                user_id,
                site,
                &registration.client_id,
                &registration.client_secret,
                &redirect_uri,
            )
            .await
        {
            self.discard_state(&state).await;
            return Err(e.context("Storing OAuth client credentials"));
        }

        let auth_url = build_authorization_url(
            &document.authorization_endpoint,
            &registration.client_id,
            &self.config.oauth.scope,
            &redirect_uri,
            &state,
        );
        tracing::info!(
            user_id,
            site,
            state = %preview(&state),
            expires_at = %stored_state.expires_at,
            "Authorization URL generated"
        );

        let supported_scopes = if document.scopes_supported.is_empty() {
            self.config.oauth.scopes()
        } else {
            document.scopes_supported
        };

        Ok(EnableOutcome::Enabled(EnabledGrant {
            auth_url,
            client_id: registration.client_id,
            state,
            state_expires_at: stored_state.expires_at,
            supported_scopes,
            protocol_used: protocol,
        }))
    }

    /// Stored document for the site, or a freshly discovered one.
    ///
    /// `None` means the site cannot be enabled: discovery is off and
    /// nothing is stored, or the stored config is disabled.
    async fn resolve_config(&self, site: &str) -> Result<Option<DiscoveryDocument>> {
        if let Some(stored) = self
            .repository
            .get_fact_pod_config(site)
            .await
            .context("Looking up fact pod config")?
        {
            if !stored.enabled {
                tracing::warn!(site, "Fact pod config is disabled");
                return Ok(None);
            }
            tracing::debug!(site, "Reusing stored fact pod config");
            let document = DiscoveryDocument::from_value(stored.openid_config)
                .with_context(|| format!("Stored discovery document for {} is invalid", site))?;
            return Ok(Some(document));
        }

        if !self.config.discovery.auto_discover {
            tracing::warn!(site, "Fact pod is not configured and discovery is disabled");
            return Ok(None);
        }

        let document = self.discovery.get_config(site).await?;

        if self.config.discovery.verify_jwks {
            let jwks = self
                .discovery
                .fetch_jwks(&document.jwks_uri, document.protocol())
                .await?;
            tracing::debug!(site, keys = jwks.keys.len(), "Verified JWKS");
        }

        let raw = serde_json::to_value(&document)?;
        self.repository
            .store_fact_pod_config(&FactPodConfig::new(site, raw))
            .await
            .context("Storing fact pod config")?;
        tracing::info!(site, "Stored discovered fact pod config");

        Ok(Some(document))
    }

    /// Removes the state written by a call that failed afterwards.
    async fn discard_state(&self, state: &str) {
        if let Err(e) = self.repository.delete_oauth_state(state).await {
            tracing::warn!(state = %preview(state), "Failed to discard OAuth state: {:#}", e);
        }
    }

    /// Check a callback's state token without consuming it
    ///
    /// # Errors
    ///
    /// Returns a `Repository` service error on storage faults
    pub async fn verify_state(
        &self,
        state: &str,
    ) -> std::result::Result<Option<StateClaim>, ServiceError> {
        self.repository
            .verify_oauth_state(state)
            .await
            .map_err(ServiceError::from_anyhow)
    }

    /// Verify and delete a callback's state token in one step
    pub async fn consume_state(
        &self,
        state: &str,
    ) -> std::result::Result<Option<StateClaim>, ServiceError> {
        let claim = self
            .repository
            .consume_oauth_state(state)
            .await
            .map_err(ServiceError::from_anyhow)?;
        if claim.is_none() {
            tracing::warn!(state = %preview(state), "Unknown or expired OAuth state");
        }
        Ok(claim)
    }

    /// Stored connection for a user and site
    pub async fn connection(
        &self,
        user_id: &str,
        site: &str,
    ) -> std::result::Result<Option<UserSiteConnection>, ServiceError> {
        self.repository
            .get_user_site_connection(user_id, site)
            .await
            .map_err(ServiceError::from_anyhow)
    }
}
