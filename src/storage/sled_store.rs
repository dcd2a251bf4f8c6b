//! Embedded-database repository
//!
//! Each table identifier maps to its own sled tree. Records are stored as
//! JSON. Upserts are compare-and-swap loops so two racing writers converge
//! on a single row, and every write is flushed before the call returns.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, IVec, Tree};

use super::types::{FactPodConfig, OAuthState, StateClaim, UserSiteConnection};
use super::Repository;
use crate::config::Config;
use crate::error::{GatewayError, Result};

/// Source of the current time, injectable for expiry tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Sled-backed [`Repository`]
///
/// # Examples
///
/// ```
/// use factpod_gateway::config::Config;
/// use factpod_gateway::storage::SledRepository;
///
/// # fn main() -> factpod_gateway::error::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let mut config = Config::default();
/// config.storage.path = Some(dir.path().join("db"));
/// let repo = SledRepository::open(&config)?;
/// # drop(repo);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SledRepository {
    db: Db,
    configs: Tree,
    connections: Tree,
    states: Tree,
    state_ttl: Duration,
    clock: Clock,
}

impl std::fmt::Debug for SledRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRepository")
            .field("state_ttl", &self.state_ttl)
            .finish_non_exhaustive()
    }
}

impl SledRepository {
    /// Open or create the database at the configured storage path
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Repository` if the database or one of its
    /// tables cannot be opened
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.storage.resolve_path()?;
        Self::open_at(&path, config)
    }

    /// Open or create the database at an explicit path
    pub fn open_at(path: &Path, config: &Config) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GatewayError::Repository(format!("Failed to create database directory: {}", e))
            })?;
        }
        let db = sled::open(path)
            .map_err(|e| GatewayError::Repository(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened repository");
        Self::from_db(db, config)
    }

    /// Wrap an already-open database
    ///
    /// # Examples
    ///
    /// ```
    /// use factpod_gateway::storage::{Repository, SledRepository};
    /// use factpod_gateway::Config;
    ///
    /// # tokio_test::block_on(async {
    /// let db = sled::Config::new().temporary(true).open().unwrap();
    /// let repo = SledRepository::from_db(db, &Config::default()).unwrap();
    ///
    /// let state = repo.store_oauth_state("s1", "user-1", "pod.example").await.unwrap();
    /// assert_eq!(state.user_id, "user-1");
    /// assert!(repo.consume_oauth_state("s1").await.unwrap().is_some());
    /// assert!(repo.consume_oauth_state("s1").await.unwrap().is_none());
    /// # });
    /// ```
    pub fn from_db(db: Db, config: &Config) -> Result<Self> {
        let tables = &config.storage;
        Ok(Self {
            configs: open_tree(&db, &tables.fact_pod_config_table)?,
            connections: open_tree(&db, &tables.connection_table)?,
            states: open_tree(&db, &tables.state_table)?,
            db,
            state_ttl: Duration::seconds(
                i64::try_from(config.oauth.state_ttl_seconds)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the wall clock used for timestamps and expiry checks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| GatewayError::Repository(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

fn open_tree(db: &Db, name: &str) -> Result<Tree> {
    db.open_tree(name).map_err(|e| {
        GatewayError::Repository(format!("Failed to open table '{}': {}", name, e)).into()
    })
}

fn connection_key(user_id: &str, site: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + site.len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(0);
    key.extend_from_slice(site.as_bytes());
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        GatewayError::Repository(format!("Malformed stored item: {}", e)).into()
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| GatewayError::Repository(format!("Failed to encode item: {}", e)).into())
}

fn read<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>> {
    let bytes = tree
        .get(key)
        .map_err(|e| GatewayError::Repository(format!("Failed to read item: {}", e)))?;
    bytes.as_deref().map(decode::<T>).transpose()
}

/// Read-modify-write until no concurrent writer got in between.
fn upsert<T, F>(tree: &Tree, key: &[u8], build: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Fn(Option<T>) -> T,
{
    loop {
        let current: Option<IVec> = tree
            .get(key)
            .map_err(|e| GatewayError::Repository(format!("Failed to read item: {}", e)))?;
        let existing = current.as_deref().map(decode::<T>).transpose()?;
        let next = build(existing);
        let bytes = encode(&next)?;

        let swapped = tree
            .compare_and_swap(key, current, Some(bytes))
            .map_err(|e| GatewayError::Repository(format!("Failed to write item: {}", e)))?;
        match swapped {
            Ok(()) => return Ok(next),
            Err(_) => {
                tracing::debug!("Concurrent write detected, retrying upsert");
                continue;
            }
        }
    }
}

#[async_trait]
impl Repository for SledRepository {
    async fn get_fact_pod_config(&self, site: &str) -> Result<Option<FactPodConfig>> {
        read(&self.configs, site.as_bytes())
    }

    async fn store_fact_pod_config(&self, config: &FactPodConfig) -> Result<FactPodConfig> {
        let now = self.now();
        let stored = upsert(&self.configs, config.site.as_bytes(), |existing| {
            FactPodConfig {
                site: config.site.clone(),
                enabled: config.enabled,
                openid_config: config.openid_config.clone(),
                created_at: existing.map(|e: FactPodConfig| e.created_at).unwrap_or(now),
                updated_at: now,
            }
        })?;
        self.flush().await?;
        tracing::debug!(site = %config.site, "Stored fact pod config");
        Ok(stored)
    }

    async fn get_user_site_connection(
        &self,
        user_id: &str,
        site: &str,
    ) -> Result<Option<UserSiteConnection>> {
        read(&self.connections, &connection_key(user_id, site))
    }

    async fn store_oauth_config(
        &self,
        user_id: &str,
        site: &str,
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
    ) -> Result<UserSiteConnection> {
        let now = self.now();
        let stored = upsert(
            &self.connections,
            &connection_key(user_id, site),
            |existing: Option<UserSiteConnection>| UserSiteConnection {
                user_id: user_id.to_string(),
                site: site.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                redirect_url: redirect_url.to_string(),
                created_at: existing.map(|e| e.created_at).unwrap_or(now),
                updated_at: now,
            },
        )?;
        self.flush().await?;
        tracing::debug!(user_id, site, client_id, "Stored OAuth client credentials");
        Ok(stored)
    }

    async fn store_oauth_state(
        &self,
        state: &str,
        user_id: &str,
        site: &str,
    ) -> Result<OAuthState> {
        let created_at = self.now();
        let record = OAuthState {
            state: state.to_string(),
            user_id: user_id.to_string(),
            site: site.to_string(),
            created_at,
            expires_at: created_at
                .checked_add_signed(self.state_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        self.states
            .insert(state.as_bytes(), encode(&record)?)
            .map_err(|e| GatewayError::Repository(format!("Failed to store state: {}", e)))?;
        self.flush().await?;
        tracing::debug!(user_id, site, expires_at = %record.expires_at, "Stored OAuth state");
        Ok(record)
    }

    async fn verify_oauth_state(&self, state: &str) -> Result<Option<StateClaim>> {
        let Some(record) = read::<OAuthState>(&self.states, state.as_bytes())? else {
            return Ok(None);
        };

        if record.is_expired_at(self.now()) {
            self.delete_oauth_state(state).await?;
            tracing::debug!(
                user_id = %record.user_id,
                site = %record.site,
                "Purged expired OAuth state"
            );
            return Ok(None);
        }

        Ok(Some(record.claim()))
    }

    async fn delete_oauth_state(&self, state: &str) -> Result<bool> {
        let removed = self
            .states
            .remove(state.as_bytes())
            .map_err(|e| GatewayError::Repository(format!("Failed to delete state: {}", e)))?;
        self.flush().await?;
        Ok(removed.is_some())
    }

    async fn consume_oauth_state(&self, state: &str) -> Result<Option<StateClaim>> {
        let removed = self
            .states
            .remove(state.as_bytes())
            .map_err(|e| GatewayError::Repository(format!("Failed to consume state: {}", e)))?;
        self.flush().await?;

        let Some(bytes) = removed else {
            return Ok(None);
        };
        let record: OAuthState = decode(&bytes)?;
        if record.is_expired_at(self.now()) {
            return Ok(None);
        }
        Ok(Some(record.claim()))
    }
}
