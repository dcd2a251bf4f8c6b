//! Configuration management for the Fact Pod gateway
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! The resulting [`Config`] is built once at startup and handed to the
//! repository, discovery client and orchestrator constructors.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the gateway
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OAuth enablement settings
    #[serde(default)]
    pub oauth: OAuthSettings,
    /// Site discovery and registration transport settings
    #[serde(default)]
    pub discovery: DiscoverySettings,
    /// Repository storage settings
    #[serde(default)]
    pub storage: StorageSettings,
}

/// OAuth enablement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    /// Lifetime of a CSRF state token in seconds
    #[serde(default = "default_state_ttl_seconds")]
    pub state_ttl_seconds: u64,

    /// Redirect URI template; `{site}` is replaced with the target site
    #[serde(default = "default_redirect_template")]
    pub redirect_template: String,

    /// Space-separated scope requested at registration and authorization
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Client name template sent during dynamic registration
    #[serde(default = "default_client_name_template")]
    pub client_name_template: String,
}

fn default_state_ttl_seconds() -> u64 {
    600
}

fn default_redirect_template() -> String {
    "https://{site}/oauth/callback".to_string()
}

fn default_scope() -> String {
    "facts:read facts:make-irrelevant".to_string()
}

fn default_client_name_template() -> String {
    "Gateway for {site}".to_string()
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl_seconds(),
            redirect_template: default_redirect_template(),
            scope: default_scope(),
            client_name_template: default_client_name_template(),
        }
    }
}

impl OAuthSettings {
    /// Renders the redirect URI for `site`.
    pub fn redirect_uri(&self, site: &str) -> String {
        self.redirect_template.replace("{site}", site)
    }

    /// Renders the registration client name for `site`.
    pub fn client_name(&self, site: &str) -> String {
        self.client_name_template.replace("{site}", site)
    }

    /// Individual scopes from the space-separated scope string.
    pub fn scopes(&self) -> Vec<String> {
        self.scope.split_whitespace().map(str::to_string).collect()
    }
}

/// Discovery and registration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Well-known path of the discovery document, relative to the site root
    #[serde(default = "default_well_known_path")]
    pub well_known_path: String,

    /// Per-request timeout for discovery and registration calls (seconds)
    #[serde(default = "default_discovery_timeout")]
    pub timeout_seconds: u64,

    /// Discover unknown sites on first enable. When off, only sites with a
    /// stored configuration can be enabled.
    #[serde(default = "default_auto_discover")]
    pub auto_discover: bool,

    /// Fetch the site's JWKS during first-time discovery
    #[serde(default)]
    pub verify_jwks: bool,

    /// Path of the MCP endpoint on sites that advertise the `mcp` protocol
    #[serde(default = "default_mcp_path")]
    pub mcp_path: String,
}

fn default_well_known_path() -> String {
    ".well-known/openprofile.json".to_string()
}

fn default_discovery_timeout() -> u64 {
    10
}

fn default_auto_discover() -> bool {
    true
}

fn default_mcp_path() -> String {
    "/mcp".to_string()
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            well_known_path: default_well_known_path(),
            timeout_seconds: default_discovery_timeout(),
            auto_discover: default_auto_discover(),
            verify_jwks: false,
            mcp_path: default_mcp_path(),
        }
    }
}

/// Repository storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Database directory. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Table holding per-site discovery configuration
    #[serde(default = "default_fact_pod_config_table")]
    pub fact_pod_config_table: String,

    /// Table holding per-user-per-site OAuth client credentials
    #[serde(default = "default_connection_table")]
    pub connection_table: String,

    /// Table holding CSRF state entries
    #[serde(default = "default_state_table")]
    pub state_table: String,
}

fn default_fact_pod_config_table() -> String {
    "fact-pod-config-table".to_string()
}

fn default_connection_table() -> String {
    "gateway-table".to_string()
}

fn default_state_table() -> String {
    "oauth-state-table".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: None,
            fact_pod_config_table: default_fact_pod_config_table(),
            connection_table: default_connection_table(),
            state_table: default_state_table(),
        }
    }
}

impl StorageSettings {
    /// Resolves the database directory, falling back to the platform data
    /// directory when no path is configured.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let proj_dirs = directories::ProjectDirs::from("ai", "openprofile", "factpod-gateway")
            .ok_or_else(|| GatewayError::Config("Could not determine data directory".into()))?;

        Ok(proj_dirs.data_dir().join("factpod.sled"))
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a YAML configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(ttl) = std::env::var("GATEWAY_OAUTH_STATE_TTL_SECONDS") {
            match ttl.parse::<u64>() {
                Ok(v) => {
                    self.oauth.state_ttl_seconds = v;
                    tracing::debug!(
                        state_ttl_seconds = v,
                        "Env override: GATEWAY_OAUTH_STATE_TTL_SECONDS"
                    );
                }
                Err(_) => {
                    tracing::warn!("Invalid GATEWAY_OAUTH_STATE_TTL_SECONDS: {}", ttl);
                }
            }
        }

        if let Ok(template) = std::env::var("GATEWAY_OAUTH_REDIRECT_TEMPLATE") {
            tracing::debug!(template = %template, "Env override: GATEWAY_OAUTH_REDIRECT_TEMPLATE");
            self.oauth.redirect_template = template;
        }

        if let Ok(path) = std::env::var("GATEWAY_OPENID_WELL_KNOWN_PATH") {
            tracing::debug!(path = %path, "Env override: GATEWAY_OPENID_WELL_KNOWN_PATH");
            self.discovery.well_known_path = path;
        }

        if let Ok(timeout) = std::env::var("GATEWAY_DISCOVERY_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(v) => {
                    self.discovery.timeout_seconds = v;
                    tracing::debug!(
                        timeout_seconds = v,
                        "Env override: GATEWAY_DISCOVERY_TIMEOUT_SECONDS"
                    );
                }
                Err(_) => {
                    tracing::warn!("Invalid GATEWAY_DISCOVERY_TIMEOUT_SECONDS: {}", timeout);
                }
            }
        }

        if let Ok(db_path) = std::env::var("GATEWAY_DB_PATH") {
            tracing::debug!(db_path = %db_path, "Env override: GATEWAY_DB_PATH");
            self.storage.path = Some(PathBuf::from(db_path));
        }

        if let Ok(table) = std::env::var("GATEWAY_DB_TABLE_NAME") {
            self.storage.connection_table = table;
        }

        if let Ok(table) = std::env::var("GATEWAY_FACT_POD_CONFIG_TABLE_NAME") {
            self.storage.fact_pod_config_table = table;
        }

        if let Ok(table) = std::env::var("GATEWAY_STATE_TABLE_NAME") {
            self.storage.state_table = table;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.storage_path {
            tracing::info!("Using storage path override from CLI: {}", db_path);
            self.storage.path = Some(PathBuf::from(db_path));
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.oauth.state_ttl_seconds == 0 {
            return Err(GatewayError::Config(
                "oauth.state_ttl_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !self.oauth.redirect_template.contains("{site}") {
            return Err(GatewayError::Config(
                "oauth.redirect_template must contain the {site} placeholder".to_string(),
            )
            .into());
        }

        if self.oauth.scope.trim().is_empty() {
            return Err(GatewayError::Config("oauth.scope cannot be empty".to_string()).into());
        }

        if self.discovery.timeout_seconds == 0 {
            return Err(GatewayError::Config(
                "discovery.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.discovery.well_known_path.trim().is_empty() {
            return Err(GatewayError::Config(
                "discovery.well_known_path cannot be empty".to_string(),
            )
            .into());
        }

        let tables = [
            &self.storage.fact_pod_config_table,
            &self.storage.connection_table,
            &self.storage.state_table,
        ];
        if tables.iter().any(|t| t.trim().is_empty()) {
            return Err(
                GatewayError::Config("storage table names cannot be empty".to_string()).into(),
            );
        }
        if tables[0] == tables[1] || tables[0] == tables[2] || tables[1] == tables[2] {
            return Err(
                GatewayError::Config("storage table names must be distinct".to_string()).into(),
            );
        }

        Ok(())
    }
}
