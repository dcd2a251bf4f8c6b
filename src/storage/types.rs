use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discovery configuration stored once per Fact Pod site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactPodConfig {
    /// Site the configuration was discovered from
    pub site: String,
    /// Whether the site may be enabled for users
    pub enabled: bool,
    /// Validated discovery document. Unknown fields are kept as published;
    /// absent optional fields carry their defaults.
    pub openid_config: Value,
    /// When the site was first discovered
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl FactPodConfig {
    /// Builds a fresh enabled config; the repository assigns final timestamps.
    pub fn new(site: impl Into<String>, openid_config: Value) -> Self {
        let now = Utc::now();
        Self {
            site: site.into(),
            enabled: true,
            openid_config,
            created_at: now,
            updated_at: now,
        }
    }
}

/// OAuth client registered for one user on one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSiteConnection {
    /// Owning user
    pub user_id: String,
    /// Fact Pod site
    pub site: String,
    /// Client identifier issued by the site
    pub client_id: String,
    /// Client secret issued by the site
    pub client_secret: String,
    /// Redirect URI the client was registered with
    pub redirect_url: String,
    /// First write
    pub created_at: DateTime<Utc>,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

impl UserSiteConnection {
    /// Copy of the connection with the client secret masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: "********".to_string(),
            ..self.clone()
        }
    }
}

/// Pending CSRF state for one authorization request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    /// Opaque random token
    pub state: String,
    pub user_id: String,
    pub site: String,
    pub created_at: DateTime<Utc>,
    /// `created_at` plus the configured TTL
    pub expires_at: DateTime<Utc>,
}

impl OAuthState {
    /// A state is expired at or after `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The payload a successful verification hands back.
    pub fn claim(&self) -> StateClaim {
        StateClaim {
            user_id: self.user_id.clone(),
            site: self.site.clone(),
        }
    }
}

/// Who a verified state token belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateClaim {
    pub user_id: String,
    pub site: String,
}
