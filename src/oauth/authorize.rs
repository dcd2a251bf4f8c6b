//! Authorization URL and CSRF state helpers

use base64::Engine as _;
use rand::RngCore as _;

/// Generates a random state token.
///
/// 32 random bytes encoded as base64url without padding, so the token is
/// safe to place in a query string unescaped.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Composes the authorization URL.
///
/// Parameters are appended in a fixed order and are not percent-encoded,
/// so the URL can be compared byte for byte.
///
/// # Examples
///
/// ```
/// use factpod_gateway::oauth::build_authorization_url;
///
/// let url = build_authorization_url(
///     "https://ex.com/auth",
///     "c1",
///     "facts:read facts:make-irrelevant",
///     "https://gw/cb?site=ex.com",
///     "s1",
/// );
/// assert_eq!(
///     url,
///     "https://ex.com/auth?client_id=c1&response_type=code\
///      &scope=facts:read facts:make-irrelevant\
///      &redirect_uri=https://gw/cb?site=ex.com&state=s1"
/// );
/// ```
pub fn build_authorization_url(
    authorization_endpoint: &str,
    client_id: &str,
    scope: &str,
    redirect_uri: &str,
    state: &str,
) -> String {
    format!(
        "{}?client_id={}&response_type=code&scope={}&redirect_uri={}&state={}",
        authorization_endpoint, client_id, scope, redirect_uri, state
    )
}

/// First few characters of a secret for log lines.
pub(crate) fn preview(secret: &str) -> String {
    let head: String = secret.chars().take(6).collect();
    format!("{}...", head)
}
