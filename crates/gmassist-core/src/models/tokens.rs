//! OAuth token data

use serde::{Deserialize, Serialize};

/// Seconds before `expires_at` at which a token is treated as expired
pub const EXPIRY_GRACE_SECS: i64 = 300;

/// OAuth tokens for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Access token for API calls
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token expiry timestamp (Unix seconds)
    pub expires_at: i64,

    /// Token scopes
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl OAuthTokens {
    /// Check if the access token is expired or will expire soon
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.expires_at < now + EXPIRY_GRACE_SECS
    }

    /// Check if a non-empty refresh token is available
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}
