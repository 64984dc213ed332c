//! OAuth 2.0 flow for Google authentication

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{Error, Result};
use crate::models::{Account, OAuthTokens};

/// Scope used when the configuration does not name any
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// An account's OAuth client registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub redirect_uri: String,
}

impl OAuthClient {
    /// Take the client registration from an account record
    pub fn from_account(account: &Account) -> Self {
        Self {
            client_id: account.client_id.clone(),
            client_secret: account.client_secret.clone(),
            auth_uri: account.auth_uri.clone(),
            token_uri: account.token_uri.clone(),
            redirect_uri: account
                .redirect_uri()
                .unwrap_or("http://localhost")
                .to_string(),
        }
    }

    /// Whether both client id and secret are set
    pub fn has_secrets(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

/// Response from the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// OAuth manager for one client registration
pub struct OAuthManager {
    client: OAuthClient,
    scopes: Vec<String>,
    http: Client,
}

impl OAuthManager {
    pub fn new(client: OAuthClient, scopes: Vec<String>, http: Client) -> Self {
        let scopes = if scopes.is_empty() {
            vec![DEFAULT_SCOPE.to_string()]
        } else {
            scopes
        };
        Self {
            client,
            scopes,
            http,
        }
    }

    /// The client registration this manager acts for
    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Generate the OAuth authorization URL
    pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> Result<String> {
        let mut url = Url::parse(&self.client.auth_uri)
            .map_err(|e| Error::OAuth(format!("Invalid auth URI '{}': {}", self.client.auth_uri, e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthTokens> {
        info!("Exchanging authorization code for tokens");

        let params = [
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http
            .post(&self.client.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed: {} - {}", status, body);
            return Err(Error::OAuth(format!(
                "Token exchange failed: {} - {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        debug!("Token exchange successful");

        Ok(OAuthTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: chrono::Utc::now().timestamp() + token_response.expires_in,
            scopes: token_response
                .scope
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_else(|| self.scopes.clone()),
        })
    }

    /// Refresh an access token
    pub async fn refresh(&self, account: &str, current: &OAuthTokens) -> Result<OAuthTokens> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::TokenRefreshFailed {
                account: account.to_string(),
                reason: "no refresh token".to_string(),
            })?;

        debug!("Refreshing access token for {}", account);

        let params = [
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.client.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::TokenRefreshFailed {
                account: account.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token refresh failed for {}: {} - {}", account, status, body);
            return Err(Error::TokenRefreshFailed {
                account: account.to_string(),
                reason: format!("{} - {}", status, body),
            });
        }

        let token_response: TokenResponse = response.json().await?;

        let new_tokens = OAuthTokens {
            access_token: token_response.access_token,
            // Keep the old refresh token if not provided
            refresh_token: token_response
                .refresh_token
                .or_else(|| current.refresh_token.clone()),
            expires_at: chrono::Utc::now().timestamp() + token_response.expires_in,
            scopes: current.scopes.clone(),
        };

        info!("Refreshed access token for {}", account);
        Ok(new_tokens)
    }
}
