//! Pluggable OAuth token storage providers
//!
//! Credentials are carried in each account record as token material, and
//! every session that reaches a valid state also writes its tokens through a
//! provider. The provider is the fallback source when an account's token
//! material is missing or unreadable.

mod file;

pub use file::FileTokenProvider;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::models::OAuthTokens;

/// Trait for OAuth token storage backends
///
/// Implementations must be thread-safe (`Send + Sync`) so one provider can
/// be shared by every tool session.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get tokens for an account
    async fn get_tokens(&self, account: &str) -> Result<Option<OAuthTokens>>;

    /// Store tokens for an account
    async fn store_tokens(&self, account: &str, tokens: &OAuthTokens) -> Result<()>;

    /// Delete tokens for an account
    async fn delete_tokens(&self, account: &str) -> Result<()>;

    /// Check if tokens exist for an account
    async fn has_tokens(&self, account: &str) -> Result<bool> {
        Ok(self.get_tokens(account).await?.is_some())
    }
}

/// Create the token provider for a configuration
pub fn create_token_provider(config: &Config) -> Arc<dyn TokenProvider> {
    Arc::new(FileTokenProvider::new(config.tokens_dir()))
}
