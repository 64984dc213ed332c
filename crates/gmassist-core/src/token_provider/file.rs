//! File-based token provider
//!
//! Stores tokens as JSON in `<tokens_dir>/<account>.json` (account name
//! percent-encoded), by default
//! `~/.config/gmassist/tokens`.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::OAuthTokens;

use super::TokenProvider;

/// Token provider backed by one JSON file per account
pub struct FileTokenProvider {
    tokens_dir: PathBuf,
}

impl FileTokenProvider {
    /// Create a provider rooted at `tokens_dir`
    pub fn new(tokens_dir: impl AsRef<Path>) -> Self {
        Self {
            tokens_dir: tokens_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of an account's token file
    fn token_path(&self, account: &str) -> PathBuf {
        self.tokens_dir.join(format!("{}.json", file_stem(account)))
    }
}

/// Percent-encoded account name, so distinct names never share a file and
/// path separators stay inside the directory
fn file_stem(account: &str) -> String {
    urlencoding::encode(account).into_owned()
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn get_tokens(&self, account: &str) -> Result<Option<OAuthTokens>> {
        let path = self.token_path(account);
        if !path.exists() {
            debug!("No tokens found for {}", account);
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let tokens: OAuthTokens = serde_json::from_str(&contents)
            .map_err(|e| Error::Token(format!("Invalid token file {:?}: {}", path, e)))?;
        debug!("Retrieved OAuth tokens for {} from {:?}", account, path);
        Ok(Some(tokens))
    }

    async fn store_tokens(&self, account: &str, tokens: &OAuthTokens) -> Result<()> {
        fs::create_dir_all(&self.tokens_dir)?;
        let path = self.token_path(account);
        let data = serde_json::to_string_pretty(tokens)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;

        debug!("Stored OAuth tokens for {}", account);
        Ok(())
    }

    async fn delete_tokens(&self, account: &str) -> Result<()> {
        let path = self.token_path(account);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted OAuth tokens for {}", account);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No tokens to delete for {}", account);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn has_tokens(&self, account: &str) -> Result<bool> {
        Ok(self.token_path(account).exists())
    }
}
