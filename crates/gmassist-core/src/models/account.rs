//! Account data structures

use serde::{Deserialize, Serialize};

/// Suffix appended to the active account's name in display lists
pub const ACTIVE_SUFFIX: &str = " (Active)";

/// A configured Gmail account with its OAuth client registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// User-chosen account name (unique key)
    pub name: String,

    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Authorization endpoint
    pub auth_uri: String,

    /// Token endpoint
    pub token_uri: String,

    /// Registered redirect URIs, first one is used
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Whether this is the selected account
    #[serde(default)]
    pub is_active: bool,

    /// Hex-encoded credential envelope
    #[serde(default, alias = "token_pickle")]
    pub token_material: Option<String>,

    /// API key for the generative language API
    #[serde(default, alias = "gemini_api_key")]
    pub api_key_for_summaries: Option<String>,
}

impl Account {
    /// Create a new, inactive account without credentials
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_uri: impl Into<String>,
        token_uri: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: auth_uri.into(),
            token_uri: token_uri.into(),
            redirect_uris: vec![redirect_uri.into()],
            is_active: false,
            token_material: None,
            api_key_for_summaries: None,
        }
    }

    /// First registered redirect URI
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uris.first().map(String::as_str)
    }

    /// Summary API key, if one is set and non-empty
    pub fn summary_key(&self) -> Option<&str> {
        self.api_key_for_summaries
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Name as shown in account lists
    pub fn display_name(&self) -> String {
        if self.is_active {
            format!("{}{}", self.name, ACTIVE_SUFFIX)
        } else {
            self.name.clone()
        }
    }
}

/// Strip the display-only active marker from a name picked from a list
pub fn clean_account_name(name: &str) -> &str {
    name.trim()
        .strip_suffix(ACTIVE_SUFFIX.trim_start())
        .map(str::trim_end)
        .unwrap_or_else(|| name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_field_names() {
        let json = r#"{
            "name": "work",
            "client_id": "id",
            "client_secret": "secret",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"],
            "is_active": true,
            "token_pickle": "abcd",
            "gemini_api_key": "key"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.token_material.as_deref(), Some("abcd"));
        assert_eq!(account.summary_key(), Some("key"));
        assert_eq!(account.redirect_uri(), Some("http://localhost"));

        let written = serde_json::to_value(&account).unwrap();
        assert!(written.get("token_material").is_some());
        assert!(written.get("token_pickle").is_none());
    }

    #[test]
    fn test_display_name_and_cleaning() {
        let mut account = Account::new("work", "a", "b", "c", "d", "e");
        assert_eq!(account.display_name(), "work");
        account.is_active = true;
        assert_eq!(account.display_name(), "work (Active)");

        assert_eq!(clean_account_name("work (Active)"), "work");
        assert_eq!(clean_account_name("  work  "), "work");
        assert_eq!(clean_account_name("personal"), "personal");
    }

    #[test]
    fn test_blank_summary_key_is_none() {
        let mut account = Account::new("work", "a", "b", "c", "d", "e");
        account.api_key_for_summaries = Some("   ".to_string());
        assert_eq!(account.summary_key(), None);
    }
}
