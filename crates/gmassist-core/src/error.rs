//! Error types for gmassist

use thiserror::Error;

/// Result type alias using gmassist's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gmassist
#[derive(Error, Debug)]
pub enum Error {
    // Command errors
    /// Malformed command. Displays as the usage hint the user should follow.
    #[error("Please format your message as: '{usage}'")]
    Parse { usage: &'static str },

    // Account registry errors
    #[error("Account with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Account '{0}' not found")]
    NotFound(String),

    /// Required input was empty. Carries the complete user-facing message.
    #[error("{0}")]
    MissingField(&'static str),

    #[error("No active account selected")]
    NoActiveAccount,

    // Authentication errors
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Token refresh failed for account {account}: {reason}")]
    TokenRefreshFailed { account: String, reason: String },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Token storage error: {0}")]
    Token(String),

    // Remote API errors
    #[error("{status} - {message}")]
    RemoteApi { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Returns true if this error indicates the user needs to re-authenticate
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed(_) | Error::TokenRefreshFailed { .. }
        ) || matches!(self, Error::RemoteApi { status: 401, .. })
    }

    /// Returns true for failures worth a single retry (network blips, 502/503/504)
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::RemoteApi { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns a stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "PARSE_ERROR",
            Error::DuplicateName(_) => "DUPLICATE_NAME",
            Error::NotFound(_) => "NOT_FOUND",
            Error::MissingField(_) => "MISSING_FIELD",
            Error::NoActiveAccount => "NO_ACTIVE_ACCOUNT",
            Error::AuthenticationFailed(_)
            | Error::TokenRefreshFailed { .. }
            | Error::OAuth(_) => "AUTHENTICATION_FAILED",
            Error::RemoteApi { .. } | Error::Http(_) => "REMOTE_API_ERROR",
            Error::Decode(_) => "DECODE_FAILURE",
            Error::Config(_) | Error::TomlParse(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-friendly action message for recoverable errors
    pub fn action_hint(&self) -> Option<&'static str> {
        match self {
            Error::AuthenticationFailed(_) | Error::TokenRefreshFailed { .. } => {
                Some("Run `gmassist account login` to re-authenticate")
            }
            Error::NoActiveAccount => Some("Select an account with `gmassist account use <name>`"),
            _ => None,
        }
    }

    /// Message shown to the user, with the recovery hint appended when there is one
    pub fn user_message(&self) -> String {
        match self.action_hint() {
            Some(hint) => format!("{}. {}", self, hint),
            None => self.to_string(),
        }
    }

    /// Status/message pair for registry operations, e.g. `("Error", "Account 'x' not found")`
    pub fn status_pair(&self) -> (&'static str, String) {
        ("Error", self.to_string())
    }
}
