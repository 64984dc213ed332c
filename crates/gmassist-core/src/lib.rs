//! gmassist Core Library
//!
//! Conversational Gmail assistant: command routing, multi-account OAuth
//! sessions, MIME handling and the Gmail/generative API tool set.

pub mod assistant;
pub mod config;
pub mod credentials;
pub mod error;
pub mod genai;
pub mod gmail;
pub mod mime;
pub mod models;
pub mod oauth;
pub mod rate_limiter;
pub mod registry;
pub mod router;
pub mod token_provider;
pub mod tools;

pub use assistant::Assistant;
pub use config::Config;
pub use error::{Error, Result};
pub use models::*;

/// Application name for config paths
pub const APP_NAME: &str = "gmassist";
