//! Data models for gmassist
//!
//! Account records, parsed command intents, OAuth tokens and the Gmail
//! REST payload shapes.

mod account;
mod email;
mod intent;
mod tokens;

pub use account::*;
pub use email::*;
pub use intent::*;
pub use tokens::*;
