//! Gmail tool facades
//!
//! Each tool owns a [`MailSession`]: its own decoded copy of the active
//! account's credentials plus the shared credential store, Gmail client and
//! optional text generator. Tool operations always return display text;
//! failures are flattened into `Error <verb>ing <noun>: <message>`.

mod analyzer;
mod drafter;
mod finder;
mod labels;
mod processor;
mod suggester;

pub use analyzer::EmailAnalyzer;
pub use drafter::EmailDrafter;
pub use finder::EmailFinder;
pub use labels::LabelManager;
pub use processor::EmailProcessor;
pub use suggester::ResponseSuggester;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::credentials::{CredentialSession, CredentialStore};
use crate::error::Result;
use crate::genai::TextGenerator;
use crate::gmail::{GmailClient, MessageFormat, LIST_HEADERS};
use crate::mime::decode_message;
use crate::models::{Account, DecodedMessage, MessageRef};

/// Characters of body text shown in analyses and reply templates
pub const EXCERPT_CHARS: usize = 500;

/// Authenticated access to one account, owned by a single tool
pub struct MailSession {
    credentials: Arc<CredentialStore>,
    session: CredentialSession,
    gmail: GmailClient,
    generator: Option<Arc<dyn TextGenerator>>,
    connected_email: Option<String>,
}

impl MailSession {
    pub async fn configure(
        account: &Account,
        credentials: Arc<CredentialStore>,
        gmail: GmailClient,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let session = credentials.configure(account).await;
        Self {
            credentials,
            session,
            gmail,
            generator,
            connected_email: None,
        }
    }

    /// Access token for the next call, refreshing or authorizing as needed
    pub async fn access_token(&mut self) -> Result<String> {
        self.credentials.ensure_authenticated(&mut self.session).await
    }

    pub fn gmail(&self) -> &GmailClient {
        &self.gmail
    }

    pub fn generator(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.generator.as_ref()
    }

    pub fn connected_email(&self) -> Option<&str> {
        self.connected_email.as_deref()
    }

    pub fn set_connected_email(&mut self, email: &str) {
        self.connected_email = Some(email.to_string());
    }

    pub fn credential_session(&self) -> &CredentialSession {
        &self.session
    }

    /// Fetch list headers for each reference and format them as cards
    async fn email_cards(&self, token: &str, refs: &[MessageRef]) -> Result<Vec<String>> {
        let mut cards = Vec::with_capacity(refs.len());
        for message_ref in refs {
            let message = self
                .gmail
                .get_message(token, &message_ref.id, MessageFormat::Metadata, LIST_HEADERS)
                .await?;
            let mut decoded = decode_message(&message);
            decoded.id = message_ref.id.clone();
            cards.push(format_email_card(&decoded));
        }
        debug!("Formatted {} email cards", cards.len());
        Ok(cards)
    }
}

/// One message in list output
pub fn format_email_card(message: &DecodedMessage) -> String {
    format!(
        "\nEmail ID: {}\nFrom: {}\nDate: {}\nSubject: {}\n",
        message.id, message.sender, message.date, message.subject
    )
}

/// Whether input looks like a Gmail message ID rather than pasted content
pub fn is_message_id(input: &str) -> bool {
    let input = input.trim();
    (10..=32).contains(&input.len()) && input.chars().all(|c| c.is_ascii_alphanumeric())
}

/// First `EXCERPT_CHARS` characters, with an ellipsis when cut
pub(crate) fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Flatten a tool result into display text
pub(crate) fn report(context: &str, result: Result<String>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!("{}: {}", context, e);
            format!("{}: {}", context, e)
        }
    }
}

/// The six tools, each configured from the same account
pub struct Toolbox {
    account: Account,
    pub drafter: EmailDrafter,
    pub analyzer: EmailAnalyzer,
    pub suggester: ResponseSuggester,
    pub finder: EmailFinder,
    pub labels: LabelManager,
    pub processor: EmailProcessor,
}

impl Toolbox {
    pub async fn configure(
        account: &Account,
        credentials: Arc<CredentialStore>,
        gmail: GmailClient,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let session = || {
            MailSession::configure(account, credentials.clone(), gmail.clone(), generator.clone())
        };

        Self {
            account: account.clone(),
            drafter: EmailDrafter::new(session().await),
            analyzer: EmailAnalyzer::new(session().await),
            suggester: ResponseSuggester::new(session().await),
            finder: EmailFinder::new(session().await),
            labels: LabelManager::new(session().await),
            processor: EmailProcessor::new(session().await),
        }
    }

    /// The account record this toolbox was configured from
    pub fn account(&self) -> &Account {
        &self.account
    }

    fn sessions(&self) -> [&MailSession; 6] {
        [
            self.drafter.session(),
            self.analyzer.session(),
            self.suggester.session(),
            self.finder.session(),
            self.labels.session(),
            self.processor.session(),
        ]
    }

    /// Set the sender address on every tool
    pub fn set_connected_email(&mut self, email: &str) {
        self.drafter.session_mut().set_connected_email(email);
        self.analyzer.session_mut().set_connected_email(email);
        self.suggester.session_mut().set_connected_email(email);
        self.finder.session_mut().set_connected_email(email);
        self.labels.session_mut().set_connected_email(email);
        self.processor.session_mut().set_connected_email(email);
    }

    /// Token material of the most recently issued credentials across the tools
    pub fn token_material(&self) -> Option<String> {
        self.sessions()
            .into_iter()
            .map(MailSession::credential_session)
            .filter(|s| s.tokens().is_some())
            .max_by_key(|s| s.tokens().map(|t| t.expires_at))
            .and_then(CredentialStore::export_token_material)
    }
}
