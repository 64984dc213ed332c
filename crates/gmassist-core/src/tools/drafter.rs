//! Draft and send

use tracing::info;

use super::{report, MailSession};
use crate::error::Result;
use crate::mime::encode_message;

/// Creates drafts and sends plain-text messages
pub struct EmailDrafter {
    session: MailSession,
}

impl EmailDrafter {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn draft_email(&mut self, to: &str, subject: &str, body: &str) -> String {
        report("Error creating draft", self.try_draft(to, subject, body).await)
    }

    pub async fn send_email(&mut self, to: &str, subject: &str, body: &str) -> String {
        report("Error sending email", self.try_send(to, subject, body).await)
    }

    async fn try_draft(&mut self, to: &str, subject: &str, body: &str) -> Result<String> {
        let token = self.session.access_token().await?;
        let raw = encode_message(to, subject, body, self.session.connected_email())?;
        let draft = self.session.gmail().create_draft(&token, &raw).await?;
        info!("Created draft {}", draft.id);
        Ok(format!("Draft created successfully. Draft ID: {}", draft.id))
    }

    async fn try_send(&mut self, to: &str, subject: &str, body: &str) -> Result<String> {
        let token = self.session.access_token().await?;
        let raw = encode_message(to, subject, body, self.session.connected_email())?;
        let sent = self.session.gmail().send(&token, &raw).await?;
        info!("Sent message {}", sent.id);
        Ok(format!("Email sent successfully. Message ID: {}", sent.id))
    }
}
