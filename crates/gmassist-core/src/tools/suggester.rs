//! Reply suggestions

use tracing::warn;

use super::{excerpt, is_message_id, report, MailSession};
use crate::error::Result;
use crate::genai::{reply_prompt, GenerationConfig};
use crate::gmail::MessageFormat;
use crate::mime::{decode_message, DEFAULT_DATE, DEFAULT_SENDER, DEFAULT_SUBJECT};
use crate::models::DecodedMessage;

const PLACEHOLDER: &str = "[Your response here based on the following email content:]";

/// Drafts a reply template for a message
pub struct ResponseSuggester {
    session: MailSession,
}

impl ResponseSuggester {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn suggest_response(&mut self, content_or_id: &str) -> String {
        report("Error suggesting response", self.try_suggest(content_or_id).await)
    }

    async fn try_suggest(&mut self, content_or_id: &str) -> Result<String> {
        let message = if is_message_id(content_or_id) {
            let token = self.session.access_token().await?;
            let message = self
                .session
                .gmail()
                .get_message(&token, content_or_id.trim(), MessageFormat::Full, &[])
                .await?;
            decode_message(&message)
        } else {
            DecodedMessage {
                subject: DEFAULT_SUBJECT.to_string(),
                sender: DEFAULT_SENDER.to_string(),
                date: DEFAULT_DATE.to_string(),
                body_text: content_or_id.trim().to_string(),
                ..Default::default()
            }
        };

        let reply = self.generated_reply(&message.body_text).await;
        Ok(format!(
            "\nSuggested Response:\n------------------\nTo: {}\nSubject: Re: {}\n\nDear {},\n\nThank you for your email regarding {}.\n\n{}\n\nOriginal Email:\n{}\n",
            message.sender,
            message.subject,
            message.sender_name(),
            message.subject,
            reply.as_deref().unwrap_or(PLACEHOLDER),
            excerpt(&message.body_text),
        ))
    }

    async fn generated_reply(&self, body_text: &str) -> Option<String> {
        let generator = self.session.generator()?;
        if body_text.trim().is_empty() {
            return None;
        }
        match generator
            .generate(&reply_prompt(body_text), GenerationConfig::default())
            .await
        {
            Ok(reply) => Some(reply.trim().to_string()),
            Err(e) => {
                warn!("Reply generation failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::genai::TextGenerator;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;
    use mockito::Matcher;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_template_reply_for_message_id() {
        let mut server = mockito::Server::new_async().await;
        let payload = serde_json::json!({
            "id": "18c2f4a9b1e0d7c3",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    {"name": "From", "value": "\"Jane Doe\" <jane@example.com>"},
                    {"name": "Subject", "value": "Offsite"}
                ],
                "body": {"data": URL_SAFE.encode("Are you coming on Friday?")}
            }
        });
        let _mock = server
            .mock("GET", "/gmail/v1/users/me/messages/18c2f4a9b1e0d7c3")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(payload.to_string())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut suggester = ResponseSuggester::new(session(&server, dir.path(), None).await);
        let text = suggester.suggest_response("18c2f4a9b1e0d7c3").await;

        assert!(text.starts_with("\nSuggested Response:\n------------------\n"));
        assert!(text.contains("To: \"Jane Doe\" <jane@example.com>\nSubject: Re: Offsite\n"));
        assert!(text.contains("Dear Jane Doe,\n"));
        assert!(text.contains("Thank you for your email regarding Offsite."));
        assert!(text.contains(PLACEHOLDER));
        assert!(text.ends_with("Original Email:\nAre you coming on Friday?\n"));
    }

    #[tokio::test]
    async fn test_generated_reply_replaces_placeholder() {
        let server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let generator = CannedGenerator::new("Happy to help, see you Friday.");
        let mut suggester = ResponseSuggester::new(
            session(&server, dir.path(), Some(generator.clone() as Arc<dyn TextGenerator>)).await,
        );

        let text = suggester
            .suggest_response("Could you join the offsite on Friday?")
            .await;

        assert!(text.contains("Happy to help, see you Friday."));
        assert!(!text.contains(PLACEHOLDER));
        assert!(text.contains("Dear Unknown sender,"));
        assert!(generator.prompts.lock().unwrap()[0].contains("Could you join the offsite"));
    }
}
