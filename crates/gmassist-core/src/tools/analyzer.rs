//! Email analysis, recent-message listing and per-message summaries

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{excerpt, format_email_card, is_message_id, report, MailSession};
use crate::error::Result;
use crate::genai::{summary_prompt, GenerationConfig};
use crate::gmail::MessageFormat;
use crate::mime::{decode_message, DEFAULT_DATE, DEFAULT_SENDER, DEFAULT_SUBJECT};
use crate::models::{DecodedMessage, MessageRef};

/// Shown in place of a summary when the account has no generative API key
pub const SUMMARY_UNAVAILABLE: &str =
    "Email summary not available. Add a generative API key with 'gmassist account set-key'.";

/// Most messages listed for one day
pub const DAY_LIST_LIMIT: u32 = 50;

/// Summarizes a message by ID or pasted content
pub struct EmailAnalyzer {
    session: MailSession,
}

impl EmailAnalyzer {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn analyze_email(&mut self, content_or_id: &str) -> String {
        report("Error analyzing email", self.try_analyze(content_or_id).await)
    }

    pub async fn list_recent_emails(&mut self, count: u32) -> String {
        report("Error listing emails", self.try_list_recent(count).await)
    }

    /// Inbox messages received on `date`, each with a summary
    pub async fn list_emails_on(&mut self, date: NaiveDate) -> String {
        report("Error listing emails", self.try_list_on(date).await)
    }

    /// The `count` most recent inbox messages, each with a summary
    pub async fn summarize_recent_emails(&mut self, count: u32) -> String {
        report("Error listing emails", self.try_summarize_recent(count).await)
    }

    async fn try_analyze(&mut self, content_or_id: &str) -> Result<String> {
        let message = if is_message_id(content_or_id) {
            let token = self.session.access_token().await?;
            let message = self
                .session
                .gmail()
                .get_message(&token, content_or_id.trim(), MessageFormat::Full, &[])
                .await?;
            decode_message(&message)
        } else {
            debug!("Analyzing pasted content");
            DecodedMessage {
                subject: DEFAULT_SUBJECT.to_string(),
                sender: DEFAULT_SENDER.to_string(),
                date: DEFAULT_DATE.to_string(),
                body_text: content_or_id.trim().to_string(),
                ..Default::default()
            }
        };

        let mut analysis = format!(
            "\nEmail Analysis:\n--------------\nFrom: {}\nDate: {}\nSubject: {}\nAttachments: {}\n\nContent Summary:\n{}\n",
            message.sender,
            message.date,
            message.subject,
            if message.attachments_present { "Yes" } else { "No" },
            excerpt(&message.body_text),
        );

        if let Some(summary) = self.summarize(&message.body_text).await {
            analysis.push_str(&format!("\nAI Summary:\n{}\n", summary));
        }
        Ok(analysis)
    }

    /// Generated summary when a generator is configured
    async fn summarize(&self, body_text: &str) -> Option<String> {
        let generator = self.session.generator()?;
        let Some(prompt) = summary_prompt(body_text) else {
            return Some("No content to summarize".to_string());
        };

        match generator.generate(&prompt, GenerationConfig::summary()).await {
            Ok(summary) => Some(summary.trim().to_string()),
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                Some(format!("Could not generate summary: {}", e))
            }
        }
    }

    async fn summary_or_notice(&self, body_text: &str) -> String {
        self.summarize(body_text)
            .await
            .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string())
    }

    /// Fetch each message in full and render it with its summary
    async fn summary_cards(&self, token: &str, refs: &[MessageRef]) -> Result<Vec<String>> {
        let mut cards = Vec::with_capacity(refs.len());
        for message_ref in refs {
            let message = self
                .session
                .gmail()
                .get_message(token, &message_ref.id, MessageFormat::Full, &[])
                .await?;
            let mut decoded = decode_message(&message);
            decoded.id = message_ref.id.clone();

            let summary = self.summary_or_notice(&decoded.body_text).await;
            cards.push(format!(
                "{}Attachments: {}\nSummary: {}\n",
                format_email_card(&decoded),
                if decoded.attachments_present { "Yes" } else { "No" },
                summary,
            ));
        }
        debug!("Summarized {} messages", cards.len());
        Ok(cards)
    }

    async fn try_list_on(&mut self, date: NaiveDate) -> Result<String> {
        let next = date.succ_opt().unwrap_or(date);
        let query = format!(
            "after:{} before:{}",
            date.format("%Y/%m/%d"),
            next.format("%Y/%m/%d")
        );

        let token = self.session.access_token().await?;
        let refs = self
            .session
            .gmail()
            .list_messages(&token, &["INBOX"], Some(&query), DAY_LIST_LIMIT)
            .await?;

        if refs.is_empty() {
            return Ok(format!("No emails found for {}", date));
        }
        let cards = self.summary_cards(&token, &refs).await?;
        Ok(format!("Emails for {}:\n{}", date, cards.join("\n")))
    }

    async fn try_summarize_recent(&mut self, count: u32) -> Result<String> {
        let token = self.session.access_token().await?;
        let refs = self
            .session
            .gmail()
            .list_messages(&token, &["INBOX"], None, count)
            .await?;

        if refs.is_empty() {
            return Ok("No recent emails found.".to_string());
        }
        Ok(self.summary_cards(&token, &refs).await?.join("\n"))
    }

    async fn try_list_recent(&mut self, count: u32) -> Result<String> {
        let token = self.session.access_token().await?;
        let refs = self
            .session
            .gmail()
            .list_messages(&token, &["INBOX"], None, count)
            .await?;

        if refs.is_empty() {
            return Ok("No recent emails found.".to_string());
        }
        Ok(self.session.email_cards(&token, &refs).await?.join("\n"))
    }
}
