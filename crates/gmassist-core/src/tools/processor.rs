//! Free-form requests

use tracing::debug;

use super::{report, MailSession};
use crate::error::Result;
use crate::genai::{request_prompt, GenerationConfig};

/// Messages shown per category
const CATEGORY_COUNT: u32 = 5;

const HELP: &str = "I can help you with: unread emails, important emails, or starred emails";

/// A mailbox category reachable by keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Unread,
    Important,
    Starred,
}

impl Category {
    fn detect(request: &str) -> Option<Self> {
        let request = request.to_lowercase();
        if request.contains("unread") {
            Some(Category::Unread)
        } else if request.contains("important") {
            Some(Category::Important)
        } else if request.contains("starred") {
            Some(Category::Starred)
        } else {
            None
        }
    }

    fn label_ids(&self) -> &'static [&'static str] {
        match self {
            Category::Unread => &["UNREAD", "INBOX"],
            Category::Important => &["IMPORTANT"],
            Category::Starred => &["STARRED"],
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Category::Unread => "Unread",
            Category::Important => "Important",
            Category::Starred => "Starred",
        }
    }
}

/// Handles anything the router did not recognize
pub struct EmailProcessor {
    session: MailSession,
}

impl EmailProcessor {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn process_request(&mut self, request: &str) -> String {
        report("Error processing request", self.try_process(request).await)
    }

    async fn try_process(&mut self, request: &str) -> Result<String> {
        if let Some(category) = Category::detect(request) {
            return self.list_category(category).await;
        }

        match self.session.generator() {
            Some(generator) => {
                debug!("Forwarding free-form request to the generator");
                generator
                    .generate(&request_prompt(request), GenerationConfig::default())
                    .await
            }
            None => Ok(HELP.to_string()),
        }
    }

    async fn list_category(&mut self, category: Category) -> Result<String> {
        let token = self.session.access_token().await?;
        let refs = self
            .session
            .gmail()
            .list_messages(&token, category.label_ids(), None, CATEGORY_COUNT)
            .await?;

        if refs.is_empty() {
            return Ok(format!(
                "No {} emails found.",
                category.title().to_lowercase()
            ));
        }
        let cards = self.session.email_cards(&token, &refs).await?;
        Ok(format!("{} Emails:\n\n{}", category.title(), cards.join("\n")))
    }
}
