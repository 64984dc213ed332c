//! Label management

use tracing::info;

use super::{report, MailSession};
use crate::error::Result;
use crate::models::Label;

/// Lists labels and applies them to messages
pub struct LabelManager {
    session: MailSession,
}

/// Case-insensitive lookup by display name
fn find_label<'a>(labels: &'a [Label], name: &str) -> Option<&'a Label> {
    let wanted = name.to_lowercase();
    labels.iter().find(|l| l.name.to_lowercase() == wanted)
}

impl LabelManager {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn list_labels(&mut self) -> String {
        report("Error listing labels", self.try_list().await)
    }

    pub async fn add_label(&mut self, name: &str, email_id: &str) -> String {
        report("Error adding label", self.try_add(name, email_id).await)
    }

    pub async fn remove_label(&mut self, name: &str, email_id: &str) -> String {
        report("Error removing label", self.try_remove(name, email_id).await)
    }

    async fn try_list(&mut self) -> Result<String> {
        let token = self.session.access_token().await?;
        let labels = self.session.gmail().list_labels(&token).await?;
        if labels.is_empty() {
            return Ok("No labels found.".to_string());
        }

        let cards: Vec<String> = labels
            .iter()
            .map(|l| {
                format!(
                    "\nLabel ID: {}\nName: {}\nType: {}\n",
                    l.id,
                    l.name,
                    l.label_type.as_deref().unwrap_or("user")
                )
            })
            .collect();
        Ok(format!("Gmail Labels:\n\n{}", cards.join("\n")))
    }

    async fn try_add(&mut self, name: &str, email_id: &str) -> Result<String> {
        let token = self.session.access_token().await?;
        let gmail = self.session.gmail();
        let labels = gmail.list_labels(&token).await?;

        let label_id = match find_label(&labels, name) {
            Some(label) => label.id.clone(),
            None => {
                let created = gmail.create_label(&token, name).await?;
                info!("Created label {} ({})", created.name, created.id);
                created.id
            }
        };

        gmail
            .modify_labels(&token, email_id, &[label_id.as_str()], &[])
            .await?;
        Ok(format!(
            "Successfully added label '{}' to email {}",
            name, email_id
        ))
    }

    async fn try_remove(&mut self, name: &str, email_id: &str) -> Result<String> {
        let token = self.session.access_token().await?;
        let gmail = self.session.gmail();
        let labels = gmail.list_labels(&token).await?;

        let Some(label) = find_label(&labels, name) else {
            return Ok(format!("Label '{}' not found", name));
        };

        gmail
            .modify_labels(&token, email_id, &[], &[label.id.as_str()])
            .await?;
        Ok(format!(
            "Successfully removed label '{}' from email {}",
            name, email_id
        ))
    }
}
