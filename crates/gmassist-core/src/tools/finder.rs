//! Search

use tracing::debug;

use super::{report, MailSession};
use crate::error::Result;

/// Runs Gmail search queries
pub struct EmailFinder {
    session: MailSession,
}

impl EmailFinder {
    pub fn new(session: MailSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &MailSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MailSession {
        &mut self.session
    }

    pub async fn find_emails(&mut self, query: &str, count: u32) -> String {
        report("Error finding emails", self.try_find(query, count).await)
    }

    async fn try_find(&mut self, query: &str, count: u32) -> Result<String> {
        let token = self.session.access_token().await?;
        let refs = self
            .session
            .gmail()
            .list_messages(&token, &[], Some(query), count)
            .await?;
        debug!("Query {:?} matched {} messages", query, refs.len());

        if refs.is_empty() {
            return Ok(format!("No emails found matching query: {}", query));
        }
        let cards = self.session.email_cards(&token, &refs).await?;
        Ok(format!("Search Results for '{}':\n\n{}", query, cards.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_find_formats_results() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "jane".into()),
                Matcher::UrlEncoded("maxResults".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"messages":[{"id":"m7"}]}"#)
            .create_async()
            .await;
        let _m7 = mock_metadata(&mut server, "m7", "Jane <jane@example.com>", "Budget").await;

        let dir = tempfile::tempdir().unwrap();
        let mut finder = EmailFinder::new(session(&server, dir.path(), None).await);
        let text = finder.find_emails("jane", 3).await;

        search.assert_async().await;
        assert_eq!(
            text,
            "Search Results for 'jane':\n\n\nEmail ID: m7\nFrom: Jane <jane@example.com>\nDate: Mon, 3 Jun 2024 10:00:00 +0000\nSubject: Budget\n"
        );
    }

    #[tokio::test]
    async fn test_find_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultSizeEstimate":0}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut finder = EmailFinder::new(session(&server, dir.path(), None).await);
        assert_eq!(
            finder.find_emails("nobody", 1).await,
            "No emails found matching query: nobody"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_session_reports_auth_error() {
        let server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let mut account = account_with_tokens();
        account.token_material = None;

        let mut finder = EmailFinder::new(
            MailSession::configure(
                &account,
                credential_store(dir.path()),
                gmail_client(&server),
                None,
            )
            .await,
        );
        assert_eq!(
            finder.find_emails("jane", 1).await,
            "Error finding emails: Authentication failed: browser unavailable"
        );
    }
}
