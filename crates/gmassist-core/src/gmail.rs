//! Gmail REST API client
//!
//! Thin wrapper over `users/me/{messages,drafts,labels}`. Every request goes
//! through the shared rate limiter, carries a bounded timeout and is retried
//! once when the failure is transient.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::GmailConfig;
use crate::error::{Error, Result};
use crate::models::{Draft, GmailMessage, Label, LabelList, MessageList, MessageRef};
use crate::rate_limiter::GlobalRateLimiter;

/// Format requested from `messages.get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Full,
    Metadata,
    Raw,
}

impl MessageFormat {
    fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Raw => "raw",
        }
    }
}

/// Headers fetched for list views
pub const LIST_HEADERS: &[&str] = &["From", "Subject", "Date"];

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Gmail API client; the access token is supplied per call
#[derive(Clone)]
pub struct GmailClient {
    base_url: String,
    http: Client,
    rate_limiter: GlobalRateLimiter,
}

impl GmailClient {
    pub fn new(config: &GmailConfig, rate_limiter: GlobalRateLimiter) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            http,
            rate_limiter,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base_url, path)
    }

    /// Send a request, retrying once on a transient failure
    async fn execute<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        match self.execute_once(what, &build).await {
            Err(e) if e.is_transient() => {
                warn!("Transient failure on {}, retrying once: {}", what, e);
                self.execute_once(what, &build).await
            }
            other => other,
        }
    }

    async fn execute_once<F>(&self, what: &str, build: &F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.rate_limiter.wait().await;
        debug!("Gmail request: {}", what);

        let response = build().send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(String::from)
                    .unwrap_or(body)
            });
        error!("Gmail {} failed: {} - {}", what, status, message);
        Err(Error::RemoteApi {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        Ok(response.json().await?)
    }

    /// `messages.list`
    pub async fn list_messages(
        &self,
        token: &str,
        label_ids: &[&str],
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<MessageRef>> {
        let url = self.url("messages");
        let mut params: Vec<(&str, String)> = vec![("maxResults", max_results.to_string())];
        params.extend(label_ids.iter().map(|l| ("labelIds", l.to_string())));
        if let Some(q) = query {
            params.push(("q", q.to_string()));
        }

        let response = self
            .execute("messages.list", || {
                self.http.get(&url).bearer_auth(token).query(&params)
            })
            .await?;
        let list: MessageList = Self::json(response).await?;
        debug!("messages.list returned {} messages", list.messages.len());
        Ok(list.messages)
    }

    /// `messages.get`
    pub async fn get_message(
        &self,
        token: &str,
        id: &str,
        format: MessageFormat,
        metadata_headers: &[&str],
    ) -> Result<GmailMessage> {
        let url = self.url(&format!("messages/{}", urlencoding::encode(id)));
        let mut params: Vec<(&str, &str)> = vec![("format", format.as_str())];
        if format == MessageFormat::Metadata {
            params.extend(metadata_headers.iter().map(|h| ("metadataHeaders", *h)));
        }

        let response = self
            .execute("messages.get", || {
                self.http.get(&url).bearer_auth(token).query(&params)
            })
            .await?;
        Self::json(response).await
    }

    /// `messages.send`
    pub async fn send(&self, token: &str, raw: &str) -> Result<MessageRef> {
        let url = self.url("messages/send");
        let body = json!({ "raw": raw });
        let response = self
            .execute("messages.send", || {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        Self::json(response).await
    }

    /// `drafts.create`
    pub async fn create_draft(&self, token: &str, raw: &str) -> Result<Draft> {
        let url = self.url("drafts");
        let body = json!({ "message": { "raw": raw } });
        let response = self
            .execute("drafts.create", || {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        Self::json(response).await
    }

    /// `labels.list`
    pub async fn list_labels(&self, token: &str) -> Result<Vec<Label>> {
        let url = self.url("labels");
        let response = self
            .execute("labels.list", || self.http.get(&url).bearer_auth(token))
            .await?;
        let list: LabelList = Self::json(response).await?;
        Ok(list.labels)
    }

    /// `labels.create`, visible in both the label and message lists
    pub async fn create_label(&self, token: &str, name: &str) -> Result<Label> {
        let url = self.url("labels");
        let body = json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show",
        });
        let response = self
            .execute("labels.create", || {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        Self::json(response).await
    }

    /// `messages.modify`
    pub async fn modify_labels(
        &self,
        token: &str,
        id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<GmailMessage> {
        let url = self.url(&format!("messages/{}/modify", urlencoding::encode(id)));
        let body = json!({
            "addLabelIds": add,
            "removeLabelIds": remove,
        });
        let response = self
            .execute("messages.modify", || {
                self.http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        Self::json(response).await
    }
}
