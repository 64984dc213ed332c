//! Generative language API client
//!
//! Text in, text out. Used for email summaries, suggested replies and
//! free-form requests when the active account has an API key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::GenerativeConfig;
use crate::error::{Error, Result};

/// Answer used when the API returns no candidates
pub const NO_RESPONSE: &str = "No response generated.";

/// Maximum characters of body text sent for a summary
pub const SUMMARY_INPUT_CHARS: usize = 1000;

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Sampling parameters sent as `generationConfig`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

impl GenerationConfig {
    /// Short, low-temperature output for one or two sentence summaries
    pub fn summary() -> Self {
        Self {
            temperature: 0.3,
            top_k: 40,
            top_p: 0.8,
            max_output_tokens: 150,
        }
    }
}

/// Text generation seam
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String>;
}

/// `models/{model}:generateContent` client bound to one API key
pub struct GenerativeClient {
    base_url: String,
    model: String,
    api_key: String,
    http: Client,
}

impl GenerativeClient {
    pub fn new(config: &GenerativeConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            http,
        })
    }

    fn request_body(prompt: &str, config: GenerationConfig) -> Value {
        let safety: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| {
                json!({
                    "category": category,
                    "threshold": "BLOCK_MEDIUM_AND_ABOVE",
                })
            })
            .collect();

        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": config,
            "safetySettings": safety,
        })
    }
}

#[async_trait]
impl TextGenerator for GenerativeClient {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Generating with {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(prompt, config))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Generation failed: {} - {}", status, body);
            return Err(Error::RemoteApi {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response.json().await?;
        Ok(json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}

/// Summary prompt for a body, or `None` when there is nothing to summarize
pub fn summary_prompt(body_text: &str) -> Option<String> {
    let clean = body_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.is_empty() {
        return None;
    }
    let clean = match clean.char_indices().nth(SUMMARY_INPUT_CHARS) {
        Some((cut, _)) => format!("{}...", &clean[..cut]),
        None => clean,
    };
    Some(format!(
        "Summarize this email content in 1-2 clear, informative sentences:\n\n{}",
        clean
    ))
}

/// Prompt asking for a reply to an email
pub fn reply_prompt(email_content: &str) -> String {
    format!(
        "Based on the following email, suggest a professional response:\n\n\
         Original email:\n{}\n\n\
         Please provide a draft response that is professional and courteous, \
         addresses all points in the original email, is clear and concise, \
         and includes appropriate greetings and sign-offs.",
        email_content
    )
}

/// Prompt wrapping a free-form user request
pub fn request_prompt(user_input: &str) -> String {
    format!(
        "You are an email assistant. You can help with drafting emails, \
         summarizing emails, suggesting email responses and analyzing email content.\n\n\
         User request: {}",
        user_input
    )
}
