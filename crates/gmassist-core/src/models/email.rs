//! Email data structures
//!
//! Gmail REST payload shapes (`users.messages`, `users.labels`,
//! `users.drafts`) and the decoded form the tools format for display.

use serde::{Deserialize, Serialize};

/// A single message header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Body of a message part
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Set when the content must be fetched separately as an attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,

    #[serde(default)]
    pub size: u64,

    /// base64url body data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// One node in a message's MIME tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub headers: Vec<Header>,

    #[serde(default)]
    pub body: MessagePartBody,

    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Whether this part's MIME type matches, ignoring case and parameters
    pub fn is_type(&self, mime_type: &str) -> bool {
        self.mime_type
            .split(';')
            .next()
            .map(|t| t.trim().eq_ignore_ascii_case(mime_type))
            .unwrap_or(false)
    }
}

/// A message as returned by `users.messages.get`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default)]
    pub label_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// base64url RFC 2822 message, present with `format=raw`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl GmailMessage {
    /// Case-insensitive lookup of a top-level header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.header(name))
    }
}

/// Reference to a message in a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Response from `users.messages.list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    #[serde(default)]
    pub result_size_estimate: u64,
}

/// A Gmail label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,

    pub name: String,

    /// `system` or `user`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
}

/// Response from `users.labels.list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelList {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Response from `users.drafts.create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
}

/// A message reduced to what the assistant displays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMessage {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub attachments_present: bool,
    pub body_text: String,
}

impl DecodedMessage {
    /// Display name of the sender, without the address part
    pub fn sender_name(&self) -> &str {
        let name = match self.sender.find('<') {
            Some(pos) => self.sender[..pos].trim(),
            None => self.sender.trim(),
        };
        let name = name.trim_matches('"').trim();
        if name.is_empty() {
            self.sender.trim().trim_matches(|c| c == '<' || c == '>')
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message_payload() {
        let json = r#"{
            "id": "18c2f4a9b1e0d7c3",
            "threadId": "18c2f4a9b1e0d7c3",
            "labelIds": ["INBOX", "UNREAD"],
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [{"name": "Subject", "value": "Lunch"}],
                "body": {"size": 0},
                "parts": [
                    {"partId": "0", "mimeType": "text/plain", "filename": "",
                     "body": {"size": 5, "data": "aGVsbG8="}}
                ]
            }
        }"#;

        let message: GmailMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.label_ids, vec!["INBOX", "UNREAD"]);
        assert_eq!(message.header("subject"), Some("Lunch"));
        let payload = message.payload.unwrap();
        assert!(payload.is_type("multipart/alternative"));
        assert_eq!(payload.parts[0].body.data.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_label_type_field() {
        let labels: LabelList = serde_json::from_str(
            r#"{"labels": [{"id": "Label_1", "name": "Receipts", "type": "user"}]}"#,
        )
        .unwrap();
        assert_eq!(labels.labels[0].label_type.as_deref(), Some("user"));
    }

    #[test]
    fn test_mime_type_ignores_parameters() {
        let part = MessagePart {
            mime_type: "Text/HTML; charset=UTF-8".to_string(),
            ..Default::default()
        };
        assert!(part.is_type("text/html"));
        assert!(!part.is_type("text/plain"));
    }

    #[test]
    fn test_sender_name() {
        let mut message = DecodedMessage {
            sender: "\"Jane Doe\" <jane@example.com>".to_string(),
            ..Default::default()
        };
        assert_eq!(message.sender_name(), "Jane Doe");

        message.sender = "<jane@example.com>".to_string();
        assert_eq!(message.sender_name(), "jane@example.com");

        message.sender = "jane@example.com".to_string();
        assert_eq!(message.sender_name(), "jane@example.com");
    }
}
