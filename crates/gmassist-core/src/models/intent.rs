//! Structured commands produced by the router

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Set the sender address used by the tools
    ConnectEmail { address: String },
    DraftEmail { to: String, subject: String, body: String },
    SendEmail { to: String, subject: String, body: String },
    /// Pasted message text or a Gmail message ID
    AnalyzeEmail { content_or_id: String },
    SuggestResponse { content_or_id: String },
    ListEmails { count: u32 },
    /// Inbox messages received on one day, with summaries
    ListEmailsOn { date: NaiveDate },
    /// Most recent inbox messages, with summaries
    SummarizeEmails { count: u32 },
    FindEmail { query: String, count: u32 },
    ListLabels,
    AddLabel { name: String, email_id: String },
    RemoveLabel { name: String, email_id: String },
    /// Anything that matched no trigger phrase
    GeneralRequest { text: String },
}

impl Intent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ConnectEmail { .. } => "connect_email",
            Intent::DraftEmail { .. } => "draft_email",
            Intent::SendEmail { .. } => "send_email",
            Intent::AnalyzeEmail { .. } => "analyze_email",
            Intent::SuggestResponse { .. } => "suggest_response",
            Intent::ListEmails { .. } => "list_emails",
            Intent::ListEmailsOn { .. } => "list_emails_on",
            Intent::SummarizeEmails { .. } => "summarize_emails",
            Intent::FindEmail { .. } => "find_email",
            Intent::ListLabels => "list_labels",
            Intent::AddLabel { .. } => "add_label",
            Intent::RemoveLabel { .. } => "remove_label",
            Intent::GeneralRequest { .. } => "general_request",
        }
    }
}
