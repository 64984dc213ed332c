//! Command grammar
//!
//! Each rule names the trigger phrase that selects it, the usage hint shown
//! when the command is malformed, and the delimiters that introduce its
//! fields, in the order they must appear.

/// A delimited field within a command
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Text that introduces the field, matched case-insensitively
    pub delimiter: &'static str,
    pub name: &'static str,
    pub required: bool,
}

/// What a rule produces once its fields are extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    ConnectEmail,
    DraftEmail,
    SendEmail,
    AnalyzeEmail,
    SuggestResponse,
    ListEmailsOn,
    SummarizeEmails,
    ListEmails,
    FindEmail,
    ListLabels,
    AddLabel,
    RemoveLabel,
}

/// One grammar rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub trigger: &'static str,
    pub kind: RuleKind,
    /// Hint shown on a malformed command; rules without fields cannot fail
    pub usage: Option<&'static str>,
    pub fields: &'static [FieldSpec],
}

const fn required(delimiter: &'static str, name: &'static str) -> FieldSpec {
    FieldSpec {
        delimiter,
        name,
        required: true,
    }
}

const fn optional(delimiter: &'static str, name: &'static str) -> FieldSpec {
    FieldSpec {
        delimiter,
        name,
        required: false,
    }
}

const MESSAGE_FIELDS: &[FieldSpec] = &[
    required("to:", "to"),
    required("subject:", "subject"),
    required("context:", "body"),
];

/// Rules in priority order; the first trigger found in the text wins
pub const RULES: &[Rule] = &[
    Rule {
        trigger: "connect email",
        kind: RuleKind::ConnectEmail,
        usage: Some("connect email: your.email@example.com"),
        fields: &[required("connect email:", "address")],
    },
    Rule {
        trigger: "draft email",
        kind: RuleKind::DraftEmail,
        usage: Some(
            "draft email to: recipient@email.com subject: your subject context: your context",
        ),
        fields: MESSAGE_FIELDS,
    },
    Rule {
        trigger: "send email",
        kind: RuleKind::SendEmail,
        usage: Some(
            "send email to: recipient@email.com subject: your subject context: your context",
        ),
        fields: MESSAGE_FIELDS,
    },
    Rule {
        trigger: "analyze email",
        kind: RuleKind::AnalyzeEmail,
        usage: Some("analyze email: [paste email content or message ID]"),
        fields: &[required("analyze email:", "content")],
    },
    Rule {
        trigger: "suggest response",
        kind: RuleKind::SuggestResponse,
        usage: Some("suggest response: [paste email to respond to]"),
        fields: &[required("suggest response:", "content")],
    },
    Rule {
        trigger: "list emails on:",
        kind: RuleKind::ListEmailsOn,
        usage: Some("list emails on: YYYY-MM-DD"),
        fields: &[required("list emails on:", "date")],
    },
    Rule {
        trigger: "summarize emails",
        kind: RuleKind::SummarizeEmails,
        usage: Some("summarize emails count: number_of_emails"),
        fields: &[optional("count:", "count")],
    },
    Rule {
        trigger: "list emails",
        kind: RuleKind::ListEmails,
        usage: None,
        fields: &[],
    },
    Rule {
        trigger: "find email",
        kind: RuleKind::FindEmail,
        usage: Some("find email: name_or_email count: number_of_emails"),
        fields: &[required("find email:", "query"), optional("count:", "count")],
    },
    Rule {
        trigger: "list labels",
        kind: RuleKind::ListLabels,
        usage: None,
        fields: &[],
    },
    Rule {
        trigger: "add label",
        kind: RuleKind::AddLabel,
        usage: Some("add label: label_name to: email_id"),
        fields: &[required("add label:", "name"), required("to:", "email_id")],
    },
    Rule {
        trigger: "remove label",
        kind: RuleKind::RemoveLabel,
        usage: Some("remove label: label_name from: email_id"),
        fields: &[
            required("remove label:", "name"),
            required("from:", "email_id"),
        ],
    },
];

/// Command starters offered to the user, as `(title, template)`
pub const COMMAND_EXAMPLES: &[(&str, &str)] = &[
    ("Connect Email", "connect email: your.email@example.com"),
    ("Draft Email", "draft email to:  subject:  context: "),
    ("Send Email", "send email to:  subject:  context: "),
    ("Analyze Email", "analyze email: [paste email content or message ID]"),
    ("Suggest Response", "suggest response: [paste email to respond to]"),
    ("List Emails", "list emails"),
    ("Emails On Date", "list emails on: YYYY-MM-DD"),
    ("Summarize Emails", "summarize emails count: [number]"),
    ("Find Email", "find email: [name or email] count: [number]"),
    ("List Labels", "list labels"),
    ("Add Label", "add label: [label_name] to: [email_id]"),
    ("Remove Label", "remove label: [label_name] from: [email_id]"),
];
