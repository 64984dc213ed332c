//! Command routing
//!
//! Turns one line of free text into an [`Intent`]. Trigger phrases are
//! detected case-insensitively in the priority order of [`grammar::RULES`];
//! text that matches no trigger becomes a general request.

pub mod grammar;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Intent;

use grammar::{FieldSpec, Rule, RuleKind, RULES};

pub use grammar::COMMAND_EXAMPLES;

/// Number of messages shown by `list emails`
pub const DEFAULT_LIST_COUNT: u32 = 5;

/// Count used by `find email` when none is given
pub const DEFAULT_FIND_COUNT: u32 = 1;

/// Count used by `summarize emails` when none is given
pub const DEFAULT_SUMMARIZE_COUNT: u32 = 10;

/// Parses command lines into intents
#[derive(Debug, Clone)]
pub struct IntentRouter {
    list_count: u32,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self {
            list_count: DEFAULT_LIST_COUNT,
        }
    }
}

impl IntentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override how many messages `list emails` asks for
    pub fn with_list_count(mut self, count: u32) -> Self {
        if count > 0 {
            self.list_count = count;
        }
        self
    }

    /// Parse a command line
    pub fn parse(&self, text: &str) -> Result<Intent> {
        // ASCII lowering keeps byte offsets aligned with `text`
        let lower = text.to_ascii_lowercase();

        let Some((rule, start)) = match_rule(&lower) else {
            return Ok(Intent::GeneralRequest {
                text: text.to_string(),
            });
        };
        debug!("Matched trigger '{}'", rule.trigger);

        let fields = Fields::extract(text, &lower, start, rule)?;
        let intent = match rule.kind {
            RuleKind::ConnectEmail => Intent::ConnectEmail {
                address: fields.require("address")?,
            },
            RuleKind::DraftEmail => Intent::DraftEmail {
                to: fields.require("to")?,
                subject: fields.require("subject")?,
                body: fields.require("body")?,
            },
            RuleKind::SendEmail => Intent::SendEmail {
                to: fields.require("to")?,
                subject: fields.require("subject")?,
                body: fields.require("body")?,
            },
            RuleKind::AnalyzeEmail => Intent::AnalyzeEmail {
                content_or_id: fields.require("content")?,
            },
            RuleKind::SuggestResponse => Intent::SuggestResponse {
                content_or_id: fields.require("content")?,
            },
            RuleKind::ListEmailsOn => Intent::ListEmailsOn {
                date: fields.parse_date(&fields.require("date")?)?,
            },
            RuleKind::SummarizeEmails => Intent::SummarizeEmails {
                count: match fields.get("count") {
                    Some(raw) => fields.parse_count(raw)?,
                    None => DEFAULT_SUMMARIZE_COUNT,
                },
            },
            RuleKind::ListEmails => Intent::ListEmails {
                count: self.list_count,
            },
            RuleKind::FindEmail => Intent::FindEmail {
                query: fields.require("query")?,
                count: match fields.get("count") {
                    Some(raw) => fields.parse_count(raw)?,
                    None => DEFAULT_FIND_COUNT,
                },
            },
            RuleKind::ListLabels => Intent::ListLabels,
            RuleKind::AddLabel => Intent::AddLabel {
                name: fields.require("name")?,
                email_id: fields.require("email_id")?,
            },
            RuleKind::RemoveLabel => Intent::RemoveLabel {
                name: fields.require("name")?,
                email_id: fields.require("email_id")?,
            },
        };

        Ok(intent)
    }
}

/// Parse a command line with the default settings
pub fn parse(text: &str) -> Result<Intent> {
    IntentRouter::default().parse(text)
}

/// First rule whose trigger occurs in the text, with the trigger's offset
fn match_rule(lower: &str) -> Option<(&'static Rule, usize)> {
    RULES
        .iter()
        .find_map(|rule| lower.find(rule.trigger).map(|pos| (rule, pos)))
}

/// Field values extracted for one rule
struct Fields<'a> {
    usage: &'static str,
    values: Vec<(&'static str, &'a str)>,
}

impl<'a> Fields<'a> {
    /// Locate each delimiter after the previous one; a value runs up to the
    /// next located delimiter, the last one to the end of the text.
    fn extract(text: &'a str, lower: &str, start: usize, rule: &Rule) -> Result<Self> {
        let usage = rule.usage.unwrap_or(rule.trigger);
        let malformed = || Error::Parse { usage };

        let mut located: Vec<(&FieldSpec, usize, usize)> = Vec::with_capacity(rule.fields.len());
        let mut cursor = start;
        for field in rule.fields {
            match lower[cursor..].find(field.delimiter) {
                Some(offset) => {
                    let at = cursor + offset;
                    let value_start = at + field.delimiter.len();
                    located.push((field, at, value_start));
                    cursor = value_start;
                }
                None if field.required => {
                    debug!("Missing delimiter '{}'", field.delimiter);
                    return Err(malformed());
                }
                None => {}
            }
        }

        let mut values = Vec::with_capacity(located.len());
        for (i, (field, _, value_start)) in located.iter().enumerate() {
            let end = located
                .get(i + 1)
                .map(|(_, at, _)| *at)
                .unwrap_or(text.len());
            let value = text[*value_start..end].trim();
            if field.required && value.is_empty() {
                debug!("Empty field '{}'", field.name);
                return Err(malformed());
            }
            values.push((field.name, value));
        }

        Ok(Self { usage, values })
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    }

    fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(String::from)
            .ok_or(Error::Parse { usage: self.usage })
    }

    fn parse_count(&self, raw: &str) -> Result<u32> {
        match raw.parse::<u32>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(Error::Parse { usage: self.usage }),
        }
    }

    fn parse_date(&self, raw: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
            debug!("Bad date '{}': {}", raw, e);
            Error::Parse { usage: self.usage }
        })
    }
}
