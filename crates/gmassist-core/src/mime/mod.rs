//! MIME decoding and encoding
//!
//! Gmail returns message bodies as base64url data inside a tree of
//! `MessagePart`s. This module pulls readable text out of that tree and
//! builds the raw RFC 2822 messages the send and draft endpoints accept.

mod html;
mod qp;

pub use html::html_to_text;
pub use qp::quoted_printable_decode;

use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use mail_builder::headers::address::Address;
use mail_builder::MessageBuilder;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{DecodedMessage, GmailMessage, MessagePart};

/// Body text used when no decoding succeeds
pub const UNDECODABLE_BODY: &str = "Could not decode email body";

pub const DEFAULT_SUBJECT: &str = "No subject";
pub const DEFAULT_SENDER: &str = "Unknown sender";
pub const DEFAULT_DATE: &str = "Unknown date";

/// Extract the readable body of a message payload.
///
/// A `text/plain` part anywhere in the tree wins; otherwise a `text/html`
/// part is reduced to text. A payload without parts decodes its own body.
pub fn decode_body(payload: &MessagePart) -> String {
    if payload.parts.is_empty() {
        let Some(data) = payload.body.data.as_deref() else {
            return String::new();
        };
        let text = decode_data(data);
        return if payload.is_type("text/html") && text != UNDECODABLE_BODY {
            html_to_text(&text)
        } else {
            text
        };
    }

    if let Some(data) = find_text_part(payload, "text/plain") {
        return decode_data(data);
    }

    if let Some(data) = find_text_part(payload, "text/html") {
        let text = decode_data(data);
        if text == UNDECODABLE_BODY {
            return text;
        }
        return html_to_text(&text);
    }

    debug!("No text part in {} payload", payload.mime_type);
    String::new()
}

/// Depth-first search for an inline part of the given type carrying data
fn find_text_part<'a>(part: &'a MessagePart, mime_type: &str) -> Option<&'a str> {
    for child in &part.parts {
        if child.is_type(mime_type) && child.filename.is_empty() {
            if let Some(data) = child.body.data.as_deref() {
                return Some(data);
            }
        }
        if !child.parts.is_empty() {
            if let Some(data) = find_text_part(child, mime_type) {
                return Some(data);
            }
        }
    }
    None
}

/// Decode one body's data: base64url (padded or not), then
/// quoted-printable, then the undecodable sentinel.
fn decode_data(data: &str) -> String {
    let trimmed = data.trim();

    let decoded = URL_SAFE
        .decode(trimmed)
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed));

    let bytes = match decoded {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => return text,
            // base64 payload that is itself quoted-printable
            Err(e) => quoted_printable_decode(e.as_bytes()),
        },
        Err(_) => quoted_printable_decode(trimmed.as_bytes()),
    };

    match bytes.map(String::from_utf8) {
        Ok(Ok(text)) => text,
        _ => {
            warn!("Could not decode body data ({} bytes)", data.len());
            UNDECODABLE_BODY.to_string()
        }
    }
}

/// Whether any part carries a filename, or the top-level body is an attachment
pub fn has_attachments(payload: &MessagePart) -> bool {
    fn any_named(parts: &[MessagePart]) -> bool {
        parts
            .iter()
            .any(|p| !p.filename.is_empty() || any_named(&p.parts))
    }

    if !payload.parts.is_empty() {
        any_named(&payload.parts)
    } else {
        payload.body.attachment_id.is_some()
    }
}

/// Reduce a Gmail message to its display fields
pub fn decode_message(message: &GmailMessage) -> DecodedMessage {
    if message.payload.is_none() {
        if let Some(raw) = message.raw.as_deref() {
            match decode_raw(raw) {
                Ok(mut decoded) => {
                    decoded.id = message.id.clone();
                    return decoded;
                }
                Err(e) => warn!("Could not parse raw message {}: {}", message.id, e),
            }
        }
    }

    let header = |name: &str, default: &str| {
        message
            .header(name)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };

    DecodedMessage {
        id: message.id.clone(),
        subject: header("Subject", DEFAULT_SUBJECT),
        sender: header("From", DEFAULT_SENDER),
        date: header("Date", DEFAULT_DATE),
        attachments_present: message.payload.as_ref().map(has_attachments).unwrap_or(false),
        body_text: message.payload.as_ref().map(decode_body).unwrap_or_default(),
    }
}

/// Build a `text/plain; charset=utf-8` message and encode it for the
/// Gmail `raw` field (base64url, no padding).
pub fn encode_message(to: &str, subject: &str, body: &str, from: Option<&str>) -> Result<String> {
    let recipients: Vec<Address<'_>> = to
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(mailbox)
        .collect();
    if recipients.is_empty() {
        return Err(Error::Other("No recipient address".to_string()));
    }

    let mut builder = MessageBuilder::new()
        .to(recipients)
        .subject(subject)
        .text_body(body);
    if let Some(from) = from.map(str::trim).filter(|f| !f.is_empty()) {
        builder = builder.from(mailbox(from));
    }

    let message = builder.write_to_string()?;
    debug!("Built message of {} bytes", message.len());
    Ok(URL_SAFE_NO_PAD.encode(message.as_bytes()))
}

/// `Name <addr>` or a bare address
fn mailbox(text: &str) -> Address<'_> {
    match (text.find('<'), text.strip_suffix('>')) {
        (Some(open), Some(inner)) if open > 0 => {
            let name = text[..open].trim().trim_matches('"');
            let email = inner[open + 1..].trim();
            Address::from((name, email))
        }
        (Some(0), Some(inner)) => Address::from(inner[1..].trim()),
        _ => Address::from(text),
    }
}

/// Parse a base64url raw message, as produced by [`encode_message`] or
/// returned by `format=raw`.
pub fn decode_raw(raw: &str) -> Result<DecodedMessage> {
    let trimmed = raw.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .map_err(|e| Error::Decode(format!("raw message is not base64url: {}", e)))?;

    let parsed = mail_parser::MessageParser::default()
        .parse(&bytes)
        .ok_or_else(|| Error::Decode("Failed to parse email".to_string()))?;

    let sender = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(email)) => format!("{} <{}>", name, email),
            (None, Some(email)) => email.to_string(),
            (Some(name), None) => name.to_string(),
            (None, None) => DEFAULT_SENDER.to_string(),
        })
        .unwrap_or_else(|| DEFAULT_SENDER.to_string());
    let attachments_present = parsed.attachments().next().is_some();

    Ok(DecodedMessage {
        id: String::new(),
        subject: parsed.subject().unwrap_or(DEFAULT_SUBJECT).to_string(),
        sender,
        date: parsed
            .date()
            .map(|d| d.to_rfc822())
            .unwrap_or_else(|| DEFAULT_DATE.to_string()),
        attachments_present,
        body_text: parsed
            .body_text(0)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Header, MessagePartBody};

    fn b64(text: &str) -> String {
        URL_SAFE.encode(text.as_bytes())
    }

    fn part(mime_type: &str, data: Option<String>) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            body: MessagePartBody {
                data,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn multipart(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_then_decode_raw() {
        let raw = encode_message("x@y.com", "S", "hello world", None).unwrap();
        assert!(!raw.contains('='));
        let decoded = decode_raw(&raw).unwrap();
        assert_eq!(decoded.body_text, "hello world");
        assert_eq!(decoded.subject, "S");
        assert!(!decoded.attachments_present);
    }

    #[test]
    fn test_decode_raw_with_attachment() {
        let message = MessageBuilder::new()
            .from(("Ann", "ann@example.com"))
            .to("x@y.com")
            .subject("Notes")
            .text_body("see attached")
            .attachment("text/plain", "notes.txt", "meeting notes")
            .write_to_string()
            .unwrap();

        let decoded = decode_raw(&URL_SAFE_NO_PAD.encode(message.as_bytes())).unwrap();
        assert!(decoded.attachments_present);
        assert_eq!(decoded.sender, "Ann <ann@example.com>");
        assert_eq!(decoded.body_text, "see attached");
    }

    #[test]
    fn test_encode_sets_from_and_multiple_recipients() {
        let raw = encode_message(
            "a@b.com, Bob Smith <bob@example.com>",
            "Status",
            "On track",
            Some("me@example.com"),
        )
        .unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(&raw).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("a@b.com"));
        assert!(text.contains("bob@example.com"));
        assert!(text.contains("me@example.com"));

        let decoded = decode_raw(&raw).unwrap();
        assert_eq!(decoded.sender, "me@example.com");
    }

    #[test]
    fn test_encode_requires_recipient() {
        assert!(encode_message(" , ", "S", "body", None).is_err());
    }

    #[test]
    fn test_html_only_multipart() {
        let payload = multipart(
            "multipart/alternative",
            vec![part("text/html", Some(b64("<p>Hi <b>there</b></p>")))],
        );
        assert_eq!(decode_body(&payload), "Hi there");
    }

    #[test]
    fn test_plain_text_preferred_in_nested_parts() {
        let payload = multipart(
            "multipart/mixed",
            vec![
                multipart(
                    "multipart/alternative",
                    vec![
                        part("text/html", Some(b64("<p>html</p>"))),
                        part("text/plain", Some(b64("plain body"))),
                    ],
                ),
                MessagePart {
                    filename: "report.pdf".to_string(),
                    ..part("application/pdf", None)
                },
            ],
        );
        assert_eq!(decode_body(&payload), "plain body");
        assert!(has_attachments(&payload));
    }

    #[test]
    fn test_single_part_bodies() {
        let plain = part("text/plain", Some(URL_SAFE_NO_PAD.encode("no padding here!")));
        assert_eq!(decode_body(&plain), "no padding here!");

        let html = part("text/html; charset=UTF-8", Some(b64("<div>Hello</div>")));
        assert_eq!(decode_body(&html), "Hello");

        assert_eq!(decode_body(&part("text/plain", None)), "");
    }

    #[test]
    fn test_quoted_printable_fallback() {
        let payload = part("text/plain", Some("Caf=C3=A9 au lait".to_string()));
        assert_eq!(decode_body(&payload), "Café au lait");
    }

    #[test]
    fn test_undecodable_sentinel() {
        let payload = part("text/plain", Some("abc=ZZ".to_string()));
        assert_eq!(decode_body(&payload), UNDECODABLE_BODY);
    }

    #[test]
    fn test_attachment_detection() {
        let plain = multipart("multipart/alternative", vec![part("text/plain", Some(b64("x")))]);
        assert!(!has_attachments(&plain));

        let nested = multipart(
            "multipart/mixed",
            vec![multipart(
                "multipart/related",
                vec![MessagePart {
                    filename: "logo.png".to_string(),
                    ..part("image/png", None)
                }],
            )],
        );
        assert!(has_attachments(&nested));

        let top_level = MessagePart {
            body: MessagePartBody {
                attachment_id: Some("ANGjdJ8".to_string()),
                ..Default::default()
            },
            ..part("application/pdf", None)
        };
        assert!(has_attachments(&top_level));
    }

    #[test]
    fn test_decode_message_headers() {
        let message = GmailMessage {
            id: "18c2f4a9b1e0d7c3".to_string(),
            payload: Some(MessagePart {
                headers: vec![
                    Header::new("SUBJECT", "Lunch?"),
                    Header::new("from", "Jane <jane@example.com>"),
                ],
                ..part("text/plain", Some(b64("Noon works")))
            }),
            ..Default::default()
        };

        let decoded = decode_message(&message);
        assert_eq!(decoded.subject, "Lunch?");
        assert_eq!(decoded.sender, "Jane <jane@example.com>");
        assert_eq!(decoded.date, DEFAULT_DATE);
        assert_eq!(decoded.body_text, "Noon works");
        assert!(!decoded.attachments_present);
    }

    #[test]
    fn test_decode_message_defaults_without_payload() {
        let decoded = decode_message(&GmailMessage {
            id: "abc".to_string(),
            ..Default::default()
        });
        assert_eq!(decoded.subject, DEFAULT_SUBJECT);
        assert_eq!(decoded.sender, DEFAULT_SENDER);
        assert_eq!(decoded.body_text, "");
    }

    #[test]
    fn test_decode_message_from_raw() {
        let raw = encode_message("x@y.com", "Raw", "from raw", Some("a@b.com")).unwrap();
        let decoded = decode_message(&GmailMessage {
            id: "r1".to_string(),
            raw: Some(raw),
            ..Default::default()
        });
        assert_eq!(decoded.id, "r1");
        assert_eq!(decoded.body_text, "from raw");
    }
}
