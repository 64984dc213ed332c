//! HTML to plain text

use tracing::warn;

/// Wrap width for rendered HTML bodies
const TEXT_WIDTH: usize = 120;

/// Render an HTML document as readable text.
///
/// Comments, scripts and markup are dropped; emphasis and links are rendered
/// without decoration markers. Trailing whitespace is trimmed from each line.
pub fn html_to_text(html: &str) -> String {
    match html2text::config::rich().string_from_read(html.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        Err(e) => {
            warn!("Could not render HTML body: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_tags_are_dropped() {
        assert_eq!(html_to_text("<p>Hi <b>there</b></p>"), "Hi there");
    }

    #[test]
    fn test_conditional_comments_are_hidden() {
        let html = "<!--[if mso]><p>Outlook only</p><![endif]--><p>Hello</p>";
        assert_eq!(html_to_text(html), "Hello");
    }

    #[test]
    fn test_quoted_attribute_with_angle_bracket() {
        assert_eq!(html_to_text(r#"<p title="a>b">Hi</p>"#), "Hi");
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            html_to_text("<p>Fish &amp; chips &lt;3</p>"),
            "Fish & chips <3"
        );
    }

    #[test]
    fn test_paragraphs_stay_in_order() {
        let text = html_to_text("<p>First</p><p>Second</p>");
        let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["First", "Second"]);
    }
}
