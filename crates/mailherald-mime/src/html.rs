//! Plain-text to HTML email rendering.
//!
//! Campaign bodies are authored as plain text. The HTML part is generated
//! from that text: blank lines split paragraphs, and lines starting with
//! `*`, `-`, or `•` become items of a bulleted list.

/// Converts a plain-text email body into a styled HTML email.
///
/// The output is a self-contained HTML document with inline styles,
/// suitable as the `text/html` alternative part of an outgoing message.
#[must_use]
pub fn render_html_body(plain: &str) -> String {
    let normalized = plain.replace("\r\n", "\n").replace('\r', "\n");

    let mut html = String::new();
    let mut in_list = false;
    let mut paragraph = String::new();

    fn flush_paragraph(html: &mut String, paragraph: &mut String) {
        if !paragraph.trim().is_empty() {
            html.push_str(&format!(
                "<p style=\"margin: 0 0 16px 0; line-height: 1.6;\">{}</p>\n",
                paragraph.trim()
            ));
        }
        paragraph.clear();
    }

    fn end_list(html: &mut String, in_list: &mut bool) {
        if *in_list {
            html.push_str("</ul>\n");
            *in_list = false;
        }
    }

    for line in normalized.lines() {
        let trimmed = line.trim();

        // Bullet line: "* item", "- item", or "• item"
        if let Some(item) = bullet_item(trimmed) {
            if !in_list {
                flush_paragraph(&mut html, &mut paragraph);
                html.push_str(
                    "<ul style=\"margin: 0 0 16px 0; padding-left: 24px; line-height: 1.6;\">\n",
                );
                in_list = true;
            }
            html.push_str(&format!(
                "  <li style=\"margin-bottom: 6px;\">{item}</li>\n"
            ));
            continue;
        }

        // Empty line = paragraph break
        if trimmed.is_empty() {
            end_list(&mut html, &mut in_list);
            flush_paragraph(&mut html, &mut paragraph);
            continue;
        }

        // Regular text line joins the current paragraph
        end_list(&mut html, &mut in_list);
        if paragraph.is_empty() {
            paragraph.push_str(trimmed);
        } else {
            paragraph.push(' ');
            paragraph.push_str(trimmed);
        }
    }

    end_list(&mut html, &mut in_list);
    flush_paragraph(&mut html, &mut paragraph);

    wrap_document(&html)
}

/// Returns the item text if the line is a bullet line.
fn bullet_item(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix('*')
        .or_else(|| line.strip_prefix('-'))
        .or_else(|| line.strip_prefix('•'))?;
    let item = rest.trim_start();
    if item.is_empty() { None } else { Some(item) }
}

/// Wraps rendered content in the email container table.
fn wrap_document(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         </head>\n\
         <body style=\"margin: 0; padding: 0; background-color: #f9fafb;\">\n\
         <table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" border=\"0\">\n\
         <tr>\n\
         <td align=\"center\" style=\"padding: 20px 0;\">\n\
         <table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" border=\"0\" style=\"max-width: 600px; margin: 0 auto;\">\n\
         <tr>\n\
         <td style=\"background-color: #ffffff; padding: 32px 40px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif; font-size: 15px; color: #1f2937;\">\n\
         {content}\
         </td>\n\
         </tr>\n\
         </table>\n\
         </td>\n\
         </tr>\n\
         </table>\n\
         </body>\n\
         </html>"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let html = render_html_body("First paragraph.\n\nSecond paragraph.");
        assert!(html.contains("<p style=\"margin: 0 0 16px 0; line-height: 1.6;\">First paragraph.</p>"));
        assert!(html.contains("Second paragraph.</p>"));
    }

    #[test]
    fn test_adjacent_lines_join_paragraph() {
        let html = render_html_body("Line one\nline two");
        assert!(html.contains(">Line one line two</p>"));
    }

    #[test]
    fn test_bullets_become_list_items() {
        let html = render_html_body("Highlights:\n* fast\n- simple\n• tested");
        assert_eq!(html.matches("<li").count(), 3);
        assert!(html.contains(">fast</li>"));
        assert!(html.contains(">simple</li>"));
        assert!(html.contains(">tested</li>"));
        assert_eq!(html.matches("<ul").count(), 1);
    }

    #[test]
    fn test_list_closed_before_following_paragraph() {
        let html = render_html_body("* one\n\nAfter the list.");
        let ul_end = html.find("</ul>").unwrap();
        let para = html.find("After the list.").unwrap();
        assert!(ul_end < para);
    }

    #[test]
    fn test_crlf_normalized() {
        let html = render_html_body("First.\r\n\r\nSecond.");
        assert!(html.contains(">First.</p>"));
        assert!(html.contains(">Second.</p>"));
    }

    #[test]
    fn test_bare_bullet_marker_is_text() {
        // "*" with no item text is not a list item
        let html = render_html_body("*");
        assert!(!html.contains("<li"));
    }
}
