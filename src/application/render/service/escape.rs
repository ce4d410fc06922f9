use std::{cell::Cell, collections::HashSet, rc::Rc};

use lol_html::{
    RewriteStrSettings, doc_text, element, end_tag,
    html_content::{ContentType, Element, TextType},
    rewrite_str,
};

use crate::application::render::types::RenderError;

pub(crate) struct EscapeOutcome {
    pub(crate) html: String,
    pub(crate) escaped_tags: u32,
}

/// Replace the tags of every element outside `allowed` with their literal,
/// entity-escaped text. Inner content is left in place, so `<script>x</script>`
/// becomes `&lt;script&gt;x&lt;/script&gt;`.
///
/// The body of raw-text elements (`script`, `style`, `textarea`, ...) is not
/// parsed as markup, so it is escaped as a whole. A closing text is only
/// written when the source carries an explicit end tag.
pub(crate) fn escape_disallowed(
    html: &str,
    allowed: &HashSet<&'static str>,
) -> Result<EscapeOutcome, RenderError> {
    let escaped = Rc::new(Cell::new(0u32));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let escaped = Rc::clone(&escaped);
                move |el: &mut Element| {
                    let name = el.tag_name();
                    if allowed.contains(name.as_str()) {
                        return Ok(());
                    }

                    let start_tag = literal_start_tag(el);
                    el.before(&start_tag, ContentType::Text);
                    if el.can_have_content() {
                        el.on_end_tag(end_tag!(move |end| {
                            end.before(&format!("</{name}>"), ContentType::Text);
                            Ok(())
                        }))?;
                    }
                    el.remove_and_keep_content();
                    escaped.set(escaped.get().saturating_add(1));
                    Ok(())
                }
            })],
            document_content_handlers: vec![doc_text!(|chunk| {
                if is_raw_text(chunk.text_type()) && !chunk.as_str().is_empty() {
                    let literal = chunk.as_str().to_string();
                    chunk.replace(&literal, ContentType::Text);
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    Ok(EscapeOutcome {
        html: rewritten,
        escaped_tags: escaped.get(),
    })
}

fn is_raw_text(text_type: TextType) -> bool {
    matches!(
        text_type,
        TextType::ScriptData | TextType::RawText | TextType::RCData | TextType::PlainText
    )
}

fn literal_start_tag(el: &Element<'_, '_>) -> String {
    let mut tag = format!("<{}", el.tag_name());
    for attribute in el.attributes() {
        let value = attribute.value();
        if value.is_empty() {
            tag.push_str(&format!(" {}", attribute.name()));
        } else {
            tag.push_str(&format!(" {}=\"{}\"", attribute.name(), value));
        }
    }
    if el.is_self_closing() {
        tag.push_str(" /");
    }
    tag.push('>');
    tag
}

#[cfg(test)]
mod tests {
    use super::escape_disallowed;
    use crate::application::render::service::config::allowed_tags;

    fn escape(html: &str) -> (String, u32) {
        let outcome = escape_disallowed(html, &allowed_tags()).expect("escape succeeds");
        (outcome.html, outcome.escaped_tags)
    }

    #[test]
    fn script_tags_become_text() {
        let (html, count) = escape("<script>alert('x')</script>");
        assert_eq!(html, "&lt;script&gt;alert('x')&lt;/script&gt;");
        assert_eq!(count, 1);
    }

    #[test]
    fn allowed_tags_pass_through_untouched() {
        let (html, count) = escape("<p><em>hi</em> <a href=\"/x\">there</a></p>");
        assert_eq!(html, "<p><em>hi</em> <a href=\"/x\">there</a></p>");
        assert_eq!(count, 0);
    }

    #[test]
    fn attributes_are_kept_in_escaped_text() {
        let (html, _) = escape("<iframe src=\"https://evil.example\"></iframe>");
        assert!(html.starts_with("&lt;iframe src="));
        assert!(html.contains("https://evil.example"));
        assert!(html.ends_with("&lt;/iframe&gt;"));
        assert!(!html.contains("<iframe"));
    }

    #[test]
    fn void_elements_get_no_closing_text() {
        let (html, count) = escape("<p>a<br />b</p><hr />");
        assert_eq!(html, "<p>a&lt;br /&gt;b</p>&lt;hr /&gt;");
        assert_eq!(count, 2);
    }

    #[test]
    fn nested_disallowed_elements_are_all_escaped() {
        let (html, count) = escape("<div><span><b>bold</b></span></div>");
        assert_eq!(
            html,
            "<div>&lt;span&gt;&lt;b&gt;bold&lt;/b&gt;&lt;/span&gt;</div>"
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn script_body_is_escaped_as_text() {
        let (html, count) = escape("<script>if (a<b) { go('<iframe>') }</script>");
        assert_eq!(
            html,
            "&lt;script&gt;if (a&lt;b) { go('&lt;iframe&gt;') }&lt;/script&gt;"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn textarea_body_is_not_parsed_as_markup() {
        let (html, count) = escape("<textarea><script>alert(1)</script></textarea>");
        assert_eq!(
            html,
            "&lt;textarea&gt;&lt;script&gt;alert(1)&lt;/script&gt;&lt;/textarea&gt;"
        );
        assert_eq!(count, 1);
    }

    #[test]
    fn implicitly_closed_elements_get_no_closing_text() {
        let (html, count) = escape("<p><span>unclosed <b>bold</p>");
        assert_eq!(html, "<p>&lt;span&gt;unclosed &lt;b&gt;bold</p>");
        assert_eq!(count, 2);
    }
}
