use regex::Regex;
use std::sync::OnceLock;

struct Rules {
    open_paragraph: Regex,
    close_paragraph: Regex,
    line_break: Regex,
    open_item: Regex,
    close_item: Regex,
    any_tag: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        open_paragraph: Regex::new(r"(?i)<p>").unwrap(),
        close_paragraph: Regex::new(r"(?i)</p>").unwrap(),
        line_break: Regex::new(r"(?i)<br\s*/?>").unwrap(),
        open_item: Regex::new(r"(?i)<li>").unwrap(),
        close_item: Regex::new(r"(?i)</li>").unwrap(),
        any_tag: Regex::new(r"<[^>]+>").unwrap(),
    })
}

/// Plain-text fallback for rich clipboard content.
///
/// Paragraph and line-break tags become newlines, list items become
/// bullets, and every other tag is dropped.
pub fn strip_markup(html: &str) -> String {
    let rules = rules();
    let text = rules.open_paragraph.replace_all(html, "");
    let text = rules.close_paragraph.replace_all(&text, "\n");
    let text = rules.line_break.replace_all(&text, "\n");
    let text = rules.open_item.replace_all(&text, "• ");
    let text = rules.close_item.replace_all(&text, "\n");
    let text = rules.any_tag.replace_all(&text, "");
    text.trim().to_string()
}
