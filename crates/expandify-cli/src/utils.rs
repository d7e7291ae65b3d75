use expandify_core::Snippet;

const PREVIEW_CHARS: usize = 40;

/// `content` with whitespace collapsed, shortened to `max` chars.
pub fn preview(content: &str, max: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let mut short: String = collapsed.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// One row of `expandify list`.
pub fn format_snippet_line(index: usize, snippet: &Snippet) -> String {
    let mut flags = Vec::new();
    if snippet.rich_text {
        flags.push("rich");
    }
    if snippet.disabled {
        flags.push("disabled");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };

    format!(
        "{:>3}  {:<12} {}{} (used {}x)\n     {}",
        index,
        snippet.trigger,
        snippet.name,
        flags,
        snippet.usage,
        preview(&snippet.content, PREVIEW_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_collapses_and_truncates() {
        assert_eq!(preview("Dear  team,\n\nthanks", 40), "Dear team, thanks");
        assert_eq!(preview("abcdefgh", 5), "abcd…");
        assert_eq!(preview("héllo", 5), "héllo");
    }

    #[test]
    fn line_shows_flags_and_usage() {
        let mut snippet = Snippet::new("sig", "Signature", "<b>Sam</b>").rich().disabled();
        snippet.usage = 7;
        let line = format_snippet_line(2, &snippet);
        assert!(line.starts_with("  2  sig"));
        assert!(line.contains("Signature [rich, disabled] (used 7x)"));
        assert!(line.ends_with("<b>Sam</b>"));
    }
}
