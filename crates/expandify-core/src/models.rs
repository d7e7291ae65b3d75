use crate::error::{ExpandifyError, Result};
use serde::{Deserialize, Serialize};

pub const MAX_TRIGGER_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 1_000_000;

/// A stored expansion. Identity is the position in the repository list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub trigger: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub rich_text: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub usage: u64,
}

impl Snippet {
    pub fn new(trigger: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            name: name.into(),
            content: content.into(),
            rich_text: false,
            disabled: false,
            usage: 0,
        }
    }

    pub fn rich(mut self) -> Self {
        self.rich_text = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Number of characters to erase when this snippet fires.
    pub fn trigger_len(&self) -> usize {
        self.trigger.chars().count()
    }

    /// Case-insensitive suffix test against the typed tail.
    pub fn matches(&self, typed: &str) -> bool {
        !self.disabled && typed.to_lowercase().ends_with(&self.trigger.to_lowercase())
    }
}

/// Incoming add/update request. `disabled` and `usage` are optional so an
/// update can leave the stored values alone.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnippetDraft {
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rich_text: bool,
    pub disabled: Option<bool>,
    pub usage: Option<u64>,
}

impl SnippetDraft {
    pub fn new(trigger: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn rich_text(mut self, rich: bool) -> Self {
        self.rich_text = rich;
        self
    }

    /// Reject empty or oversized fields. Lengths are counted in characters.
    pub fn validate(&self) -> Result<()> {
        check_field("trigger", &self.trigger, MAX_TRIGGER_LEN)?;
        check_field("name", &self.name, MAX_NAME_LEN)?;
        check_field("content", &self.content, MAX_CONTENT_LEN)?;
        Ok(())
    }

    /// Build a new snippet, defaulting `disabled`/`usage`.
    pub fn into_snippet(self) -> Snippet {
        Snippet {
            disabled: self.disabled.unwrap_or(false),
            usage: self.usage.unwrap_or(0),
            trigger: self.trigger,
            name: self.name,
            content: self.content,
            rich_text: self.rich_text,
        }
    }

    /// Build the replacement for `existing`, keeping its flags unless overridden.
    pub fn apply_to(self, existing: &Snippet) -> Snippet {
        Snippet {
            disabled: self.disabled.unwrap_or(existing.disabled),
            usage: self.usage.unwrap_or(existing.usage),
            trigger: self.trigger,
            name: self.name,
            content: self.content,
            rich_text: self.rich_text,
        }
    }
}

impl From<Snippet> for SnippetDraft {
    fn from(snippet: Snippet) -> Self {
        Self {
            trigger: snippet.trigger,
            name: snippet.name,
            content: snippet.content,
            rich_text: snippet.rich_text,
            disabled: Some(snippet.disabled),
            usage: Some(snippet.usage),
        }
    }
}

fn check_field(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(ExpandifyError::Validation(format!(
            "{} must be a non-empty string",
            field
        )));
    }
    if value.chars().count() > max {
        return Err(ExpandifyError::Validation(format!(
            "{} exceeds maximum length of {} characters",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_trigger() {
        let draft = SnippetDraft::new("x".repeat(101), "name", "content");
        let err = draft.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("trigger exceeds maximum length"));

        assert!(SnippetDraft::new("x".repeat(100), "name", "content")
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(SnippetDraft::new("", "n", "c").validate().is_err());
        assert!(SnippetDraft::new("t", "", "c").validate().is_err());
        assert!(SnippetDraft::new("t", "n", "").validate().is_err());
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        let trigger = "é".repeat(100);
        assert!(SnippetDraft::new(trigger, "n", "c").validate().is_ok());
        assert!(SnippetDraft::new("t", "ü".repeat(201), "c")
            .validate()
            .is_err());
    }

    #[test]
    fn update_preserves_flags_unless_overridden() {
        let mut existing = Snippet::new("brb", "Be right back", "be right back");
        existing.disabled = true;
        existing.usage = 7;

        let kept = SnippetDraft::new("brb", "BRB", "back soon").apply_to(&existing);
        assert!(kept.disabled);
        assert_eq!(kept.usage, 7);
        assert_eq!(kept.content, "back soon");

        let mut draft = SnippetDraft::new("brb", "BRB", "back soon");
        draft.disabled = Some(false);
        draft.usage = Some(0);
        let overridden = draft.apply_to(&existing);
        assert!(!overridden.disabled);
        assert_eq!(overridden.usage, 0);
    }

    #[test]
    fn legacy_records_default_new_fields() {
        let json = r#"{"trigger":"sig","name":"Signature","content":"Regards"}"#;
        let snippet: Snippet = serde_json::from_str(json).unwrap();
        assert!(!snippet.rich_text);
        assert!(!snippet.disabled);
        assert_eq!(snippet.usage, 0);
    }

    #[test]
    fn matching_is_case_insensitive_and_skips_disabled() {
        let snippet = Snippet::new("BRB", "n", "c");
        assert!(snippet.matches("ok brb"));
        assert!(!snippet.clone().disabled().matches("ok brb"));
        assert!(!snippet.matches("brb ok"));
    }
}
