use crate::error::{ExpandifyError, Result};
use arboard::Clipboard;

/// Text plus optional markup, written and restored as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardContents {
    pub text: String,
    pub html: Option<String>,
}

impl ClipboardContents {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: None,
        }
    }

    pub fn rich(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: Some(html.into()),
        }
    }

    /// Markup is only worth restoring when present and non-empty.
    pub fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|html| !html.is_empty())
    }
}

pub trait ClipboardAccess: Send + Sync {
    fn read(&self) -> Result<ClipboardContents>;

    /// Writing markup must carry the text alongside it.
    fn write(&self, contents: &ClipboardContents) -> Result<()>;
}

/// The OS clipboard through `arboard`. A handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

fn open() -> Result<Clipboard> {
    Clipboard::new().map_err(|e| ExpandifyError::Clipboard(e.to_string()))
}

impl ClipboardAccess for SystemClipboard {
    fn read(&self) -> Result<ClipboardContents> {
        let mut clipboard = open()?;
        let text = match clipboard.get_text() {
            Ok(text) => text,
            Err(arboard::Error::ContentNotAvailable) => String::new(),
            Err(e) => return Err(ExpandifyError::Clipboard(e.to_string())),
        };
        // Markup is optional; any failure just means there is none.
        let html = clipboard.get().html().ok().filter(|html| !html.is_empty());
        Ok(ClipboardContents { text, html })
    }

    fn write(&self, contents: &ClipboardContents) -> Result<()> {
        let mut clipboard = open()?;
        let result = match &contents.html {
            Some(html) => clipboard.set_html(html.as_str(), Some(contents.text.as_str())),
            None => clipboard.set_text(contents.text.as_str()),
        };
        result.map_err(|e| ExpandifyError::Clipboard(e.to_string()))
    }
}
