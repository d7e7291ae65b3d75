use crate::keyboard::KeyInput;
use crate::models::Snippet;

/// Length past which the buffer is cut back.
pub const BUFFER_LIMIT: usize = 100;
/// Characters kept after a cut.
pub const BUFFER_KEEP: usize = 50;

/// Effect of one key-down on the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUpdate {
    /// A character was appended; the buffer should be tested for a trigger.
    Extended,
    /// Enter or Tab emptied the buffer.
    Cleared,
    /// Backspace dropped the last character.
    Deleted,
    Ignored,
}

impl BufferUpdate {
    pub fn should_match(self) -> bool {
        self == BufferUpdate::Extended
    }
}

/// Rolling tail of recently typed characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerBuffer {
    chars: Vec<char>,
}

impl TriggerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn apply(&mut self, input: KeyInput) -> BufferUpdate {
        match input {
            KeyInput::Char(c) => {
                self.chars.push(c);
                if self.chars.len() > BUFFER_LIMIT {
                    self.chars.drain(..self.chars.len() - BUFFER_KEEP);
                }
                BufferUpdate::Extended
            }
            KeyInput::Enter | KeyInput::Tab => {
                self.clear();
                BufferUpdate::Cleared
            }
            KeyInput::Backspace => {
                self.chars.pop();
                BufferUpdate::Deleted
            }
            KeyInput::Other => BufferUpdate::Ignored,
        }
    }

    /// First enabled snippet, in list order, whose trigger ends the buffer.
    ///
    /// List order decides between overlapping triggers: `"k"` listed before
    /// `"ok"` shadows it.
    pub fn find_match<'a>(&self, snippets: &'a [Snippet]) -> Option<&'a Snippet> {
        if self.is_empty() {
            return None;
        }
        let typed = self.as_string();
        snippets.iter().find(|snippet| snippet.matches(&typed))
    }
}
