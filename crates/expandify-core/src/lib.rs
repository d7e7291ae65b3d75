//! Expandify core: watches typed keys for registered triggers and replaces
//! them with snippet content through the clipboard.

pub mod buffer;
pub mod clipboard;
pub mod config;
pub mod context;
pub mod error;
pub mod expansion;
pub mod keyboard;
pub mod markup;
pub mod media;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod storage;

// Re-export common items for convenience
pub use buffer::TriggerBuffer;
pub use clipboard::{ClipboardAccess, ClipboardContents, SystemClipboard};
pub use config::{get_config_dir, is_daemon_running, AllowList, Settings};
pub use context::{ContextGate, Eligibility, WindowInfo, WindowProbe};
pub use error::{ExpandifyError, Result};
pub use expansion::{ExpansionEngine, ExpansionGuard};
pub use keyboard::{EnigoInjector, KeyEvent, KeyInjector, KeyInput, KeyState};
pub use media::{ImageDirectory, MediaStore, NoMedia};
pub use models::{Snippet, SnippetDraft};
pub use notify::{LogNotifier, Notifier};
pub use pipeline::KeystrokePipeline;
pub use storage::{
    lock_repository, JsonFileStore, MemoryStore, SharedRepository, SnippetRepository, SnippetStore,
};
