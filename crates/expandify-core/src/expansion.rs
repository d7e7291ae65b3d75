//! Erase-and-replace through the clipboard.
//!
//! An expansion erases the trigger, swaps the snippet onto the clipboard,
//! sends the paste chord and later puts the original clipboard back. It runs
//! as a task on the tokio runtime so the keystroke stream is never blocked;
//! the [`ExpansionGuard`] keeps a second expansion from starting meanwhile.
//! Injector, clipboard, media and repository calls block, so they run on the
//! blocking pool and the settle and restore timers keep their schedule.

use crate::clipboard::{ClipboardAccess, ClipboardContents, SystemClipboard};
use crate::error::{ExpandifyError, Result};
use crate::keyboard::{EnigoInjector, KeyInjector};
use crate::markup::strip_markup;
use crate::media::{MediaStore, NoMedia};
use crate::models::Snippet;
use crate::notify::{LogNotifier, Notifier};
use crate::storage::{lock_repository, SharedRepository};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Lets the target application process the erasures.
pub const ERASE_SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Between the clipboard write and the paste chord.
pub const PASTE_SETTLE_DELAY: Duration = Duration::from_millis(50);
/// After the paste, before new triggers are accepted.
pub const GUARD_RELEASE_DELAY: Duration = Duration::from_millis(500);
/// After the paste, before the original clipboard is written back.
pub const CLIPBOARD_RESTORE_DELAY: Duration = Duration::from_millis(1000);

/// Run a blocking call on the blocking pool and wait for it.
async fn off_runtime<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(call)
        .await
        .map_err(|e| ExpandifyError::Other(format!("blocking call failed: {}", e)))?
}

/// Set for the whole of one expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpansionGuard(Arc<AtomicBool>);

impl ExpansionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag. It clears when the returned hold is dropped.
    pub fn hold(&self) -> GuardHold {
        self.0.store(true, Ordering::SeqCst);
        GuardHold(Arc::clone(&self.0))
    }
}

/// Clears the guard on drop, including when a task panics or is cancelled.
#[derive(Debug)]
pub struct GuardHold(Arc<AtomicBool>);

impl Drop for GuardHold {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ExpansionEngine {
    injector: Arc<dyn KeyInjector>,
    clipboard: Arc<dyn ClipboardAccess>,
    media: Arc<dyn MediaStore>,
    notifier: Arc<dyn Notifier>,
    repository: SharedRepository,
    guard: ExpansionGuard,
    runtime: Handle,
}

pub struct ExpansionEngineBuilder {
    injector: Arc<dyn KeyInjector>,
    clipboard: Arc<dyn ClipboardAccess>,
    media: Arc<dyn MediaStore>,
    notifier: Arc<dyn Notifier>,
    repository: SharedRepository,
}

impl ExpansionEngineBuilder {
    pub fn injector(mut self, injector: Arc<dyn KeyInjector>) -> Self {
        self.injector = injector;
        self
    }

    pub fn clipboard(mut self, clipboard: Arc<dyn ClipboardAccess>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = media;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Timed work is spawned onto `runtime`.
    pub fn build(self, runtime: Handle) -> Arc<ExpansionEngine> {
        Arc::new(ExpansionEngine {
            injector: self.injector,
            clipboard: self.clipboard,
            media: self.media,
            notifier: self.notifier,
            repository: self.repository,
            guard: ExpansionGuard::new(),
            runtime,
        })
    }
}

impl ExpansionEngine {
    /// Defaults to enigo, the system clipboard, no media and log notifications.
    pub fn builder(repository: SharedRepository) -> ExpansionEngineBuilder {
        ExpansionEngineBuilder {
            injector: Arc::new(EnigoInjector),
            clipboard: Arc::new(SystemClipboard),
            media: Arc::new(NoMedia),
            notifier: Arc::new(LogNotifier),
            repository,
        }
    }

    pub fn guard(&self) -> &ExpansionGuard {
        &self.guard
    }

    /// Start expanding `snippet`.
    ///
    /// The guard is set before this returns. Callers check it first; a call
    /// while it is held is not rejected here.
    pub fn expand(self: &Arc<Self>, snippet: Snippet) -> JoinHandle<()> {
        let hold = self.guard.hold();
        let engine = Arc::clone(self);
        self.runtime.spawn(async move { engine.run(snippet, hold).await })
    }

    async fn run(&self, snippet: Snippet, hold: GuardHold) {
        info!(
            trigger = %snippet.trigger,
            name = %snippet.name,
            rich_text = snippet.rich_text,
            content_len = snippet.content.len(),
            "Expanding snippet"
        );

        let mut original = None;
        match self.replace(&snippet, &mut original).await {
            Ok(()) => {
                self.schedule_restore(original.unwrap_or_default());
                self.runtime.spawn(async move {
                    sleep(GUARD_RELEASE_DELAY).await;
                    drop(hold);
                });
                self.record_usage(&snippet).await;
                self.notifier.notify(
                    "Snippet Expanded!",
                    &format!("\"{}\" → {}", snippet.trigger, snippet.name),
                );
                info!("Snippet expanded successfully");
            }
            Err(e) => {
                drop(hold);
                error!("Error expanding snippet: {}", e);
                self.notifier
                    .notify("Error", &format!("Failed to expand snippet: {}", e));
                // The clipboard may already hold the snippet.
                if let Some(original) = original {
                    self.schedule_restore(original);
                }
            }
        }
    }

    /// Erase, swap the clipboard and paste. `original` is filled in with the
    /// snapshot just before the clipboard is overwritten.
    async fn replace(
        &self,
        snippet: &Snippet,
        original: &mut Option<ClipboardContents>,
    ) -> Result<()> {
        let count = snippet.trigger_len();
        debug!("Erasing {} characters", count);
        let injector = Arc::clone(&self.injector);
        off_runtime(move || injector.erase(count)).await?;
        sleep(ERASE_SETTLE_DELAY).await;

        let clipboard = Arc::clone(&self.clipboard);
        let snapshot = off_runtime(move || clipboard.read())
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to read clipboard: {}", e);
                ClipboardContents::default()
            });
        let media = Arc::clone(&self.media);
        let source = snippet.clone();
        let replacement = off_runtime(move || Ok(compose(media.as_ref(), &source))).await?;
        *original = Some(snapshot);
        let clipboard = Arc::clone(&self.clipboard);
        off_runtime(move || clipboard.write(&replacement)).await?;
        sleep(PASTE_SETTLE_DELAY).await;

        debug!("Pasting content");
        let injector = Arc::clone(&self.injector);
        off_runtime(move || injector.paste()).await
    }

    fn schedule_restore(&self, original: ClipboardContents) {
        let clipboard = Arc::clone(&self.clipboard);
        self.runtime.spawn(async move {
            sleep(CLIPBOARD_RESTORE_DELAY).await;
            let restored = if original.has_html() {
                original
            } else {
                ClipboardContents::text(original.text)
            };
            match off_runtime(move || clipboard.write(&restored)).await {
                Ok(()) => debug!("Original clipboard restored"),
                Err(e) => warn!("Failed to restore clipboard: {}", e),
            }
        });
    }

    async fn record_usage(&self, snippet: &Snippet) {
        let repository = Arc::clone(&self.repository);
        let trigger = snippet.trigger.clone();
        let counted =
            off_runtime(move || lock_repository(&repository).increment_usage(&trigger)).await;
        if let Err(e) = counted {
            warn!("Failed to record usage of '{}': {}", snippet.trigger, e);
        }
    }
}

fn compose(media: &dyn MediaStore, snippet: &Snippet) -> ClipboardContents {
    if snippet.rich_text {
        let html = media.embed(&snippet.content);
        let text = strip_markup(&html);
        ClipboardContents::rich(html, text)
    } else {
        ClipboardContents::text(snippet.content.as_str())
    }
}
