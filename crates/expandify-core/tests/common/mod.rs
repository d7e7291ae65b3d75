#![allow(dead_code)]

use expandify_core::{
    AllowList, ClipboardAccess, ClipboardContents, ContextGate, ExpandifyError, ExpansionEngine,
    KeyEvent, KeyInjector, KeystrokePipeline, MediaStore, Notifier, Result, SharedRepository,
    Snippet, SnippetRepository, WindowInfo, WindowProbe,
};
use std::sync::{Arc, Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Erase(usize),
    Paste,
    ClipboardRead,
    ClipboardWrite(ClipboardContents),
}

pub type Journal = Arc<Mutex<Vec<Action>>>;

pub struct RecordingInjector {
    pub journal: Journal,
    pub fail_paste: bool,
}

impl KeyInjector for RecordingInjector {
    fn erase(&self, count: usize) -> Result<()> {
        self.journal.lock().unwrap().push(Action::Erase(count));
        Ok(())
    }

    fn paste(&self) -> Result<()> {
        if self.fail_paste {
            return Err(ExpandifyError::Injection("paste rejected".into()));
        }
        self.journal.lock().unwrap().push(Action::Paste);
        Ok(())
    }
}

pub struct FakeClipboard {
    pub journal: Journal,
    pub contents: Mutex<ClipboardContents>,
    pub fail_read: bool,
}

impl FakeClipboard {
    pub fn current(&self) -> ClipboardContents {
        self.contents.lock().unwrap().clone()
    }
}

impl ClipboardAccess for FakeClipboard {
    fn read(&self) -> Result<ClipboardContents> {
        self.journal.lock().unwrap().push(Action::ClipboardRead);
        if self.fail_read {
            return Err(ExpandifyError::Clipboard("locked by another process".into()));
        }
        Ok(self.current())
    }

    fn write(&self, contents: &ClipboardContents) -> Result<()> {
        self.journal
            .lock()
            .unwrap()
            .push(Action::ClipboardWrite(contents.clone()));
        *self.contents.lock().unwrap() = contents.clone();
        Ok(())
    }
}

/// Window the test has "focused".
#[derive(Clone)]
pub struct FocusedWindow(pub Arc<Mutex<Option<WindowInfo>>>);

impl FocusedWindow {
    pub fn focus(&self, title: &str, path: &str) {
        *self.0.lock().unwrap() = Some(WindowInfo::new(title, path));
    }
}

impl WindowProbe for FocusedWindow {
    fn active_window(&self) -> Result<Option<WindowInfo>> {
        Ok(self.0.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier(pub Mutex<Vec<(String, String)>>);

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.0
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

/// Resolves `file:///` references to a fixed marker.
pub struct MarkerMedia;

impl MediaStore for MarkerMedia {
    fn embed(&self, markup: &str) -> String {
        markup.replace("file:///img.jpg", "data:image/jpeg;base64,AAAA")
    }

    fn persist(&self, markup: &str) -> String {
        markup.to_string()
    }

    fn release(&self, _markup: &str) {}
}

pub struct Harness {
    pub pipeline: KeystrokePipeline,
    pub journal: Journal,
    pub clipboard: Arc<FakeClipboard>,
    pub window: FocusedWindow,
    pub notifier: Arc<RecordingNotifier>,
    pub repository: SharedRepository,
}

pub struct HarnessOptions {
    pub fail_paste: bool,
    pub fail_clipboard_read: bool,
    pub initial_clipboard: ClipboardContents,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            fail_paste: false,
            fail_clipboard_read: false,
            initial_clipboard: ClipboardContents::text("original"),
        }
    }
}

impl Harness {
    /// Must be called inside a tokio runtime.
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self::with_options(snippets, HarnessOptions::default())
    }

    pub fn with_options(snippets: Vec<Snippet>, options: HarnessOptions) -> Self {
        let journal: Journal = Arc::default();
        let clipboard = Arc::new(FakeClipboard {
            journal: Arc::clone(&journal),
            contents: Mutex::new(options.initial_clipboard),
            fail_read: options.fail_clipboard_read,
        });
        let window = FocusedWindow(Arc::default());
        window.focus("Inbox - Chrome", "C:\\Program Files\\Google\\Chrome\\chrome.exe");
        let notifier = Arc::new(RecordingNotifier::default());
        let repository = SnippetRepository::in_memory(snippets).shared();

        let engine = ExpansionEngine::builder(Arc::clone(&repository))
            .injector(Arc::new(RecordingInjector {
                journal: Arc::clone(&journal),
                fail_paste: options.fail_paste,
            }))
            .clipboard(Arc::clone(&clipboard) as Arc<dyn ClipboardAccess>)
            .media(Arc::new(MarkerMedia))
            .notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .build(Handle::current());

        let gate = ContextGate::new(
            Arc::new(window.clone()),
            Arc::new(RwLock::new(AllowList::new(vec![
                "chrome.exe".into(),
                "notepad.exe".into(),
            ]))),
        );
        let pipeline = KeystrokePipeline::new(gate, Arc::clone(&repository), engine);

        Self {
            pipeline,
            journal,
            clipboard,
            window,
            notifier,
            repository,
        }
    }

    /// Type each character as a key-down. Returns the expansions started.
    pub fn type_text(&mut self, text: &str) -> Vec<JoinHandle<()>> {
        text.chars()
            .filter_map(|c| self.press(&c.to_string()))
            .collect()
    }

    pub fn press(&mut self, name: &str) -> Option<JoinHandle<()>> {
        self.pipeline.handle(&KeyEvent::down(name))
    }

    pub fn actions(&self) -> Vec<Action> {
        self.journal.lock().unwrap().clone()
    }

    pub fn erase_count(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Erase(_)))
            .count()
    }

    pub fn guard_held(&self) -> bool {
        self.pipeline.engine().guard().is_held()
    }

    pub fn usage(&self, index: usize) -> u64 {
        self.repository.lock().unwrap().list()[index].usage
    }
}
