use crate::error::{ExpandifyError, Result};
use crate::media::{MediaStore, NoMedia};
use crate::models::{Snippet, SnippetDraft};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

/// Durable copy of the snippet list.
pub trait SnippetStore: Send {
    fn load(&self) -> Result<Vec<Snippet>>;
    fn save(&self, snippets: &[Snippet]) -> Result<()>;
}

/// Pretty-printed JSON array, with a `.backup` copy taken after each load
/// that found snippets. Saves replace the file in one rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    fn read(path: &Path) -> Result<Vec<Snippet>> {
        let content = fs::read_to_string(path)?;
        // Saves always write at least `[]`.
        if content.trim().is_empty() {
            return Err(ExpandifyError::Other(format!("{} is empty", path.display())));
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl SnippetStore for JsonFileStore {
    /// A missing file is created empty; a corrupt one is recovered from the
    /// backup when possible.
    fn load(&self) -> Result<Vec<Snippet>> {
        if !self.path.exists() {
            self.save(&[])?;
            return Ok(vec![]);
        }

        match Self::read(&self.path) {
            Ok(snippets) => {
                if !snippets.is_empty() {
                    if let Err(e) = fs::copy(&self.path, self.backup_path()) {
                        warn!("Failed to create backup: {}", e);
                    }
                }
                info!("Loaded {} snippets", snippets.len());
                Ok(snippets)
            }
            Err(e) => {
                error!("Error loading snippets: {}", e);
                let backup = self.backup_path();
                if backup.exists() {
                    match Self::read(&backup) {
                        Ok(snippets) => {
                            info!("Restored snippets from backup");
                            return Ok(snippets);
                        }
                        Err(backup_err) => error!("Backup also corrupt: {}", backup_err),
                    }
                }
                Ok(vec![])
            }
        }
    }

    /// Readers see either the old list or the new one, never a partial write.
    fn save(&self, snippets: &[Snippet]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let serialized = serde_json::to_string_pretty(snippets)?;
        let mut staged = NamedTempFile::new_in(parent)?;
        staged.write_all(serialized.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-process store. `fail_saves` makes every save error out.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<Snippet>>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self {
            saved: Arc::new(Mutex::new(snippets)),
            fail_saves: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Contents of the last successful save.
    pub fn saved(&self) -> Vec<Snippet> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SnippetStore for MemoryStore {
    fn load(&self) -> Result<Vec<Snippet>> {
        Ok(self.saved())
    }

    fn save(&self, snippets: &[Snippet]) -> Result<()> {
        if self.fail_saves {
            return Err(ExpandifyError::Other("store is read-only".to_string()));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| ExpandifyError::Other("store lock poisoned".to_string()))?;
        *saved = snippets.to_vec();
        Ok(())
    }
}

type ChangeListener = Box<dyn Fn(&[Snippet]) + Send + Sync>;

/// Ordered, resident snippet list backed by a [`SnippetStore`].
///
/// Mutations are computed on a copy, saved, and only then committed and
/// announced to subscribers. A failed save leaves the list untouched.
pub struct SnippetRepository {
    snippets: Vec<Snippet>,
    store: Box<dyn SnippetStore>,
    media: Arc<dyn MediaStore>,
    listeners: Vec<ChangeListener>,
}

pub type SharedRepository = Arc<Mutex<SnippetRepository>>;

/// Lock the shared repository. A poisoned lock still holds a consistent
/// list since every mutation commits in one assignment.
pub fn lock_repository(repository: &SharedRepository) -> MutexGuard<'_, SnippetRepository> {
    repository
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SnippetRepository {
    pub fn open(store: impl SnippetStore + 'static, media: Arc<dyn MediaStore>) -> Result<Self> {
        let snippets = store.load()?;
        Ok(Self {
            snippets,
            store: Box::new(store),
            media,
            listeners: Vec::new(),
        })
    }

    pub fn in_memory(snippets: Vec<Snippet>) -> Self {
        Self {
            snippets: snippets.clone(),
            store: Box::new(MemoryStore::new(snippets)),
            media: Arc::new(NoMedia),
            listeners: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedRepository {
        Arc::new(Mutex::new(self))
    }

    pub fn list(&self) -> &[Snippet] {
        &self.snippets
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn find(&self, trigger: &str) -> Option<(usize, &Snippet)> {
        self.snippets
            .iter()
            .enumerate()
            .find(|(_, snippet)| snippet.trigger == trigger)
    }

    /// Run `listener` with the new list after every change.
    pub fn subscribe(&mut self, listener: impl Fn(&[Snippet]) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn add(&mut self, draft: SnippetDraft) -> Result<()> {
        draft.validate()?;
        let mut snippet = draft.into_snippet();
        if snippet.rich_text {
            snippet.content = self.media.persist(&snippet.content);
        }
        let mut next = self.snippets.clone();
        next.push(snippet);
        self.commit(next)?;

        if let Some(added) = self.snippets.last() {
            info!("Added snippet: {} -> {}", added.trigger, added.name);
        }
        Ok(())
    }

    pub fn update(&mut self, index: usize, draft: SnippetDraft) -> Result<()> {
        let existing = self.get(index)?;
        draft.validate()?;
        let mut snippet = draft.apply_to(existing);
        if snippet.rich_text {
            snippet.content = self.media.persist(&snippet.content);
        }

        let mut next = self.snippets.clone();
        next[index] = snippet;
        self.commit(next)
    }

    pub fn delete(&mut self, index: usize) -> Result<Snippet> {
        self.get(index)?;
        let mut next = self.snippets.clone();
        let deleted = next.remove(index);
        self.commit(next)?;

        if deleted.rich_text {
            self.media.release(&deleted.content);
        }
        info!("Deleted snippet: {} -> {}", deleted.trigger, deleted.name);
        Ok(deleted)
    }

    pub fn set_disabled(&mut self, index: usize, disabled: bool) -> Result<()> {
        self.get(index)?;
        let mut next = self.snippets.clone();
        next[index].disabled = disabled;
        self.commit(next)
    }

    /// Count one use of the first snippet with this exact trigger.
    ///
    /// Starts from the store's current contents rather than the resident
    /// list, so edits saved by another process since the last reload are
    /// kept.
    pub fn increment_usage(&mut self, trigger: &str) -> Result<u64> {
        let mut next = self.store.load()?;
        let Some(index) = next.iter().position(|snippet| snippet.trigger == trigger) else {
            self.snippets = next;
            self.announce();
            return Err(ExpandifyError::SnippetNotFound(trigger.to_string()));
        };
        next[index].usage += 1;
        let usage = next[index].usage;
        self.commit(next)?;
        Ok(usage)
    }

    /// Replace the resident list with the store's contents.
    pub fn reload(&mut self) -> Result<()> {
        self.snippets = self.store.load()?;
        self.announce();
        Ok(())
    }

    fn get(&self, index: usize) -> Result<&Snippet> {
        self.snippets
            .get(index)
            .ok_or(ExpandifyError::InvalidIndex(index))
    }

    fn commit(&mut self, next: Vec<Snippet>) -> Result<()> {
        self.store.save(&next)?;
        self.snippets = next;
        self.announce();
        Ok(())
    }

    fn announce(&self) {
        for listener in &self.listeners {
            listener(&self.snippets);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn repo_with(snippets: Vec<Snippet>) -> (SnippetRepository, MemoryStore) {
        let store = MemoryStore::new(snippets);
        let repo = SnippetRepository::open(store.clone(), Arc::new(NoMedia)).unwrap();
        (repo, store)
    }

    #[test]
    fn add_persists_and_defaults_flags() {
        let (mut repo, store) = repo_with(vec![]);
        repo.add(SnippetDraft::new("brb", "BRB", "be right back"))
            .unwrap();

        assert_eq!(repo.len(), 1);
        assert!(!repo.list()[0].disabled);
        assert_eq!(repo.list()[0].usage, 0);
        assert_eq!(store.saved(), repo.list());
    }

    #[test]
    fn oversized_trigger_leaves_repository_unchanged() {
        let (mut repo, store) = repo_with(vec![Snippet::new("a", "A", "aaa")]);
        let err = repo
            .add(SnippetDraft::new("t".repeat(101), "Too long", "x"))
            .unwrap_err();

        assert!(matches!(err, ExpandifyError::Validation(_)));
        assert_eq!(repo.len(), 1);
        assert_eq!(store.saved().len(), 1);
    }

    #[test]
    fn failed_save_does_not_touch_memory() {
        let mut repo = SnippetRepository::open(MemoryStore::failing(), Arc::new(NoMedia)).unwrap();
        assert!(repo.add(SnippetDraft::new("x", "X", "x")).is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn update_keeps_usage_and_disabled() {
        let mut original = Snippet::new("sig", "Sig", "Regards");
        original.usage = 4;
        original.disabled = true;
        let (mut repo, _) = repo_with(vec![original]);

        repo.update(0, SnippetDraft::new("sig", "Signature", "Best regards"))
            .unwrap();
        let updated = &repo.list()[0];
        assert_eq!(updated.name, "Signature");
        assert_eq!(updated.usage, 4);
        assert!(updated.disabled);
    }

    #[test]
    fn invalid_index_is_rejected() {
        let (mut repo, _) = repo_with(vec![Snippet::new("a", "A", "aaa")]);
        assert!(matches!(
            repo.update(3, SnippetDraft::new("b", "B", "bbb")),
            Err(ExpandifyError::InvalidIndex(3))
        ));
        assert!(matches!(repo.delete(1), Err(ExpandifyError::InvalidIndex(1))));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn delete_preserves_order_of_the_rest() {
        let (mut repo, _) = repo_with(vec![
            Snippet::new("a", "A", "1"),
            Snippet::new("b", "B", "2"),
            Snippet::new("c", "C", "3"),
        ]);
        let deleted = repo.delete(1).unwrap();
        assert_eq!(deleted.trigger, "b");
        let triggers: Vec<_> = repo.list().iter().map(|s| s.trigger.as_str()).collect();
        assert_eq!(triggers, ["a", "c"]);
    }

    #[test]
    fn usage_increments_first_exact_trigger() {
        let (mut repo, store) = repo_with(vec![
            Snippet::new("brb", "BRB", "1"),
            Snippet::new("brb", "BRB 2", "2"),
        ]);
        assert_eq!(repo.increment_usage("brb").unwrap(), 1);
        assert_eq!(repo.increment_usage("brb").unwrap(), 2);
        assert_eq!(store.saved()[0].usage, 2);
        assert_eq!(store.saved()[1].usage, 0);
        assert!(matches!(
            repo.increment_usage("nope"),
            Err(ExpandifyError::SnippetNotFound(_))
        ));
    }

    #[test]
    fn subscribers_hear_every_mutation() {
        let (mut repo, _) = repo_with(vec![]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        repo.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        repo.add(SnippetDraft::new("a", "A", "1")).unwrap();
        repo.set_disabled(0, true).unwrap();
        repo.increment_usage("a").unwrap();
        repo.delete(0).unwrap();
        let _ = repo.add(SnippetDraft::new("", "bad", "x"));

        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn json_store_round_trips_and_backs_up() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snippets.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(store.path().exists());

        store
            .save(&[Snippet::new("brb", "BRB", "be right back").rich()])
            .unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].rich_text);
        assert!(store.backup_path().exists());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"richText\": true"));
    }

    #[test]
    fn corrupt_file_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snippets.json"));
        store.save(&[Snippet::new("a", "A", "1")]).unwrap();
        store.load().unwrap();

        fs::write(store.path(), "[{broken").unwrap();
        let recovered = store.load().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].trigger, "a");
    }

    #[test]
    fn empty_file_does_not_clobber_backup() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snippets.json"));
        store.save(&[Snippet::new("a", "A", "1")]).unwrap();
        store.load().unwrap();

        fs::write(store.path(), "").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(fs::read_to_string(store.backup_path())
            .unwrap()
            .contains("\"trigger\": \"a\""));

        fs::write(store.path(), "[{broken").unwrap();
        assert_eq!(store.load().unwrap()[0].trigger, "a");
    }

    #[test]
    fn empty_list_leaves_previous_backup() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snippets.json"));
        store.save(&[Snippet::new("a", "A", "1")]).unwrap();
        store.load().unwrap();

        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
        let backup: Vec<Snippet> =
            serde_json::from_str(&fs::read_to_string(store.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.len(), 1);
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("snippets.json"));
        store.save(&[Snippet::new("a", "A", "1")]).unwrap();
        store
            .save(&[Snippet::new("a", "A", "1"), Snippet::new("b", "B", "2")])
            .unwrap();

        assert_eq!(store.load().unwrap().len(), 2);
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(names.iter().all(|name| name.starts_with("snippets.json")));
    }

    #[test]
    fn usage_bump_keeps_snippets_saved_elsewhere() {
        let store = MemoryStore::new(vec![Snippet::new("brb", "BRB", "be right back")]);
        let mut daemon = SnippetRepository::open(store.clone(), Arc::new(NoMedia)).unwrap();
        let mut cli = SnippetRepository::open(store.clone(), Arc::new(NoMedia)).unwrap();

        cli.add(SnippetDraft::new("sig", "Signature", "Regards")).unwrap();
        assert_eq!(daemon.increment_usage("brb").unwrap(), 1);

        let triggers: Vec<_> = store.saved().iter().map(|s| s.trigger.clone()).collect();
        assert_eq!(triggers, ["brb", "sig"]);
        assert_eq!(daemon.len(), 2);
    }

    #[test]
    fn usage_bump_for_snippet_deleted_elsewhere_adopts_store() {
        let store = MemoryStore::new(vec![Snippet::new("brb", "BRB", "be right back")]);
        let mut daemon = SnippetRepository::open(store.clone(), Arc::new(NoMedia)).unwrap();
        let mut cli = SnippetRepository::open(store.clone(), Arc::new(NoMedia)).unwrap();

        cli.delete(0).unwrap();
        assert!(matches!(
            daemon.increment_usage("brb"),
            Err(ExpandifyError::SnippetNotFound(_))
        ));
        assert!(daemon.is_empty());
        assert!(store.saved().is_empty());
    }
}
