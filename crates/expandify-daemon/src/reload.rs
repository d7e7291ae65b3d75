//! Picks up edits made to the data files while the worker runs.

use expandify_core::config::{
    get_allowed_apps_file_path, get_db_file_path, get_settings_file_path,
};
use expandify_core::{lock_repository, AllowList, Notifier, Settings, SharedRepository};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

pub const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks a file's modification time between polls.
#[derive(Debug)]
pub struct ModificationWatch {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ModificationWatch {
    /// Starts from the file's current state, so the first poll reports no change.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once per observed modification. A file that disappears is not a
    /// change; it is picked up again when it reappears.
    pub fn changed(&mut self) -> bool {
        match modified(&self.path) {
            Some(current) if self.last_modified != Some(current) => {
                self.last_modified = Some(current);
                true
            }
            _ => false,
        }
    }
}

/// Locations of the files the worker follows.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub snippets: PathBuf,
    pub allowed_apps: PathBuf,
    pub settings: PathBuf,
}

impl DataFiles {
    pub fn in_config_dir() -> Self {
        Self {
            snippets: get_db_file_path(),
            allowed_apps: get_allowed_apps_file_path(),
            settings: get_settings_file_path(),
        }
    }
}

/// Reloads whichever data file changed since the previous poll.
pub struct DataReloader {
    snippets: ModificationWatch,
    allowed_apps: ModificationWatch,
    settings: ModificationWatch,
    repository: SharedRepository,
    allow_list: Arc<RwLock<AllowList>>,
    triggers_disabled: Arc<AtomicBool>,
    notifier: Arc<dyn Notifier>,
}

impl DataReloader {
    pub fn new(
        files: &DataFiles,
        repository: SharedRepository,
        allow_list: Arc<RwLock<AllowList>>,
        triggers_disabled: Arc<AtomicBool>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            snippets: ModificationWatch::new(&files.snippets),
            allowed_apps: ModificationWatch::new(&files.allowed_apps),
            settings: ModificationWatch::new(&files.settings),
            repository,
            allow_list,
            triggers_disabled,
            notifier,
        }
    }

    pub fn poll(&mut self) {
        if self.snippets.changed() {
            info!("Snippet file changed, reloading");
            if let Err(e) = lock_repository(&self.repository).reload() {
                warn!("Failed to reload snippets: {}", e);
            }
        }

        if self.allowed_apps.changed() {
            match AllowList::load(self.allowed_apps.path()) {
                Ok(list) => {
                    info!("Allowed applications reloaded ({} entries)", list.apps().len());
                    *self
                        .allow_list
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = list;
                }
                Err(e) => warn!("Failed to reload allowed applications: {}", e),
            }
        }

        if self.settings.changed() {
            match Settings::load(self.settings.path()) {
                Ok(settings) => self.apply_settings(&settings),
                Err(e) => warn!("Failed to reload settings: {}", e),
            }
        }
    }

    /// Flip the trigger switch, notifying only on an actual change.
    pub fn apply_settings(&self, settings: &Settings) {
        let disabled = settings.triggers_disabled;
        if self.triggers_disabled.swap(disabled, Ordering::SeqCst) == disabled {
            return;
        }

        info!("Triggers {}", if disabled { "DISABLED" } else { "ENABLED" });
        if disabled {
            self.notifier.notify(
                "⚠️ Expansion Disabled",
                "Triggers will not work while disabled.",
            );
        } else {
            self.notifier
                .notify("✓ Expansion Enabled", "Triggers are now active.");
        }
    }
}
