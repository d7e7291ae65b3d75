use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PID_FILENAME: &str = "expandify-daemon.pid";
pub const DB_FILENAME: &str = "snippets.json";
pub const ALLOWED_APPS_FILENAME: &str = "allowed-apps.json";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const IMAGES_DIRNAME: &str = "images";
pub const LOG_FILENAME: &str = "daemon_log.txt";

#[cfg(target_os = "windows")]
pub const DEFAULT_ALLOWED_APPS: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "firefox.exe",
    "brave.exe",
    "opera.exe",
    "notepad.exe",
    "code.exe",
];

/// Matched against `/proc/<pid>/exe` basenames and macOS `.app` bundle names.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_ALLOWED_APPS: &[&str] = &[
    "chrome",
    "chromium",
    "msedge",
    "microsoft edge",
    "firefox",
    "brave",
    "opera",
    "code",
    "gedit",
    "gnome-text-editor",
    "kate",
    "textedit",
];

/// Get the expandify configuration directory
pub fn get_config_dir() -> PathBuf {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".expandify"))
        .unwrap_or_else(|_| PathBuf::from(".expandify"))
}

/// Ensure the configuration directory and the images directory exist
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        info!("Created configuration directory at {}", config_dir.display());
    }

    let images_dir = get_images_dir();
    if !images_dir.exists() {
        fs::create_dir_all(&images_dir)?;
        info!("Created images directory");
    }

    Ok(config_dir)
}

/// Get the path to the PID file
pub fn get_pid_file_path() -> PathBuf {
    get_config_dir().join(PID_FILENAME)
}

/// Get the path to the snippet database file
pub fn get_db_file_path() -> PathBuf {
    get_config_dir().join(DB_FILENAME)
}

pub fn get_allowed_apps_file_path() -> PathBuf {
    get_config_dir().join(ALLOWED_APPS_FILENAME)
}

pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILENAME)
}

pub fn get_images_dir() -> PathBuf {
    get_config_dir().join(IMAGES_DIRNAME)
}

pub fn get_log_file_path() -> PathBuf {
    get_config_dir().join(LOG_FILENAME)
}

/// Check if daemon is running
pub fn is_daemon_running() -> Result<Option<u32>> {
    let pid_file = get_pid_file_path();

    if pid_file.exists() {
        match fs::read_to_string(&pid_file) {
            Ok(contents) => match contents.trim().parse::<u32>() {
                Ok(pid) => Ok(Some(pid)),
                Err(_) => {
                    // Invalid PID, treat as not running and clean up
                    let _ = fs::remove_file(&pid_file);
                    Ok(None)
                }
            },
            Err(_) => {
                let _ = fs::remove_file(&pid_file);
                Ok(None)
            }
        }
    } else {
        Ok(None)
    }
}

/// Lowercased final path component, accepting both `/` and `\` separators.
pub fn executable_basename(path: &str) -> String {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Executable names in which expansion is permitted.
///
/// Membership is substring containment against the active executable's
/// basename, so a short entry such as `code` also admits `vscode.exe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    apps: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            apps: DEFAULT_ALLOWED_APPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AllowList {
    pub fn new(apps: Vec<String>) -> Self {
        Self {
            apps: apps.into_iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    pub fn apps(&self) -> &[String] {
        &self.apps
    }

    /// `basename` is expected lowercased already.
    pub fn contains(&self, basename: &str) -> bool {
        self.apps.iter().any(|app| basename.contains(app.as_str()))
    }

    /// Returns false when the executable was already listed.
    pub fn add(&mut self, app_path: &str) -> bool {
        let name = executable_basename(app_path);
        if name.is_empty() || self.apps.contains(&name) {
            return false;
        }
        self.apps.push(name);
        true
    }

    /// Returns false when the executable was not listed.
    pub fn remove(&mut self, app_path: &str) -> bool {
        let name = executable_basename(app_path);
        match self.apps.iter().position(|app| *app == name) {
            Some(index) => {
                self.apps.remove(index);
                true
            }
            None => false,
        }
    }

    /// Load the allow-list, writing the defaults when the file is missing
    /// and falling back to them when it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let list = Self::default();
            list.save(path)?;
            return Ok(list);
        }

        let parsed = fs::read_to_string(path)
            .map_err(crate::ExpandifyError::from)
            .and_then(|data| serde_json::from_str::<Vec<String>>(&data).map_err(Into::into));

        match parsed {
            Ok(apps) => {
                info!("Loaded {} allowed apps", apps.len());
                Ok(Self::new(apps))
            }
            Err(e) => {
                warn!("Error loading allowed apps, resetting to defaults: {}", e);
                let list = Self::default();
                list.save(path)?;
                Ok(list)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.apps)?)?;
        Ok(())
    }
}

/// Persisted runtime switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub triggers_disabled: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        match serde_json::from_str(&fs::read_to_string(path)?) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Error loading settings, using defaults: {}", e);
                let settings = Self::default();
                settings.save(path)?;
                Ok(settings)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
