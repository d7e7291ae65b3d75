//! Per-keystroke eligibility of the focused window.

use crate::config::{executable_basename, AllowList};
use crate::error::Result;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Substrings of a window title or executable path that suggest a
/// credential prompt.
pub const PASSWORD_INDICATORS: &[&str] = &[
    "password",
    "login",
    "log in",
    "sign in",
    "authenticate",
    "1password",
    "lastpass",
    "bitwarden",
    "vault",
];

/// Identity of the focused window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub owner_path: String,
}

impl WindowInfo {
    pub fn new(title: impl Into<String>, owner_path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            owner_path: owner_path.into(),
        }
    }

    pub fn executable(&self) -> String {
        executable_basename(&self.owner_path)
    }

    pub fn looks_like_password_prompt(&self) -> bool {
        let title = self.title.to_lowercase();
        let path = self.owner_path.to_lowercase();
        PASSWORD_INDICATORS
            .iter()
            .any(|indicator| title.contains(indicator) || path.contains(indicator))
    }
}

/// Source of the focused window's identity.
pub trait WindowProbe: Send + Sync {
    /// `Ok(None)` when no window has focus.
    fn active_window(&self) -> Result<Option<WindowInfo>>;
}

/// Result of a best-effort OS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Found(T),
    Missing,
    Failed(String),
}

impl<T> Probe<T> {
    /// Run `query`, logging and folding failures into [`Probe::Failed`].
    pub fn run(what: &str, query: impl FnOnce() -> Result<Option<T>>) -> Self {
        match query() {
            Ok(Some(value)) => Probe::Found(value),
            Ok(None) => {
                debug!("{}: nothing reported", what);
                Probe::Missing
            }
            Err(e) => {
                warn!("{} failed: {}", what, e);
                Probe::Failed(e.to_string())
            }
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Probe::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    PasswordField,
    NotAllowed,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

/// Decides whether expansion logic runs for the current keystroke.
///
/// Window metadata that cannot be obtained counts as eligible and as not a
/// password prompt, so a broken probe never disables expansion outright.
pub struct ContextGate {
    probe: Arc<dyn WindowProbe>,
    allow_list: Arc<RwLock<AllowList>>,
}

impl ContextGate {
    pub fn new(probe: Arc<dyn WindowProbe>, allow_list: Arc<RwLock<AllowList>>) -> Self {
        Self { probe, allow_list }
    }

    pub fn allow_list(&self) -> &Arc<RwLock<AllowList>> {
        &self.allow_list
    }

    pub fn check(&self) -> Eligibility {
        let window = Probe::run("Active window query", || self.probe.active_window());
        let Some(window) = window.found() else {
            return Eligibility::Eligible;
        };

        // Takes precedence over the allow-list.
        if window.looks_like_password_prompt() {
            debug!("Password field detected: {:?}", window.title);
            return Eligibility::PasswordField;
        }

        let executable = window.executable();
        let allowed = match self.allow_list.read() {
            Ok(list) => list.contains(&executable),
            Err(poisoned) => poisoned.into_inner().contains(&executable),
        };
        if allowed {
            Eligibility::Eligible
        } else {
            Eligibility::NotAllowed
        }
    }
}
