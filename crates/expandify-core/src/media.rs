//! Images embedded in rich snippets.
//!
//! Stored snippets reference their images as `file:///` URLs inside an
//! images directory. Inline `data:` images are written out when a snippet is
//! saved, inlined again when its content goes to the clipboard, and deleted
//! with the snippet.

use crate::error::{ExpandifyError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::{debug, error, warn};

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Media collaborator used by the repository and the expansion engine.
pub trait MediaStore: Send + Sync {
    /// Resolve file references into inline data the clipboard can carry.
    fn embed(&self, markup: &str) -> String;

    /// Move inline images out to owned files, rewriting their references.
    fn persist(&self, markup: &str) -> String;

    /// Delete files owned by `markup`.
    fn release(&self, markup: &str);
}

/// Leaves markup untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMedia;

impl MediaStore for NoMedia {
    fn embed(&self, markup: &str) -> String {
        markup.to_string()
    }

    fn persist(&self, markup: &str) -> String {
        markup.to_string()
    }

    fn release(&self, _markup: &str) {}
}

fn file_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<img[^>]+src="file:///([^"]+)"[^>]*>"#).unwrap())
}

fn any_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<img[^>]+src="([^"]+)"[^>]*>"#).unwrap())
}

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:image/([^;]+);base64,(.+)$").unwrap())
}

/// Image files kept under one directory.
#[derive(Debug)]
pub struct ImageDirectory {
    dir: PathBuf,
    counter: AtomicU64,
}

impl ImageDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save_data_url(&self, data_url: &str) -> Result<PathBuf> {
        let captures = data_url_regex()
            .captures(data_url)
            .ok_or_else(|| ExpandifyError::Media("invalid base64 image data".to_string()))?;

        let bytes = STANDARD
            .decode(&captures[2])
            .map_err(|e| ExpandifyError::Media(e.to_string()))?;
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ExpandifyError::Media(format!(
                "image exceeds maximum size of {}MB",
                MAX_IMAGE_SIZE / 1024 / 1024
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let filename = format!(
            "img_{}_{}.jpg",
            chrono::Utc::now().timestamp_millis(),
            self.counter.fetch_add(1, Ordering::Relaxed)
        );
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Only files inside the images directory belong to snippets.
    fn owned_path(&self, reference: &str) -> Option<PathBuf> {
        let path = url_to_path(reference);
        if path.starts_with(&self.dir) {
            Some(path)
        } else {
            None
        }
    }
}

fn path_to_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    format!("file:///{}", path.trim_start_matches('/'))
}

fn url_to_path(reference: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(reference.replace('/', "\\"))
    } else {
        PathBuf::from(format!("/{}", reference))
    }
}

impl MediaStore for ImageDirectory {
    fn embed(&self, markup: &str) -> String {
        let mut embedded = markup.to_string();
        for captures in file_image_regex().captures_iter(markup) {
            let tag = &captures[0];
            let reference = &captures[1];
            let path = url_to_path(reference);

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Image file not readable: {} ({})", path.display(), e);
                    continue;
                }
            };
            let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes));
            let new_tag = tag.replace(&format!("file:///{}", reference), &data_url);
            embedded = embedded.replacen(tag, &new_tag, 1);
        }
        embedded
    }

    fn persist(&self, markup: &str) -> String {
        let mut persisted = markup.to_string();
        for captures in any_image_regex().captures_iter(markup) {
            let tag = &captures[0];
            let src = &captures[1];
            if !src.starts_with("data:image/") {
                continue;
            }

            match self.save_data_url(src) {
                Ok(path) => {
                    debug!("Saved image to: {}", path.display());
                    let new_tag = tag.replace(src, &path_to_url(&path));
                    persisted = persisted.replacen(tag, &new_tag, 1);
                }
                Err(e) => error!("Error processing image: {}", e),
            }
        }
        persisted
    }

    fn release(&self, markup: &str) {
        for captures in file_image_regex().captures_iter(markup) {
            let Some(path) = self.owned_path(&captures[1]) else {
                continue;
            };
            if path.exists() {
                match fs::remove_file(&path) {
                    Ok(()) => debug!("Deleted image: {}", path.display()),
                    Err(e) => error!("Error deleting image {}: {}", path.display(), e),
                }
            }
        }
    }
}
