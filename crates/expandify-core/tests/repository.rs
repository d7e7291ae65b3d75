#![cfg(unix)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use expandify_core::{
    ImageDirectory, JsonFileStore, MediaStore, Snippet, SnippetDraft, SnippetRepository,
    SnippetStore,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn open(dir: &Path) -> (SnippetRepository, Arc<ImageDirectory>) {
    let media = Arc::new(ImageDirectory::new(dir.join("images")));
    let repository = SnippetRepository::open(
        JsonFileStore::new(dir.join("snippets.json")),
        Arc::clone(&media) as Arc<dyn MediaStore>,
    )
    .unwrap();
    (repository, media)
}

fn image_count(dir: &Path) -> usize {
    fs::read_dir(dir.join("images"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn rich_snippet_images_live_with_the_snippet() {
    let dir = tempdir().unwrap();
    let (mut repository, media) = open(dir.path());
    let inline = format!(
        r#"<p>Logo</p><img src="data:image/png;base64,{}">"#,
        STANDARD.encode(b"not really a png")
    );

    repository
        .add(SnippetDraft::new("logo", "Logo", inline).rich_text(true))
        .unwrap();
    assert_eq!(image_count(dir.path()), 1);

    let stored = repository.list()[0].content.clone();
    assert!(stored.contains("file:///"));
    assert!(!stored.contains("data:image"));
    assert!(media
        .embed(&stored)
        .contains(&STANDARD.encode(b"not really a png")));

    // A fresh process sees the same file reference.
    let (reopened, _) = open(dir.path());
    assert_eq!(reopened.list()[0].content, stored);

    repository.delete(0).unwrap();
    assert_eq!(image_count(dir.path()), 0);
    assert!(repository.is_empty());
}

#[test]
fn plain_snippets_are_not_scanned_for_images() {
    let dir = tempdir().unwrap();
    let (mut repository, _) = open(dir.path());
    let content = r#"<img src="data:image/png;base64,AAAA">"#;

    repository
        .add(SnippetDraft::new("raw", "Raw markup", content))
        .unwrap();

    assert_eq!(repository.list()[0].content, content);
    assert_eq!(image_count(dir.path()), 0);
}

#[test]
fn edits_from_another_writer_are_seen_on_reload() {
    let dir = tempdir().unwrap();
    let (mut repository, _) = open(dir.path());
    repository
        .add(SnippetDraft::new("brb", "Be right back", "be right back"))
        .unwrap();

    let other = JsonFileStore::new(dir.path().join("snippets.json"));
    let mut snippets = other.load().unwrap();
    snippets.push(Snippet::new("ty", "Thanks", "thank you"));
    other.save(&snippets).unwrap();

    repository.reload().unwrap();
    assert_eq!(repository.len(), 2);
    assert_eq!(repository.find("ty").map(|(index, _)| index), Some(1));
}

#[test]
fn usage_survives_a_restart() {
    let dir = tempdir().unwrap();
    let (mut repository, _) = open(dir.path());
    repository
        .add(SnippetDraft::new("brb", "Be right back", "be right back"))
        .unwrap();
    repository.increment_usage("brb").unwrap();
    repository.increment_usage("brb").unwrap();

    let (reopened, _) = open(dir.path());
    assert_eq!(reopened.list()[0].usage, 2);
}

#[test]
fn expansion_count_keeps_snippet_added_by_another_process() {
    let dir = tempdir().unwrap();
    let (mut daemon, _) = open(dir.path());
    daemon
        .add(SnippetDraft::new("brb", "Be right back", "be right back"))
        .unwrap();

    let (mut cli, _) = open(dir.path());
    cli.add(SnippetDraft::new("sig", "Signature", "Regards"))
        .unwrap();
    daemon.increment_usage("brb").unwrap();

    let on_disk = JsonFileStore::new(dir.path().join("snippets.json"))
        .load()
        .unwrap();
    let triggers: Vec<_> = on_disk.iter().map(|s| s.trigger.as_str()).collect();
    assert_eq!(triggers, ["brb", "sig"]);
    assert_eq!(on_disk[0].usage, 1);
}
