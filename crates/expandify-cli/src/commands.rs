use crate::cli::{AppsCommand, Commands, TriggerState};
use crate::utils::format_snippet_line;
use expandify_core::config::{
    ensure_config_dir, get_allowed_apps_file_path, get_db_file_path, get_images_dir,
    get_settings_file_path,
};
use expandify_core::{
    is_daemon_running, AllowList, ImageDirectory, JsonFileStore, Result, Settings, SnippetDraft,
    SnippetRepository,
};
use expandify_daemon::{daemon_status, daemon_worker_entry, start_daemon, stop_daemon};
use std::path::Path;
use std::sync::Arc;

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            trigger,
            name,
            content,
            rich,
        } => {
            let mut repository = open_repository()?;
            repository.add(SnippetDraft::new(trigger, name, content).rich_text(rich))?;
            println!("Snippet added successfully");
            remind_reload();
            Ok(())
        }
        Commands::Update {
            index,
            trigger,
            name,
            content,
            rich,
        } => {
            let mut repository = open_repository()?;
            repository.update(index, SnippetDraft::new(trigger, name, content).rich_text(rich))?;
            println!("Snippet updated successfully");
            Ok(())
        }
        Commands::Delete { index } => {
            let removed = open_repository()?.delete(index)?;
            println!("Deleted snippet '{}' ({})", removed.trigger, removed.name);
            Ok(())
        }
        Commands::List => list_snippets(&open_repository()?),
        Commands::Enable { index } => set_enabled(index, true),
        Commands::Disable { index } => set_enabled(index, false),
        Commands::Apps { action } => {
            ensure_config_dir()?;
            for line in handle_apps(action, &get_allowed_apps_file_path())? {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Triggers { state } => {
            ensure_config_dir()?;
            println!("{}", set_triggers(state, &get_settings_file_path())?);
            Ok(())
        }
        Commands::Start => start_daemon(),
        Commands::Stop => stop_daemon(),
        Commands::Status => daemon_status(),
        Commands::DaemonWorker => daemon_worker_entry(),
    }
}

fn open_repository() -> Result<SnippetRepository> {
    ensure_config_dir()?;
    SnippetRepository::open(
        JsonFileStore::new(get_db_file_path()),
        Arc::new(ImageDirectory::new(get_images_dir())),
    )
}

fn remind_reload() {
    if let Ok(None) = is_daemon_running() {
        println!("The daemon is not running; start it with 'expandify start'.");
    }
}

fn list_snippets(repository: &SnippetRepository) -> Result<()> {
    if repository.is_empty() {
        println!("No snippets yet. Add one with 'expandify add'.");
        return Ok(());
    }
    for (index, snippet) in repository.list().iter().enumerate() {
        println!("{}", format_snippet_line(index, snippet));
    }
    Ok(())
}

fn set_enabled(index: usize, enabled: bool) -> Result<()> {
    let mut repository = open_repository()?;
    repository.set_disabled(index, !enabled)?;
    println!(
        "Snippet {} {}",
        index,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// Apply an `apps` subcommand to the allow-list at `path`. Returns the lines
/// to show.
pub fn handle_apps(action: AppsCommand, path: &Path) -> Result<Vec<String>> {
    let mut allow_list = AllowList::load(path)?;
    let lines = match action {
        AppsCommand::List => allow_list.apps().to_vec(),
        AppsCommand::Add { path: app } => {
            if allow_list.add(&app) {
                allow_list.save(path)?;
                vec![format!("Allowed {}", app)]
            } else {
                vec![format!("{} is already allowed", app)]
            }
        }
        AppsCommand::Remove { path: app } => {
            if allow_list.remove(&app) {
                allow_list.save(path)?;
                vec![format!("Removed {}", app)]
            } else {
                vec![format!("{} was not in the list", app)]
            }
        }
    };
    Ok(lines)
}

/// Persist the trigger switch; a running daemon picks it up from the file.
pub fn set_triggers(state: TriggerState, path: &Path) -> Result<String> {
    let mut settings = Settings::load(path)?;
    settings.triggers_disabled = state == TriggerState::Off;
    settings.save(path)?;
    Ok(match state {
        TriggerState::On => "Triggers enabled".to_string(),
        TriggerState::Off => "Triggers disabled".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use expandify_core::config::DEFAULT_ALLOWED_APPS;
    use tempfile::tempdir;

    #[test]
    fn apps_add_and_remove_round_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("allowed-apps.json");

        let added = handle_apps(
            AppsCommand::Add {
                path: "/usr/bin/Kate".to_string(),
            },
            &path,
        )
        .unwrap();
        assert_eq!(added, ["Allowed /usr/bin/Kate"]);
        assert!(AllowList::load(&path).unwrap().contains("kate"));

        let again = handle_apps(
            AppsCommand::Add {
                path: "kate".to_string(),
            },
            &path,
        )
        .unwrap();
        assert_eq!(again, ["kate is already allowed"]);

        handle_apps(
            AppsCommand::Remove {
                path: "kate".to_string(),
            },
            &path,
        )
        .unwrap();
        let listed = handle_apps(AppsCommand::List, &path).unwrap();
        assert!(!listed.iter().any(|app| app == "kate"));
        assert!(listed.iter().any(|app| app == DEFAULT_ALLOWED_APPS[0]));
    }

    #[test]
    fn triggers_switch_is_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        assert_eq!(set_triggers(TriggerState::Off, &path).unwrap(), "Triggers disabled");
        assert!(Settings::load(&path).unwrap().triggers_disabled);

        set_triggers(TriggerState::On, &path).unwrap();
        assert!(!Settings::load(&path).unwrap().triggers_disabled);
    }
}
