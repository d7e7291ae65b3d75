use crate::keyboard_listener::{start_keyboard_listener, start_pipeline};
use crate::notify::DesktopNotifier;
use crate::permissions::check_and_request_permissions;
use crate::process::verify_process_running;
use crate::reload::{DataFiles, DataReloader, RELOAD_INTERVAL};
use crate::window::SystemWindowProbe;
use expandify_core::config::{ensure_config_dir, get_images_dir, get_log_file_path, get_pid_file_path};
use expandify_core::{
    is_daemon_running, AllowList, ContextGate, ExpandifyError, ExpansionEngine, ImageDirectory,
    JsonFileStore, KeystrokePipeline, MediaStore, Notifier, Result, Settings, SnippetRepository,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

const STARTUP_POLLS: u32 = 20;
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Start the daemon process
pub fn start_daemon() -> Result<()> {
    if let Some(pid) = is_daemon_running()? {
        if verify_process_running(pid) {
            return Err(ExpandifyError::DaemonAlreadyRunning(pid));
        }
        println!("Found stale PID file. Cleaning up and starting new daemon...");
        let _ = fs::remove_file(get_pid_file_path());
    }

    println!("Starting expandify daemon...");
    ensure_config_dir()?;
    check_and_request_permissions()?;

    let log_file = get_log_file_path();
    launch_worker(&log_file)?;

    for _ in 0..STARTUP_POLLS {
        thread::sleep(STARTUP_POLL_INTERVAL);
        if is_daemon_running()?.is_some() {
            break;
        }
    }

    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("Daemon started successfully with PID {}.", pid);
            Ok(())
        }
        Some(_) => Err(ExpandifyError::Other(format!(
            "Daemon process failed to start. Check logs at {}",
            log_file.display()
        ))),
        None => Err(ExpandifyError::Other(format!(
            "Daemon failed to start. Check logs at {}",
            log_file.display()
        ))),
    }
}

/// Run `<current exe> daemon-worker` detached, output appended to `log_file`.
#[cfg(unix)]
fn launch_worker(log_file: &Path) -> Result<()> {
    let current_exe = std::env::current_exe()?;
    let cmd = format!(
        "nohup '{}' daemon-worker >> '{}' 2>&1 &",
        current_exe.to_string_lossy().replace('\'', r"'\''"),
        log_file.to_string_lossy().replace('\'', r"'\''")
    );
    process::Command::new("sh").arg("-c").arg(&cmd).status()?;
    Ok(())
}

#[cfg(windows)]
fn launch_worker(log_file: &Path) -> Result<()> {
    let current_exe = std::env::current_exe()?;
    let cmd = format!(
        "START /B \"Expandify Daemon\" \"{}\" daemon-worker >> \"{}\" 2>&1",
        current_exe.to_string_lossy(),
        log_file.to_string_lossy()
    );
    process::Command::new("cmd").arg("/C").arg(&cmd).status()?;
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn launch_worker(_log_file: &Path) -> Result<()> {
    Err(ExpandifyError::Other(
        "Starting the daemon is not supported on this platform".to_string(),
    ))
}

/// Stop the daemon if it's running
pub fn stop_daemon() -> Result<()> {
    let pid_file = get_pid_file_path();
    if !pid_file.exists() {
        return Err(ExpandifyError::DaemonNotRunning);
    }

    let pid = match fs::read_to_string(&pid_file)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
    {
        Some(pid) => pid,
        None => {
            let _ = fs::remove_file(&pid_file);
            return Err(ExpandifyError::InvalidPid);
        }
    };

    if !verify_process_running(pid) {
        println!("Process with PID {} is not running.", pid);
        let _ = fs::remove_file(&pid_file);
        return Ok(());
    }

    println!("Attempting to stop daemon with PID {}...", pid);
    if terminate(pid) {
        println!("Daemon stopped successfully.");
    } else {
        println!("WARNING: Failed to stop daemon process. PID file will be removed anyway.");
    }
    let _ = fs::remove_file(&pid_file);
    Ok(())
}

/// Polite termination first, forced after a grace period.
#[cfg(unix)]
fn terminate(pid: u32) -> bool {
    let pid_arg = pid.to_string();
    let _ = process::Command::new("kill").arg(&pid_arg).status();
    thread::sleep(STOP_GRACE_PERIOD);
    if !verify_process_running(pid) {
        return true;
    }

    println!("Daemon didn't terminate gracefully, using force kill...");
    process::Command::new("kill")
        .args(["-9", &pid_arg])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
fn terminate(pid: u32) -> bool {
    let pid_arg = pid.to_string();
    let _ = process::Command::new("taskkill")
        .args(["/PID", &pid_arg])
        .status();
    thread::sleep(STOP_GRACE_PERIOD);
    if !verify_process_running(pid) {
        return true;
    }

    println!("Daemon didn't terminate gracefully, using force kill...");
    process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid_arg])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
fn terminate(_pid: u32) -> bool {
    false
}

/// Check daemon status
pub fn daemon_status() -> Result<()> {
    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("expandify daemon is running with PID {}", pid);
            println!("Log file: {}", get_log_file_path().display());
        }
        Some(pid) => {
            println!("PID file exists but process {} is not running", pid);
            println!("This could indicate the daemon crashed or was stopped abruptly");
            println!("Recommend running 'expandify stop' followed by 'expandify start'");
        }
        None => println!("expandify daemon is not running"),
    }
    Ok(())
}

/// This function runs as a separate daemon process
pub fn daemon_worker_entry() -> Result<()> {
    ensure_config_dir()?;
    let pid_file = get_pid_file_path();
    let mut file = File::create(&pid_file)?;
    write!(file, "{}", process::id())?;

    let result = run_daemon_worker();
    if let Err(e) = &result {
        error!("Daemon worker stopped: {}", e);
    }

    let _ = fs::remove_file(&pid_file);
    result
}

/// The actual daemon worker process
pub fn run_daemon_worker() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("expandify-worker")
        .enable_time()
        .build()?;

    let files = DataFiles::in_config_dir();
    let media: Arc<dyn MediaStore> = Arc::new(ImageDirectory::new(get_images_dir()));
    let mut repository =
        SnippetRepository::open(JsonFileStore::new(&files.snippets), Arc::clone(&media))?;
    repository.subscribe(|snippets| info!("Snippet list now has {} entries", snippets.len()));
    let repository = repository.shared();

    let allow_list = Arc::new(RwLock::new(AllowList::load(&files.allowed_apps)?));
    let settings = Settings::load(&files.settings)?;
    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier);

    let engine = ExpansionEngine::builder(Arc::clone(&repository))
        .media(media)
        .notifier(Arc::clone(&notifier))
        .build(runtime.handle().clone());
    let gate = ContextGate::new(Arc::new(SystemWindowProbe), Arc::clone(&allow_list));
    let pipeline = KeystrokePipeline::new(gate, Arc::clone(&repository), engine);
    pipeline.set_triggers_disabled(settings.triggers_disabled);
    let triggers = pipeline.triggers_switch();

    info!(
        pid = process::id(),
        triggers_disabled = settings.triggers_disabled,
        "Expandify worker running"
    );

    let (sender, receiver) = mpsc::channel();
    let _listener = start_keyboard_listener(sender);
    let pipeline_thread = start_pipeline(pipeline, receiver);

    let mut reloader = DataReloader::new(&files, repository, allow_list, triggers, notifier);
    while !pipeline_thread.is_finished() {
        thread::sleep(RELOAD_INTERVAL);
        reloader.poll();
    }

    // Only reached when the keyboard hook gave up and closed the channel.
    let _ = pipeline_thread.join();
    runtime.shutdown_timeout(Duration::from_secs(2));
    Err(ExpandifyError::Keyboard(
        "keyboard listener could not be started".to_string(),
    ))
}
