use std::process::Command;

/// Whether a process with `pid` currently exists.
#[cfg(unix)]
pub fn verify_process_running(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
pub fn verify_process_running(pid: u32) -> bool {
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
pub fn verify_process_running(_pid: u32) -> bool {
    false
}

#[cfg(target_os = "linux")]
pub fn is_running_as_sudo() -> bool {
    Command::new("id")
        .arg("-u")
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).trim() == "0")
        .unwrap_or(false)
}

/// Name of the terminal application that launched us, for permission hints.
#[cfg(target_os = "macos")]
pub fn detect_terminal_app() -> String {
    match std::env::var("TERM_PROGRAM").as_deref() {
        Ok("Apple_Terminal") => "Terminal".to_string(),
        Ok("iTerm.app") => "iTerm".to_string(),
        Ok("vscode") => "Visual Studio Code".to_string(),
        Ok(other) if !other.is_empty() => other.to_string(),
        _ => "your terminal application".to_string(),
    }
}
