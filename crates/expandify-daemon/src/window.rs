//! Focused-window queries through the platform's own tooling.

use expandify_core::{ExpandifyError, Result, WindowInfo, WindowProbe};
use std::process::Command;

#[cfg(target_os = "macos")]
const FRONT_WINDOW_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appPath to POSIX path of (file of frontApp as alias)
    set winTitle to ""
    try
        set winTitle to name of front window of frontApp
    end try
end tell
return appPath & linefeed & winTitle
"#;

#[cfg(target_os = "windows")]
const FRONT_WINDOW_SCRIPT: &str = r#"
Add-Type @"
using System;
using System.Runtime.InteropServices;
using System.Text;
public class Foreground {
    [DllImport("user32.dll")] public static extern IntPtr GetForegroundWindow();
    [DllImport("user32.dll")] public static extern int GetWindowText(IntPtr h, StringBuilder s, int n);
    [DllImport("user32.dll")] public static extern uint GetWindowThreadProcessId(IntPtr h, out uint p);
}
"@
$h = [Foreground]::GetForegroundWindow()
if ($h -eq [IntPtr]::Zero) { exit 0 }
$title = New-Object System.Text.StringBuilder 512
[void][Foreground]::GetWindowText($h, $title, 512)
$owner = 0
[void][Foreground]::GetWindowThreadProcessId($h, [ref]$owner)
(Get-Process -Id $owner).Path
$title.ToString()
"#;

/// Asks the OS for the focused window on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWindowProbe;

impl WindowProbe for SystemWindowProbe {
    fn active_window(&self) -> Result<Option<WindowInfo>> {
        query_active_window()
    }
}

/// Parse `<owner path>\n<title>` as printed by the probe scripts.
/// Empty output means nothing has focus.
pub fn parse_window_report(report: &str) -> Result<Option<WindowInfo>> {
    let report = report.trim_end_matches(['\r', '\n']);
    if report.trim().is_empty() {
        return Ok(None);
    }

    let (path, title) = report.split_once('\n').unwrap_or((report, ""));
    let path = path.trim();
    if path.is_empty() {
        return Err(ExpandifyError::WindowQuery(format!(
            "no owner path in report: {:?}",
            report
        )));
    }
    Ok(Some(WindowInfo::new(title.trim(), path)))
}

fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ExpandifyError::WindowQuery(format!("{}: {}", program, e)))?;

    if !output.status.success() {
        return Err(ExpandifyError::WindowQuery(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(target_os = "linux")]
fn query_active_window() -> Result<Option<WindowInfo>> {
    let title = run("xdotool", &["getactivewindow", "getwindowname"])?;
    let pid = run("xdotool", &["getactivewindow", "getwindowpid"])?;
    let pid: u32 = pid
        .trim()
        .parse()
        .map_err(|_| ExpandifyError::WindowQuery(format!("unexpected pid {:?}", pid.trim())))?;

    let exe = std::fs::read_link(format!("/proc/{}/exe", pid))?;
    parse_window_report(&format!("{}\n{}", exe.to_string_lossy(), title))
}

#[cfg(target_os = "macos")]
fn query_active_window() -> Result<Option<WindowInfo>> {
    parse_window_report(&run("osascript", &["-e", FRONT_WINDOW_SCRIPT])?)
}

#[cfg(target_os = "windows")]
fn query_active_window() -> Result<Option<WindowInfo>> {
    parse_window_report(&run(
        "powershell",
        &["-NoProfile", "-NonInteractive", "-Command", FRONT_WINDOW_SCRIPT],
    )?)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn query_active_window() -> Result<Option<WindowInfo>> {
    Err(ExpandifyError::WindowQuery(
        "active window lookup is not supported on this platform".to_string(),
    ))
}
