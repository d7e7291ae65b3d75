use expandify_core::Notifier;
use std::process::Command;
use std::thread;
use tracing::{debug, warn};

/// Shows notifications through the desktop's notification service.
///
/// The helper process is reaped on a background thread; `notify` never waits
/// for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        debug!(title, body, "Showing notification");
        match notification_command(title, body).spawn() {
            Ok(mut child) => {
                thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => warn!("Failed to show notification '{}': {}", title, e),
        }
    }
}

/// Quote for an AppleScript string literal.
pub fn applescript_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote for a PowerShell single-quoted string.
pub fn powershell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

#[cfg(target_os = "linux")]
fn notification_command(title: &str, body: &str) -> Command {
    let mut cmd = Command::new("notify-send");
    cmd.args(["--app-name=Expandify", "--expire-time=3000", title, body]);
    cmd
}

#[cfg(target_os = "macos")]
fn notification_command(title: &str, body: &str) -> Command {
    let mut cmd = Command::new("osascript");
    cmd.arg("-e").arg(format!(
        "display notification {} with title {}",
        applescript_quote(body),
        applescript_quote(title)
    ));
    cmd
}

#[cfg(target_os = "windows")]
fn notification_command(title: &str, body: &str) -> Command {
    let script = format!(
        "Add-Type -AssemblyName System.Windows.Forms; \
         $n = New-Object System.Windows.Forms.NotifyIcon; \
         $n.Icon = [System.Drawing.SystemIcons]::Information; \
         $n.Visible = $true; \
         $n.ShowBalloonTip(3000, {}, {}, 'Info'); \
         Start-Sleep -Seconds 4; \
         $n.Dispose()",
        powershell_quote(title),
        powershell_quote(body)
    );
    let mut cmd = Command::new("powershell");
    cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
    cmd
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn notification_command(title: &str, body: &str) -> Command {
    let mut cmd = Command::new("echo");
    cmd.arg(format!("{}: {}", title, body));
    cmd
}
