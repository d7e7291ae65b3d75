use expandify_core::Result;

#[cfg(any(target_os = "macos", target_os = "linux"))]
use expandify_core::ExpandifyError;

#[cfg(target_os = "macos")]
use crate::process::detect_terminal_app;

#[cfg(target_os = "linux")]
use crate::process::is_running_as_sudo;

/// Make sure the global keyboard hook can be installed before launching the
/// worker. Prints guidance and fails with `PermissionDenied` when it cannot.
pub fn check_and_request_permissions() -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        if !has_accessibility_permission() {
            request_macos_permissions()?;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if !has_display_access() {
            return Err(linux_permission_error());
        }
    }

    #[cfg(target_os = "windows")]
    {
        println!("Expandify monitors keyboard input to detect triggers.");
        println!("Some antivirus programs may warn about or block this.");
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn has_accessibility_permission() -> bool {
    std::process::Command::new("osascript")
        .arg("-e")
        .arg("tell application \"System Events\" to return name of first process")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(target_os = "macos")]
fn request_macos_permissions() -> Result<()> {
    let terminal_app = detect_terminal_app();

    println!("⚠️  Expandify needs accessibility permissions to detect keyboard input");
    println!("--------------------------------------------------------------------");
    println!("1. Open System Settings > Privacy & Security > Accessibility");
    println!("2. Check the box next to '{}'", terminal_app);
    println!("3. On macOS 14 or newer, also allow it under Input Monitoring");
    println!();
    println!("Would you like to open System Settings now? (y/n)");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim().eq_ignore_ascii_case("y") {
        let _ = std::process::Command::new("open")
            .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
            .status();
    }

    println!("\nPress Enter once you've granted permission...");
    input.clear();
    std::io::stdin().read_line(&mut input)?;

    if !has_accessibility_permission() {
        return Err(ExpandifyError::PermissionDenied(format!(
            "Accessibility permission not granted for {}. Please try again.",
            terminal_app
        )));
    }

    println!("✅ Permission granted.");
    Ok(())
}

/// The hook and the window probe both talk to the X server.
#[cfg(target_os = "linux")]
fn has_display_access() -> bool {
    std::env::var_os("DISPLAY").is_some_and(|display| !display.is_empty())
}

#[cfg(target_os = "linux")]
fn linux_permission_error() -> ExpandifyError {
    println!("⚠️  Expandify needs an X11 display to read keyboard input");
    println!("-------------------------------------------------------");
    println!("Run `expandify start` from a graphical session (DISPLAY must be set).");
    println!("Wayland sessions need XWayland; the window lookup also uses xdotool.");
    if is_running_as_sudo() {
        println!("Under sudo, preserve the display with: sudo -E expandify start");
    }
    ExpandifyError::PermissionDenied("no X11 display available".to_string())
}
