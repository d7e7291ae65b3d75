//! Background worker for Expandify: the global keyboard hook, active-window
//! lookup, desktop notifications and the PID-file lifecycle around them.

pub mod daemon_manager;
pub mod keyboard_listener;
pub mod notify;
pub mod permissions;
pub mod process;
pub mod reload;
pub mod window;

pub use daemon_manager::{daemon_status, daemon_worker_entry, start_daemon, stop_daemon};
pub use notify::DesktopNotifier;
pub use window::SystemWindowProbe;
