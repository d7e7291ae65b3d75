use expandify_core::{KeyEvent, KeystrokePipeline};
use rdev::{self, EventType, Key as RdevKey};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const MAX_LISTEN_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Name a key the way [`expandify_core::KeyInput::classify`] expects.
///
/// Editing keys are named by their physical key; anything else by the
/// character it produced, falling back to the uppercased key name.
pub fn key_name(key: RdevKey, produced: Option<&str>) -> String {
    match key {
        RdevKey::Space => "SPACE".to_string(),
        RdevKey::Return | RdevKey::KpReturn => "RETURN".to_string(),
        RdevKey::Tab => "TAB".to_string(),
        RdevKey::Backspace => "BACKSPACE".to_string(),
        _ => match produced {
            Some(text) if is_printable(text) => text.to_string(),
            _ => format!("{:?}", key).to_uppercase(),
        },
    }
}

fn is_printable(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if !c.is_control())
}

/// Translate a raw hook event. Mouse and wheel events yield `None`.
pub fn translate(event: &rdev::Event) -> Option<KeyEvent> {
    match event.event_type {
        EventType::KeyPress(key) => Some(KeyEvent::down(key_name(key, event.name.as_deref()))),
        EventType::KeyRelease(key) => Some(KeyEvent::up(key_name(key, None))),
        _ => None,
    }
}

/// Install the global keyboard hook on its own thread.
///
/// Events are forwarded to `sender`. The hook is retried a few times; when it
/// gives up the sender is dropped, which closes the channel.
pub fn start_keyboard_listener(sender: Sender<KeyEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut retry_count = 0;

        while retry_count < MAX_LISTEN_RETRIES {
            let sender = sender.clone();
            let callback = move |event: rdev::Event| {
                if let Some(key) = translate(&event) {
                    // Receiver gone means the worker is shutting down.
                    let _ = sender.send(key);
                }
            };

            info!("Installing keyboard hook");
            match rdev::listen(callback) {
                Ok(()) => break,
                Err(e) => {
                    retry_count += 1;
                    error!("Error in keyboard listener: {:?}", e);
                    warn!(
                        "Retrying keyboard listener ({}/{})...",
                        retry_count, MAX_LISTEN_RETRIES
                    );
                    thread::sleep(RETRY_DELAY);
                }
            }
        }

        if retry_count >= MAX_LISTEN_RETRIES {
            error!(
                "Failed to start keyboard listener after {} attempts",
                MAX_LISTEN_RETRIES
            );
        }
    })
}

/// Drain `events` through `pipeline`, one at a time, until the channel closes.
pub fn start_pipeline(mut pipeline: KeystrokePipeline, events: Receiver<KeyEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            pipeline.handle(&event);
        }
        debug!("Keystroke channel closed");
    })
}
