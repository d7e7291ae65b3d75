use crate::error::{ExpandifyError, Result};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Down,
    Up,
}

/// A raw event from the global keyboard hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub name: String,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn down(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: KeyState::Down,
        }
    }

    pub fn up(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: KeyState::Up,
        }
    }

    pub fn is_down(&self) -> bool {
        self.state == KeyState::Down
    }

    pub fn input(&self) -> KeyInput {
        KeyInput::classify(&self.name)
    }
}

/// What a key-down means for the typed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Other,
}

impl KeyInput {
    pub fn classify(name: &str) -> Self {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return if c.is_control() {
                KeyInput::Other
            } else {
                KeyInput::Char(c)
            };
        }

        match name {
            "SPACE" => KeyInput::Char(' '),
            "SEMICOLON" => KeyInput::Char(';'),
            "RETURN" | "ENTER" => KeyInput::Enter,
            "TAB" => KeyInput::Tab,
            "BACKSPACE" | "BACK SPACE" => KeyInput::Backspace,
            _ => KeyInput::Other,
        }
    }
}

/// Synthetic keystrokes sent to the focused application.
///
/// Calls return once the keystrokes are queued with the OS. Whether the
/// target application acted on them cannot be observed.
pub trait KeyInjector: Send + Sync {
    fn erase(&self, count: usize) -> Result<()>;
    fn paste(&self) -> Result<()>;
}

/// Create a keyboard controller
pub fn create_keyboard_controller() -> Result<Enigo> {
    Enigo::new(&Settings::default()).map_err(|err| {
        ExpandifyError::Injection(format!("Failed to create keyboard controller: {}", err))
    })
}

/// Send backspace key presses
pub fn send_backspace(keyboard: &mut impl Keyboard, count: usize) -> Result<()> {
    for _ in 0..count {
        thread::sleep(Duration::from_millis(2));
        keyboard
            .key(Key::Backspace, Direction::Click)
            .map_err(|err| ExpandifyError::Injection(format!("Failed to send backspace: {}", err)))?;
    }
    Ok(())
}

/// Send the platform paste chord
pub fn send_paste(keyboard: &mut impl Keyboard) -> Result<()> {
    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    let failed =
        |err: enigo::InputError| ExpandifyError::Injection(format!("Failed to send paste: {}", err));

    keyboard.key(modifier, Direction::Press).map_err(failed)?;
    let pasted = keyboard
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(failed);
    // Release the modifier even when the click failed
    keyboard.key(modifier, Direction::Release).map_err(failed)?;
    pasted
}

/// Injects through `enigo`, creating a controller for every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnigoInjector;

impl KeyInjector for EnigoInjector {
    fn erase(&self, count: usize) -> Result<()> {
        let mut keyboard = create_keyboard_controller()?;
        send_backspace(&mut keyboard, count)
    }

    fn paste(&self) -> Result<()> {
        let mut keyboard = create_keyboard_controller()?;
        send_paste(&mut keyboard)
    }
}
