use crate::terminal::{BACKSPACE, ENTER, ESCAPE};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// A physical key, before shift and caps lock are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKey {
    /// an unshifted ASCII key code
    Char(u8),
    Enter,
    Backspace,
    Escape,
    LeftShift,
    RightShift,
    CapsLock,
    /// F1-F12; machine controls, never typed
    Function(u8),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: RawKey,
    pub action: KeyAction,
}

impl KeyInput {
    pub fn down(key: RawKey) -> Self {
        KeyInput {
            key,
            action: KeyAction::Down,
        }
    }

    pub fn up(key: RawKey) -> Self {
        KeyInput {
            key,
            action: KeyAction::Up,
        }
    }
}

/// US layout shifted punctuation
const SHIFTED: [(u8, u8); 21] = [
    (b'0', b')'),
    (b'1', b'!'),
    (b'2', b'@'),
    (b'3', b'#'),
    (b'4', b'$'),
    (b'5', b'%'),
    (b'6', b'^'),
    (b'7', b'&'),
    (b'8', b'*'),
    (b'9', b'('),
    (b'-', b'_'),
    (b'=', b'+'),
    (b'\\', b'|'),
    (b'[', b'{'),
    (b']', b'}'),
    (b';', b':'),
    (b'\'', b'"'),
    (b',', b'<'),
    (b'.', b'>'),
    (b'/', b'?'),
    (b'`', b'~'),
];

/// Tracks shift and caps lock and turns key events into the bytes a
/// program sees on the keyboard port.
#[derive(Debug, Default)]
pub struct KeyMapper {
    caps_lock: bool,
    shift_on: bool,
}

impl KeyMapper {
    pub fn new() -> Self {
        KeyMapper::default()
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    pub fn shift_on(&self) -> bool {
        self.shift_on
    }

    /// None for modifier changes, releases and anything untypeable
    pub fn process(&mut self, input: KeyInput) -> Option<u8> {
        match (input.action, input.key) {
            (KeyAction::Down, RawKey::Enter) => Some(ENTER),
            (KeyAction::Down, RawKey::Backspace) => Some(BACKSPACE),
            (KeyAction::Down, RawKey::Escape) => Some(ESCAPE),
            (KeyAction::Down, RawKey::CapsLock) => {
                self.caps_lock = !self.caps_lock;
                None
            }
            (KeyAction::Down, RawKey::LeftShift | RawKey::RightShift) => {
                self.shift_on = true;
                None
            }
            (KeyAction::Up, RawKey::LeftShift | RawKey::RightShift) => {
                self.shift_on = false;
                None
            }
            (KeyAction::Down, RawKey::Char(c)) if (32..=126).contains(&c) => {
                Some(self.apply_case(c))
            }
            _ => None,
        }
    }

    fn apply_case(&self, c: u8) -> u8 {
        if c.is_ascii_lowercase() {
            // shift and caps lock cancel each other out
            if self.caps_lock != self.shift_on {
                c.to_ascii_uppercase()
            } else {
                c
            }
        } else if self.shift_on {
            SHIFTED
                .iter()
                .find(|(k, _)| *k == c)
                .map_or(c, |&(_, s)| s)
        } else {
            c
        }
    }
}

impl From<KeyEvent> for KeyInput {
    /// terminals hand us characters with shift already applied, so they
    /// come through as plain key downs
    fn from(evt: KeyEvent) -> Self {
        let key = match evt.code {
            KeyCode::Char(c) if c.is_ascii() && !evt.modifiers.contains(KeyModifiers::CONTROL) => {
                RawKey::Char(c as u8)
            }
            KeyCode::Enter => RawKey::Enter,
            KeyCode::Backspace => RawKey::Backspace,
            KeyCode::Esc => RawKey::Escape,
            KeyCode::F(n) => RawKey::Function(n),
            _ => RawKey::Other,
        };
        KeyInput::down(key)
    }
}

/// reads key presses
pub trait Input {
    /// everything pressed since the last call, without blocking
    fn poll_keys(&mut self) -> Result<Vec<KeyInput>, io::Error>;
}

/// key presses from the controlling terminal, via crossterm in raw mode
pub struct StdinInput;

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput)
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("unable to leave raw mode: {}", e);
        }
    }
}

impl Input for StdinInput {
    fn poll_keys(&mut self) -> Result<Vec<KeyInput>, io::Error> {
        let mut keys = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                keys.push(KeyInput::from(evt));
            }
        }
        Ok(keys)
    }
}

/// scripted Input for testing; hands out one batch per poll
pub struct DummyInput {
    batches: VecDeque<Vec<KeyInput>>,
}

impl DummyInput {
    pub fn new(batches: Vec<Vec<KeyInput>>) -> Self {
        DummyInput {
            batches: batches.into(),
        }
    }

    /// one key down per byte, all in one batch
    pub fn typing(text: &[u8]) -> Self {
        DummyInput::new(vec![text
            .iter()
            .map(|&c| KeyInput::down(RawKey::Char(c)))
            .collect()])
    }
}

impl Input for DummyInput {
    fn poll_keys(&mut self) -> Result<Vec<KeyInput>, io::Error> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}
