//! Non-interactive front end: key presses go straight into the terminal
//! engine with no program in between.

use crate::display::Display;
use crate::input::{Input, KeyMapper, RawKey};
use crate::terminal::TerminalEngine;
use std::io;

/// the key that ends the session
pub const QUIT_KEY: RawKey = RawKey::Function(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    Continue,
    Quit,
}

pub struct Typewriter<I: Input, D: Display> {
    input: I,
    display: D,
    mapper: KeyMapper,
    terminal: TerminalEngine,
    blink_every: u32,
    frame: u32,
}

impl<I: Input, D: Display> Typewriter<I, D> {
    /// the cursor blinks once every `blink_every` frames
    pub fn new(input: I, display: D, terminal: TerminalEngine, blink_every: u32) -> Self {
        Typewriter {
            input,
            display,
            mapper: KeyMapper::new(),
            terminal,
            blink_every: blink_every.max(1),
            frame: 0,
        }
    }

    pub fn terminal(&self) -> &TerminalEngine {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut TerminalEngine {
        &mut self.terminal
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// take keys, then draw a frame
    pub fn pump(&mut self) -> Result<Pump, io::Error> {
        for key in self.input.poll_keys()? {
            if key.key == QUIT_KEY {
                return Ok(Pump::Quit);
            }
            if let Some(b) = self.mapper.process(key) {
                self.terminal.process_byte(b);
            }
        }
        if self.frame % self.blink_every == 0 {
            self.terminal.next_blink_glyph();
        }
        self.frame = self.frame.wrapping_add(1);

        let cursor = self.terminal.cursor();
        let status = format!(
            "{:02},{:02}{}  F10: Exit",
            cursor.y(),
            cursor.x(),
            if self.mapper.caps_lock() { " CAPS" } else { "" }
        );
        self.display.draw(&self.terminal.render_lines(), &status)?;
        Ok(Pump::Continue)
    }
}
