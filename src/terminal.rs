//! Character terminal engine.
//!
//! Consumes the byte stream written to the screen port and turns it into
//! cursor motion, glyph placement and scrolling on a fixed grid of cells.
//! Bytes following ESC are collected and, from the last `[` on, matched
//! against a small bracket-introduced dialect:
//!
//! | sequence      | effect                                   |
//! |---------------|------------------------------------------|
//! | `ESC [D`      | scroll the grid up one row               |
//! | `ESC [M`      | scroll the grid down one row             |
//! | `ESC [H`      | cursor home                              |
//! | `ESC [2J`     | blank the grid, cursor stays put         |
//! | `ESC [nA..D`  | cursor up/down/right/left by n, clamped  |
//! | `ESC [r;cH`   | cursor to row r, column c, if on grid    |
//!
//! Anything that doesn't match within `ESCAPE_MAX_LENGTH` bytes is dropped.

use crate::cursor::{CursorPos, Glyph, DEFAULT_BLINK};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const BACKSPACE: u8 = 0x08;
pub const ENTER: u8 = 0x0d;
pub const ESCAPE: u8 = 0x1b;

/// longest escape sequence (after ESC) we'll hold before giving up
pub const ESCAPE_MAX_LENGTH: usize = 10;

/// a terminal shared between the stepping thread and whoever draws it
pub type SharedTerminal = Arc<Mutex<TerminalEngine>>;

/// lock a shared terminal, shrugging off poisoning; the grid is always
/// left consistent between bytes
pub fn lock_terminal(terminal: &SharedTerminal) -> MutexGuard<'_, TerminalEngine> {
    terminal.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Escape,
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// exactly these bytes
    Literal(&'static [u8]),
    /// `[`, optional decimal count, then the final byte
    Count(u8),
    /// `[`, digits, `;`, digits, then the final byte
    Position(u8),
}

impl Pattern {
    /// `seq` runs from the last `[` of the collected bytes
    fn matches(&self, seq: &[u8]) -> bool {
        match *self {
            Pattern::Literal(lit) => seq == lit,
            Pattern::Count(fin) => match seq {
                [b'[', digits @ .., last] => {
                    *last == fin && digits.iter().all(u8::is_ascii_digit)
                }
                _ => false,
            },
            Pattern::Position(fin) => match seq {
                [b'[', body @ .., last] if *last == fin => match split_once(body, b';') {
                    Some((row, col)) => is_number(row) && is_number(col),
                    None => false,
                },
                _ => false,
            },
        }
    }
}

/// the tail of `seq` from its last `[`; bytes before it are noise
fn bracketed_tail(seq: &[u8]) -> Option<&[u8]> {
    let start = seq.iter().rposition(|&b| b == b'[')?;
    Some(&seq[start..])
}

struct EscapeRule {
    pattern: Pattern,
    action: fn(&mut TerminalEngine, &[u8]),
}

// first match wins, so the bare scroll codes shadow a count-less `[D`
const ESCAPE_RULES: &[EscapeRule] = &[
    EscapeRule {
        pattern: Pattern::Literal(b"[D"),
        action: |t, _| {
            t.scroll_up();
            t.cursor.clear_scroll();
        },
    },
    EscapeRule {
        pattern: Pattern::Literal(b"[M"),
        action: |t, _| {
            t.scroll_down();
            t.cursor.clear_scroll();
        },
    },
    EscapeRule {
        pattern: Pattern::Literal(b"[H"),
        action: |t, _| t.cursor.home(),
    },
    EscapeRule {
        pattern: Pattern::Literal(b"[2J"),
        action: |t, _| t.clear(),
    },
    EscapeRule {
        pattern: Pattern::Count(b'A'),
        action: |t, seq| t.cursor.move_up(first_number(seq).unwrap_or(0)),
    },
    EscapeRule {
        pattern: Pattern::Count(b'B'),
        action: |t, seq| t.cursor.move_down(first_number(seq).unwrap_or(0)),
    },
    EscapeRule {
        pattern: Pattern::Count(b'C'),
        action: |t, seq| t.cursor.move_right(first_number(seq).unwrap_or(0)),
    },
    EscapeRule {
        pattern: Pattern::Count(b'D'),
        action: |t, seq| t.cursor.move_left(first_number(seq).unwrap_or(0)),
    },
    EscapeRule {
        pattern: Pattern::Position(b'H'),
        action: |t, seq| {
            if let Some((row, col)) = two_numbers(seq) {
                t.cursor.set(col, row);
            }
        },
    },
];

fn is_number(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(u8::is_ascii_digit)
}

fn split_once(s: &[u8], sep: u8) -> Option<(&[u8], &[u8])> {
    let i = s.iter().position(|&b| b == sep)?;
    Some((&s[..i], &s[i + 1..]))
}

fn parse_number(digits: &[u8]) -> usize {
    digits.iter().fold(0usize, |n, d| {
        n.saturating_mul(10).saturating_add((d - b'0') as usize)
    })
}

/// the first run of decimal digits in `seq`
fn first_number(seq: &[u8]) -> Option<usize> {
    let start = seq.iter().position(u8::is_ascii_digit)?;
    let len = seq[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    Some(parse_number(&seq[start..start + len]))
}

/// the numbers either side of the `;`
fn two_numbers(seq: &[u8]) -> Option<(usize, usize)> {
    let (a, b) = split_once(seq, b';')?;
    Some((first_number(a)?, first_number(b)?))
}

/// Owns the cursor and video memory, and interprets bytes written to the
/// screen.
pub struct TerminalEngine {
    text_cols: usize,
    text_rows: usize,
    cursor: CursorPos,
    video: Vec<Glyph>,
    mode: Mode,
    sequence: Vec<u8>,
}

impl TerminalEngine {
    /// `cols`/`rows` must be non-zero
    pub fn new(cols: usize, rows: usize) -> Self {
        TerminalEngine {
            text_cols: cols,
            text_rows: rows,
            cursor: CursorPos::new(cols, rows, &DEFAULT_BLINK),
            video: vec![0; cols * rows],
            mode: Mode::Normal,
            sequence: Vec::with_capacity(ESCAPE_MAX_LENGTH + 1),
        }
    }

    /// wrap up for sharing with the screen port
    pub fn shared(self) -> SharedTerminal {
        Arc::new(Mutex::new(self))
    }

    pub fn cols(&self) -> usize {
        self.text_cols
    }

    pub fn rows(&self) -> usize {
        self.text_rows
    }

    pub fn cursor(&self) -> &CursorPos {
        &self.cursor
    }

    /// the whole grid, row-major
    pub fn video(&self) -> &[Glyph] {
        &self.video
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> Glyph {
        self.video[self.index(x, y)]
    }

    /// one row of the grid
    pub fn row(&self, y: usize) -> &[Glyph] {
        let start = y * self.text_cols;
        &self.video[start..start + self.text_cols]
    }

    pub fn in_escape(&self) -> bool {
        self.mode == Mode::Escape
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.text_cols + x
    }

    /// feed one byte from the output stream
    pub fn process_byte(&mut self, b: u8) {
        match self.mode {
            Mode::Escape => self.match_escape(b),
            Mode::Normal => match b {
                BACKSPACE => {
                    self.cursor.backspace();
                    let i = self.index(self.cursor.x(), self.cursor.y());
                    self.video[i] = 0;
                }
                ESCAPE => {
                    self.mode = Mode::Escape;
                    self.sequence.clear();
                }
                ENTER => {
                    self.cursor.new_line();
                    self.scroll_if_pending();
                }
                32..=126 => self.put_glyph(b),
                _ => {}
            },
        }
    }

    /// feed a run of bytes
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.process_byte(b);
        }
    }

    fn put_glyph(&mut self, g: Glyph) {
        let i = self.index(self.cursor.x(), self.cursor.y());
        self.video[i] = g;
        self.cursor.advance();
        self.scroll_if_pending();
    }

    fn scroll_if_pending(&mut self) {
        if self.cursor.take_scroll() {
            self.scroll_up();
        }
    }

    fn match_escape(&mut self, b: u8) {
        self.sequence.push(b);
        let rule = bracketed_tail(&self.sequence)
            .and_then(|tail| ESCAPE_RULES.iter().find(|r| r.pattern.matches(tail)));
        if let Some(rule) = rule {
            let seq = std::mem::take(&mut self.sequence);
            if let Some(tail) = bracketed_tail(&seq) {
                (rule.action)(self, tail);
            }
            self.sequence = seq;
            self.sequence.clear();
            self.mode = Mode::Normal;
        } else if self.sequence.len() > ESCAPE_MAX_LENGTH {
            debug!(
                "dropping unrecognised escape sequence {:?}",
                String::from_utf8_lossy(&self.sequence)
            );
            self.sequence.clear();
            self.mode = Mode::Normal;
        }
    }

    /// row i takes row i+1; the last row comes up blank
    pub fn scroll_up(&mut self) {
        let cols = self.text_cols;
        let len = self.video.len();
        self.video.copy_within(cols.., 0);
        self.video[len - cols..].fill(0);
    }

    /// row i takes row i-1; row 0 comes up blank
    pub fn scroll_down(&mut self) {
        let cols = self.text_cols;
        let len = self.video.len();
        self.video.copy_within(..len - cols, cols);
        self.video[..cols].fill(0);
    }

    /// blank every cell; the cursor doesn't move
    pub fn clear(&mut self) {
        self.video.fill(0);
    }

    /// back to power-on state
    pub fn reset(&mut self) {
        self.cursor.home();
        self.clear();
        self.sequence.clear();
        self.mode = Mode::Normal;
    }

    /// step the cursor blink; called by the render loop at its own cadence
    pub fn next_blink_glyph(&mut self) -> Glyph {
        self.cursor.next_blink()
    }

    /// the grid as text, with the current blink glyph drawn over the
    /// cursor cell; video memory is left alone
    pub fn render_lines(&self) -> Vec<String> {
        let blink = self.cursor.blink_glyph();
        (0..self.text_rows)
            .map(|y| {
                self.row(y)
                    .iter()
                    .enumerate()
                    .map(|(x, &g)| {
                        let g = if self.cursor.display_on
                            && blink != 0
                            && (x, y) == (self.cursor.x(), self.cursor.y())
                        {
                            blink
                        } else {
                            g
                        };
                        if g == 0 {
                            ' '
                        } else {
                            g as char
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
