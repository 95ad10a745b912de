//! Cursor position on the text grid.
//!
//! The cursor never leaves the grid. Vertical motion off the bottom row
//! leaves it on the last row and raises `scroll_pending` so the owner can
//! scroll; any other cursor operation drops the flag again.

/// one cell of video memory; 0 is blank
pub type Glyph = u8;

/// the default blink cycle: underscore, then blank
pub const DEFAULT_BLINK: [Glyph; 2] = [b'_', 0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPos {
    x: usize,
    y: usize,
    pub display_on: bool,
    scroll_pending: bool,
    blink_sequence: Vec<Glyph>,
    // None until the first blink
    blink_index: Option<usize>,
    text_cols: usize,
    text_rows: usize,
}

impl CursorPos {
    /// `cols`/`rows` must be non-zero; an empty blink sequence always
    /// blinks blank
    pub fn new(cols: usize, rows: usize, blink_sequence: &[Glyph]) -> Self {
        assert!(cols > 0 && rows > 0, "cursor needs a non-empty grid");
        CursorPos {
            x: 0,
            y: 0,
            display_on: true,
            scroll_pending: false,
            blink_sequence: blink_sequence.to_vec(),
            blink_index: None,
            text_cols: cols,
            text_rows: rows,
        }
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn scroll_pending(&self) -> bool {
        self.scroll_pending
    }

    pub fn clear_scroll(&mut self) {
        self.scroll_pending = false;
    }

    /// clear and return the scroll flag
    pub fn take_scroll(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    /// advance the blink cycle and return the new glyph
    pub fn next_blink(&mut self) -> Glyph {
        if self.blink_sequence.is_empty() {
            return 0;
        }
        let next = match self.blink_index {
            Some(i) if i + 1 < self.blink_sequence.len() => i + 1,
            _ => 0,
        };
        self.blink_index = Some(next);
        self.blink_sequence[next]
    }

    /// the glyph the last blink produced, blank before the first one
    pub fn blink_glyph(&self) -> Glyph {
        self.blink_index
            .and_then(|i| self.blink_sequence.get(i).copied())
            .unwrap_or(0)
    }

    /// move right one cell, wrapping to the start of the next line
    pub fn advance(&mut self) {
        self.clear_scroll();
        self.x += 1;
        if self.x >= self.text_cols {
            self.new_line();
        }
    }

    /// start of the next line
    pub fn new_line(&mut self) {
        self.x = 0;
        self.next_line();
    }

    /// same column, next line
    pub fn next_line(&mut self) {
        self.clear_scroll();
        self.y += 1;
        if self.y >= self.text_rows {
            self.y = self.text_rows - 1;
            self.scroll_pending = true;
        }
    }

    /// left one cell; nothing at column 0
    pub fn backspace(&mut self) {
        self.clear_scroll();
        self.x = self.x.saturating_sub(1);
    }

    pub fn home(&mut self) {
        self.clear_scroll();
        self.x = 0;
        self.y = 0;
    }

    pub fn move_up(&mut self, n: usize) {
        self.clear_scroll();
        self.y = self.y.saturating_sub(n);
    }

    pub fn move_down(&mut self, n: usize) {
        self.clear_scroll();
        self.y = self.y.saturating_add(n).min(self.text_rows - 1);
    }

    pub fn move_left(&mut self, n: usize) {
        self.clear_scroll();
        self.x = self.x.saturating_sub(n);
    }

    pub fn move_right(&mut self, n: usize) {
        self.clear_scroll();
        self.x = self.x.saturating_add(n).min(self.text_cols - 1);
    }

    /// jump to (`x`, `y`) if it is on the grid; returns whether it moved
    pub fn set(&mut self, x: usize, y: usize) -> bool {
        if x >= self.text_cols || y >= self.text_rows {
            return false;
        }
        self.clear_scroll();
        self.x = x;
        self.y = y;
        true
    }
}
