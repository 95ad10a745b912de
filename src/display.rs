use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::text::Spans;
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

/// Display is used by the front end to put the text grid on a screen. It
/// should abstract the implementation details, so a variety of kinds of
/// screen would work.
pub trait Display {
    /// draw one frame: the grid rows (cursor already overlaid) and a
    /// status line
    fn draw(&mut self, lines: &[String], status: &str) -> Result<(), io::Error>;
}

/// text grid in the hosting terminal, rendered using TUI over crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    width: u16,
    height: u16,
}

impl TermDisplay {
    pub fn new(cols: usize, rows: usize) -> Result<TermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(TermDisplay {
            terminal,
            width: frame_span(cols),
            height: frame_span(rows),
        })
    }
}

/// cells needed for `n` grid cells plus the border on both sides
fn frame_span(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX).saturating_add(2)
}

impl Drop for TermDisplay {
    fn drop(&mut self) {
        // nothing useful to do if the terminal has gone away
        let _ = self.terminal.show_cursor();
    }
}

impl Display for TermDisplay {
    fn draw(&mut self, lines: &[String], status: &str) -> Result<(), io::Error> {
        let frame = Rect::new(0, 0, self.width, self.height);
        let text: Vec<Spans> = lines.iter().map(|l| Spans::from(l.clone())).collect();
        let title = format!("Kabputer | {}", status);
        self.terminal.draw(|f| {
            let screen = Paragraph::new(text).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::White).bg(Color::Black)),
            );
            // never draw past the edge of the hosting terminal
            f.render_widget(screen, frame.intersection(f.size()));
        })?;
        Ok(())
    }
}

/// useful for testing front-end loops; remembers the last frame
#[derive(Debug, Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last_lines: Vec<String>,
    pub last_status: String,
}

impl DummyDisplay {
    pub fn new() -> Self {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, lines: &[String], status: &str) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_lines = lines.to_vec();
        self.last_status = status.to_string();
        Ok(())
    }
}
