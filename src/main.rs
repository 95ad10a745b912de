use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use kabputer::config::MachineConfig;
use kabputer::display::TermDisplay;
use kabputer::input::StdinInput;
use kabputer::terminal::TerminalEngine;
use kabputer::typewriter::{Pump, Typewriter};
use log::info;

/// how often a frame is drawn
const FRAME: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(about = "Kabputer terminal in typewriter mode")]
struct Args {
    /// text columns
    #[arg(long, default_value_t = MachineConfig::default().text_cols)]
    cols: usize,

    /// text rows
    #[arg(long, default_value_t = MachineConfig::default().text_rows)]
    rows: usize,

    /// feed this file through the terminal before taking keys
    #[arg(long)]
    feed: Option<PathBuf>,

    /// cursor blink period in milliseconds
    #[arg(long, default_value_t = 300)]
    blink_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    if args.cols == 0 || args.rows == 0 {
        return Err("the text grid needs at least one row and column".into());
    }

    let mut terminal = TerminalEngine::new(args.cols, args.rows);
    if let Some(path) = &args.feed {
        let bytes = fs::read(path)?;
        info!("feeding {} bytes from {}", bytes.len(), path.display());
        terminal.process_bytes(&bytes);
    }

    let blink_every = (args.blink_ms / FRAME.as_millis() as u64).max(1) as u32;
    let input = StdinInput::new()?;
    let display = TermDisplay::new(args.cols, args.rows)?;
    let mut typewriter = Typewriter::new(input, display, terminal, blink_every);

    while typewriter.pump()? == Pump::Continue {
        spin_sleep::sleep(FRAME);
    }

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..2 {
        println!();
    }
    Ok(())
}
