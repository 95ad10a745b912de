use crate::error::{BusError, ConfigError};
use crate::memory::{AddressBus, Ram};
use crate::ports::{KeyLatch, KeyboardPort, ScreenPort};
use crate::terminal::SharedTerminal;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// Standard Kabputer memory map:
///   0x0000-0x7fff  RAM (32K)
///   0x8000         screen output port
///   0x8001         keyboard input port
///   0x8002-0x83ff  unmapped I/O page
///   0x8400-0xffff  RAM (31K)
///
/// image loaders never write anywhere in the I/O page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub low_ram_base: u16,
    pub low_ram_size: u16,
    pub screen_port: u16,
    pub keyboard_port: u16,
    pub high_ram_base: u16,
    pub high_ram_size: u16,
    pub io_window: RangeInclusive<u16>,
    pub text_cols: usize,
    pub text_rows: usize,
    pub step_interval: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            low_ram_base: 0x0000,
            low_ram_size: 0x8000,
            screen_port: 0x8000,
            keyboard_port: 0x8001,
            high_ram_base: 0x8400,
            high_ram_size: 0x7c00,
            io_window: 0x8000..=0x83ff,
            text_cols: 80,
            text_rows: 26,
            step_interval: Duration::from_micros(1),
        }
    }
}

impl MachineConfig {
    /// the text grid needs at least one cell
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text_cols == 0 || self.text_rows == 0 {
            return Err(ConfigError::EmptyGrid {
                cols: self.text_cols,
                rows: self.text_rows,
            });
        }
        Ok(())
    }

    /// wire up RAM and both ports; a bad map is fatal
    pub fn build_bus(
        &self,
        terminal: SharedTerminal,
        latch: Arc<KeyLatch>,
    ) -> Result<AddressBus, BusError> {
        let mut bus = AddressBus::new();
        bus.attach(Box::new(Ram::new(self.low_ram_size)), self.low_ram_base)?;
        bus.attach(Box::new(ScreenPort::new(terminal)), self.screen_port)?;
        bus.attach(Box::new(KeyboardPort::new(latch)), self.keyboard_port)?;
        bus.attach(Box::new(Ram::new(self.high_ram_size)), self.high_ram_base)?;
        Ok(bus)
    }
}
