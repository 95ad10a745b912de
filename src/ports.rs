//! The two single-byte I/O ports the CPU talks to.

use crate::memory::Device;
use crate::terminal::{lock_terminal, SharedTerminal};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, TryLockError};

/// Output port: bytes written here go straight to the terminal engine.
/// Reading gives the busy flag, 1 while someone else holds the terminal.
/// Bytes are processed synchronously, so it is 0 whenever the terminal
/// is free.
pub struct ScreenPort {
    terminal: SharedTerminal,
}

impl ScreenPort {
    pub fn new(terminal: SharedTerminal) -> Self {
        ScreenPort { terminal }
    }
}

impl Device for ScreenPort {
    fn size(&self) -> u16 {
        1
    }

    fn read_byte(&mut self, _offset: u16) -> u8 {
        match self.terminal.try_lock() {
            Err(TryLockError::WouldBlock) => 1,
            Ok(_) | Err(TryLockError::Poisoned(_)) => 0,
        }
    }

    fn write_byte(&mut self, _offset: u16, data: u8) {
        lock_terminal(&self.terminal).process_byte(data);
    }
}

/// The key waiting to be picked up by the keyboard port. Shared between
/// the port on the bus and whoever delivers key presses.
#[derive(Debug, Default)]
pub struct KeyLatch {
    key: AtomicU8,
    waiting: AtomicBool,
}

impl KeyLatch {
    pub fn new() -> Arc<Self> {
        Arc::new(KeyLatch::default())
    }

    /// latch `key`, replacing anything not yet read
    pub fn press(&self, key: u8) {
        self.key.store(key, Ordering::Relaxed);
        self.waiting.store(true, Ordering::Release);
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    /// hand over the waiting key, once; 0 when nothing is waiting
    pub fn take(&self) -> u8 {
        if self.waiting.swap(false, Ordering::AcqRel) {
            self.key.load(Ordering::Relaxed)
        } else {
            0
        }
    }
}

/// Input port: reading returns the waiting key and clears it, which is
/// how a program acknowledges the keyboard interrupt. Writes are ignored.
pub struct KeyboardPort {
    latch: Arc<KeyLatch>,
}

impl KeyboardPort {
    pub fn new(latch: Arc<KeyLatch>) -> Self {
        KeyboardPort { latch }
    }
}

impl Device for KeyboardPort {
    fn size(&self) -> u16 {
        1
    }

    fn read_byte(&mut self, _offset: u16) -> u8 {
        self.latch.take()
    }

    fn write_byte(&mut self, _offset: u16, _data: u8) {}
}
