use std::io;
use thiserror::Error;

/// Problems wiring devices onto the address bus. These are fatal at setup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    #[error("device at {base:#06x} (size {size:#06x}) overlaps device at {existing:#06x}")]
    Overlap { base: u16, size: u16, existing: u16 },

    #[error("device at {base:#06x} (size {size:#06x}) runs past the end of the address space")]
    OutOfRange { base: u16, size: u16 },

    #[error("device at {base:#06x} has zero size")]
    ZeroSize { base: u16 },
}

/// A machine configuration that can't be built.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("text grid of {cols}x{rows} has no cells")]
    EmptyGrid { cols: usize, rows: usize },

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Problems reading or validating a memory image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("image must be exactly {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    #[error("image is too short to hold its origin header")]
    Truncated,

    #[error("{len} bytes at {origin:#06x} run past the end of the address space")]
    Overflow { origin: u16, len: usize },

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("unrecognised image type: {0:?}")]
    UnknownFormat(String),

    #[error("unable to read image: {0}")]
    Io(#[from] io::Error),
}
