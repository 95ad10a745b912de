///
/// ## Design
///
/// * a simple 8-bit home computer built around a 6502
/// * the CPU core itself is pluggable (see `cpu::Cpu`); this crate owns
///   everything around it
/// * devices on a 16-bit address bus; unmapped space is an open bus
/// * CPU progress only ever comes from the scheduler tick, which runs one
///   instruction at a time under a lock
/// * text output is a byte stream interpreted by a terminal engine into a
///   grid of glyphs; rendering that grid is someone else's problem
///
/// Model
///
/// Machine(config)
///  |-- AddressBus
///  |    |-- Ram            0x0000-0x7fff
///  |    |-- ScreenPort     0x8000  --> TerminalEngine (shared with renderer)
///  |    |-- KeyboardPort   0x8001  <-- KeyLatch (shared with scheduler)
///  |    `-- Ram            0x8400-0xffff
///  |-- Cpu (external)
///  `-- BreakpointSet
///
/// ExecutionScheduler
///  `-- worker thread
///       |-- lock machine
///       |-- breakpoint check at PC -> maybe enter single-step
///       |-- cpu.step()                 // bus I/O happens in here
///       |-- maybe pause for single-step
///       `-- sleep(step interval)
///
/// key press -> KeyMapper -> Machine::set_key_waiting (latch + IRQ)
///                        `-> or straight into TerminalEngine (typewriter)
pub mod breakpoint;
pub mod config;
pub mod cpu;
pub mod cursor;
pub mod display;
pub mod error;
pub mod input;
pub mod loader;
pub mod memory;
pub mod ports;
pub mod scheduler;
pub mod terminal;
pub mod typewriter;
