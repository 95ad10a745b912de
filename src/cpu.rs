use crate::memory::AddressBus;

/// interrupt-disable bit of the status register
pub const FLAG_INTERRUPT_DISABLE: u8 = 0b0000_0100;

/// A snapshot of the 6502 register file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub p: u8,
}

impl Registers {
    pub fn interrupts_disabled(&self) -> bool {
        self.p & FLAG_INTERRUPT_DISABLE != 0
    }
}

/// The processor core the scheduler drives. Instruction decode and
/// execution belong to the implementation; the scheduler only resets it,
/// steps it, raises interrupts and reads registers back.
pub trait Cpu: Send {
    /// power-on reset, typically reading the reset vector off the bus
    fn reset(&mut self, bus: &mut AddressBus);

    /// execute exactly one instruction
    fn step(&mut self, bus: &mut AddressBus);

    /// raise a maskable interrupt
    fn interrupt(&mut self, bus: &mut AddressBus);

    fn registers(&self) -> Registers;
}
