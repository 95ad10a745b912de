use kabputer::cpu::{Cpu, Registers, FLAG_INTERRUPT_DISABLE};
use kabputer::memory::AddressBus;

/// Just enough of a 6502 to run echo programs: NOP, LDA #/abs, STA abs,
/// JMP abs, SEI, CLI and RTI. Interrupts save PC and P in the core
/// rather than on the stack.
#[derive(Default)]
pub struct ToyCpu {
    pub regs: Registers,
    pub interrupts: u32,
    saved: Option<(u16, u8)>,
}

impl ToyCpu {
    pub fn new() -> Self {
        ToyCpu::default()
    }
}

impl Cpu for ToyCpu {
    fn reset(&mut self, bus: &mut AddressBus) {
        self.regs = Registers {
            sp: 0xff,
            pc: bus.read_word(0xfffc),
            ..Registers::default()
        };
        self.saved = None;
    }

    fn step(&mut self, bus: &mut AddressBus) {
        let pc = self.regs.pc;
        let opcode = bus.read_byte(pc);
        let operand = pc.wrapping_add(1);
        self.regs.pc = match opcode {
            0xa9 => {
                self.regs.a = bus.read_byte(operand);
                pc.wrapping_add(2)
            }
            0xad => {
                let addr = bus.read_word(operand);
                self.regs.a = bus.read_byte(addr);
                pc.wrapping_add(3)
            }
            0x8d => {
                let addr = bus.read_word(operand);
                bus.write_byte(addr, self.regs.a);
                pc.wrapping_add(3)
            }
            0x4c => bus.read_word(operand),
            0x78 => {
                self.regs.p |= FLAG_INTERRUPT_DISABLE;
                pc.wrapping_add(1)
            }
            0x58 => {
                self.regs.p &= !FLAG_INTERRUPT_DISABLE;
                pc.wrapping_add(1)
            }
            0x40 => match self.saved.take() {
                Some((ret, p)) => {
                    self.regs.p = p;
                    ret
                }
                None => pc.wrapping_add(1),
            },
            _ => pc.wrapping_add(1),
        };
    }

    fn interrupt(&mut self, bus: &mut AddressBus) {
        self.interrupts += 1;
        self.saved = Some((self.regs.pc, self.regs.p));
        self.regs.p |= FLAG_INTERRUPT_DISABLE;
        self.regs.pc = bus.read_word(0xfffe);
    }

    fn registers(&self) -> Registers {
        self.regs
    }
}

/// prints "HI" then spins at 0x030a; the interrupt handler at 0x0400
/// echoes the waiting key to the screen
pub const ECHO_PROGRAM: &str = "\
0300: A9 48 8D 00 80 A9 49 8D 00 80 4C 0A 03
0400: AD 01 80 8D 00 80 40
FFFC: 00 03 00 04
";
