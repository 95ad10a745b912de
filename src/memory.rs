use crate::error::BusError;
use log::trace;

// NB. addresses are u16 as per the 6502; offsets passed to devices are
//     relative to the base the device was attached at

/// Anything that can sit on the address bus: RAM, the screen port, the
/// keyboard port.
pub trait Device: Send {
    /// how many addresses the device occupies; fixed and never zero
    fn size(&self) -> u16;

    /// read the byte at `offset` (may have side effects, e.g. the keyboard)
    fn read_byte(&mut self, offset: u16) -> u8;

    /// write the byte at `offset`
    fn write_byte(&mut self, offset: u16, data: u8);
}

/// A plain block of read/write memory
pub struct Ram {
    bytes: Box<[u8]>,
}

impl Ram {
    pub fn new(size: u16) -> Self {
        Ram {
            bytes: vec![0u8; size as usize].into_boxed_slice(),
        }
    }
}

impl Device for Ram {
    fn size(&self) -> u16 {
        self.bytes.len() as u16
    }

    fn read_byte(&mut self, offset: u16) -> u8 {
        self.bytes[offset as usize]
    }

    fn write_byte(&mut self, offset: u16, data: u8) {
        self.bytes[offset as usize] = data;
    }
}

struct Mapping {
    base: u16,
    device: Box<dyn Device>,
}

impl Mapping {
    /// one past the last address, widened so 0xffff-ending devices fit
    fn end(&self) -> u32 {
        self.base as u32 + self.device.size() as u32
    }

    fn contains(&self, addr: u16) -> bool {
        addr >= self.base && (addr as u32) < self.end()
    }
}

/// Routes 16-bit addresses to the device mapped over them. Unmapped
/// addresses behave as an open bus: reads give 0, writes vanish.
#[derive(Default)]
pub struct AddressBus {
    // kept sorted by base so the first hit is always the lowest base
    mappings: Vec<Mapping>,
}

impl AddressBus {
    pub fn new() -> Self {
        AddressBus {
            mappings: Vec::new(),
        }
    }

    /// map `device` at `base`; the whole range must be free and inside
    /// the 64K address space
    pub fn attach(&mut self, device: Box<dyn Device>, base: u16) -> Result<(), BusError> {
        let size = device.size();
        if size == 0 {
            return Err(BusError::ZeroSize { base });
        }
        let end = base as u32 + size as u32;
        if end > 0x1_0000 {
            return Err(BusError::OutOfRange { base, size });
        }
        if let Some(existing) = self
            .mappings
            .iter()
            .find(|m| (base as u32) < m.end() && end > m.base as u32)
        {
            return Err(BusError::Overlap {
                base,
                size,
                existing: existing.base,
            });
        }
        let idx = self.mappings.partition_point(|m| m.base < base);
        self.mappings.insert(idx, Mapping { base, device });
        Ok(())
    }

    /// how many devices are attached
    pub fn device_count(&self) -> usize {
        self.mappings.len()
    }

    /// is `addr` backed by a device at all
    pub fn is_mapped(&self, addr: u16) -> bool {
        self.mappings.iter().any(|m| m.contains(addr))
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        match self.mappings.iter_mut().find(|m| m.contains(addr)) {
            Some(m) => m.device.read_byte(addr - m.base),
            None => {
                trace!("open bus read at {:#06x}", addr);
                0
            }
        }
    }

    pub fn write_byte(&mut self, addr: u16, data: u8) {
        match self.mappings.iter_mut().find(|m| m.contains(addr)) {
            Some(m) => m.device.write_byte(addr - m.base, data),
            None => trace!("open bus write of {:#04x} at {:#06x}", data, addr),
        }
    }

    /// get a two-byte little-endian word (vectors, operands)
    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }
}
