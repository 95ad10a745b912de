//! Memory image formats.
//!
//! * `.bin`  - raw image, exactly 65024 bytes, loaded at 0x0200
//! * `.sbin` - self-relocating: little-endian origin, then the bytes
//! * `.txt`  - hex dump, lines of `AAAA: XX XX XX ...`
//!
//! An image is parsed and checked in full before anything touches the bus,
//! so a bad image leaves memory exactly as it was.

use crate::error::LoadError;
use crate::memory::AddressBus;
use log::info;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::Path;

pub const RAW_IMAGE_SIZE: usize = 65024;
pub const RAW_IMAGE_ORIGIN: u16 = 0x0200;

/// a run of bytes destined for consecutive addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub origin: u16,
    pub bytes: Vec<u8>,
}

impl Segment {
    fn new(origin: u16, bytes: Vec<u8>) -> Result<Self, LoadError> {
        if origin as usize + bytes.len() > 0x1_0000 {
            return Err(LoadError::Overflow {
                origin,
                len: bytes.len(),
            });
        }
        Ok(Segment { origin, bytes })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    segments: Vec<Segment>,
}

impl MemoryImage {
    /// a raw image covering 0x0200-0xffff
    pub fn from_raw(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() != RAW_IMAGE_SIZE {
            return Err(LoadError::WrongSize {
                expected: RAW_IMAGE_SIZE,
                actual: data.len(),
            });
        }
        Ok(MemoryImage {
            segments: vec![Segment::new(RAW_IMAGE_ORIGIN, data.to_vec())?],
        })
    }

    /// two-byte little-endian origin followed by the bytes to put there
    pub fn from_relocating(data: &[u8]) -> Result<Self, LoadError> {
        match data {
            [lo, hi, body @ ..] => {
                let origin = u16::from_le_bytes([*lo, *hi]);
                Ok(MemoryImage {
                    segments: vec![Segment::new(origin, body.to_vec())?],
                })
            }
            _ => Err(LoadError::Truncated),
        }
    }

    /// one segment per non-blank `AAAA: XX XX ...` line
    pub fn from_hex_dump(text: &str) -> Result<Self, LoadError> {
        let mut segments = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if !line.is_empty() {
                segments.push(parse_hex_line(n + 1, line)?);
            }
        }
        Ok(MemoryImage { segments })
    }

    /// pick the format from the file extension
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "bin" => Self::from_raw(&fs::read(path)?),
            "sbin" => Self::from_relocating(&fs::read(path)?),
            "txt" => Self::from_hex_dump(&fs::read_to_string(path)?),
            _ => Err(LoadError::UnknownFormat(ext)),
        }
    }

    /// read a relocating image from any reader
    pub fn read_relocating(reader: &mut impl io::Read) -> Result<Self, LoadError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_relocating(&buf)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// total bytes carried
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.bytes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// zero memory, then lay the image down; nothing inside `protect`
    /// (the I/O page) is written
    pub fn write_to(&self, bus: &mut AddressBus, protect: &RangeInclusive<u16>) {
        for addr in 0..=u16::MAX {
            if !protect.contains(&addr) {
                bus.write_byte(addr, 0);
            }
        }
        for seg in &self.segments {
            for (addr, &b) in (seg.origin..=u16::MAX).zip(seg.bytes.iter()) {
                if !protect.contains(&addr) {
                    bus.write_byte(addr, b);
                }
            }
        }
        info!(
            "loaded {} bytes in {} segment(s)",
            self.len(),
            self.segments.len()
        );
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> LoadError {
    LoadError::MalformedLine {
        line,
        reason: reason.into(),
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hex_line(n: usize, line: &str) -> Result<Segment, LoadError> {
    let addr_str = line
        .get(..4)
        .filter(|a| is_hex(a))
        .ok_or_else(|| malformed(n, format!("bad address in {:?}", line)))?;
    let origin = u16::from_str_radix(addr_str, 16).map_err(|e| malformed(n, e.to_string()))?;
    // the address ends with one separator byte, usually `:`
    let data = match line.as_bytes().get(4) {
        None => "",
        Some(sep) if sep.is_ascii() && !sep.is_ascii_hexdigit() => &line[5..],
        Some(_) => {
            let reason = format!("no separator after address in {:?}", line);
            return Err(malformed(n, reason));
        }
    };
    let bytes = data
        .split_whitespace()
        .map(|tok| {
            if tok.len() != 2 || !is_hex(tok) {
                return Err(malformed(n, format!("bad data byte {:?}", tok)));
            }
            u8::from_str_radix(tok, 16).map_err(|e| malformed(n, e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Segment::new(origin, bytes).map_err(|_| malformed(n, "data runs past 0xffff"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Ram;
    use std::io::Write;

    fn flat_bus() -> AddressBus {
        let mut bus = AddressBus::new();
        bus.attach(Box::new(Ram::new(0x8000)), 0x0000).unwrap();
        bus.attach(Box::new(Ram::new(0x8000)), 0x8000).unwrap();
        bus
    }

    const NO_IO: RangeInclusive<u16> = 1..=0;

    #[test]
    fn test_raw_size_checked() {
        assert!(matches!(
            MemoryImage::from_raw(&[0; 100]),
            Err(LoadError::WrongSize {
                expected: RAW_IMAGE_SIZE,
                actual: 100
            })
        ));
        assert!(MemoryImage::from_raw(&[0; RAW_IMAGE_SIZE + 1]).is_err());
    }

    #[test]
    fn test_raw_lands_at_0200() -> Result<(), LoadError> {
        let mut data = vec![0u8; RAW_IMAGE_SIZE];
        data[0] = 0xa9;
        data[RAW_IMAGE_SIZE - 1] = 0x02;
        let img = MemoryImage::from_raw(&data)?;
        let mut bus = flat_bus();
        img.write_to(&mut bus, &NO_IO);
        assert_eq!(bus.read_byte(0x0200), 0xa9);
        assert_eq!(bus.read_byte(0xffff), 0x02);
        Ok(())
    }

    #[test]
    fn test_relocating_round_trip() -> Result<(), LoadError> {
        let body: Vec<u8> = (0..40).collect();
        let mut data = vec![0x00, 0x03];
        data.extend(&body);
        let img = MemoryImage::from_relocating(&data)?;
        let mut bus = flat_bus();
        img.write_to(&mut bus, &NO_IO);
        let read: Vec<u8> = (0x0300..0x0300 + body.len() as u16)
            .map(|a| bus.read_byte(a))
            .collect();
        assert_eq!(read, body);
        assert_eq!(bus.read_byte(0x02ff), 0);
        Ok(())
    }

    #[test]
    fn test_relocating_errors() {
        assert!(matches!(
            MemoryImage::from_relocating(&[0x00]),
            Err(LoadError::Truncated)
        ));
        assert!(matches!(
            MemoryImage::from_relocating(&[0xff, 0xff, 1, 2]),
            Err(LoadError::Overflow { origin: 0xffff, len: 2 })
        ));
    }

    #[test]
    fn test_read_relocating() -> Result<(), LoadError> {
        let mut src: &[u8] = &[0x10, 0x00, 0xea];
        let img = MemoryImage::read_relocating(&mut src)?;
        assert_eq!(
            img.segments(),
            &[Segment {
                origin: 0x0010,
                bytes: vec![0xea]
            }]
        );
        Ok(())
    }

    #[test]
    fn test_hex_dump() -> Result<(), LoadError> {
        let img = MemoryImage::from_hex_dump("0300: A9 41 8D\n\n  0400: 00 80\r\n0500:\n")?;
        assert_eq!(img.segments().len(), 3);
        assert_eq!(img.len(), 5);
        let mut bus = flat_bus();
        img.write_to(&mut bus, &NO_IO);
        assert_eq!(bus.read_byte(0x0300), 0xa9);
        assert_eq!(bus.read_byte(0x0302), 0x8d);
        assert_eq!(bus.read_byte(0x0401), 0x80);
        Ok(())
    }

    #[test]
    fn test_hex_dump_malformed() {
        for (text, bad_line) in [
            ("0300: A9\nzz00: 00", 2),
            ("0300: A9 4G", 1),
            ("03", 1),
            ("0300: 100", 1),
            ("\nFFFF: 01 02", 2),
            ("0300A9 41", 1),
            ("0300\u{e9}A9 41", 1),
            ("0300: A9 4", 1),
        ] {
            match MemoryImage::from_hex_dump(text) {
                Err(LoadError::MalformedLine { line, .. }) => {
                    assert_eq!(line, bad_line, "{:?}", text)
                }
                other => panic!("{:?} gave {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_bad_image_leaves_memory() {
        let mut bus = flat_bus();
        bus.write_byte(0x0300, 0x55);
        let result = MemoryImage::from_hex_dump("0300: 01\n0301: XX");
        assert!(result.is_err());
        assert_eq!(bus.read_byte(0x0300), 0x55);
    }

    #[test]
    fn test_io_window_untouched() -> Result<(), LoadError> {
        let mut bus = flat_bus();
        bus.write_byte(0x8001, 0x77);
        let img = MemoryImage::from_hex_dump("7FFF: 01 02 03")?;
        img.write_to(&mut bus, &(0x8000..=0x83ff));
        assert_eq!(bus.read_byte(0x7fff), 0x01);
        assert_eq!(bus.read_byte(0x8000), 0x00);
        assert_eq!(bus.read_byte(0x8001), 0x77);
        Ok(())
    }

    #[test]
    fn test_load_clears_old_memory() -> Result<(), LoadError> {
        let mut bus = flat_bus();
        bus.write_byte(0x1000, 0x99);
        MemoryImage::from_hex_dump("0300: 01")?.write_to(&mut bus, &NO_IO);
        assert_eq!(bus.read_byte(0x1000), 0);
        Ok(())
    }

    #[test]
    fn test_from_file_by_extension() -> Result<(), LoadError> {
        let dir = tempfile::tempdir()?;

        let txt = dir.path().join("prog.txt");
        fs::File::create(&txt)?.write_all(b"0300: EA EA\n")?;
        assert_eq!(MemoryImage::from_file(&txt)?.len(), 2);

        let sbin = dir.path().join("prog.SBIN");
        fs::write(&sbin, [0x00, 0x03, 0xea])?;
        assert_eq!(MemoryImage::from_file(&sbin)?.segments()[0].origin, 0x0300);

        let bin = dir.path().join("rom.bin");
        fs::write(&bin, [0u8; 16])?;
        assert!(matches!(
            MemoryImage::from_file(&bin),
            Err(LoadError::WrongSize { .. })
        ));

        let other = dir.path().join("rom.hex");
        fs::write(&other, b"")?;
        assert!(matches!(
            MemoryImage::from_file(&other),
            Err(LoadError::UnknownFormat(ext)) if ext == "hex"
        ));

        assert!(matches!(
            MemoryImage::from_file(&dir.path().join("missing.bin")),
            Err(LoadError::Io(_))
        ));
        Ok(())
    }
}
