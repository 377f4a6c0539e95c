//! TRX container: the generic bootloader-chain image with a three-entry
//! offset table (loader, kernel, filesystem). Native byte order.
//!
//! The CRC32 field covers everything from `flags` to the end of the image,
//! which is exactly what the first (checksum-less) write leaves in the file.

use super::{crc32_image, Endian, FirmwareHeader, ImageFormat, WriteMode};
use crate::error::{to_u32, Result};
use crate::layout;
use crate::manifest::Manifest;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const TRX_MAGIC: u32 = 0x3052_4448; // "HDR0"
pub const TRX_VERSION: u16 = 1;
pub const NUM_OFFSETS: usize = 3;

const ORDER: Endian = Endian::Native;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrxHeader {
    pub magic: u32,
    pub file_length: u32,
    pub crc32: u32,
    pub flags: u16,
    pub version: u16,
    pub offsets: [u32; NUM_OFFSETS],
}

impl TrxHeader {
    pub const SIZE: usize = 28;
    /// Start of the CRC-covered region; magic, length and crc precede it.
    pub const CRC_START: usize = 12;

    pub fn new() -> Self {
        Self {
            magic: TRX_MAGIC,
            version: TRX_VERSION,
            ..Default::default()
        }
    }

    pub fn decode(b: &[u8; TrxHeader::SIZE]) -> Self {
        let mut offsets = [0u32; NUM_OFFSETS];
        for (i, o) in offsets.iter_mut().enumerate() {
            *o = ORDER.u32_at(b, 16 + 4 * i);
        }
        Self {
            magic: ORDER.u32_at(b, 0),
            file_length: ORDER.u32_at(b, 4),
            crc32: ORDER.u32_at(b, 8),
            flags: ORDER.u16_at(b, 12),
            version: ORDER.u16_at(b, 14),
            offsets,
        }
    }
}

impl FirmwareHeader for TrxHeader {
    fn format(&self) -> ImageFormat {
        ImageFormat::Trx
    }

    fn init(&mut self, manifest: &Manifest) -> Result<()> {
        manifest.expect_payloads(self.format().name(), self.required_payloads())?;
        self.magic = TRX_MAGIC;
        self.flags = 0;
        self.version = TRX_VERSION;

        let placement = layout::place(manifest, Self::SIZE as u64);
        for (slot, off) in placement.offsets {
            if let Some(o) = self.offsets.get_mut(slot) {
                *o = to_u32("offset", off)?;
            }
        }
        self.file_length = to_u32("file_length", placement.file_length)?;
        Ok(())
    }

    fn compute_checksum(&mut self, manifest: &Manifest, output: &Path) -> Result<()> {
        self.crc32 = !crc32_image(manifest, output)?;
        Ok(())
    }

    fn encode(&self, mode: WriteMode) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        if mode == WriteMode::WithChecksum {
            ORDER.put_u32(&mut out, self.magic);
            ORDER.put_u32(&mut out, self.file_length);
            ORDER.put_u32(&mut out, self.crc32);
        }
        ORDER.put_u16(&mut out, self.flags);
        ORDER.put_u16(&mut out, self.version);
        for &o in &self.offsets {
            ORDER.put_u32(&mut out, o);
        }
        out
    }

    fn magic_ok(&self) -> bool {
        self.magic == TRX_MAGIC
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for TrxHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic\t= {:#010x}", self.magic)?;
        writeln!(f, "length\t= {}", self.file_length)?;
        writeln!(
            f,
            "crc32\t= {:#010x}\t~crc32\t= {:#010x}",
            self.crc32, !self.crc32
        )?;
        writeln!(f, "flags\t= {:#06x}", self.flags)?;
        writeln!(f, "version\t= {}", self.version)?;
        for (i, o) in self.offsets.iter().enumerate() {
            writeln!(f, "offset[{i}] = {o}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_modes() {
        let h = TrxHeader {
            file_length: 15992,
            crc32: 0xdead_beef,
            offsets: [28, 128, 8192],
            ..TrxHeader::new()
        };
        let full = h.encode(WriteMode::WithChecksum);
        assert_eq!(full.len(), TrxHeader::SIZE);
        let short = h.encode(WriteMode::NoChecksum);
        assert_eq!(short.len(), TrxHeader::SIZE - TrxHeader::CRC_START);
        assert_eq!(&full[TrxHeader::CRC_START..], &short[..]);
        assert_eq!(&full[..4], &TRX_MAGIC.to_ne_bytes());
    }

    #[test]
    fn decode_full_header() {
        let h = TrxHeader {
            file_length: 100,
            crc32: 0x1234_5678,
            flags: 2,
            offsets: [28, 40, 60],
            ..TrxHeader::new()
        };
        let mut b = [0u8; TrxHeader::SIZE];
        b.copy_from_slice(&h.encode(WriteMode::WithChecksum));
        assert_eq!(TrxHeader::decode(&b), h);
    }

    #[test]
    fn report_has_inverse_crc() {
        let h = TrxHeader {
            crc32: 0xffff_0000,
            ..TrxHeader::new()
        };
        let s = h.to_string();
        assert!(s.contains("~crc32\t= 0x0000ffff"));
        assert!(s.contains("offset[2] = 0"));
    }
}
