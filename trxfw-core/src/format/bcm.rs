//! Broadcom BCM firmware header (92 bytes, native byte order).
//!
//! ```text
//! 0x00 magic        0xa81c0005
//! 0x04 version      0x010001ff
//! 0x08 timestamp    unix seconds
//! 0x0c file_length  payload size, header excluded
//! 0x10 loadaddress
//! 0x14 name         char[64]
//! 0x54 crc16        CRC16-CCITT (init 0xffff) over 0x00..0x54
//! 0x56 pad
//! 0x58 crc32        inverted
//! ```

use super::{
    crc32_image, put_str, str_at, Endian, FirmwareHeader, HeaderConfig, ImageFormat, WriteMode,
};
use crate::checksum::crc16_ccitt;
use crate::error::{to_u32, Result};
use crate::manifest::Manifest;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const BCM_MAGIC: u32 = 0xA81C_0005;
pub const BCM_VERSION: u32 = 0x0100_01FF;
pub const LOAD_ADDRESS: u32 = 0x8000_1100;
pub const NAME_LEN: usize = 64;
pub const DEFAULT_NAME: &str = "FreeBSD for BCM";

const ORDER: Endian = Endian::Native;
const CRC16_SPAN: usize = 0x54;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BcmHeader {
    pub magic: u32,
    pub version: u32,
    pub timestamp: u32,
    pub file_length: u32,
    pub loadaddress: u32,
    pub name: String,
    pub crc16_header: u16,
    pub pad: u16,
    pub crc32: u32,
    #[serde(skip)]
    fixed_timestamp: Option<u32>,
}

impl BcmHeader {
    pub const SIZE: usize = 0x5c;

    pub fn new(cfg: &HeaderConfig) -> Self {
        Self {
            magic: BCM_MAGIC,
            version: BCM_VERSION,
            loadaddress: cfg.load_address,
            name: cfg.firmware_name.clone(),
            fixed_timestamp: cfg.timestamp,
            ..Default::default()
        }
    }

    pub fn decode(b: &[u8; BcmHeader::SIZE]) -> Self {
        Self {
            magic: ORDER.u32_at(b, 0x00),
            version: ORDER.u32_at(b, 0x04),
            timestamp: ORDER.u32_at(b, 0x08),
            file_length: ORDER.u32_at(b, 0x0c),
            loadaddress: ORDER.u32_at(b, 0x10),
            name: str_at(b, 0x14, NAME_LEN),
            crc16_header: ORDER.u16_at(b, 0x54),
            pad: ORDER.u16_at(b, 0x56),
            crc32: ORDER.u32_at(b, 0x58),
            fixed_timestamp: None,
        }
    }

    /// Seconds since the epoch, wrapped to 32 bits.
    fn now() -> u32 {
        (chrono::Utc::now().timestamp() as u64 & 0xFFFF_FFFF) as u32
    }
}

impl FirmwareHeader for BcmHeader {
    fn format(&self) -> ImageFormat {
        ImageFormat::Bcm
    }

    fn init(&mut self, manifest: &Manifest) -> Result<()> {
        manifest.expect_payloads(self.format().name(), self.required_payloads())?;
        self.magic = BCM_MAGIC;
        self.version = BCM_VERSION;
        self.timestamp = self.fixed_timestamp.unwrap_or_else(Self::now);
        self.file_length = to_u32("file_length", manifest.total_bytes())?;
        self.pad = 0;
        self.crc16_header = 0;
        self.crc32 = 0;
        Ok(())
    }

    fn compute_checksum(&mut self, manifest: &Manifest, output: &Path) -> Result<()> {
        let fixed = self.encode(WriteMode::NoChecksum);
        self.crc16_header = crc16_ccitt(&fixed[..CRC16_SPAN]);
        self.crc32 = !crc32_image(manifest, output)?;
        Ok(())
    }

    fn encode(&self, mode: WriteMode) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        ORDER.put_u32(&mut out, self.magic);
        ORDER.put_u32(&mut out, self.version);
        ORDER.put_u32(&mut out, self.timestamp);
        ORDER.put_u32(&mut out, self.file_length);
        ORDER.put_u32(&mut out, self.loadaddress);
        put_str(&mut out, &self.name, NAME_LEN);
        match mode {
            WriteMode::WithChecksum => {
                ORDER.put_u16(&mut out, self.crc16_header);
                ORDER.put_u16(&mut out, self.pad);
                ORDER.put_u32(&mut out, self.crc32);
            }
            WriteMode::NoChecksum => {
                ORDER.put_u16(&mut out, 0);
                ORDER.put_u16(&mut out, self.pad);
                ORDER.put_u32(&mut out, 0);
            }
        }
        out
    }

    fn magic_ok(&self) -> bool {
        self.magic == BCM_MAGIC
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for BcmHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic\t\t= {:#010x}", self.magic)?;
        writeln!(f, "version\t\t= {:#010x}", self.version)?;
        writeln!(f, "timestamp\t= {}", self.timestamp)?;
        writeln!(f, "length\t\t= {}", self.file_length)?;
        writeln!(f, "loadaddr\t= {:#010x}", self.loadaddress)?;
        writeln!(f, "name\t\t= {}", self.name)?;
        writeln!(f, "crc16\t\t= {:#06x}", self.crc16_header)?;
        writeln!(f, "padding\t\t= {:#06x}", self.pad)?;
        writeln!(f, "crc32\t\t= {:#010x}", self.crc32)?;
        writeln!(f, "~crc32\t\t= {:#010x}", !self.crc32)
    }
}
