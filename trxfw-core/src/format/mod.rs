//! Firmware header layouts. Each format knows its fixed size, how to fill
//! itself from a manifest, how to compute its checksum fields and how to
//! serialize in its own byte order.

pub mod bcm;
pub mod chk;
pub mod trx;

use crate::checksum::{Crc32, Digest};
use crate::error::Result;
use crate::manifest::Manifest;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;

pub use bcm::BcmHeader;
pub use chk::ChkHeader;
pub use trx::TrxHeader;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// First pass: checksum fields left out (TRX) or zeroed (CHK, BCM).
    NoChecksum,
    WithChecksum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Trx,
    Chk,
    Bcm,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Trx, ImageFormat::Chk, ImageFormat::Bcm];

    pub const fn name(self) -> &'static str {
        match self {
            ImageFormat::Trx => "TRX",
            ImageFormat::Chk => "CHK",
            ImageFormat::Bcm => "BCM",
        }
    }

    pub const fn header_size(self) -> usize {
        match self {
            ImageFormat::Trx => TrxHeader::SIZE,
            ImageFormat::Chk => ChkHeader::SIZE,
            ImageFormat::Bcm => BcmHeader::SIZE,
        }
    }

    pub const fn required_payloads(self) -> usize {
        match self {
            ImageFormat::Trx => trx::NUM_OFFSETS,
            ImageFormat::Chk | ImageFormat::Bcm => 1,
        }
    }

    /// Only TRX has an offset table that needs the final slot aligned.
    pub const fn aligns_final_slot(self) -> bool {
        matches!(self, ImageFormat::Trx)
    }

    /// Payload names for usage text.
    pub const fn create_args(self) -> &'static str {
        match self {
            ImageFormat::Trx => "lzmaloader lzmakernel fsimage",
            ImageFormat::Chk => "trxfile",
            ImageFormat::Bcm => "kernel",
        }
    }

    pub fn new_header(self, cfg: &HeaderConfig) -> Box<dyn FirmwareHeader> {
        match self {
            ImageFormat::Trx => Box::new(TrxHeader::new()),
            ImageFormat::Chk => Box::new(ChkHeader::new(cfg)),
            ImageFormat::Bcm => Box::new(BcmHeader::new(cfg)),
        }
    }

    /// Read exactly one header of this format from `r`. No magic check.
    pub fn read_header<R: Read>(self, mut r: R) -> io::Result<Box<dyn FirmwareHeader>> {
        Ok(match self {
            ImageFormat::Trx => {
                let mut b = [0u8; TrxHeader::SIZE];
                r.read_exact(&mut b)?;
                Box::new(TrxHeader::decode(&b))
            }
            ImageFormat::Chk => {
                let mut b = [0u8; ChkHeader::SIZE];
                r.read_exact(&mut b)?;
                Box::new(ChkHeader::decode(&b))
            }
            ImageFormat::Bcm => {
                let mut b = [0u8; BcmHeader::SIZE];
                r.read_exact(&mut b)?;
                Box::new(BcmHeader::decode(&b))
            }
        })
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values a header takes from the caller rather than from the manifest.
#[derive(Clone, Debug)]
pub struct HeaderConfig {
    pub model_name: String,
    pub firmware_name: String,
    pub load_address: u32,
    /// Fixed BCM timestamp; `None` uses the current time.
    pub timestamp: Option<u32>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            model_name: chk::DEFAULT_MODEL.to_string(),
            firmware_name: bcm::DEFAULT_NAME.to_string(),
            load_address: bcm::LOAD_ADDRESS,
            timestamp: None,
        }
    }
}

pub trait FirmwareHeader: fmt::Display {
    fn format(&self) -> ImageFormat;

    fn header_size(&self) -> usize {
        self.format().header_size()
    }

    fn required_payloads(&self) -> usize {
        self.format().required_payloads()
    }

    /// Fill every non-checksum field from the manifest.
    fn init(&mut self, manifest: &Manifest) -> Result<()>;

    /// Digest the first-pass `output` and the payloads into the checksum fields.
    fn compute_checksum(&mut self, manifest: &Manifest, output: &Path) -> Result<()>;

    fn encode(&self, mode: WriteMode) -> Vec<u8>;

    fn magic_ok(&self) -> bool;

    fn to_json(&self) -> serde_json::Value;
}

/// CRC32 over the written header followed by every manifest entry in order.
pub(crate) fn crc32_image(manifest: &Manifest, output: &Path) -> Result<u32> {
    let (mut crc, _) = Crc32.update_path(0, output)?;
    for f in &manifest.files {
        crc = Crc32.update_path(crc, &f.path)?.0;
    }
    Ok(crc)
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Endian {
    Native,
    Big,
}

impl Endian {
    pub(crate) fn u32_at(self, b: &[u8], off: usize) -> u32 {
        let mut w = [0u8; 4];
        w.copy_from_slice(&b[off..off + 4]);
        match self {
            Endian::Native => u32::from_ne_bytes(w),
            Endian::Big => u32::from_be_bytes(w),
        }
    }

    pub(crate) fn u16_at(self, b: &[u8], off: usize) -> u16 {
        let mut w = [0u8; 2];
        w.copy_from_slice(&b[off..off + 2]);
        match self {
            Endian::Native => u16::from_ne_bytes(w),
            Endian::Big => u16::from_be_bytes(w),
        }
    }

    pub(crate) fn put_u32(self, out: &mut Vec<u8>, v: u32) {
        match self {
            Endian::Native => out.extend_from_slice(&v.to_ne_bytes()),
            Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
        }
    }

    pub(crate) fn put_u16(self, out: &mut Vec<u8>, v: u16) {
        match self {
            Endian::Native => out.extend_from_slice(&v.to_ne_bytes()),
            Endian::Big => out.extend_from_slice(&v.to_be_bytes()),
        }
    }
}

/// Write `s` into a fixed `len`-byte field, truncated or NUL padded.
pub(crate) fn put_str(out: &mut Vec<u8>, s: &str, len: usize) {
    let b = s.as_bytes();
    let n = b.len().min(len);
    out.extend_from_slice(&b[..n]);
    out.resize(out.len() + (len - n), 0);
}

/// Read a fixed-width text field up to the first NUL.
pub(crate) fn str_at(b: &[u8], off: usize, len: usize) -> String {
    let field = &b[off..off + len];
    let end = field.iter().position(|&c| c == 0).unwrap_or(len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
