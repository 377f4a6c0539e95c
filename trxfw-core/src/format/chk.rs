//! NETGEAR CHK header wrapped around a TRX image. Big-endian integers.
//!
//! Checksums are System V sums (`cksum -o 2`). The payload is split into at
//! most two partitions with their own sum and size; `cksum_total` runs over
//! every payload and `cksum_header` covers the header as first written.

use super::{put_str, str_at, Endian, FirmwareHeader, HeaderConfig, ImageFormat, WriteMode};
use crate::checksum::{ByteSum, Digest, SysvSum};
use crate::error::{to_u32, Result};
use crate::manifest::Manifest;
use serde::Serialize;
use std::fmt;
use std::path::Path;

pub const CHK_MAGIC: u32 = 0x2a23_245e;
pub const CHK_HEADER_SIZE: u32 = 0x3a;
pub const CHK_VERSION: u32 = 0x0101_0202;
pub const MODEL_NAME_LEN: usize = 18;
pub const DEFAULT_MODEL: &str = "U12H136T99_NETGEAR";

const ORDER: Endian = Endian::Big;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChkHeader {
    pub magic: u32,
    pub headersize: u32,
    pub version: u32,
    pub pad: u32,
    pub cksum_part1: u32,
    pub cksum_part2: u32,
    pub size_part1: u32,
    pub size_part2: u32,
    pub cksum_total: u32,
    pub cksum_header: u32,
    pub model_name: String,
}

impl ChkHeader {
    pub const SIZE: usize = CHK_HEADER_SIZE as usize;

    pub fn new(cfg: &HeaderConfig) -> Self {
        Self {
            magic: CHK_MAGIC,
            headersize: CHK_HEADER_SIZE,
            version: CHK_VERSION,
            model_name: cfg.model_name.clone(),
            ..Default::default()
        }
    }

    pub fn decode(b: &[u8; ChkHeader::SIZE]) -> Self {
        Self {
            magic: ORDER.u32_at(b, 0),
            headersize: ORDER.u32_at(b, 4),
            version: ORDER.u32_at(b, 8),
            pad: ORDER.u32_at(b, 12),
            cksum_part1: ORDER.u32_at(b, 16),
            cksum_part2: ORDER.u32_at(b, 20),
            size_part1: ORDER.u32_at(b, 24),
            size_part2: ORDER.u32_at(b, 28),
            cksum_total: ORDER.u32_at(b, 32),
            cksum_header: ORDER.u32_at(b, 36),
            model_name: str_at(b, 40, MODEL_NAME_LEN),
        }
    }

    /// Per-partition sums and sizes for the first two payloads, and the
    /// running sum over all of them.
    fn digest_partitions(&mut self, manifest: &Manifest) -> Result<()> {
        let mut total = 0u32;
        for (n, f) in manifest.payloads().enumerate() {
            let (raw, size) = ByteSum.update_path(0, &f.path)?;
            let sum = SysvSum::resume(0, raw);
            match n {
                0 => {
                    self.cksum_part1 = sum;
                    self.size_part1 = to_u32("size_part1", size)?;
                }
                1 => {
                    self.cksum_part2 = sum;
                    self.size_part2 = to_u32("size_part2", size)?;
                }
                _ => {}
            }
            total = SysvSum::resume(total, raw);
        }
        self.cksum_total = total;
        Ok(())
    }
}

impl FirmwareHeader for ChkHeader {
    fn format(&self) -> ImageFormat {
        ImageFormat::Chk
    }

    fn init(&mut self, manifest: &Manifest) -> Result<()> {
        manifest.expect_payloads(self.format().name(), self.required_payloads())?;
        self.magic = CHK_MAGIC;
        self.headersize = CHK_HEADER_SIZE;
        self.version = CHK_VERSION;
        self.pad = 0;
        self.cksum_part1 = 0;
        self.cksum_part2 = 0;
        self.size_part1 = 0;
        self.size_part2 = 0;
        self.cksum_total = 0;
        self.cksum_header = 0;
        self.digest_partitions(manifest)
    }

    fn compute_checksum(&mut self, manifest: &Manifest, output: &Path) -> Result<()> {
        self.cksum_header = SysvSum.update_path(0, output)?.0;
        // Same inputs as the pass in init, so the partition fields come out unchanged.
        self.digest_partitions(manifest)
    }

    fn encode(&self, mode: WriteMode) -> Vec<u8> {
        let ck = |v: u32| if mode == WriteMode::WithChecksum { v } else { 0 };
        let mut out = Vec::with_capacity(Self::SIZE);
        ORDER.put_u32(&mut out, self.magic);
        ORDER.put_u32(&mut out, self.headersize);
        ORDER.put_u32(&mut out, self.version);
        ORDER.put_u32(&mut out, self.pad);
        ORDER.put_u32(&mut out, ck(self.cksum_part1));
        ORDER.put_u32(&mut out, ck(self.cksum_part2));
        ORDER.put_u32(&mut out, self.size_part1);
        ORDER.put_u32(&mut out, self.size_part2);
        ORDER.put_u32(&mut out, ck(self.cksum_total));
        ORDER.put_u32(&mut out, ck(self.cksum_header));
        put_str(&mut out, &self.model_name, MODEL_NAME_LEN);
        out
    }

    fn magic_ok(&self) -> bool {
        self.magic == CHK_MAGIC
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for ChkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic\t\t= {:#010x}", self.magic)?;
        writeln!(f, "headersize\t= {:#010x}", self.headersize)?;
        writeln!(f, "version\t\t= {:#010x}", self.version)?;
        writeln!(f, "unknown\t\t= {:#010x}", self.pad)?;
        writeln!(f, "cksum_part1\t= {:#010x}", self.cksum_part1)?;
        writeln!(f, "cksum_part2\t= {:#010x}", self.cksum_part2)?;
        writeln!(f, "size_part1\t= {:#010x}", self.size_part1)?;
        writeln!(f, "size_part2\t= {:#010x}", self.size_part2)?;
        writeln!(f, "cksum_total\t= {:#010x}", self.cksum_total)?;
        writeln!(f, "cksum_header\t= {:#010x}", self.cksum_header)?;
        writeln!(f, "model_name\t= {}", self.model_name)
    }
}
