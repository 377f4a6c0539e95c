//! Whole-file digests with a running accumulator, so a header followed by
//! several payload files can be digested as one logical byte stream.

use crate::error::{IoContext, Result};
use crc::{Crc, CRC_16_IBM_3740};
use crc32fast::Hasher as Crc32Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUFSIZE: usize = 8192;

/// CRC-16/CCITT with initial value 0xFFFF, as used by the BCM header.
const CRC16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

pub trait Digest {
    /// Digest `src` to EOF starting from `acc`; returns the new accumulator
    /// and the number of bytes consumed.
    fn update<R: Read>(&self, acc: u32, src: R) -> io::Result<(u32, u64)>;

    fn update_path(&self, acc: u32, path: &Path) -> Result<(u32, u64)> {
        let f = File::open(path).with_path("open for checksum", path)?;
        log::info!(" * {}", path.display());
        self.update(acc, f).with_path("read for checksum", path)
    }
}

/// Standard reflected CRC-32. The accumulator is the finalized CRC of all
/// bytes seen so far; 0 starts a fresh run. Header fields store `!crc`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32;

impl Digest for Crc32 {
    fn update<R: Read>(&self, acc: u32, mut src: R) -> io::Result<(u32, u64)> {
        let mut h = Crc32Hasher::new_with_initial(acc);
        let mut buf = [0u8; BUFSIZE];
        let mut total = 0u64;
        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            h.update(&buf[..n]);
            total += n as u64;
        }
        Ok((h.finalize(), total))
    }
}

/// Raw 32-bit byte sum, wrapping, with no folding. Lets one read of a file
/// feed both its own System V sum and a running one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ByteSum;

impl Digest for ByteSum {
    fn update<R: Read>(&self, acc: u32, mut src: R) -> io::Result<(u32, u64)> {
        let mut s = acc;
        let mut buf = [0u8; BUFSIZE];
        let mut total = 0u64;
        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            s = buf[..n].iter().fold(s, |s, &b| s.wrapping_add(b as u32));
            total += n as u64;
        }
        Ok((s, total))
    }
}

/// System V `sum` (`cksum -o 2`): byte sum folded to 16 bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysvSum;

impl SysvSum {
    /// Continue a sum from `acc` with the [`ByteSum`] of further bytes.
    pub fn resume(acc: u32, raw: u32) -> u32 {
        let s = acc.wrapping_add(raw);
        let r = (s & 0xffff) + (s >> 16);
        (r & 0xffff) + (r >> 16)
    }
}

impl Digest for SysvSum {
    fn update<R: Read>(&self, acc: u32, src: R) -> io::Result<(u32, u64)> {
        let (raw, total) = ByteSum.update(0, src)?;
        Ok((Self::resume(acc, raw), total))
    }
}

pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    CRC16_CCITT.checksum(bytes)
}
