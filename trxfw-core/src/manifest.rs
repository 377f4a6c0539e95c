use crate::error::{FwError, IoContext, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where an entry lands in the header: a required payload position, or
/// synthetic zero padding that has no header slot.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Payload(usize),
    Padding,
}

#[derive(Serialize, Clone, Debug)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub slot: Slot,
}

impl FileEntry {
    pub fn is_padding(&self) -> bool {
        self.slot == Slot::Padding
    }
}

/// Ordered input files. Order decides offsets, slots and checksums.
#[derive(Serialize, Clone, Debug, Default)]
pub struct Manifest {
    pub files: Vec<FileEntry>,
}

impl Manifest {
    /// Stat every input and assign slots in argument order.
    pub fn collect<P: AsRef<Path>>(inputs: &[P]) -> Result<Self> {
        let mut files = Vec::new();
        files
            .try_reserve_exact(inputs.len())
            .map_err(|_| FwError::OutOfMemory("manifest"))?;
        for (i, p) in inputs.iter().enumerate() {
            let path = p.as_ref();
            let md = std::fs::metadata(path).with_path("stat", path)?;
            files.push(FileEntry {
                path: path.to_path_buf(),
                size: md.len(),
                slot: Slot::Payload(i),
            });
        }
        Ok(Self { files })
    }

    pub fn payloads(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|f| !f.is_padding())
    }

    pub fn payload_count(&self) -> usize {
        self.payloads().count()
    }

    /// Fail unless exactly `expected` payloads are present.
    pub fn expect_payloads(&self, format: &'static str, expected: usize) -> Result<()> {
        let got = self.payload_count();
        if got != expected {
            return Err(FwError::Manifest { format, expected, got });
        }
        Ok(())
    }

    /// Sum of all entry sizes, padding included.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn padding(&self) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.is_padding())
    }
}
