use crate::manifest::{FileEntry, Manifest, Slot};
use std::path::PathBuf;

/// The final TRX partition starts on an 8 KiB (16 sector) boundary.
pub const TRX_ALIGNMENT: u64 = 0x2000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// `(slot index, absolute offset)` for every payload, in manifest order.
    pub offsets: Vec<(usize, u64)>,
    /// Offset one past the last entry, i.e. the full image length.
    pub file_length: u64,
}

/// If the last entry would not start on an `alignment` boundary, insert a
/// padding entry right before it. Returns the padding size when one was added.
pub fn align_final_slot(
    manifest: &mut Manifest,
    header_size: u64,
    alignment: u64,
    pad_path: PathBuf,
) -> Option<u64> {
    let last = manifest.files.len().checked_sub(1)?;
    let offset = header_size + manifest.files[..last].iter().map(|f| f.size).sum::<u64>();
    let rem = offset % alignment;
    if rem == 0 {
        log::debug!("final slot already aligned at {offset:#x}");
        return None;
    }
    let size = alignment - rem;
    log::debug!("padding {size} bytes before final slot (offset {offset:#x})");
    let pad = FileEntry {
        path: pad_path,
        size,
        slot: Slot::Padding,
    };
    manifest.files.insert(last, pad);
    Some(size)
}

/// Walk the manifest from the end of the header and record where each payload
/// starts. Padding advances the offset but has no slot.
pub fn place(manifest: &Manifest, header_size: u64) -> Placement {
    let mut offset = header_size;
    let mut offsets = Vec::with_capacity(manifest.files.len());
    for f in &manifest.files {
        if let Slot::Payload(i) = f.slot {
            offsets.push((i, offset));
        }
        offset += f.size;
    }
    Placement { offsets, file_length: offset }
}
