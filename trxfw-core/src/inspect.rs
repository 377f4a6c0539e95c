use crate::error::{IoContext, Result};
use crate::format::{FirmwareHeader, ImageFormat};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

pub struct Inspection {
    pub path: PathBuf,
    pub header: Box<dyn FirmwareHeader>,
}

impl Inspection {
    pub fn magic_ok(&self) -> bool {
        self.header.magic_ok()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path.display().to_string(),
            "format": self.header.format(),
            "magic_ok": self.magic_ok(),
            "header": self.header.to_json(),
        })
    }
}

impl fmt::Debug for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspection")
            .field("path", &self.path)
            .field("format", &self.header.format())
            .field("header", &self.header.to_json())
            .finish()
    }
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "======= {} =========", self.path.display())?;
        write!(f, "{}", self.header)?;
        writeln!(f, "====================")
    }
}

/// Decode the header at the start of `path` as `format`.
///
/// The magic is not checked; a mismatch is only logged. A file shorter than
/// the header is an I/O error.
pub fn inspect(path: &Path, format: ImageFormat) -> Result<Inspection> {
    let f = File::open(path).with_path("open", path)?;
    let header = format.read_header(f).with_path("read header", path)?;
    if !header.magic_ok() {
        log::warn!("{}: magic does not match {} format", path.display(), format);
    }
    Ok(Inspection { path: path.to_path_buf(), header })
}
