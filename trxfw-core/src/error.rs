use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FwError {
    #[error("{format} image needs {expected} payload file(s), got {got}")]
    Manifest {
        format: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{op} {path:?}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),
    #[error("{field} does not fit in 32 bits: {value}")]
    FieldOverflow { field: &'static str, value: u64 },
}

pub type Result<T> = std::result::Result<T, FwError>;

impl FwError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        FwError::Io { op, path: path.to_path_buf(), source }
    }
}

/// Attach an operation label and path to an `io::Result`.
pub(crate) trait IoContext<T> {
    fn with_path(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| FwError::io(op, path, e))
    }
}

pub(crate) fn to_u32(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| FwError::FieldOverflow { field, value })
}
