use crate::error::{IoContext, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

const IMAGE_MODE: u32 = 0o644;

/// Create or truncate `path`, set mode 0644 and open it for writing.
fn create_0644(path: &Path) -> Result<File> {
    let f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_path("create", path)?;
    set_mode(path)?;
    Ok(f)
}

#[cfg(unix)]
fn set_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(IMAGE_MODE))
        .with_path("chmod 0644", path)
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> Result<()> {
    let _ = IMAGE_MODE;
    Ok(())
}

/// Replace the contents of `path` with a freshly encoded header.
pub fn write_header(path: &Path, header: &[u8]) -> Result<()> {
    let mut f = create_0644(path)?;
    f.write_all(header).with_path("write header", path)?;
    f.flush().with_path("write header", path)
}

/// Append all of `src` to the end of `dst`.
pub fn append(src: &Path, dst: &Path) -> Result<u64> {
    let mut from = File::open(src).with_path("open", src)?;
    let mut to = OpenOptions::new()
        .append(true)
        .open(dst)
        .with_path("open for append", dst)?;
    io::copy(&mut from, &mut to).with_path("append to", dst)
}

/// Materialize `n` zero bytes as a file so padding appends like any payload.
pub fn pad_zero(path: &Path, n: u64) -> Result<()> {
    let mut f = create_0644(path)?;
    io::copy(&mut io::repeat(0).take(n), &mut f)
        .with_path("write padding", path)?;
    Ok(())
}
