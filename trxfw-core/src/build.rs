use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fileops;
use crate::format::{FirmwareHeader, HeaderConfig, ImageFormat, WriteMode};
use crate::inspect::{self, Inspection};
use crate::layout::{self, TRX_ALIGNMENT};
use crate::manifest::Manifest;

/// Appended to the output path to name the zero padding file.
pub const PADDING_SUFFIX: &str = ".zeros";

/// State of one assembly run.
pub struct BuildContext {
    pub manifest: Manifest,
    pub header: Box<dyn FirmwareHeader>,
    pub output: PathBuf,
}

impl BuildContext {
    pub fn new(
        inputs: &[PathBuf],
        output: &Path,
        format: ImageFormat,
        cfg: &HeaderConfig,
    ) -> Result<Self> {
        let manifest = Manifest::collect(inputs)?;
        Ok(Self {
            manifest,
            header: format.new_header(cfg),
            output: output.to_path_buf(),
        })
    }

    /// `<output>.zeros`, so builds into one directory never share it.
    pub fn padding_path(&self) -> PathBuf {
        let mut p = self.output.clone().into_os_string();
        p.push(PADDING_SUFFIX);
        PathBuf::from(p)
    }

    /// Splice alignment padding before the final slot when the format needs
    /// it, and write it out as zeros so it appends like any other entry.
    pub fn place(&mut self) -> Result<Option<u64>> {
        let format = self.header.format();
        self.manifest.expect_payloads(format.name(), format.required_payloads())?;
        if !format.aligns_final_slot() {
            return Ok(None);
        }
        let pad_path = self.padding_path();
        let pad = layout::align_final_slot(
            &mut self.manifest,
            self.header.header_size() as u64,
            TRX_ALIGNMENT,
            pad_path.clone(),
        );
        if let Some(n) = pad {
            fileops::pad_zero(&pad_path, n)?;
        }
        Ok(pad)
    }

    /// Header with zeroed checksums, checksum pass, header with checksums.
    pub fn write_header(&mut self) -> Result<()> {
        self.header.init(&self.manifest)?;
        fileops::write_header(&self.output, &self.header.encode(WriteMode::NoChecksum))?;
        self.header.compute_checksum(&self.manifest, &self.output)?;
        fileops::write_header(&self.output, &self.header.encode(WriteMode::WithChecksum))
    }

    pub fn append_payloads(&self) -> Result<u64> {
        let mut total = 0u64;
        for f in &self.manifest.files {
            total += fileops::append(&f.path, &self.output)?;
        }
        Ok(total)
    }

    fn remove_padding(&self) {
        if let Some(p) = self.manifest.padding() {
            if let Err(e) = std::fs::remove_file(&p.path) {
                log::warn!("could not remove padding file {}: {e}", p.path.display());
            }
        }
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub manifest: Manifest,
    pub padding: Option<u64>,
    pub payload_bytes: u64,
    /// Header read back from the finished image.
    pub verify: Inspection,
}

impl BuildReport {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "files": self.manifest.files,
            "padding": self.padding,
            "payload_bytes": self.payload_bytes,
            "image": self.verify.to_json(),
        })
    }
}

/// Assemble `inputs` into `output` with a `format` header.
///
/// On error the output may be left half written; it must not be flashed.
pub fn build_image(
    inputs: &[PathBuf],
    output: &Path,
    format: ImageFormat,
    cfg: &HeaderConfig,
) -> Result<BuildReport> {
    let mut ctx = BuildContext::new(inputs, output, format, cfg)?;
    let padding = ctx.place()?;
    ctx.write_header()?;
    let payload_bytes = ctx.append_payloads()?;
    let verify = inspect::inspect(&ctx.output, format)?;
    ctx.remove_padding();
    log::info!(
        "wrote {} ({} header + {} payload bytes)",
        output.display(),
        format.header_size(),
        payload_bytes
    );
    Ok(BuildReport {
        manifest: ctx.manifest,
        padding,
        payload_bytes,
        verify,
    })
}
