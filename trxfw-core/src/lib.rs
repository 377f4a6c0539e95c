pub mod build;
pub mod checksum;
pub mod error;
pub mod fileops;
pub mod format;
pub mod inspect;
pub mod layout;
pub mod manifest;

pub use build::{build_image, BuildReport};
pub use error::{FwError, Result};
pub use format::{FirmwareHeader, HeaderConfig, ImageFormat, WriteMode};
pub use inspect::{inspect, Inspection};
