//! Image I/O backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the editor needs
//! from the outside world: decode a file into a [`PixelBuffer`], encode a
//! buffer to a file, and display a buffer on screen.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use crate::buffer::PixelBuffer;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unable to open image: {0}")]
    Open(String),
    #[error("Unable to save image: {0}")]
    Save(String),
    #[error("Unable to display image: {0}")]
    Display(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for image I/O backends.
pub trait ImageBackend: Sync {
    /// Decode the image at `path`.
    fn decode(&self, path: &Path) -> Result<PixelBuffer, BackendError>;

    /// Encode `buffer` to `path`; the format follows the extension.
    fn encode(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), BackendError>;

    /// Show `buffer` to the user.
    fn display(&self, buffer: &PixelBuffer) -> Result<(), BackendError>;
}
