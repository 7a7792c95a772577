//! Image I/O: decode, encode, display.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` → [`PixelBuffer`](crate::buffer::PixelBuffer) |
//! | **Encode** | [`PixelBuffer`](crate::buffer::PixelBuffer) → `image::DynamicImage::save_with_format` |
//! | **Display** | temporary PNG + viewer process |
//!
//! The module is split into:
//! - **Backend**: [`ImageBackend`] trait, the seam the CLI talks to
//! - **Rust backend**: [`RustBackend`], the production implementation

pub mod backend;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use rust_backend::{RustBackend, supported_extensions};
