//! # Image Layers
//!
//! Apply a sequence of convolution filters and color adjustments to a raster
//! image. Each operation consumes the previous operation's output, so the
//! order given on the command line is the order the layers are applied in.
//!
//! # Architecture: Decode, Layer, Clamp
//!
//! ```text
//! 1. Decode    file      →  PixelBuffer   (image crate, 8-bit → f32)
//! 2. Layer     buffer    →  buffer        (one stage per operation, unclamped)
//! 3. Clamp     buffer    →  0..255        (once, then encode and/or display)
//! ```
//!
//! Intermediate stages keep full `f32` range. A brightness boost followed by
//! a contrast reduction therefore loses nothing to clipping in between; only
//! the final result is rounded and clamped.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`buffer`] | `PixelBuffer`: row-major interleaved `f32` samples, bounds-checked access |
//! | [`kernel`] | `Kernel` type and the strength-parameterized catalog (box blur, sharpen, Sobel) |
//! | [`convolve`] | Parallel convolution with clamped-replication edges; Sobel magnitude |
//! | [`adjust`] | Brightness, contrast and saturation; luminance helpers |
//! | [`pipeline`] | Operation types, up-front validation, staged execution |
//! | [`config`] | `config.toml` loading, stock defaults, merging, validation |
//! | [`edit`] | One run over any backend: decode, layer, save, display |
//! | [`imaging`] | Decode, encode and display through the `ImageBackend` trait |
//! | [`cli`] | `clap` command line and recovery of the typed operation order |
//! | [`output`] | CLI output formatting for plan, stages and result |
//!
//! # Design Decisions
//!
//! ## Clamped Replication at the Border
//!
//! Kernel taps that fall outside the image read the nearest edge pixel. A
//! uniform image stays uniform under every normalized kernel, and no dark or
//! light frame appears around blurred output.
//!
//! ## Alpha Is Carried, Not Filtered
//!
//! For RGBA input, every operation works on the color channels and copies
//! alpha through unchanged.
//!
//! ## Validate Before Running
//!
//! [`pipeline::Pipeline`] is built from the full operation list before the
//! image is decoded. An unknown filter in the last position fails the run
//! without spending time on the stages before it.

pub mod adjust;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod convolve;
pub mod edit;
pub mod imaging;
pub mod kernel;
pub mod output;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;
