//! Shared test utilities: buffer builders and tolerant comparisons.
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let flat = uniform(4, 4, ChannelLayout::Rgb, 100.0);
//! let out = convolve(&flat, &box_blur(1.0).unwrap());
//! assert_all_close(&out, 100.0);
//! ```

use crate::buffer::{ChannelLayout, PixelBuffer};

/// Tolerance for float comparisons of sample values.
pub const EPSILON: f32 = 1e-3;

// =========================================================================
// Builders
// =========================================================================

/// Buffer with every sample set to `value`.
pub fn uniform(width: usize, height: usize, layout: ChannelLayout, value: f32) -> PixelBuffer {
    PixelBuffer::filled(width, height, layout, value).unwrap()
}

/// Non-uniform buffer: each channel ramps differently across rows and
/// columns. Alpha (if present) is a constant 255.
pub fn gradient(width: usize, height: usize, layout: ChannelLayout) -> PixelBuffer {
    PixelBuffer::from_fn(width, height, layout, |row, col, ch| match ch {
        0 => ((col * 37 + row * 11) % 256) as f32,
        1 => ((row * 53 + 20) % 256) as f32,
        2 => ((col * row * 29 + 7) % 256) as f32,
        _ => 255.0,
    })
    .unwrap()
}

// =========================================================================
// Assertions: panic with the offending coordinates
// =========================================================================

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

/// Every sample of `buffer` (alpha included) is within [`EPSILON`] of `value`.
pub fn assert_all_close(buffer: &PixelBuffer, value: f32) {
    for (i, &v) in buffer.samples().iter().enumerate() {
        assert!(
            (v - value).abs() < EPSILON,
            "sample {i} is {v}, expected {value}"
        );
    }
}

/// Same shape and sample-wise equal within [`EPSILON`].
pub fn assert_buffers_close(actual: &PixelBuffer, expected: &PixelBuffer) {
    assert_eq!(
        (actual.width(), actual.height(), actual.layout()),
        (expected.width(), expected.height(), expected.layout()),
        "buffer shapes differ"
    );
    for (i, (a, e)) in actual
        .samples()
        .iter()
        .zip(expected.samples())
        .enumerate()
    {
        assert!((a - e).abs() < EPSILON, "sample {i}: {a} != {e}");
    }
}
