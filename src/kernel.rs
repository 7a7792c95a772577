//! Convolution kernels and the catalog of built-in filters.
//!
//! | Filter | Size | Weights | Normalization |
//! |---|---|---|---|
//! | Box blur | `(2k+1)²`, `k = max(1, round(strength))` | all `1` | cell count |
//! | Sharpen | 3×3 | center `1 + 4s`, edges `-s`, corners `0` | 1 |
//! | Sobel Gx / Gy | 3×3 | fixed | 1 (weights sum to 0) |
//!
//! Normalization is derived from the weights: their sum, or `1` when the sum
//! is zero (gradient kernels).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("kernel size must be odd and at least 1, got {0}")]
    InvalidSize(usize),
    #[error("a {size}x{size} kernel needs {expected} weights, got {actual}")]
    WeightCount {
        size: usize,
        expected: usize,
        actual: usize,
    },
    #[error("kernel weights must be finite")]
    NonFiniteWeight,
    #[error("blur radius {radius} exceeds the kernel limit of {max}")]
    TooLarge { radius: usize, max: usize },
}

/// Odd-sized square weight matrix applied by the convolution engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
    normalization: f32,
    bias: f32,
}

impl Kernel {
    /// Build a kernel from row-major weights.
    pub fn new(size: usize, weights: Vec<f32>) -> Result<Self, KernelError> {
        if size == 0 || size % 2 == 0 {
            return Err(KernelError::InvalidSize(size));
        }
        let expected = size * size;
        if weights.len() != expected {
            return Err(KernelError::WeightCount {
                size,
                expected,
                actual: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(KernelError::NonFiniteWeight);
        }

        let sum: f32 = weights.iter().sum();
        let normalization = if sum.abs() < f32::EPSILON { 1.0 } else { sum };
        Ok(Self {
            size,
            weights,
            normalization,
            bias: 0.0,
        })
    }

    /// Constant added after normalization, e.g. 128 for gradient kernels
    /// that should be centered on mid-gray.
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance from the center cell to an edge.
    pub fn radius(&self) -> usize {
        self.size / 2
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn normalization(&self) -> f32 {
        self.normalization
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Weight at kernel row `ky`, column `kx` (both `0..size`).
    #[inline]
    pub fn weight(&self, ky: usize, kx: usize) -> f32 {
        self.weights[ky * self.size + kx]
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Largest radius any catalog kernel is built with. A `(2k+1)²` weight
/// matrix beyond this would not fit in memory on ordinary machines.
pub const MAX_RADIUS: usize = 1024;

/// Blur radius `k` for a given strength: `max(1, round(strength))`.
pub fn box_blur_radius(strength: f32) -> usize {
    let rounded = strength.round();
    if rounded.is_finite() && rounded > 1.0 {
        rounded as usize
    } else {
        1
    }
}

/// Uniform `(2k+1)×(2k+1)` averaging kernel.
pub fn box_blur(strength: f32) -> Result<Kernel, KernelError> {
    let radius = box_blur_radius(strength);
    let too_large = KernelError::TooLarge {
        radius,
        max: MAX_RADIUS,
    };
    if radius > MAX_RADIUS {
        return Err(too_large);
    }
    let size = radius
        .checked_mul(2)
        .and_then(|d| d.checked_add(1))
        .ok_or_else(|| too_large.clone())?;
    let cells = size.checked_mul(size).ok_or(too_large)?;
    Kernel::new(size, vec![1.0; cells])
}

/// 3×3 unsharp kernel scaled by `strength`. Weights always sum to 1, so
/// flat regions keep their brightness.
pub fn sharpen(strength: f32) -> Result<Kernel, KernelError> {
    let s = strength;
    #[rustfmt::skip]
    let weights = vec![
        0.0, -s,            0.0,
        -s,  1.0 + 4.0 * s, -s,
        0.0, -s,            0.0,
    ];
    Kernel::new(3, weights)
}

/// Horizontal Sobel gradient.
pub fn sobel_x() -> Kernel {
    #[rustfmt::skip]
    let weights = vec![
        -1.0, 0.0, 1.0,
        -2.0, 0.0, 2.0,
        -1.0, 0.0, 1.0,
    ];
    Kernel {
        size: 3,
        weights,
        normalization: 1.0,
        bias: 0.0,
    }
}

/// Vertical Sobel gradient.
pub fn sobel_y() -> Kernel {
    #[rustfmt::skip]
    let weights = vec![
        -1.0, -2.0, -1.0,
         0.0,  0.0,  0.0,
         1.0,  2.0,  1.0,
    ];
    Kernel {
        size: 3,
        weights,
        normalization: 1.0,
        bias: 0.0,
    }
}
