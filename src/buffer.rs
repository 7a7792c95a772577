//! In-memory pixel storage shared by every stage of the pipeline.
//!
//! A [`PixelBuffer`] is a row-major grid of interleaved `f32` samples. Values
//! are *conceptually* in `[0, 255]` but are allowed to leave that range while
//! a pipeline runs; clipping once at the end (see [`PixelBuffer::clamp`])
//! avoids compounding rounding error across layered operations.
//!
//! ```text
//! samples: [r g b | r g b | r g b]   row 0
//!          [r g b | r g b | r g b]   row 1
//! index  = (row * width + col) * channels + channel
//! ```
//!
//! Buffers are never mutated by transforms. Every filter and adjustment
//! returns a fresh buffer, so intermediate results can be kept and compared.

use std::fmt;
use thiserror::Error;

/// Largest value a materialized sample can hold.
pub const MAX_INTENSITY: f32 = 255.0;
/// Smallest value a materialized sample can hold.
pub const MIN_INTENSITY: f32 = 0.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error(
        "sample ({row}, {col}, {channel}) is outside a {width}x{height} buffer with {channels} channels"
    )]
    OutOfBounds {
        row: usize,
        col: usize,
        channel: usize,
        width: usize,
        height: usize,
        channels: usize,
    },
    #[error("buffer dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: usize, height: usize },
    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
    #[error("expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
}

/// Interleaved channel layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn from_count(channels: usize) -> Result<Self, BufferError> {
        match channels {
            1 => Ok(Self::Gray),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(BufferError::UnsupportedChannels(other)),
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Channels that carry color; alpha is excluded.
    pub fn color_channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb | Self::Rgba => 3,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gray => "gray",
            Self::Rgb => "rgb",
            Self::Rgba => "rgba",
        };
        f.write_str(name)
    }
}

/// A 2D grid of multi-channel samples held at `f32` precision.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    layout: ChannelLayout,
    samples: Vec<f32>,
}

impl PixelBuffer {
    /// Zero-filled buffer.
    pub fn new(width: usize, height: usize, layout: ChannelLayout) -> Result<Self, BufferError> {
        Self::filled(width, height, layout, 0.0)
    }

    /// Buffer with every sample set to `value`.
    pub fn filled(
        width: usize,
        height: usize,
        layout: ChannelLayout,
        value: f32,
    ) -> Result<Self, BufferError> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            layout,
            samples: vec![value; width * height * layout.channels()],
        })
    }

    /// Wrap an existing row-major, interleaved sample vector.
    pub fn from_samples(
        width: usize,
        height: usize,
        layout: ChannelLayout,
        samples: Vec<f32>,
    ) -> Result<Self, BufferError> {
        check_dimensions(width, height)?;
        let expected = width * height * layout.channels();
        if samples.len() != expected {
            return Err(BufferError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            layout,
            samples,
        })
    }

    /// Build a buffer by evaluating `f(row, col, channel)` for every sample.
    pub fn from_fn(
        width: usize,
        height: usize,
        layout: ChannelLayout,
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Result<Self, BufferError> {
        check_dimensions(width, height)?;
        let channels = layout.channels();
        let mut samples = Vec::with_capacity(width * height * channels);
        for row in 0..height {
            for col in 0..width {
                for channel in 0..channels {
                    samples.push(f(row, col, channel));
                }
            }
        }
        Ok(Self {
            width,
            height,
            layout,
            samples,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Bounds-checked sample read.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Result<f32, BufferError> {
        let idx = self.index(row, col, channel)?;
        Ok(self.samples[idx])
    }

    /// Bounds-checked sample write.
    pub fn set(
        &mut self,
        row: usize,
        col: usize,
        channel: usize,
        value: f32,
    ) -> Result<(), BufferError> {
        let idx = self.index(row, col, channel)?;
        self.samples[idx] = value;
        Ok(())
    }

    /// Read a sample, replicating the nearest edge pixel for out-of-range
    /// coordinates. `channel` must be in range.
    #[inline]
    pub(crate) fn get_clamped(&self, row: isize, col: isize, channel: usize) -> f32 {
        let r = row.clamp(0, self.height as isize - 1) as usize;
        let c = col.clamp(0, self.width as isize - 1) as usize;
        self.samples[(r * self.width + c) * self.layout.channels() + channel]
    }

    /// Smallest and largest sample, alpha included.
    pub fn sample_range(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// New buffer with every sample rounded and clamped into `[0, 255]`.
    pub fn clamp(&self) -> PixelBuffer {
        self.map_samples(|_, v| clamp_sample(v))
    }

    /// Clamped 8-bit samples, ready for an encoder.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.samples.iter().map(|&v| clamp_sample(v) as u8).collect()
    }

    /// New buffer of the same shape with `f(channel, sample)` applied to
    /// every sample.
    pub fn map_samples(&self, f: impl Fn(usize, f32) -> f32) -> PixelBuffer {
        let channels = self.layout.channels();
        let samples = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, &v)| f(i % channels, v))
            .collect();
        PixelBuffer {
            width: self.width,
            height: self.height,
            layout: self.layout,
            samples,
        }
    }

    /// New buffer of the same shape built pixel by pixel: `f` receives the
    /// input pixel and fills the output pixel.
    pub(crate) fn map_pixels(&self, f: impl Fn(&[f32], &mut [f32])) -> PixelBuffer {
        let channels = self.layout.channels();
        let mut samples = vec![0.0; self.samples.len()];
        for (src, dst) in self
            .samples
            .chunks_exact(channels)
            .zip(samples.chunks_exact_mut(channels))
        {
            f(src, dst);
        }
        PixelBuffer {
            width: self.width,
            height: self.height,
            layout: self.layout,
            samples,
        }
    }

    /// Same-shape buffer around freshly computed samples.
    pub(crate) fn with_samples(&self, samples: Vec<f32>) -> PixelBuffer {
        debug_assert_eq!(samples.len(), self.samples.len());
        PixelBuffer {
            width: self.width,
            height: self.height,
            layout: self.layout,
            samples,
        }
    }

    /// Buffer with the same width and height but a different layout.
    pub(crate) fn with_layout(&self, layout: ChannelLayout, samples: Vec<f32>) -> PixelBuffer {
        debug_assert_eq!(samples.len(), self.width * self.height * layout.channels());
        PixelBuffer {
            width: self.width,
            height: self.height,
            layout,
            samples,
        }
    }

    fn index(&self, row: usize, col: usize, channel: usize) -> Result<usize, BufferError> {
        let channels = self.layout.channels();
        if row >= self.height || col >= self.width || channel >= channels {
            return Err(BufferError::OutOfBounds {
                row,
                col,
                channel,
                width: self.width,
                height: self.height,
                channels,
            });
        }
        Ok((row * self.width + col) * channels + channel)
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), BufferError> {
    if width == 0 || height == 0 {
        return Err(BufferError::EmptyDimensions { width, height });
    }
    Ok(())
}

fn clamp_sample(v: f32) -> f32 {
    if v.is_nan() {
        return MIN_INTENSITY;
    }
    v.round().clamp(MIN_INTENSITY, MAX_INTENSITY)
}
