//! Kernel convolution over a [`PixelBuffer`].
//!
//! ## Edge handling
//!
//! Neighbors that fall outside the buffer use **clamped replication**: the
//! row and column are clamped independently to the nearest valid index, so a
//! 3×3 kernel centered on the top-left pixel reads the corner pixel four
//! times. This keeps flat regions flat all the way to the border (a blurred
//! or sharpened uniform image is unchanged, Sobel of a flat field is zero).
//!
//! ## Channels
//!
//! Every color channel is convolved independently; there is no cross-channel
//! mixing. The alpha channel of an RGBA buffer is copied through unchanged.
//!
//! ## Parallelism
//!
//! Output rows are computed with rayon. Each worker writes one disjoint row of
//! the freshly allocated output and only reads the input buffer, so the result
//! is identical to a sequential pass.

use crate::adjust::luminance_plane;
use crate::buffer::PixelBuffer;
use crate::kernel::{Kernel, sobel_x, sobel_y};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How Sobel edge detection treats color channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeChannels {
    /// Gradient magnitude of each color channel on its own.
    #[default]
    PerChannel,
    /// Gradient magnitude of the luminance plane, written to every color
    /// channel (a gray edge map).
    Luminance,
}

/// Sobel options resolved from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeOptions {
    pub channels: EdgeChannels,
    /// Rescale magnitudes so the strongest edge maps to 255 before strength
    /// is applied.
    pub normalize: bool,
}

/// Apply `kernel` to every color channel of `buffer`.
///
/// `out = Σ kernel[ky, kx] · in[r + ky - radius, c + kx - radius] / normalization + bias`
pub fn convolve(buffer: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    let width = buffer.width();
    let layout = buffer.layout();
    let channels = layout.channels();
    let color_channels = layout.color_channels();
    let radius = kernel.radius() as isize;
    let size = kernel.size();
    let normalization = kernel.normalization();
    let bias = kernel.bias();

    let mut samples = vec![0.0f32; buffer.samples().len()];
    samples
        .par_chunks_mut(width * channels)
        .enumerate()
        .for_each(|(row, out_row)| {
            let row = row as isize;
            for col in 0..width {
                let c = col as isize;
                for ch in 0..channels {
                    let idx = col * channels + ch;
                    if ch >= color_channels {
                        out_row[idx] = buffer.get_clamped(row, c, ch);
                        continue;
                    }
                    let mut sum = 0.0f32;
                    for ky in 0..size {
                        let sy = row + ky as isize - radius;
                        for kx in 0..size {
                            let sx = c + kx as isize - radius;
                            sum += kernel.weight(ky, kx) * buffer.get_clamped(sy, sx, ch);
                        }
                    }
                    out_row[idx] = sum / normalization + bias;
                }
            }
        });

    buffer.with_samples(samples)
}

/// Sobel edge detection: `strength · sqrt(Gx² + Gy²)` per pixel and color
/// channel. Alpha is preserved.
pub fn sobel(buffer: &PixelBuffer, strength: f32, options: EdgeOptions) -> PixelBuffer {
    let (gx, gy) = match options.channels {
        EdgeChannels::PerChannel => (convolve(buffer, &sobel_x()), convolve(buffer, &sobel_y())),
        EdgeChannels::Luminance => {
            let plane = luminance_plane(buffer);
            (convolve(&plane, &sobel_x()), convolve(&plane, &sobel_y()))
        }
    };

    let layout = buffer.layout();
    let channels = layout.channels();
    let color_channels = layout.color_channels();
    let grad_channels = gx.channels();
    let input = buffer.samples();

    let mut samples = vec![0.0f32; input.len()];
    let mut peak = 0.0f32;
    for (p, out) in samples.chunks_exact_mut(channels).enumerate() {
        for (ch, slot) in out.iter_mut().enumerate().take(color_channels) {
            let g = if grad_channels == 1 { 0 } else { ch };
            let i = p * grad_channels + g;
            let magnitude = gx.samples()[i].hypot(gy.samples()[i]);
            peak = peak.max(magnitude);
            *slot = magnitude;
        }
        if layout.has_alpha() {
            out[3] = input[p * channels + 3];
        }
    }

    let mut scale = strength;
    if options.normalize && peak > 0.0 {
        scale *= 255.0 / peak;
    }
    log::debug!("sobel peak magnitude {peak:.2}, scale {scale:.3}");

    for out in samples.chunks_exact_mut(channels) {
        for v in out.iter_mut().take(color_channels) {
            *v *= scale;
        }
    }

    buffer.with_samples(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;
    use crate::kernel::{box_blur, sharpen};
    use crate::test_helpers::*;

    // =========================================================================
    // Flat-field properties
    // =========================================================================

    #[test]
    fn blur_of_uniform_buffer_is_unchanged() {
        let input = uniform(6, 5, ChannelLayout::Rgb, 77.0);
        for strength in [1.0, 2.0, 4.0] {
            let out = convolve(&input, &box_blur(strength).unwrap());
            assert_all_close(&out, 77.0);
        }
    }

    #[test]
    fn sharpen_of_uniform_buffer_is_unchanged() {
        let input = uniform(5, 5, ChannelLayout::Gray, 140.0);
        for strength in [0.0, 0.5, 1.0, 7.5] {
            let out = convolve(&input, &sharpen(strength).unwrap());
            assert_all_close(&out, 140.0);
        }
    }

    #[test]
    fn sobel_of_uniform_buffer_is_zero() {
        let input = uniform(4, 4, ChannelLayout::Rgb, 200.0);
        let out = sobel(&input, 1.0, EdgeOptions::default());
        assert_all_close(&out, 0.0);

        let lum = sobel(
            &input,
            3.0,
            EdgeOptions {
                channels: EdgeChannels::Luminance,
                normalize: true,
            },
        );
        assert_all_close(&lum, 0.0);
    }

    // =========================================================================
    // Borders and shape
    // =========================================================================

    #[test]
    fn output_shape_matches_input() {
        let input = gradient(7, 3, ChannelLayout::Rgba);
        let out = convolve(&input, &box_blur(3.0).unwrap());
        assert_eq!(out.width(), 7);
        assert_eq!(out.height(), 3);
        assert_eq!(out.layout(), ChannelLayout::Rgba);
    }

    #[test]
    fn border_pixels_use_clamped_replication() {
        // Single row: [0, 30, 60]. Blur radius 1 on the left pixel sees
        // columns (-1, 0, 1) -> (0, 0, 30) on every row, so the average is 10.
        let input =
            PixelBuffer::from_samples(3, 1, ChannelLayout::Gray, vec![0.0, 30.0, 60.0]).unwrap();
        let out = convolve(&input, &box_blur(1.0).unwrap());
        assert_close(out.get(0, 0, 0).unwrap(), 10.0);
        assert_close(out.get(0, 1, 0).unwrap(), 30.0);
        assert_close(out.get(0, 2, 0).unwrap(), 50.0);
    }

    #[test]
    fn corner_reads_replicated_corner() {
        // 2x2 gray: [[0, 90], [90, 90]]. The top-left 3x3 window replicates
        // to [[0,0,90],[0,0,90],[90,90,90]] -> 450 / 9 = 50.
        let input =
            PixelBuffer::from_samples(2, 2, ChannelLayout::Gray, vec![0.0, 90.0, 90.0, 90.0])
                .unwrap();
        let out = convolve(&input, &box_blur(1.0).unwrap());
        assert_close(out.get(0, 0, 0).unwrap(), 50.0);
    }

    #[test]
    fn single_pixel_buffer_is_stable() {
        let input = uniform(1, 1, ChannelLayout::Rgb, 99.0);
        let out = convolve(&input, &sharpen(2.0).unwrap());
        assert_all_close(&out, 99.0);
    }

    #[test]
    fn bias_is_added_after_normalization() {
        let input = uniform(3, 3, ChannelLayout::Gray, 10.0);
        let kernel = crate::kernel::sobel_x().with_bias(128.0);
        let out = convolve(&input, &kernel);
        assert_all_close(&out, 128.0);
    }

    // =========================================================================
    // Channels
    // =========================================================================

    #[test]
    fn channels_are_convolved_independently() {
        let input = PixelBuffer::from_fn(4, 4, ChannelLayout::Rgb, |r, c, ch| match ch {
            0 => 50.0,
            1 => (c * 40) as f32,
            _ => (r * 40) as f32,
        })
        .unwrap();
        let out = convolve(&input, &box_blur(1.0).unwrap());
        // Red is flat and must stay flat regardless of the other channels.
        for row in 0..4 {
            for col in 0..4 {
                assert_close(out.get(row, col, 0).unwrap(), 50.0);
            }
        }
    }

    #[test]
    fn alpha_is_copied_through() {
        let input = PixelBuffer::from_fn(3, 3, ChannelLayout::Rgba, |r, c, ch| {
            if ch == 3 { (r * 3 + c) as f32 } else { 100.0 }
        })
        .unwrap();
        let blurred = convolve(&input, &box_blur(1.0).unwrap());
        let edges = sobel(&input, 1.0, EdgeOptions::default());
        for row in 0..3 {
            for col in 0..3 {
                let alpha = (row * 3 + col) as f32;
                assert_eq!(blurred.get(row, col, 3).unwrap(), alpha);
                assert_eq!(edges.get(row, col, 3).unwrap(), alpha);
            }
        }
    }

    // =========================================================================
    // Sobel
    // =========================================================================

    #[test]
    fn sobel_detects_vertical_edge() {
        // Left half 0, right half 100.
        let input = PixelBuffer::from_fn(6, 4, ChannelLayout::Gray, |_, c, _| {
            if c < 3 { 0.0 } else { 100.0 }
        })
        .unwrap();
        let out = sobel(&input, 1.0, EdgeOptions::default());
        // Columns 2 and 3 straddle the step: gx = 4 * 100.
        assert_close(out.get(1, 2, 0).unwrap(), 400.0);
        assert_close(out.get(1, 3, 0).unwrap(), 400.0);
        assert_close(out.get(1, 0, 0).unwrap(), 0.0);
        assert_close(out.get(1, 5, 0).unwrap(), 0.0);
    }

    #[test]
    fn sobel_strength_scales_magnitude() {
        let input = PixelBuffer::from_fn(6, 4, ChannelLayout::Gray, |_, c, _| {
            if c < 3 { 0.0 } else { 100.0 }
        })
        .unwrap();
        let out = sobel(&input, 0.25, EdgeOptions::default());
        assert_close(out.get(1, 2, 0).unwrap(), 100.0);
    }

    #[test]
    fn sobel_normalize_maps_peak_to_255() {
        let input = PixelBuffer::from_fn(6, 4, ChannelLayout::Gray, |r, _, _| {
            if r < 2 { 10.0 } else { 30.0 }
        })
        .unwrap();
        let out = sobel(
            &input,
            1.0,
            EdgeOptions {
                channels: EdgeChannels::PerChannel,
                normalize: true,
            },
        );
        let (_, hi) = out.sample_range();
        assert_close(hi, 255.0);
    }

    #[test]
    fn sobel_luminance_writes_same_value_to_color_channels() {
        let input = PixelBuffer::from_fn(5, 5, ChannelLayout::Rgb, |_, c, ch| {
            if c < 2 { 0.0 } else { [200.0, 50.0, 10.0][ch] }
        })
        .unwrap();
        let out = sobel(
            &input,
            1.0,
            EdgeOptions {
                channels: EdgeChannels::Luminance,
                normalize: false,
            },
        );
        for row in 0..5 {
            for col in 0..5 {
                let r = out.get(row, col, 0).unwrap();
                assert_eq!(r, out.get(row, col, 1).unwrap());
                assert_eq!(r, out.get(row, col, 2).unwrap());
            }
        }
        assert!(out.get(2, 1, 0).unwrap() > 0.0);
    }
}
