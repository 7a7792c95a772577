//! Pixel-wise color adjustments: brightness, contrast, saturation.
//!
//! None of these look at neighboring pixels. Results are left unclamped; the
//! pipeline clips once after its last stage.
//!
//! All functions accept gray, RGB and RGBA buffers. Alpha is always preserved
//! unchanged.

use crate::buffer::{ChannelLayout, PixelBuffer};

/// Pivot for contrast: mid-gray.
pub const CONTRAST_PIVOT: f32 = 128.0;

/// Rec.601 luma weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// `out = in + value`
pub fn brightness(buffer: &PixelBuffer, value: f32) -> PixelBuffer {
    let color = buffer.layout().color_channels();
    buffer.map_samples(|ch, v| if ch < color { v + value } else { v })
}

/// `out = 128 + (in - 128) * value`
///
/// `1.0` is identity, `0.0` collapses everything to mid-gray.
pub fn contrast(buffer: &PixelBuffer, value: f32) -> PixelBuffer {
    let color = buffer.layout().color_channels();
    buffer.map_samples(|ch, v| {
        if ch < color {
            CONTRAST_PIVOT + (v - CONTRAST_PIVOT) * value
        } else {
            v
        }
    })
}

/// `out = L + (in - L) * value`, with `L` the pixel's luminance.
///
/// `0.0` desaturates to gray, `1.0` is identity. Gray buffers carry no chroma
/// and come back unchanged.
pub fn saturation(buffer: &PixelBuffer, value: f32) -> PixelBuffer {
    if buffer.layout() == ChannelLayout::Gray {
        return buffer.clone();
    }
    buffer.map_pixels(|src, dst| {
        let l = luminance(src);
        for ch in 0..3 {
            dst[ch] = l + (src[ch] - l) * value;
        }
        if let (Some(a), Some(out)) = (src.get(3), dst.get_mut(3)) {
            *out = *a;
        }
    })
}

/// Luminance of one pixel. Gray pixels are their own luminance.
pub fn luminance(pixel: &[f32]) -> f32 {
    match pixel {
        [r, g, b, ..] => LUMA_R * r + LUMA_G * g + LUMA_B * b,
        [v, ..] => *v,
        [] => 0.0,
    }
}

/// Single-channel luminance plane of `buffer`.
pub fn luminance_plane(buffer: &PixelBuffer) -> PixelBuffer {
    let samples = buffer
        .samples()
        .chunks_exact(buffer.channels())
        .map(luminance)
        .collect();
    buffer.with_layout(ChannelLayout::Gray, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn brightness_adds_offset() {
        let input = uniform(3, 3, ChannelLayout::Rgb, 100.0);
        assert_all_close(&brightness(&input, 50.0), 150.0);
        assert_all_close(&brightness(&input, -30.0), 70.0);
    }

    #[test]
    fn brightness_is_not_clipped_mid_pipeline() {
        let input = uniform(2, 2, ChannelLayout::Gray, 200.0);
        let out = brightness(&input, 100.0);
        assert_all_close(&out, 300.0);
    }

    #[test]
    fn brightness_extremes_clamp_to_range() {
        let input = gradient(5, 4, ChannelLayout::Rgb);
        assert_all_close(&brightness(&input, 1000.0).clamp(), 255.0);
        assert_all_close(&brightness(&input, -1000.0).clamp(), 0.0);
    }

    #[test]
    fn contrast_one_is_identity() {
        let input = gradient(6, 4, ChannelLayout::Rgb);
        assert_buffers_close(&contrast(&input, 1.0), &input);
    }

    #[test]
    fn contrast_zero_collapses_to_pivot() {
        let input = gradient(4, 4, ChannelLayout::Gray);
        assert_all_close(&contrast(&input, 0.0), 128.0);
    }

    #[test]
    fn contrast_scales_distance_from_pivot() {
        let input =
            PixelBuffer::from_samples(2, 1, ChannelLayout::Gray, vec![100.0, 178.0]).unwrap();
        let out = contrast(&input, 2.0);
        assert_close(out.get(0, 0, 0).unwrap(), 72.0);
        assert_close(out.get(0, 1, 0).unwrap(), 228.0);
    }

    #[test]
    fn saturation_one_is_identity() {
        let input = gradient(5, 5, ChannelLayout::Rgba);
        assert_buffers_close(&saturation(&input, 1.0), &input);
    }

    #[test]
    fn saturation_zero_desaturates_to_luminance() {
        let input =
            PixelBuffer::from_samples(1, 1, ChannelLayout::Rgb, vec![200.0, 100.0, 50.0]).unwrap();
        let out = saturation(&input, 0.0);
        let l = 0.299 * 200.0 + 0.587 * 100.0 + 0.114 * 50.0;
        for ch in 0..3 {
            assert_close(out.get(0, 0, ch).unwrap(), l);
        }
    }

    #[test]
    fn saturation_amplifies_chroma() {
        let input =
            PixelBuffer::from_samples(1, 1, ChannelLayout::Rgb, vec![150.0, 100.0, 100.0]).unwrap();
        let out = saturation(&input, 2.0);
        let l = luminance(input.samples());
        assert_close(out.get(0, 0, 0).unwrap(), l + 2.0 * (150.0 - l));
        assert!(out.get(0, 0, 0).unwrap() > 150.0);
        assert!(out.get(0, 0, 1).unwrap() < 100.0);
    }

    #[test]
    fn saturation_on_gray_is_noop() {
        let input = gradient(3, 3, ChannelLayout::Gray);
        assert_eq!(saturation(&input, 0.0), input);
    }

    #[test]
    fn adjustments_preserve_alpha() {
        let input = PixelBuffer::from_fn(2, 2, ChannelLayout::Rgba, |r, c, ch| {
            if ch == 3 { (r * 2 + c) as f32 * 10.0 } else { 90.0 + ch as f32 }
        })
        .unwrap();
        for out in [
            brightness(&input, 40.0),
            contrast(&input, 0.0),
            saturation(&input, 0.0),
        ] {
            for row in 0..2 {
                for col in 0..2 {
                    assert_eq!(
                        out.get(row, col, 3).unwrap(),
                        input.get(row, col, 3).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn luminance_of_gray_pixel_is_itself() {
        assert_eq!(luminance(&[42.0]), 42.0);
    }

    #[test]
    fn luminance_plane_is_single_channel() {
        let input = uniform(3, 2, ChannelLayout::Rgb, 80.0);
        let plane = luminance_plane(&input);
        assert_eq!(plane.layout(), ChannelLayout::Gray);
        assert_eq!(plane.width(), 3);
        assert_eq!(plane.height(), 2);
        assert_all_close(&plane, 80.0);
    }
}
