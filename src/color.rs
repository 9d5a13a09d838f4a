// SPDX-License-Identifier: GPL-3.0-only

//! CPU reference of the colour conversion
//!
//! Mirrors the fragment shader in `shaders/yuv_present.wgsl` using the same
//! constants. Used by tests to pin down the colour contract and by the CLI
//! to export frames without a GPU.

use crate::constants::{CHROMA_OFFSET, LUMA_OFFSET, LUMA_SCALE, YUV_TO_RGB};
use crate::errors::TransformResult;
use crate::frame::{FrameGeometry, Layout};

/// Convert one normalized sample triple to RGB
///
/// Inputs are in `[0, 1]`. The result is not clamped, matching what the
/// shader computes before the framebuffer write.
#[inline]
pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [f32; 3] {
    let yuv = [LUMA_SCALE * (y - LUMA_OFFSET), u - CHROMA_OFFSET, v - CHROMA_OFFSET];
    let dot = |col: &[f32; 3]| col[0] * yuv[0] + col[1] * yuv[1] + col[2] * yuv[2];
    [
        dot(&YUV_TO_RGB[0]),
        dot(&YUV_TO_RGB[1]),
        dot(&YUV_TO_RGB[2]),
    ]
}

/// Quantize a channel the way an 8-bit unorm target does
#[inline]
fn to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert an 8-bit sample triple straight to an RGBA pixel
#[inline]
pub fn pixel_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let [r, g, b] = yuv_to_rgb(y as f32 / 255.0, u as f32 / 255.0, v as f32 / 255.0);
    [to_unorm8(r), to_unorm8(g), to_unorm8(b), 255]
}

/// Convert a whole frame of any 4:2:0 layout to packed RGBA
///
/// Chroma is sampled nearest-neighbour, one sample per 2×2 luma block.
pub fn frame_to_rgba(
    src: &[u8],
    width: u32,
    height: u32,
    layout: Layout,
) -> TransformResult<Vec<u8>> {
    let geometry = FrameGeometry::for_buffer(width, height, src.len())?;
    let offsets = geometry.plane_offsets(layout);
    let step = layout.chroma_step();
    let width = width as usize;
    let chroma_width = geometry.chroma_width();

    let mut rgba = Vec::with_capacity(geometry.luma_len() * 4);
    for (row, luma_row) in src[..geometry.luma_len()].chunks_exact(width).enumerate() {
        let chroma_row = (row / 2) * chroma_width;
        for (col, &y) in luma_row.iter().enumerate() {
            let sample = (chroma_row + col / 2) * step;
            let u = src[offsets.u + sample];
            let v = src[offsets.v + sample];
            rgba.extend_from_slice(&pixel_to_rgba(y, u, v));
        }
    }
    Ok(rgba)
}

/// Convert an I420 frame to packed RGBA
pub fn i420_to_rgba(src: &[u8], width: u32, height: u32) -> TransformResult<Vec<u8>> {
    frame_to_rgba(src, width, height, Layout::I420)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_and_white_levels() {
        // Limited-range black (16) and white (235) with neutral chroma
        assert_eq!(pixel_to_rgba(16, 128, 128), [0, 0, 0, 255]);
        let white = pixel_to_rgba(235, 128, 128);
        assert!(white[..3].iter().all(|&c| c >= 253), "{:?}", white);
    }

    #[test]
    fn test_neutral_chroma_is_grey() {
        let [r, g, b] = yuv_to_rgb(0.5, 0.5, 0.5);
        assert!((r - g).abs() < 1e-6 && (g - b).abs() < 1e-6);
    }

    #[test]
    fn test_column_major_matrix() {
        // v' alone drives red and green, never blue
        let [r, g, b] = yuv_to_rgb(LUMA_OFFSET, 0.5, 0.75);
        assert!((r - 1.2802 * 0.25).abs() < 1e-6);
        assert!((g + 0.380589 * 0.25).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn test_frame_layouts_agree() {
        let mut i420: Vec<u8> = (0..16).map(|i| 16 + i * 10).collect();
        i420.extend_from_slice(&[90, 100, 110, 120]);
        i420.extend_from_slice(&[130, 140, 150, 160]);
        let nv21 =
            crate::transform::convert(&i420, 4, 4, Layout::I420, Layout::Nv21).unwrap();

        let a = i420_to_rgba(&i420, 4, 4).unwrap();
        let b = frame_to_rgba(&nv21, 4, 4, Layout::Nv21).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }
}
