// SPDX-License-Identifier: GPL-3.0-only

//! In-place chroma channel swaps

use crate::errors::TransformResult;
use crate::frame::FrameGeometry;

/// Exchange the two bytes of every chroma pair in a semi-planar frame
///
/// Turns NV21 into NV12 and back. Applying it twice restores the buffer.
pub fn swap_chroma_order(buffer: &mut [u8], width: u32, height: u32) -> TransformResult<()> {
    let geometry = FrameGeometry::for_buffer(width, height, buffer.len())?;
    for pair in buffer[geometry.luma_len()..].chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    Ok(())
}

/// Exchange the two chroma planes of a planar frame
///
/// Turns I420 into YV12 and back.
pub fn swap_chroma_planes(buffer: &mut [u8], width: u32, height: u32) -> TransformResult<()> {
    let geometry = FrameGeometry::for_buffer(width, height, buffer.len())?;
    let (first, second) = buffer[geometry.luma_len()..].split_at_mut(geometry.chroma_plane_len());
    first.swap_with_slice(second);
    Ok(())
}
