// SPDX-License-Identifier: GPL-3.0-only

//! Quarter and half turns
//!
//! The plain entry points operate on semi-planar frames and keep the pair
//! layout, so they work for NV21 and NV12 alike. [`rotate`] and
//! [`rotate_into_layout`] accept any layout.

use super::remap::remap;
use super::{ChromaOrder, Direction, Orientation, Rotation};
use crate::errors::TransformResult;
use crate::frame::{FrameGeometry, Layout, YuvFrame};

/// Rotate a semi-planar frame by 90 degrees
///
/// The returned buffer has the same length; its logical width is the input
/// height and its logical height the input width.
pub fn rotate_quarter_turn(
    src: &[u8],
    width: u32,
    height: u32,
    direction: Direction,
    order: ChromaOrder,
) -> TransformResult<Vec<u8>> {
    let frame = rotate_into_layout(
        src,
        width,
        height,
        Layout::Nv21,
        Orientation::new(direction.into(), order),
        Layout::Nv21,
    )?;
    Ok(frame.data)
}

/// Rotate a semi-planar frame by 180 degrees
///
/// Chroma pairs move as whole pairs, so U and V never trade places unless
/// `order` asks for it.
pub fn rotate_half_turn(
    src: &[u8],
    width: u32,
    height: u32,
    order: ChromaOrder,
) -> TransformResult<Vec<u8>> {
    let frame = rotate_into_layout(
        src,
        width,
        height,
        Layout::Nv21,
        Orientation::new(Rotation::Half, order),
        Layout::Nv21,
    )?;
    Ok(frame.data)
}

/// Apply an orientation to a frame of any layout, keeping the layout
pub fn rotate(
    src: &[u8],
    width: u32,
    height: u32,
    layout: Layout,
    orientation: Orientation,
) -> TransformResult<YuvFrame> {
    rotate_into_layout(src, width, height, layout, orientation, layout)
}

/// Apply an orientation and convert to another layout in one pass
pub fn rotate_into_layout(
    src: &[u8],
    width: u32,
    height: u32,
    from: Layout,
    orientation: Orientation,
    to: Layout,
) -> TransformResult<YuvFrame> {
    let geometry = FrameGeometry::for_buffer(width, height, src.len())?;
    let out_geometry = if orientation.rotation.swaps_dimensions() {
        geometry.transposed()
    } else {
        geometry
    };

    let data = if orientation.is_identity() && from == to {
        src.to_vec()
    } else {
        let mut dst = vec![0u8; src.len()];
        remap(
            src,
            &mut dst,
            geometry,
            from,
            to,
            orientation.rotation,
            orientation.chroma_order,
        );
        dst
    };

    Ok(YuvFrame {
        data,
        geometry: out_geometry,
        layout: to,
    })
}
