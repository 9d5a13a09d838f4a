// SPDX-License-Identifier: GPL-3.0-only

//! Shared remapping core for conversion and rotation

use super::{ChromaOrder, Rotation};
use crate::frame::{FrameGeometry, Layout};

/// Visit every output sample of a rotated `cols × rows` grid
///
/// `visit` receives `(dst_index, src_index)` in output raster order.
#[inline]
fn for_each_sample(
    rotation: Rotation,
    cols: usize,
    rows: usize,
    mut visit: impl FnMut(usize, usize),
) {
    let (dst_cols, dst_rows) = rotation.output_dims(cols, rows);
    for y in 0..dst_rows {
        let row = y * dst_cols;
        for x in 0..dst_cols {
            let (sx, sy) = match rotation {
                Rotation::None => (x, y),
                Rotation::Clockwise90 => (y, rows - 1 - x),
                Rotation::CounterClockwise90 => (cols - 1 - y, x),
                Rotation::Half => (cols - 1 - x, rows - 1 - y),
            };
            visit(row + x, sy * cols + sx);
        }
    }
}

/// Remap a validated frame into `dst`
///
/// Reads `src` as `from`, applies `rotation` to both grids, corrects the
/// chroma channel order and writes `dst` as `to`. Both buffers must already
/// have the frame length of `geometry`.
pub(super) fn remap(
    src: &[u8],
    dst: &mut [u8],
    geometry: FrameGeometry,
    from: Layout,
    to: Layout,
    rotation: Rotation,
    order: ChromaOrder,
) {
    let luma = geometry.luma_len();
    let width = geometry.width() as usize;
    let height = geometry.height() as usize;

    if rotation == Rotation::None {
        dst[..luma].copy_from_slice(&src[..luma]);
    } else {
        for_each_sample(rotation, width, height, |d, s| dst[d] = src[s]);
    }

    let out_geometry = if rotation.swaps_dimensions() {
        geometry.transposed()
    } else {
        geometry
    };
    let src_offsets = geometry.plane_offsets(from);
    let dst_offsets = out_geometry.plane_offsets(to);
    let src_step = from.chroma_step();
    let dst_step = to.chroma_step();

    let (src_u, src_v) = match order {
        ChromaOrder::Standard => (src_offsets.u, src_offsets.v),
        ChromaOrder::Swapped => (src_offsets.v, src_offsets.u),
    };

    for_each_sample(
        rotation,
        geometry.chroma_width(),
        geometry.chroma_height(),
        |d, s| {
            dst[dst_offsets.u + d * dst_step] = src[src_u + s * src_step];
            dst[dst_offsets.v + d * dst_step] = src[src_v + s * src_step];
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_clockwise() {
        // 3x2 grid
        // a b c
        // d e f
        let src = [b'a', b'b', b'c', b'd', b'e', b'f'];
        let mut dst = [0u8; 6];
        for_each_sample(Rotation::Clockwise90, 3, 2, |d, s| dst[d] = src[s]);
        // d a
        // e b
        // f c
        assert_eq!(&dst, b"daebfc");
    }

    #[test]
    fn test_grid_counter_clockwise() {
        let src = [b'a', b'b', b'c', b'd', b'e', b'f'];
        let mut dst = [0u8; 6];
        for_each_sample(Rotation::CounterClockwise90, 3, 2, |d, s| dst[d] = src[s]);
        // c f
        // b e
        // a d
        assert_eq!(&dst, b"cfbead");
    }

    #[test]
    fn test_grid_half() {
        let src = [b'a', b'b', b'c', b'd', b'e', b'f'];
        let mut dst = [0u8; 6];
        for_each_sample(Rotation::Half, 3, 2, |d, s| dst[d] = src[s]);
        assert_eq!(&dst, b"fedcba");
    }
}
