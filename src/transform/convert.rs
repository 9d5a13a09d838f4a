// SPDX-License-Identifier: GPL-3.0-only

//! Layout conversion

use super::remap::remap;
use super::{ChromaOrder, Rotation};
use crate::errors::TransformResult;
use crate::frame::{FrameGeometry, Layout};

/// Convert a frame between 4:2:0 layouts
///
/// Luma is copied byte for byte; only the chroma region is rearranged.
/// The output has the same length as the input.
pub fn convert(
    src: &[u8],
    width: u32,
    height: u32,
    from: Layout,
    to: Layout,
) -> TransformResult<Vec<u8>> {
    let geometry = FrameGeometry::for_buffer(width, height, src.len())?;
    let mut dst = vec![0u8; src.len()];
    if from == to {
        dst.copy_from_slice(src);
    } else {
        remap(
            src,
            &mut dst,
            geometry,
            from,
            to,
            Rotation::None,
            ChromaOrder::Standard,
        );
    }
    Ok(dst)
}

/// Convert into a caller-owned buffer
///
/// Both buffers are validated before anything is written, so on error `dst`
/// is left untouched.
pub fn convert_into(
    src: &[u8],
    dst: &mut [u8],
    width: u32,
    height: u32,
    from: Layout,
    to: Layout,
) -> TransformResult<()> {
    let geometry = FrameGeometry::for_buffer(width, height, src.len())?;
    geometry.check_len(dst.len())?;
    if from == to {
        dst.copy_from_slice(src);
    } else {
        remap(
            src,
            dst,
            geometry,
            from,
            to,
            Rotation::None,
            ChromaOrder::Standard,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransformError;

    #[test]
    fn test_convert_into_leaves_dst_on_error() {
        let src = vec![1u8; 24];
        let mut dst = vec![7u8; 23];
        let err = convert_into(&src, &mut dst, 4, 4, Layout::Nv21, Layout::I420);
        assert_eq!(
            err,
            Err(TransformError::InvalidBufferSize {
                expected: 24,
                actual: 23
            })
        );
        assert!(dst.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_nv12_to_yv12() {
        let mut src: Vec<u8> = (0..16).collect();
        // U0 V0 U1 V1 ...
        src.extend_from_slice(&[10, 20, 11, 21, 12, 22, 13, 23]);
        let dst = convert(&src, 4, 4, Layout::Nv12, Layout::Yv12).unwrap();
        assert_eq!(&dst[..16], &src[..16]);
        assert_eq!(&dst[16..], &[20, 21, 22, 23, 10, 11, 12, 13]);
    }
}
