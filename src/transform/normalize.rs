// SPDX-License-Identifier: GPL-3.0-only

use super::{Orientation, rotate_into_layout};
use crate::errors::TransformResult;
use crate::frame::{Layout, YuvFrame};

/// Frame ready for upload: I420 with its post-rotation dimensions
pub type NormalizedFrame = YuvFrame;

/// Bring a captured frame into the renderer's canonical form
///
/// Applies the orientation and converts to I420, the layout whose planes the
/// renderer uploads without any further rearrangement.
pub fn normalize(
    src: &[u8],
    width: u32,
    height: u32,
    layout: Layout,
    orientation: Orientation,
) -> TransformResult<NormalizedFrame> {
    rotate_into_layout(src, width, height, layout, orientation, Layout::I420)
}
