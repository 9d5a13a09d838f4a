// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! The colour constants here are part of the display contract and must match
//! the literals in `shaders/yuv_present.wgsl` exactly.

/// Luma scale for limited-range expansion
pub const LUMA_SCALE: f32 = 1.1643;

/// Normalized luma black level (16 / 256)
pub const LUMA_OFFSET: f32 = 0.0625;

/// Normalized chroma zero point
pub const CHROMA_OFFSET: f32 = 0.5;

/// YUV→RGB matrix, stored column by column.
///
/// Column `i` is dotted with `[y', u', v']` to give output channel `i`.
pub const YUV_TO_RGB: [[f32; 3]; 3] = [
    [1.0, 0.0, 1.2802],
    [1.0, -0.214821, -0.380589],
    [1.0, 2.127982, 0.0],
];

/// Vertex layout of the screen quad: position (x, y, z) then texcoord (s, t)
pub const QUAD_FLOATS_PER_VERTEX: usize = 5;

/// Screen-filling quad, four corners
pub const QUAD_VERTICES: [[f32; QUAD_FLOATS_PER_VERTEX]; 4] = [
    [1.0, -1.0, 0.0, 1.0, 1.0],
    [1.0, 1.0, 0.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0, 0.0, 0.0],
    [-1.0, -1.0, 0.0, 0.0, 1.0],
];

/// Two triangles covering the quad
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Default preview width used when nothing else is configured
pub const DEFAULT_PREVIEW_WIDTH: u32 = 1280;

/// Default preview height used when nothing else is configured
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 720;

/// Config schema version written to disk
pub const CONFIG_VERSION: u32 = 1;

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "yuvplay";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Upload cycles slower than this are logged as stutter
pub const SLOW_CYCLE_MS: u128 = 16;

/// Size in bytes of a 4:2:0 frame
///
/// Does not validate; see [`crate::frame::FrameGeometry`] for checked sizes.
#[inline]
pub const fn frame_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * 3 / 2
}
