// SPDX-License-Identifier: GPL-3.0-only

//! Frame geometry and 4:2:0 plane layouts
//!
//! A frame buffer is a flat byte sequence of exactly `width * height * 3 / 2`
//! bytes: a full-resolution luma plane followed by two quarter-size chroma
//! planes. [`Layout`] decides how the chroma bytes are arranged.

use crate::errors::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chroma arrangement of a 4:2:0 frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Semi-planar, interleaved V,U pairs (Android camera default)
    #[default]
    Nv21,
    /// Semi-planar, interleaved U,V pairs
    Nv12,
    /// Planar Y, U, V
    I420,
    /// Planar Y, V, U
    Yv12,
}

impl Layout {
    /// All layouts, for iteration in tests and help text
    pub const ALL: [Layout; 4] = [Layout::Nv21, Layout::Nv12, Layout::I420, Layout::Yv12];

    /// Whether chroma is stored as interleaved pairs
    #[inline]
    pub fn is_semi_planar(self) -> bool {
        matches!(self, Layout::Nv21 | Layout::Nv12)
    }

    /// Whether V comes before U (first byte of a pair, or first plane)
    #[inline]
    pub fn v_first(self) -> bool {
        matches!(self, Layout::Nv21 | Layout::Yv12)
    }

    /// Byte distance between consecutive samples of one chroma channel
    #[inline]
    pub fn chroma_step(self) -> usize {
        if self.is_semi_planar() { 2 } else { 1 }
    }

    /// Lowercase name used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Layout::Nv21 => "nv21",
            Layout::Nv12 => "nv12",
            Layout::I420 => "i420",
            Layout::Yv12 => "yv12",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nv21" => Ok(Layout::Nv21),
            "nv12" => Ok(Layout::Nv12),
            "i420" | "yu12" => Ok(Layout::I420),
            "yv12" => Ok(Layout::Yv12),
            other => Err(format!(
                "unknown layout '{}', expected one of nv21, nv12, i420, yv12",
                other
            )),
        }
    }
}

/// Byte offsets of the three planes inside a frame buffer
///
/// For semi-planar layouts `u` and `v` point at the first byte of the
/// respective channel inside the interleaved region, and consecutive samples
/// are [`Layout::chroma_step`] bytes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneOffsets {
    pub y: usize,
    pub u: usize,
    pub v: usize,
}

/// Validated frame dimensions
///
/// Construction guarantees both dimensions are even and non-zero, so every
/// derived size below is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
}

impl FrameGeometry {
    /// Validate dimensions for 4:2:0 subsampling
    pub fn new(width: u32, height: u32) -> TransformResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(TransformError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Validate dimensions and check a buffer length against them
    pub fn for_buffer(width: u32, height: u32, len: usize) -> TransformResult<Self> {
        let geometry = Self::new(width, height)?;
        geometry.check_len(len)?;
        Ok(geometry)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Geometry with width and height exchanged (after a quarter turn)
    #[inline]
    pub fn transposed(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Luma plane size in bytes
    #[inline]
    pub fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one chroma plane in samples
    #[inline]
    pub fn chroma_plane_len(&self) -> usize {
        self.luma_len() / 4
    }

    /// Chroma grid width (samples per row of one chroma channel)
    #[inline]
    pub fn chroma_width(&self) -> usize {
        self.width as usize / 2
    }

    /// Chroma grid height
    #[inline]
    pub fn chroma_height(&self) -> usize {
        self.height as usize / 2
    }

    /// Total frame size in bytes
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.luma_len() * 3 / 2
    }

    /// Check that a buffer has exactly the frame size
    pub fn check_len(&self, len: usize) -> TransformResult<()> {
        let expected = self.frame_len();
        if len != expected {
            return Err(TransformError::InvalidBufferSize {
                expected,
                actual: len,
            });
        }
        Ok(())
    }

    /// Plane offsets for the given layout
    pub fn plane_offsets(&self, layout: Layout) -> PlaneOffsets {
        let luma = self.luma_len();
        let quarter = self.chroma_plane_len();
        let (u, v) = match layout {
            Layout::Nv21 => (luma + 1, luma),
            Layout::Nv12 => (luma, luma + 1),
            Layout::I420 => (luma, luma + quarter),
            Layout::Yv12 => (luma + quarter, luma),
        };
        PlaneOffsets { y: 0, u, v }
    }
}

/// An owned frame buffer together with its geometry and layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    pub data: Vec<u8>,
    pub geometry: FrameGeometry,
    pub layout: Layout,
}

impl YuvFrame {
    /// Wrap a buffer after validating it against the dimensions
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: Layout) -> TransformResult<Self> {
        let geometry = FrameGeometry::for_buffer(width, height, data.len())?;
        Ok(Self {
            data,
            geometry,
            layout,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.geometry.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.geometry.height()
    }

    /// Luma plane
    pub fn y_plane(&self) -> &[u8] {
        &self.data[..self.geometry.luma_len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_rejects_odd_and_zero() {
        assert!(FrameGeometry::new(4, 4).is_ok());
        assert_eq!(
            FrameGeometry::new(3, 4),
            Err(TransformError::InvalidDimensions {
                width: 3,
                height: 4
            })
        );
        assert!(FrameGeometry::new(4, 5).is_err());
        assert!(FrameGeometry::new(0, 4).is_err());
    }

    #[test]
    fn test_for_buffer_checks_len() {
        assert!(FrameGeometry::for_buffer(4, 4, 24).is_ok());
        assert_eq!(
            FrameGeometry::for_buffer(4, 4, 25),
            Err(TransformError::InvalidBufferSize {
                expected: 24,
                actual: 25
            })
        );
    }

    #[test]
    fn test_plane_offsets() {
        let g = FrameGeometry::new(1280, 720).unwrap();
        let i420 = g.plane_offsets(Layout::I420);
        assert_eq!(i420.y, 0);
        assert_eq!(i420.u, 1280 * 720);
        assert_eq!(i420.v, 1280 * 720 * 5 / 4);

        let yv12 = g.plane_offsets(Layout::Yv12);
        assert_eq!(yv12.u, i420.v);
        assert_eq!(yv12.v, i420.u);

        let nv21 = g.plane_offsets(Layout::Nv21);
        assert_eq!(nv21.v, 1280 * 720);
        assert_eq!(nv21.u, nv21.v + 1);
    }

    #[test]
    fn test_layout_parse_roundtrip() {
        for layout in Layout::ALL {
            assert_eq!(layout.name().parse::<Layout>(), Ok(layout));
        }
        assert_eq!("NV12".parse::<Layout>(), Ok(Layout::Nv12));
        assert!("rgba".parse::<Layout>().is_err());
    }

    #[test]
    fn test_transposed() {
        let g = FrameGeometry::new(8, 4).unwrap().transposed();
        assert_eq!((g.width(), g.height()), (4, 8));
    }
}
