// SPDX-License-Identifier: GPL-3.0-only

//! Pixel transform library
//!
//! Pure functions over raw 4:2:0 frame buffers: layout conversion between
//! NV21, NV12, I420 and YV12, quarter and half turns, and chroma channel
//! swaps. Nothing here touches the GPU.
//!
//! Every transform validates its input first and either produces a buffer of
//! exactly `width * height * 3 / 2` bytes or returns an error without
//! touching any output.
//!
//! Conversion and rotation share one remapping core: luma is
//! remapped on the full-resolution grid, chroma on the half-resolution grid,
//! reading and writing each chroma channel at the offsets and step of its
//! layout.

mod convert;
mod normalize;
mod remap;
mod rotate;
mod swap;

pub use convert::{convert, convert_into};
pub use normalize::{NormalizedFrame, normalize};
pub use rotate::{rotate, rotate_half_turn, rotate_into_layout, rotate_quarter_turn};
pub use swap::{swap_chroma_order, swap_chroma_planes};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a quarter turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Rotation applied to correct sensor mounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    CounterClockwise90,
    Half,
}

impl Rotation {
    /// Clockwise angle in degrees (0, 90, 180, 270)
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::CounterClockwise90 => 270,
        }
    }

    /// Build from a clockwise angle; negative angles turn counter-clockwise
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Half),
            270 => Some(Rotation::CounterClockwise90),
            _ => None,
        }
    }

    /// Whether the output has width and height exchanged
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }

    /// Rotation that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Rotation::Clockwise90 => Rotation::CounterClockwise90,
            Rotation::CounterClockwise90 => Rotation::Clockwise90,
            other => other,
        }
    }

    /// Output grid size for a `cols × rows` input grid
    #[inline]
    pub(crate) fn output_dims(self, cols: usize, rows: usize) -> (usize, usize) {
        if self.swaps_dimensions() {
            (rows, cols)
        } else {
            (cols, rows)
        }
    }
}

impl From<Direction> for Rotation {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Clockwise => Rotation::Clockwise90,
            Direction::CounterClockwise => Rotation::CounterClockwise90,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cw" => Ok(Rotation::Clockwise90),
            "ccw" => Ok(Rotation::CounterClockwise90),
            "none" => Ok(Rotation::None),
            other => other
                .parse::<i32>()
                .ok()
                .and_then(Rotation::from_degrees)
                .ok_or_else(|| {
                    format!(
                        "unknown rotation '{}', expected 0, 90, 180, 270, cw or ccw",
                        other
                    )
                }),
        }
    }
}

/// Order in which a sensor emits the two chroma channels
///
/// Some vendors' sensors emit every chroma pair reversed relative to the
/// declared layout. `Swapped` corrects for that while transforming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromaOrder {
    #[default]
    Standard,
    Swapped,
}

impl FromStr for ChromaOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ChromaOrder::Standard),
            "swapped" => Ok(ChromaOrder::Swapped),
            other => Err(format!(
                "unknown chroma order '{}', expected standard or swapped",
                other
            )),
        }
    }
}

/// Per-frame orientation correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Orientation {
    pub rotation: Rotation,
    pub chroma_order: ChromaOrder,
}

impl Orientation {
    pub fn new(rotation: Rotation, chroma_order: ChromaOrder) -> Self {
        Self {
            rotation,
            chroma_order,
        }
    }

    /// Whether applying this orientation leaves the buffer unchanged
    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation::None && self.chroma_order == ChromaOrder::Standard
    }
}
