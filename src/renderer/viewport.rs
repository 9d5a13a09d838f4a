// SPDX-License-Identifier: GPL-3.0-only

//! Where on the surface the frame is drawn

use serde::{Deserialize, Serialize};

/// How the frame is fitted to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportMode {
    /// Stretch over the whole surface
    #[default]
    Fill,
    /// Largest centred rectangle with the frame's aspect ratio
    Letterbox,
}

impl std::str::FromStr for ViewportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fill" => Ok(ViewportMode::Fill),
            "letterbox" | "fit" => Ok(ViewportMode::Letterbox),
            other => Err(format!(
                "unknown viewport mode '{}', expected fill or letterbox",
                other
            )),
        }
    }
}

/// Pixel rectangle inside the surface, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Compute the draw rectangle for a frame on a surface
///
/// Letterboxing fits the width first and derives the height from the frame
/// aspect ratio, truncating at each step; offsets split the slack evenly
/// rounding down.
pub fn compute_viewport(
    mode: ViewportMode,
    surface: (u32, u32),
    frame: (u32, u32),
) -> Viewport {
    let (surface_w, surface_h) = surface;
    let (frame_w, frame_h) = frame;
    let fill = Viewport {
        x: 0,
        y: 0,
        width: surface_w,
        height: surface_h,
    };

    if mode == ViewportMode::Fill || frame_w == 0 || frame_h == 0 {
        return fill;
    }

    let ratio = frame_w as f32 / frame_h as f32;
    let width = if (surface_w as f32 / ratio) as u32 > surface_h {
        (surface_h as f32 * ratio) as u32
    } else {
        surface_w
    };
    let derived_h = (width as f32 / ratio) as u32;
    let height = if derived_h > surface_h {
        surface_h
    } else {
        derived_h
    };

    Viewport {
        x: (surface_w - width) >> 1,
        y: (surface_h - height) >> 1,
        width,
        height,
    }
}
