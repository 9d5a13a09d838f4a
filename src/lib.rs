// SPDX-License-Identifier: GPL-3.0-only

//! yuvplay - raw camera frame transforms and a GPU streaming renderer
//!
//! Camera sensors deliver frames in 4:2:0 YUV layouts (NV21, NV12, I420,
//! YV12), often mounted at an angle and sometimes with the chroma channels
//! swapped. This crate corrects those frames on the CPU and streams them to
//! a GPU surface that converts them to RGB for display.
//!
//! # Architecture
//!
//! - [`frame`]: frame geometry and plane layouts
//! - [`transform`]: layout conversion, rotation and chroma swaps
//! - [`renderer`]: the threaded streaming renderer and its wgpu backend
//! - [`color`]: CPU reference of the colour conversion
//! - [`shaders`]: WGSL presentation program and interface checks
//! - [`gpu`]: wgpu instance, adapter and device setup
//! - [`media`]: raw frame files and PNG output
//! - [`config`]: persisted settings
//!
//! # Example
//!
//! ```no_run
//! use yuvplay::renderer::{RendererConfig, StreamingRenderer, WgpuBackend, WgpuSurface};
//!
//! # fn main() -> Result<(), yuvplay::errors::RenderError> {
//! let renderer = StreamingRenderer::<WgpuBackend>::new(RendererConfig::default());
//! renderer.initialize(WgpuSurface::offscreen(640, 480))?;
//! renderer.deliver_frame(&vec![128u8; 640 * 480 * 3 / 2], 640, 480)?;
//! renderer.request_draw()?;
//! renderer.wait_idle()?;
//! renderer.teardown();
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod gpu;
pub mod media;
pub mod renderer;
pub mod shaders;
pub mod transform;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, RenderError, TransformError};
pub use frame::{FrameGeometry, Layout, YuvFrame};
pub use renderer::{RendererConfig, RendererState, StreamingRenderer};
pub use transform::{ChromaOrder, Direction, Orientation, Rotation};
