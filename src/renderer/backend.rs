// SPDX-License-Identifier: GPL-3.0-only

//! The seam between the render loop and the GPU

use super::RendererConfig;
use super::viewport::Viewport;
use crate::errors::RenderResult;

/// The three planes of one frame, borrowed from the upload buffer
#[derive(Debug, Clone, Copy)]
pub struct FramePlanes<'a> {
    pub width: u32,
    pub height: u32,
    /// Full resolution luma
    pub y: &'a [u8],
    /// Half resolution U
    pub u: &'a [u8],
    /// Half resolution V
    pub v: &'a [u8],
}

/// Packed RGBA pixels read back from the render target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// GPU work performed by the render thread
///
/// A backend is created on the render thread and never leaves it. All its
/// resources are released when it is dropped there.
pub trait RenderBackend: Sized + 'static {
    /// What the host hands over when the drawable surface is acquired
    type Surface: Send + 'static;

    /// Create every GPU resource: context, program, textures, quad geometry
    ///
    /// Any failure is fatal and reported as `RenderError::InitFailed`.
    fn create(surface: Self::Surface, config: &RendererConfig) -> RenderResult<Self>;

    /// Current surface size in pixels
    fn surface_size(&self) -> (u32, u32);

    /// The host resized the drawable surface
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Upload the planes of one frame into the plane textures
    fn upload(&mut self, planes: &FramePlanes<'_>) -> RenderResult<()>;

    /// Clear the target and, with a viewport, draw the uploaded frame into it
    fn draw(&mut self, viewport: Option<Viewport>) -> RenderResult<()>;

    /// Read the last drawn image back, for targets that support it
    fn read_back(&mut self) -> RenderResult<Option<Snapshot>> {
        Ok(None)
    }
}
