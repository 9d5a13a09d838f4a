// SPDX-License-Identifier: GPL-3.0-only

//! Streaming renderer
//!
//! Displays a stream of planar 4:2:0 frames on a GPU surface. A producer
//! thread delivers frames with [`StreamingRenderer::deliver_frame`]; the
//! host asks for draws with [`StreamingRenderer::request_draw`]. A dedicated
//! render thread owns the [`RenderBackend`] and performs every GPU call.
//!
//! State machine:
//!
//! ```text
//! Uninitialized --initialize--> SurfaceReady --deliver--> HasFrame --draw--> HasFrame
//!       any --teardown--> Destroyed (further calls are no-ops)
//! ```
//!
//! Only the most recent frame is kept. A draw uploads it if it changed
//! since the previous upload, then draws the quad once.

pub mod backend;
mod render_loop;
mod slot;
mod textures;
pub mod viewport;
mod wgpu_backend;

pub use backend::{FramePlanes, RenderBackend, Snapshot};
pub use viewport::{Viewport, ViewportMode, compute_viewport};
pub use wgpu_backend::{RenderTarget, WgpuBackend, WgpuSurface};

use crate::constants::SLOW_CYCLE_MS;
use crate::errors::{RenderError, RenderResult};
use crate::frame::{FrameGeometry, Layout};
use crate::gpu::PowerPreference;
use render_loop::{Command, LoopAction, RenderLoopController};
use serde::{Deserialize, Serialize};
use slot::{FrameBuffer, FrameSlot};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RendererState {
    Uninitialized = 0,
    SurfaceReady = 1,
    HasFrame = 2,
    Destroyed = 3,
}

impl RendererState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RendererState::Uninitialized,
            1 => RendererState::SurfaceReady,
            2 => RendererState::HasFrame,
            _ => RendererState::Destroyed,
        }
    }
}

/// Presentation mode preference for window surfaces
///
/// Falls back to `Fifo` when the surface does not support the preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentMode {
    #[default]
    Fifo,
    Mailbox,
    Immediate,
    AutoVsync,
}

impl From<PresentMode> for wgpu::PresentMode {
    fn from(mode: PresentMode) -> Self {
        match mode {
            PresentMode::Fifo => wgpu::PresentMode::Fifo,
            PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
            PresentMode::Immediate => wgpu::PresentMode::Immediate,
            PresentMode::AutoVsync => wgpu::PresentMode::AutoVsync,
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// How the frame is fitted to the surface
    pub viewport_mode: ViewportMode,
    /// Colour outside the viewport (RGBA, 0..1)
    pub clear_color: [f64; 4],
    pub present_mode: PresentMode,
    pub power_preference: PowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport_mode: ViewportMode::Fill,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            present_mode: PresentMode::Fifo,
            power_preference: PowerPreference::LowPower,
        }
    }
}

type ErrorHandler = Box<dyn Fn(&RenderError) + Send + Sync>;

/// State shared between the host, the producer and the render thread
struct Shared {
    state: AtomicU8,
    slot: FrameSlot,
    on_error: Option<ErrorHandler>,
}

impl Shared {
    fn state(&self) -> RendererState {
        RendererState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn is_destroyed(&self) -> bool {
        self.state() == RendererState::Destroyed
    }

    /// Move to `next` unless teardown already happened
    fn enter(&self, next: RendererState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != RendererState::Destroyed as u8).then_some(next as u8)
            })
            .is_ok()
    }

    /// Move from `from` to `to`; no change from any other state
    fn advance(&self, from: RendererState, to: RendererState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn report(&self, err: RenderError) {
        warn!(error = %err, "Render cycle failed");
        if let Some(handler) = &self.on_error {
            handler(&err);
        }
    }
}

/// Render thread state: the backend plus the private upload buffer
struct RenderWorker<B: RenderBackend> {
    backend: B,
    shared: Arc<Shared>,
    viewport_mode: ViewportMode,
    upload: FrameBuffer,
    /// Whether `upload` is what the plane textures currently hold
    uploaded: bool,
}

impl<B: RenderBackend> RenderWorker<B> {
    fn new(backend: B, shared: Arc<Shared>, viewport_mode: ViewportMode) -> Self {
        Self {
            backend,
            shared,
            viewport_mode,
            upload: FrameBuffer::default(),
            uploaded: false,
        }
    }

    fn handle(&mut self, command: Command) -> LoopAction {
        if self.shared.is_destroyed() {
            debug!(?command, "Renderer destroyed, dropping command");
            return LoopAction::Stop;
        }

        match command {
            Command::Draw => {
                if let Err(e) = self.draw_cycle() {
                    self.shared.report(e);
                }
            }
            Command::Resize { width, height } => {
                debug!(width, height, "Resizing render surface");
                if let Err(e) = self.backend.resize(width, height) {
                    self.shared.report(e);
                }
            }
            Command::Sync(reply) => {
                let _ = reply.send(());
            }
            Command::ReadBack(reply) => {
                let _ = reply.send(self.backend.read_back());
            }
            Command::Shutdown => return LoopAction::Stop,
        }

        LoopAction::Continue
    }

    /// One upload + draw; aborts quietly if teardown lands mid-cycle
    fn draw_cycle(&mut self) -> RenderResult<()> {
        let started = Instant::now();

        if self.shared.slot.take_newer(&mut self.upload) {
            self.uploaded = false;
        }

        if !self.uploaded {
            if let Some(planes) = self.upload.planes() {
                if self.shared.is_destroyed() {
                    return Ok(());
                }
                self.backend.upload(&planes)?;
                self.uploaded = true;
                trace!(generation = self.upload.generation(), "Frame uploaded");
            }
        }

        if self.shared.is_destroyed() {
            return Ok(());
        }

        let viewport = if self.uploaded {
            self.upload.dimensions().map(|frame| {
                compute_viewport(self.viewport_mode, self.backend.surface_size(), frame)
            })
        } else {
            None
        };
        self.backend.draw(viewport)?;

        let elapsed = started.elapsed().as_millis();
        if elapsed > SLOW_CYCLE_MS {
            debug!(elapsed_ms = elapsed, "Slow render cycle");
        }
        Ok(())
    }
}

impl<B: RenderBackend> Drop for RenderWorker<B> {
    fn drop(&mut self) {
        self.shared.slot.restore(&mut self.upload);
    }
}

/// Streams frames from a producer to a GPU surface
///
/// All methods take `&self`, so one renderer can be shared between the
/// producer thread and the host behind an `Arc`.
pub struct StreamingRenderer<B: RenderBackend> {
    shared: Arc<Shared>,
    config: RendererConfig,
    controller: Mutex<Option<RenderLoopController>>,
    _backend: PhantomData<fn() -> B>,
}

impl<B: RenderBackend> StreamingRenderer<B> {
    /// Create an uninitialized renderer
    pub fn new(config: RendererConfig) -> Self {
        Self::build(config, None)
    }

    /// Create an uninitialized renderer that reports per-frame GPU errors
    ///
    /// The handler runs on the render thread.
    pub fn with_error_handler<F>(config: RendererConfig, handler: F) -> Self
    where
        F: Fn(&RenderError) + Send + Sync + 'static,
    {
        Self::build(config, Some(Box::new(handler)))
    }

    fn build(config: RendererConfig, on_error: Option<ErrorHandler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(RendererState::Uninitialized as u8),
                slot: FrameSlot::default(),
                on_error,
            }),
            config,
            controller: Mutex::new(None),
            _backend: PhantomData,
        }
    }

    pub fn state(&self) -> RendererState {
        self.shared.state()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn lock_controller(&self) -> MutexGuard<'_, Option<RenderLoopController>> {
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate for calls that need an initialized surface
    ///
    /// `Ok(false)` means the renderer is torn down and the call is a no-op.
    fn ready(&self) -> RenderResult<bool> {
        match self.state() {
            RendererState::Destroyed => Ok(false),
            RendererState::Uninitialized => Err(RenderError::SurfaceNotReady),
            RendererState::SurfaceReady | RendererState::HasFrame => Ok(true),
        }
    }

    fn send(&self, command: Command) -> RenderResult<()> {
        let controller = self.lock_controller();
        match controller.as_ref() {
            Some(c) if c.is_running() && c.send(command) => Ok(()),
            Some(_) => Err(RenderError::Gpu("render thread is not running".to_string())),
            None if self.shared.is_destroyed() => Ok(()),
            None => Err(RenderError::SurfaceNotReady),
        }
    }

    /// Acquire GPU resources for a surface and start the render thread
    ///
    /// Blocks until the backend is created. On failure the renderer stays
    /// uninitialized and may be initialized again with a fresh surface.
    /// Initializing an already initialized renderer replaces its surface;
    /// the latest delivered frame is kept.
    ///
    /// The controller lock is never held while a render thread is joined or
    /// a backend is created, so the error handler may call
    /// [`teardown`](Self::teardown) at any point.
    pub fn initialize(&self, surface: B::Surface) -> RenderResult<()> {
        if self.shared.is_destroyed() {
            return Ok(());
        }

        let previous = self.lock_controller().take();
        if let Some(mut previous) = previous {
            info!("Replacing render surface");
            previous.stop();
            self.shared.enter(RendererState::Uninitialized);
        }
        if self.shared.is_destroyed() {
            debug!("Renderer torn down while replacing surface");
            return Ok(());
        }

        let config = self.config.clone();
        let shared = Arc::clone(&self.shared);
        let started = RenderLoopController::start_with_init(
            "yuvplay-render",
            move || {
                let backend = B::create(surface, &config)?;
                Ok(RenderWorker::new(backend, shared, config.viewport_mode))
            },
            |worker: &mut RenderWorker<B>, command| worker.handle(command),
        );

        let started = match started {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Renderer initialization failed");
                return Err(e);
            }
        };

        // Stopped after the lock is released
        let stale = {
            let mut controller = self.lock_controller();
            if self.shared.is_destroyed() {
                Some(started)
            } else {
                let replaced = controller.replace(started);
                let next = if self.shared.slot.has_frame() {
                    RendererState::HasFrame
                } else {
                    RendererState::SurfaceReady
                };
                if self.shared.enter(next) {
                    info!(state = ?next, "Renderer initialized");
                }
                replaced
            }
        };

        if let Some(mut stale) = stale {
            debug!("Stopping superseded render thread");
            stale.stop();
        }
        Ok(())
    }

    /// Hand over an I420 frame
    pub fn deliver_frame(&self, buffer: &[u8], width: u32, height: u32) -> RenderResult<()> {
        self.deliver_frame_with_layout(buffer, width, height, Layout::I420)
    }

    /// Hand over a frame of any 4:2:0 layout
    ///
    /// The bytes are copied; the caller keeps ownership of `buffer`. Only
    /// the latest frame is kept until the next draw.
    pub fn deliver_frame_with_layout(
        &self,
        buffer: &[u8],
        width: u32,
        height: u32,
        layout: Layout,
    ) -> RenderResult<()> {
        if !self.ready()? {
            return Ok(());
        }

        let geometry = FrameGeometry::for_buffer(width, height, buffer.len())?;
        let generation = self.shared.slot.store(buffer, geometry, layout)?;
        self.shared
            .advance(RendererState::SurfaceReady, RendererState::HasFrame);

        trace!(generation, width, height, %layout, "Frame delivered");
        Ok(())
    }

    /// Ask the render thread to upload the latest frame and draw
    ///
    /// Returns immediately. GPU errors of the cycle go to the error handler.
    pub fn request_draw(&self) -> RenderResult<()> {
        if !self.ready()? {
            return Ok(());
        }
        self.send(Command::Draw)
    }

    /// Forward a host surface size change
    pub fn resize(&self, width: u32, height: u32) -> RenderResult<()> {
        if !self.ready()? {
            return Ok(());
        }
        self.send(Command::Resize { width, height })
    }

    /// Block until every command queued so far has been handled
    pub fn wait_idle(&self) -> RenderResult<()> {
        if !self.ready()? {
            return Ok(());
        }
        let (reply, done) = mpsc::channel();
        self.send(Command::Sync(reply))?;
        // A closed channel means the loop stopped, which is idle too
        let _ = done.recv();
        Ok(())
    }

    /// Read the render target back, if the backend supports it
    pub fn read_back(&self) -> RenderResult<Option<Snapshot>> {
        if !self.ready()? {
            return Ok(None);
        }
        let (reply, result) = mpsc::channel();
        self.send(Command::ReadBack(reply))?;
        result.recv().unwrap_or(Ok(None))
    }

    /// Release every GPU resource and stop the render thread
    ///
    /// Safe from any thread, including the render thread itself through the
    /// error handler. Every later call is a no-op.
    pub fn teardown(&self) {
        let previous = RendererState::from_u8(
            self.shared
                .state
                .swap(RendererState::Destroyed as u8, Ordering::SeqCst),
        );
        if previous != RendererState::Destroyed {
            info!(from = ?previous, "Tearing down renderer");
        }

        let controller = self.lock_controller().take();
        if let Some(mut c) = controller {
            c.stop();
        }
    }
}

impl<B: RenderBackend> Drop for StreamingRenderer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
