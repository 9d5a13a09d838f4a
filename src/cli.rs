// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for frame files
//!
//! This module provides command-line functionality for:
//! - Converting, rotating and chroma-swapping raw frame files
//! - Rendering a frame through the GPU pipeline to PNG
//! - Listing GPU adapters

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use yuvplay::errors::{AppError, AppResult, RenderError};
use yuvplay::media::{self, RawFrameReader, RawFrameWriter};
use yuvplay::renderer::{Snapshot, WgpuBackend, WgpuSurface};
use yuvplay::transform::{self, NormalizedFrame};
use yuvplay::{
    ChromaOrder, Config, Layout, Orientation, RendererConfig, Rotation, StreamingRenderer,
    YuvFrame, color, gpu,
};

/// Orientation from command-line overrides, falling back to the config
pub fn orientation(
    config: &Config,
    rotation: Option<Rotation>,
    chroma_order: Option<ChromaOrder>,
) -> Orientation {
    Orientation::new(
        rotation.unwrap_or(config.orientation.rotation),
        chroma_order.unwrap_or(config.orientation.chroma_order),
    )
}

/// Convert every frame of a file to another layout
pub fn convert(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    from: Layout,
    to: Layout,
) -> AppResult<()> {
    let reader = RawFrameReader::open(input, width, height, from)?;
    let mut writer = RawFrameWriter::create(output)?;

    for frame in reader {
        let frame = frame?;
        let data = transform::convert(&frame.data, width, height, from, to)?;
        writer.write_frame(&YuvFrame::new(data, width, height, to)?)?;
    }

    let count = writer.finish()?;
    println!("Converted {} frame(s) from {} to {}", count, from, to);
    Ok(())
}

/// Rotate every frame of a file, optionally changing layout
pub fn rotate(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    layout: Layout,
    orientation: Orientation,
    to: Layout,
) -> AppResult<()> {
    let reader = RawFrameReader::open(input, width, height, layout)?;
    let mut writer = RawFrameWriter::create(output)?;
    let mut out_size = (width, height);

    for frame in reader {
        let frame = frame?;
        let rotated =
            transform::rotate_into_layout(&frame.data, width, height, layout, orientation, to)?;
        out_size = (rotated.width(), rotated.height());
        writer.write_frame(&rotated)?;
    }

    let count = writer.finish()?;
    println!(
        "Rotated {} frame(s) by {} degrees; output is {}x{} {}",
        count, orientation.rotation, out_size.0, out_size.1, to
    );
    Ok(())
}

/// Exchange U and V in every frame of a file
pub fn swap_uv(
    input: &Path,
    output: &Path,
    width: u32,
    height: u32,
    layout: Layout,
) -> AppResult<()> {
    let reader = RawFrameReader::open(input, width, height, layout)?;
    let mut writer = RawFrameWriter::create(output)?;

    for frame in reader {
        let mut frame = frame?;
        if layout.is_semi_planar() {
            transform::swap_chroma_order(&mut frame.data, width, height)?;
        } else {
            transform::swap_chroma_planes(&mut frame.data, width, height)?;
        }
        writer.write_frame(&frame)?;
    }

    let count = writer.finish()?;
    println!("Swapped chroma in {} frame(s)", count);
    Ok(())
}

/// Options for `render`
pub struct RenderOptions {
    pub input: PathBuf,
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
    pub orientation: Orientation,
    pub frame_index: u64,
    pub surface: (u32, u32),
    pub renderer: RendererConfig,
    pub cpu_only: bool,
    pub output: PathBuf,
}

/// Render one frame to PNG, on the GPU when an adapter is available
pub fn render(options: RenderOptions) -> AppResult<()> {
    let mut reader =
        RawFrameReader::open(&options.input, options.width, options.height, options.layout)?;
    reader.skip_frames(options.frame_index)?;
    let frame = reader.read_frame()?.ok_or_else(|| {
        AppError::Other(format!(
            "no frame {} in {}: it holds {} frame(s)",
            options.frame_index,
            options.input.display(),
            reader.frames_read()
        ))
    })?;

    let normalized = transform::normalize(
        &frame.data,
        options.width,
        options.height,
        options.layout,
        options.orientation,
    )?;

    if !options.cpu_only {
        match render_gpu(&normalized, options.surface, options.renderer.clone()) {
            Ok(snapshot) => {
                media::save_png(
                    &options.output,
                    snapshot.width,
                    snapshot.height,
                    snapshot.rgba,
                )?;
                println!("Rendered frame {} to {}", options.frame_index, options.output.display());
                return Ok(());
            }
            Err(AppError::Render(RenderError::InitFailed(msg))) => {
                warn!(error = %msg, "GPU renderer unavailable, converting on the CPU");
            }
            Err(e) => return Err(e),
        }
    }

    let rgba = color::i420_to_rgba(&normalized.data, normalized.width(), normalized.height())?;
    media::save_png(
        &options.output,
        normalized.width(),
        normalized.height(),
        rgba,
    )?;
    println!(
        "Converted frame {} to {} on the CPU",
        options.frame_index,
        options.output.display()
    );
    Ok(())
}

/// Push one frame through the streaming renderer into an offscreen target
fn render_gpu(
    frame: &NormalizedFrame,
    surface: (u32, u32),
    config: RendererConfig,
) -> AppResult<Snapshot> {
    let last_error: Arc<Mutex<Option<RenderError>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last_error);
    let renderer = StreamingRenderer::<WgpuBackend>::with_error_handler(config, move |e| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(e.clone());
        }
    });

    renderer.initialize(WgpuSurface::offscreen(surface.0, surface.1))?;
    renderer.deliver_frame(&frame.data, frame.width(), frame.height())?;
    renderer.request_draw()?;
    renderer.wait_idle()?;

    let failed = last_error.lock().ok().and_then(|mut slot| slot.take());
    if let Some(e) = failed {
        return Err(e.into());
    }

    let snapshot = renderer
        .read_back()?
        .ok_or_else(|| AppError::Other("offscreen target returned no image".to_string()))?;
    renderer.teardown();

    info!(
        width = snapshot.width,
        height = snapshot.height,
        "Frame rendered offscreen"
    );
    Ok(snapshot)
}

/// Print every adapter wgpu can see
pub fn list_adapters() {
    let instance = gpu::create_instance();
    let adapters = gpu::list_adapters(&instance);

    if adapters.is_empty() {
        println!("No GPU adapters found.");
        return;
    }

    println!("Available adapters:");
    println!();
    for (index, info) in adapters.iter().enumerate() {
        println!("  [{}] {}", index, info.name);
        println!(
            "      Backend: {:?}, type: {:?}, driver: {} {}",
            info.backend, info.device_type, info.driver, info.driver_info
        );
    }
}
