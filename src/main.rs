// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yuvplay::renderer::ViewportMode;
use yuvplay::{ChromaOrder, Config, Layout, Rotation};

mod cli;

#[derive(Parser)]
#[command(name = "yuvplay")]
#[command(about = "Convert, rotate and render raw 4:2:0 camera frames")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/yuvplay/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments describing a raw input file
#[derive(clap::Args)]
struct InputArgs {
    /// Raw frame file (frames back to back, no header)
    #[arg(short, long)]
    input: PathBuf,

    /// Frame width in pixels
    #[arg(long)]
    width: u32,

    /// Frame height in pixels
    #[arg(long)]
    height: u32,

    /// Input layout: nv21, nv12, i420, yv12 (default from config)
    #[arg(short, long)]
    layout: Option<Layout>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert frames between layouts
    Convert {
        #[command(flatten)]
        input: InputArgs,

        /// Output layout
        #[arg(long)]
        to: Layout,

        /// Output raw file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate frames and optionally change layout
    Rotate {
        #[command(flatten)]
        input: InputArgs,

        /// Clockwise degrees (0, 90, 180, 270) or cw / ccw
        #[arg(short, long)]
        rotation: Option<Rotation>,

        /// Chroma order of the sensor: standard or swapped
        #[arg(long)]
        chroma_order: Option<ChromaOrder>,

        /// Output layout (default: same as input)
        #[arg(long)]
        to: Option<Layout>,

        /// Output raw file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Swap U and V in every frame
    SwapUv {
        #[command(flatten)]
        input: InputArgs,

        /// Output raw file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render one frame through the GPU pipeline to a PNG
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Zero-based frame index
        #[arg(short, long, default_value = "0")]
        frame: u64,

        /// Clockwise degrees (0, 90, 180, 270) or cw / ccw
        #[arg(short, long)]
        rotation: Option<Rotation>,

        /// Chroma order of the sensor: standard or swapped
        #[arg(long)]
        chroma_order: Option<ChromaOrder>,

        /// Surface width (default from config)
        #[arg(long)]
        surface_width: Option<u32>,

        /// Surface height (default from config)
        #[arg(long)]
        surface_height: Option<u32>,

        /// fill or letterbox (default from config)
        #[arg(long)]
        viewport: Option<ViewportMode>,

        /// Skip the GPU and convert on the CPU
        #[arg(long)]
        cpu: bool,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List GPU adapters
    Adapters,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=yuvplay=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Convert { input, to, output } => {
            let layout = input.layout.unwrap_or(config.layout);
            cli::convert(&input.input, &output, input.width, input.height, layout, to)?;
        }
        Commands::Rotate {
            input,
            rotation,
            chroma_order,
            to,
            output,
        } => {
            let layout = input.layout.unwrap_or(config.layout);
            let orientation = cli::orientation(&config, rotation, chroma_order);
            cli::rotate(
                &input.input,
                &output,
                input.width,
                input.height,
                layout,
                orientation,
                to.unwrap_or(layout),
            )?;
        }
        Commands::SwapUv { input, output } => {
            let layout = input.layout.unwrap_or(config.layout);
            cli::swap_uv(&input.input, &output, input.width, input.height, layout)?;
        }
        Commands::Render {
            input,
            frame,
            rotation,
            chroma_order,
            surface_width,
            surface_height,
            viewport,
            cpu,
            output,
        } => {
            let mut renderer = config.renderer.clone();
            if let Some(mode) = viewport {
                renderer.viewport_mode = mode;
            }
            cli::render(cli::RenderOptions {
                input: input.input,
                width: input.width,
                height: input.height,
                layout: input.layout.unwrap_or(config.layout),
                orientation: cli::orientation(&config, rotation, chroma_order),
                frame_index: frame,
                surface: (
                    surface_width.unwrap_or(config.surface_width),
                    surface_height.unwrap_or(config.surface_height),
                ),
                renderer,
                cpu_only: cpu,
                output,
            })?;
        }
        Commands::Adapters => cli::list_adapters(),
    }

    Ok(())
}
