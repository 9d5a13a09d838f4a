// SPDX-License-Identifier: GPL-3.0-only
//! Shader sources and program checks
//!
//! The presentation shader is the single source of truth for the colour
//! conversion on the GPU. `crate::color` mirrors it on the CPU.

pub mod program;

pub use program::{ProgramInterface, check_program};

/// Planar YUV presentation program (WGSL)
/// Entry points: vs_main, fs_main
/// Bindings (group 0): tex_y, tex_u, tex_v, plane_sampler
pub const YUV_PRESENT_SHADER: &str = include_str!("yuv_present.wgsl");
