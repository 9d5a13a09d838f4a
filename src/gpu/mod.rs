// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities
//!
//! Helpers for creating the wgpu instance, picking an adapter and opening a
//! device for the streaming renderer. The async functions are driven with
//! `pollster::block_on` on the render thread.

mod resources;

pub use resources::{CachedDimensions, padded_bytes_per_row, read_buffer_async};

use crate::errors::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Adapter power preference, as stored in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    LowPower,
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(preference: PowerPreference) -> Self {
        match preference {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Create a wgpu instance for all backends available on this platform
pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Pick an adapter, optionally one that can present to `surface`
pub async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
    preference: PowerPreference,
) -> RenderResult<wgpu::Adapter> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: preference.into(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::InitFailed(format!("no suitable GPU adapter: {}", e)))?;

    let adapter_info = adapter.get_info();
    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected"
    );

    Ok(adapter)
}

/// Open a device and queue on the adapter
pub async fn create_device(
    adapter: &wgpu::Adapter,
    label: &str,
) -> RenderResult<(wgpu::Device, wgpu::Queue, GpuDeviceInfo)> {
    info!(label = label, "Creating GPU device");

    let adapter_info = adapter.get_info();
    debug!(
        device_type = ?adapter_info.device_type,
        driver = %adapter_info.driver,
        driver_info = %adapter_info.driver_info,
        "Adapter driver"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| RenderError::InitFailed(format!("failed to create GPU device: {}", e)))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name,
        backend: adapter_info.backend,
    };

    Ok((device, queue, info))
}

/// List every adapter the instance can see
pub fn list_adapters(instance: &wgpu::Instance) -> Vec<wgpu::AdapterInfo> {
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .map(|adapter| adapter.get_info())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_device() {
        // This test requires a GPU, so it may be skipped in CI
        let instance = create_instance();
        let adapter = match request_adapter(&instance, None, PowerPreference::LowPower).await {
            Ok(adapter) => adapter,
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
                return;
            }
        };
        match create_device(&adapter, "test_device").await {
            Ok((device, queue, info)) => {
                println!("Created device: {:?}", info);
                assert!(!info.adapter_name.is_empty());
                drop(queue);
                drop(device);
            }
            Err(e) => println!("Skipping test (device creation failed): {}", e),
        }
    }

    #[test]
    fn test_power_preference_serde() {
        let json = serde_json::to_string(&PowerPreference::HighPerformance).unwrap();
        assert_eq!(json, "\"high-performance\"");
    }
}
