use std::fmt;
use std::str::FromStr;

use crate::compile::DEFAULT_FRAGMENT_SOURCE;
use crate::runtime::DEFAULT_REFRESH_RATE;

/// Adapter selection hint passed to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

impl FromStr for GpuPowerPreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            other => Err(format!("unknown GPU power preference '{other}' (expected low or high)")),
        }
    }
}

impl fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Preview surface size in physical pixels; fixed for the session.
    pub surface_size: (u32, u32),
    /// Refresh cadence the clock and the frame pacer assume.
    pub refresh_rate: f32,
    /// Fragment source compiled on start-up.
    pub initial_source: String,
    /// Recompile as soon as new source text arrives.
    pub auto_recompile: bool,
    pub gpu_power: GpuPowerPreference,
    /// Base window title; compile and playback status are appended.
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 800),
            refresh_rate: DEFAULT_REFRESH_RATE,
            initial_source: DEFAULT_FRAGMENT_SOURCE.to_string(),
            auto_recompile: true,
            gpu_power: GpuPowerPreference::default(),
            title: "shaderpad".to_string(),
        }
    }
}
