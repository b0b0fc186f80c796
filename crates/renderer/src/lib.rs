//! Renderer crate for shaderpad, a live WGSL fragment shader sandbox.
//!
//! The crate compiles editor text into a `wgpu` pipeline and animates it on a
//! full-screen quad. The overall flow is:
//!
//! ```text
//!   CLI / shaderpad
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ RenderLoopDriver::tick()
//!          ▲                │                                   │
//!   ControlHandle ──────────┘ SandboxCommand                    └─▶ GpuBackend ─▶ present
//! ```
//!
//! [`ShaderPipelineManager`] owns the source text, the compile state and the
//! playback clock. [`RenderLoopDriver`] borrows it once per refresh to advance
//! time, write the `env` uniform block and draw. Both are generic over
//! [`GpuBackend`], so everything except the window itself runs without a GPU.

mod backend;
mod compile;
mod gpu;
mod manager;
mod runtime;
mod speed;
mod types;
mod uniforms;
mod window;

use anyhow::Result;

pub use backend::GpuBackend;
pub use compile::{
    build_program, compose_program, CompileError, ShaderProgram, DEFAULT_FRAGMENT_SOURCE,
    FRAGMENT_ENTRY, PREAMBLE, VERTEX_ENTRY,
};
pub use gpu::WgpuBackend;
pub use manager::{
    CompileState, PlaybackState, ShaderPipelineManager, StateSnapshot, SubscriptionId,
};
pub use runtime::{FramePacer, RenderLoopDriver, TickOutcome, DEFAULT_REFRESH_RATE};
pub use speed::SpeedMapper;
pub use types::{GpuPowerPreference, RendererConfig};
pub use uniforms::UniformBlock;
pub use window::{ControlHandle, SandboxCommand};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the preview window and blocks until it is closed.
    ///
    /// `setup` receives a [`ControlHandle`] once the event loop exists, which
    /// lets callers feed source text or playback commands from other threads.
    /// Whatever it returns is dropped after the loop exits.
    pub fn run<G, F>(self, setup: F) -> Result<()>
    where
        F: FnOnce(ControlHandle) -> Result<G>,
    {
        window::run(self.config, setup)
    }
}
