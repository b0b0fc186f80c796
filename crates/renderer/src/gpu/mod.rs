//! `wgpu` side of the renderer.
//!
//! - `context` owns instance/surface/device wiring for the preview window and
//!   hands out one drawable per refresh.
//! - `pipeline` holds the shared layouts, the static full-screen quad and the
//!   error-scoped pipeline construction.
//! - `state` implements [`crate::GpuBackend`] on top of both.

mod context;
mod pipeline;
mod state;

pub(crate) use context::GpuContext;
pub use state::WgpuBackend;
