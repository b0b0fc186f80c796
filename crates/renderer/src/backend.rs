//! Seam between the pipeline manager and the GPU API.
//!
//! The manager and the render loop only speak to the device through
//! [`GpuBackend`], which keeps compile-state handling and time bookkeeping
//! independent of `wgpu` and exercisable without a GPU.

use crate::compile::{CompileError, ShaderProgram};
use crate::uniforms::UniformBlock;

/// Device-side operations needed to compile and draw a shader.
///
/// An implementation owns the device, the command queue and the single
/// uniform buffer for its whole lifetime.
pub trait GpuBackend {
    /// Compiled render pipeline bound to the fixed output format.
    type Pipeline;
    /// Per-frame drawable handed over by the host surface.
    type Frame;

    /// Assembles a pipeline from a validated program.
    ///
    /// Failures must be reported as [`CompileError::PipelineAssembly`] and must
    /// not leave the backend unusable.
    fn create_pipeline(&mut self, program: &ShaderProgram) -> Result<Self::Pipeline, CompileError>;

    /// Overwrites the uniform buffer with `block`.
    fn write_uniforms(&mut self, block: &UniformBlock);

    /// Draws the full-screen quad with `pipeline` into `frame`, submits the
    /// commands and presents.
    fn submit(&mut self, pipeline: &Self::Pipeline, frame: Self::Frame);
}
