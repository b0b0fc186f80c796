use crate::backend::GpuBackend;
use crate::compile::{CompileError, ShaderProgram};
use crate::uniforms::UniformBlock;

use super::context::GpuContext;
use super::pipeline::{
    create_quad_buffer, create_render_pipeline, PipelineLayouts, QUAD_VERTEX_COUNT,
};

/// `wgpu` implementation of [`GpuBackend`].
///
/// Device and queue are cloned handles of the window's [`GpuContext`]; the
/// uniform buffer, its bind group and the quad vertex buffer are created once
/// and reused by every pipeline.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    quad_buffer: wgpu::Buffer,
}

impl WgpuBackend {
    pub(crate) fn new(context: &GpuContext) -> Self {
        let device = context.device.clone();
        let queue = context.queue.clone();
        let layouts = PipelineLayouts::new(&device);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("env uniform buffer"),
            size: UniformBlock::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("env uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let quad_buffer = create_quad_buffer(&device);

        Self {
            device,
            queue,
            format: context.surface_format,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            quad_buffer,
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Pipeline = wgpu::RenderPipeline;
    type Frame = wgpu::SurfaceTexture;

    fn create_pipeline(&mut self, program: &ShaderProgram) -> Result<Self::Pipeline, CompileError> {
        create_render_pipeline(&self.device, &self.layouts, self.format, program)
    }

    fn write_uniforms(&mut self, block: &UniformBlock) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(block));
    }

    fn submit(&mut self, pipeline: &Self::Pipeline, frame: Self::Frame) {
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
