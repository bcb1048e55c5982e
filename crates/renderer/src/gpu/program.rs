use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::compile::{CompileError, CompiledStages};

use super::context::{GpuContext, QuadVertex};
use super::uniforms::UniformBlock;

/// A linked pipeline with its own uniform block and bind group.
pub(crate) struct Program {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniforms: UniformBlock,
}

impl Program {
    /// Creates the GPU objects for already validated stages. Anything wgpu
    /// rejects is captured by a validation error scope and reported as a link
    /// error; partially created objects are dropped on the way out.
    pub(crate) fn link(gpu: &GpuContext, stages: &CompiledStages) -> Result<Self, CompileError> {
        let device = &gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gallery vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(stages.vertex.as_str()),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gallery fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(stages.fragment.as_str()),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });

        let uniforms = UniformBlock::new(device, stages.handles);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gallery uniform bind group"),
            layout: &gpu.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.buffer().as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gallery pipeline layout"),
            bind_group_layouts: &[&gpu.uniform_layout],
            push_constant_ranges: &[],
        });

        let attributes = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: stages.position_location,
        }];
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gallery pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(CompileError::Link(error.to_string()));
        }

        Ok(Self {
            pipeline,
            bind_group,
            uniforms,
        })
    }

    pub(crate) fn uniforms_mut(&mut self) -> &mut UniformBlock {
        &mut self.uniforms
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>, quad: &wgpu::Buffer) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, quad.slice(..));
        pass.draw(0..4, 0..1);
    }
}
