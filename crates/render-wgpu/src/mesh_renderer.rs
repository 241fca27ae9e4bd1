use std::cell::Cell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use tessera_render::TessellationSettings;
use tessera_render::factors::workgroup_count;

use crate::RendererError;
use crate::context::GpuContext;
use crate::mesh::TessellatedMesh;
use crate::scene::FramebufferDescriptor;
use crate::shaders;

/// Per-frame work of one drawable registered with the scene.
///
/// `update` records work that must precede the scene's render pass, `draw`
/// records into that pass. The scene calls every `update` before any `draw`.
pub trait MeshRenderer {
    fn update(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder);
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FactorParams {
    edge: f32,
    inside: f32,
    patch_count: u32,
    max_factor: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    spherify: u32,
    index_format: u32,
    max_level: u32,
    _pad: u32,
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

/// Run `build` inside a validation error scope, turning a captured error
/// into [`RendererError::PipelineBuild`].
fn capture_pipeline<T>(ctx: &GpuContext, label: &str, build: impl FnOnce() -> T) -> Result<T, RendererError> {
    ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let built = build();
    match pollster::block_on(ctx.device.pop_error_scope()) {
        Some(err) => {
            tracing::error!(pipeline = label, "pipeline build failed: {err}");
            Err(RendererError::PipelineBuild {
                label: label.to_string(),
                message: err.to_string(),
            })
        }
        None => Ok(built),
    }
}

/// Computes tessellation factors for a [`TessellatedMesh`] and draws it as
/// one patch expansion draw.
///
/// Tunables live in a [`Cell`] so UI code can change them through the shared
/// handle the scene holds.
pub struct TessellatedMeshRenderer {
    mesh: Rc<TessellatedMesh>,
    settings: Cell<TessellationSettings>,
    max_factor: u32,
    vertices_per_patch: u32,
    factor_pipeline: wgpu::ComputePipeline,
    fill_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    factor_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
}

impl TessellatedMeshRenderer {
    /// Build the factor and patch pipelines for `mesh`.
    ///
    /// `frame_layout` is the scene's group 0 layout (view-projection, color
    /// ramp, sampler). `max_factor` sizes the per-patch vertex budget and must
    /// be a power of two.
    pub fn new(
        ctx: &GpuContext,
        mesh: Rc<TessellatedMesh>,
        framebuffer: &FramebufferDescriptor,
        frame_layout: &wgpu::BindGroupLayout,
        max_factor: u32,
    ) -> Result<Self, RendererError> {
        let device = &ctx.device;
        let topology = mesh.topology();
        let name = mesh.name().to_string();

        // Factor compute
        let factor_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("factor_bind_group_layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::COMPUTE, false),
                uniform_entry::<FactorParams>(1, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("factor_params"),
            size: std::mem::size_of::<FactorParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let factor_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("factor_bind_group"),
            layout: &factor_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh.factor_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let factor_label = format!("{name}_{}", topology.factor_entry_point());
        let factor_pipeline = capture_pipeline(ctx, &factor_label, || {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("factor_shader"),
                source: wgpu::ShaderSource::Wgsl(shaders::FACTOR_SHADER.into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("factor_pipeline_layout"),
                bind_group_layouts: &[&factor_layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&factor_label),
                layout: Some(&layout),
                module: &module,
                entry_point: Some(topology.factor_entry_point()),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;

        // Patch draw
        let vertex_only = wgpu::ShaderStages::VERTEX;
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bind_group_layout"),
            entries: &[
                uniform_entry::<DrawUniforms>(0, vertex_only),
                storage_entry(1, vertex_only, true),
                storage_entry(2, vertex_only, true),
                storage_entry(3, vertex_only, true),
            ],
        });
        let draw_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: std::mem::size_of::<DrawUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: draw_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: mesh.control_point_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: mesh.control_index_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: mesh.factor_buffer().as_entire_binding(),
                },
            ],
        });

        let patch_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("patch_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PATCH_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("patch_pipeline_layout"),
            bind_group_layouts: &[frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let patch_pipeline = |label: &str, polygon_mode: wgpu::PolygonMode, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &patch_module,
                    entry_point: Some(topology.vertex_entry_point()),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &patch_module,
                    entry_point: Some(fragment),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: framebuffer.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: framebuffer.depth_stencil_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: framebuffer.sample_count,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            })
        };

        let fill_label = format!("{name}_{}_fill", topology.vertex_entry_point());
        let fill_pipeline = capture_pipeline(ctx, &fill_label, || {
            patch_pipeline(&fill_label, wgpu::PolygonMode::Fill, "fs_main")
        })?;

        let wireframe_label = format!("{name}_{}_wireframe", topology.vertex_entry_point());
        let wireframe_pipeline = capture_pipeline(ctx, &wireframe_label, || {
            if ctx.supports_line_mode() {
                patch_pipeline(&wireframe_label, wgpu::PolygonMode::Line, "fs_main")
            } else {
                patch_pipeline(&wireframe_label, wgpu::PolygonMode::Fill, "fs_wireframe")
            }
        })?;

        tracing::debug!(
            mesh = %name,
            factor_entry = topology.factor_entry_point(),
            vertex_entry = topology.vertex_entry_point(),
            line_mode = ctx.supports_line_mode(),
            "mesh renderer pipelines built"
        );

        Ok(Self {
            vertices_per_patch: topology.vertices_per_patch(max_factor),
            mesh,
            settings: Cell::new(TessellationSettings::default()),
            max_factor,
            factor_pipeline,
            fill_pipeline,
            wireframe_pipeline,
            params_buffer,
            factor_bind_group,
            draw_buffer,
            draw_bind_group,
        })
    }

    pub fn mesh(&self) -> &Rc<TessellatedMesh> {
        &self.mesh
    }

    pub fn settings(&self) -> TessellationSettings {
        self.settings.get()
    }

    pub fn set_settings(&self, settings: TessellationSettings) {
        self.settings.set(settings);
    }

    pub fn max_factor(&self) -> u32 {
        self.max_factor
    }

    /// Vertices emitted per patch instance.
    pub fn vertices_per_patch(&self) -> u32 {
        self.vertices_per_patch
    }
}

impl MeshRenderer for TessellatedMeshRenderer {
    fn update(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder) {
        let settings = self.settings.get();
        let patch_count = self.mesh.patch_count();

        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&FactorParams {
                edge: settings.edge_factor,
                inside: settings.inside_factor,
                patch_count,
                max_factor: self.max_factor as f32,
            }),
        );
        queue.write_buffer(
            &self.draw_buffer,
            0,
            bytemuck::bytes_of(&DrawUniforms {
                model: self.mesh.model_transform().to_cols_array_2d(),
                spherify: settings.spherify as u32,
                index_format: self.mesh.index_format().map_or(0, |f| f.shader_code()),
                max_level: self.max_factor,
                _pad: 0,
            }),
        );

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("tess_factor_pass"),
            timestamp_writes: None,
        });
        pass.push_debug_group("Compute Tessellation Factors");
        pass.set_pipeline(&self.factor_pipeline);
        pass.set_bind_group(0, &self.factor_bind_group, &[]);
        pass.dispatch_workgroups(workgroup_count(patch_count), 1, 1);
        pass.pop_debug_group();
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let pipeline = if self.settings.get().wireframe {
            &self.wireframe_pipeline
        } else {
            &self.fill_pipeline
        };
        pass.push_debug_group("Draw Patches");
        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, &self.draw_bind_group, &[]);
        pass.draw(0..self.vertices_per_patch, 0..self.mesh.patch_count());
        pass.pop_debug_group();
    }
}
