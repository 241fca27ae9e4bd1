use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use tessera_assets::TextureData;
use tessera_render::frame::{DEFAULT_ACQUIRE_TIMEOUT, UNIFORM_SLOT_STRIDE};
use tessera_render::{FRAMES_IN_FLIGHT, FlyCamera, FrameRing, FrameThrottle};

use crate::context::GpuContext;
use crate::mesh_renderer::MeshRenderer;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
}

/// Attachment formats and sample count every pipeline in a scene targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferDescriptor {
    pub color_format: wgpu::TextureFormat,
    pub depth_stencil_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl FramebufferDescriptor {
    pub fn new(color_format: wgpu::TextureFormat) -> Self {
        Self {
            color_format,
            depth_stencil_format: wgpu::TextureFormat::Depth24PlusStencil8,
            sample_count: 4,
        }
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Clamp the sample count to what `ctx` supports for both attachments.
    pub fn supported_by(mut self, ctx: &GpuContext) -> Self {
        self.sample_count = ctx.supported_sample_count(
            &[self.color_format, self.depth_stencil_format],
            self.sample_count,
        );
        self
    }
}

struct RenderTargets {
    /// Multisampled color, resolved into the frame's target. `None` at one
    /// sample.
    color: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, framebuffer: &FramebufferDescriptor, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let attachment = |label, format| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: framebuffer.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&Default::default())
        };
        let color = (framebuffer.sample_count > 1)
            .then(|| attachment("msaa_color_target", framebuffer.color_format));
        let depth = attachment("depth_stencil_target", framebuffer.depth_stencil_format);
        Self {
            color,
            depth,
            width,
            height,
        }
    }
}

/// Per-frame orchestration: frame pacing, the view-projection ring, and the
/// update/draw protocol over all registered mesh renderers.
pub struct SceneRenderer {
    pub camera: FlyCamera,
    framebuffer: FramebufferDescriptor,
    clear_color: wgpu::Color,
    acquire_timeout: Duration,
    mesh_renderers: Vec<Rc<dyn MeshRenderer>>,
    throttle: FrameThrottle,
    ring: FrameRing,
    submissions: VecDeque<wgpu::SubmissionIndex>,
    frame_buffer: wgpu::Buffer,
    frame_layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    targets: RenderTargets,
}

impl SceneRenderer {
    pub fn new(
        ctx: &GpuContext,
        framebuffer: FramebufferDescriptor,
        color_ramp: &TextureData,
        width: u32,
        height: u32,
    ) -> Self {
        let device = &ctx.device;
        let ring = FrameRing::new(FRAMES_IN_FLIGHT, UNIFORM_SLOT_STRIDE);
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniform_ring"),
            size: ring.buffer_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniforms>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let ramp_view = ctx.create_texture(color_ramp).create_view(&Default::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("color_ramp_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &frame_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniforms>() as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&ramp_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let targets = RenderTargets::new(device, &framebuffer, width, height);

        tracing::debug!(
            color = ?framebuffer.color_format,
            depth = ?framebuffer.depth_stencil_format,
            samples = framebuffer.sample_count,
            "scene renderer created"
        );

        Self {
            camera: FlyCamera::default(),
            framebuffer,
            clear_color: wgpu::Color::BLACK,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            mesh_renderers: Vec::new(),
            throttle: FrameThrottle::new(FRAMES_IN_FLIGHT),
            ring,
            submissions: VecDeque::with_capacity(FRAMES_IN_FLIGHT + 1),
            frame_buffer,
            frame_layout,
            frame_bind_group,
            targets,
        }
    }

    pub fn framebuffer(&self) -> &FramebufferDescriptor {
        &self.framebuffer
    }

    /// Group 0 layout every mesh pipeline in this scene must share.
    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    pub fn set_clear_color(&mut self, rgba: [f64; 4]) {
        self.clear_color = wgpu::Color {
            r: rgba[0],
            g: rgba[1],
            b: rgba[2],
            a: rgba[3],
        };
    }

    pub fn set_acquire_timeout(&mut self, timeout: Duration) {
        self.acquire_timeout = timeout;
    }

    /// Register a renderer. Draw order follows registration order.
    pub fn add_mesh_renderer(&mut self, renderer: Rc<dyn MeshRenderer>) {
        self.mesh_renderers.push(renderer);
    }

    pub fn mesh_renderers(&self) -> &[Rc<dyn MeshRenderer>] {
        &self.mesh_renderers
    }

    /// Frames submitted whose completion has not been observed.
    pub fn frames_in_flight(&self) -> usize {
        self.throttle.in_flight()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        self.targets = RenderTargets::new(&ctx.device, &self.framebuffer, width, height);
    }

    /// Record, submit and return one frame rendered into `target`.
    ///
    /// `target` must match the framebuffer's color format and the scene's
    /// size. Presentation is left to the caller.
    pub fn render_frame(&mut self, ctx: &GpuContext, target: &wgpu::TextureView) -> wgpu::SubmissionIndex {
        let slot = self.ring.slot();
        let _span = tracing::debug_span!("frame", slot).entered();
        self.acquire_frame(ctx);

        let aspect = self.targets.width as f32 / self.targets.height as f32;
        let view_proj = self.camera.view_projection(aspect);
        let offset = self.ring.offset();
        ctx.queue.write_buffer(
            &self.frame_buffer,
            offset,
            bytemuck::bytes_of(&FrameUniforms {
                view_proj: view_proj.to_cols_array_2d(),
            }),
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });

        for renderer in &self.mesh_renderers {
            renderer.update(&ctx.queue, &mut encoder);
        }

        {
            let (view, resolve_target, store) = match &self.targets.color {
                Some(msaa) => (msaa, Some(target), wgpu::StoreOp::Discard),
                None => (target, None, wgpu::StoreOp::Store),
            };
            let stencil_ops = self
                .framebuffer
                .depth_stencil_format
                .has_stencil_aspect()
                .then_some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Discard,
                });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[offset as u32]);
            for renderer in &self.mesh_renderers {
                renderer.draw(&mut pass);
            }
        }

        let submission = ctx.queue.submit(std::iter::once(encoder.finish()));
        let completion = self.throttle.completion();
        ctx.queue.on_submitted_work_done(move || completion.signal());

        self.submissions.push_back(submission.clone());
        while self.submissions.len() > FRAMES_IN_FLIGHT {
            self.submissions.pop_front();
        }
        self.ring.advance();
        let status = ctx.device.poll(wgpu::Maintain::Poll);
        tracing::trace!(queue_empty = status.is_queue_empty(), "device polled");
        submission
    }

    /// Take a frame slot, driving the device until the oldest outstanding
    /// frame completes if none is free.
    fn acquire_frame(&mut self, ctx: &GpuContext) {
        if self.throttle.try_acquire() {
            return;
        }
        if let Some(oldest) = self.submissions.pop_front() {
            let status = ctx.device.poll(wgpu::Maintain::wait_for(oldest));
            tracing::trace!(
                queue_empty = status.is_queue_empty(),
                "waited for oldest frame"
            );
        }
        self.throttle.acquire(self.acquire_timeout);
    }
}
