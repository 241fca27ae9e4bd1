use crossbeam_channel::bounded;
use tessera_assets::TextureData;
use wgpu::util::DeviceExt;

use crate::RendererError;

/// Device features used when the adapter offers them.
fn optional_features() -> wgpu::Features {
    wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
}

/// Explicit GPU device handle shared by every renderer.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub features: wgpu::Features,
    pub limits: wgpu::Limits,
}

impl GpuContext {
    /// Open a device on `adapter`, enabling the optional features it has.
    pub async fn from_adapter(adapter: wgpu::Adapter) -> Result<Self, RendererError> {
        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel.flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
            return Err(RendererError::MissingCapability("storage buffers in vertex shaders"));
        }
        if !downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
            return Err(RendererError::MissingCapability("compute shaders"));
        }

        let features = adapter.features() & optional_features();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tessera_device"),
                    required_features: features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        let limits = device.limits();

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = info.backend.to_str(),
            line_mode = features.contains(wgpu::Features::POLYGON_MODE_LINE),
            "GPU device ready"
        );

        Ok(Self {
            adapter,
            device,
            queue,
            features,
            limits,
        })
    }

    /// Device without a surface, for tests and offscreen rendering.
    pub fn headless() -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(RendererError::NoAdapter)?;
        pollster::block_on(Self::from_adapter(adapter))
    }

    /// Whether pipelines may rasterize with `PolygonMode::Line`.
    pub fn supports_line_mode(&self) -> bool {
        self.features.contains(wgpu::Features::POLYGON_MODE_LINE)
    }

    /// Largest sample count not above `requested` that every format in
    /// `formats` supports as a render attachment.
    ///
    /// 1 and 4 are always available; other counts need adapter-specific
    /// format features.
    pub fn supported_sample_count(&self, formats: &[wgpu::TextureFormat], requested: u32) -> u32 {
        let adapter_specific = self
            .features
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
        let supported = |count: u32| {
            count == 1
                || count == 4
                || (adapter_specific
                    && formats.iter().all(|f| {
                        self.adapter
                            .get_texture_format_features(*f)
                            .flags
                            .sample_count_supported(count)
                    }))
        };
        let count = [16, 8, 4, 2, 1]
            .into_iter()
            .find(|c| *c <= requested && supported(*c))
            .unwrap_or(1);
        if count != requested {
            tracing::warn!(requested, using = count, "sample count not supported");
        }
        count
    }

    /// Upload RGBA8 sRGB texel data as a sampled 2D texture.
    pub fn create_texture(&self, data: &TextureData) -> wgpu::Texture {
        self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(data.name.as_str()),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.rgba,
        )
    }

    /// Block until all submitted work has finished. Returns whether the
    /// queue drained.
    pub fn wait_idle(&self) -> bool {
        let drained = self.device.poll(wgpu::Maintain::Wait).is_queue_empty();
        tracing::trace!(drained, "waited for device idle");
        drained
    }

    /// Copy `size` bytes of `buffer` back to the host. `buffer` needs
    /// `COPY_SRC` usage.
    pub fn read_buffer(&self, buffer: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, RendererError> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.map_and_copy(&staging)
    }

    /// Read an RGBA8 texture back as tightly packed rows. `texture` needs
    /// `COPY_SRC` usage.
    pub fn read_texture(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, RendererError> {
        let (width, height) = (texture.width(), texture.height());
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture_readback_staging"),
            size: (padded * height) as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texture_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let bytes = self.map_and_copy(&staging)?;
        Ok(bytes
            .chunks(padded as usize)
            .flat_map(|row| &row[..unpadded as usize])
            .copied()
            .collect())
    }

    fn map_and_copy(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>, RendererError> {
        let (tx, rx) = bounded(1);
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.wait_idle();
        rx.recv().map_err(|_| RendererError::Readback)??;
        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
}
