use std::cell::Cell;

use glam::Mat4;
use tessera_assets::{AssetLibrary, MeshAsset};
use tessera_render::{IndexFormat, PatchLayout, PatchTopology};
use wgpu::util::DeviceExt;

use crate::RendererError;
use crate::context::GpuContext;

/// GPU-resident patch mesh: control points, optional control-point indices
/// and the per-patch tessellation factor buffer.
///
/// Built from the first submesh of a mesh asset. Construction either fully
/// succeeds or allocates nothing.
pub struct TessellatedMesh {
    name: String,
    topology: PatchTopology,
    patch_count: u32,
    index_format: Option<IndexFormat>,
    control_point_buffer: wgpu::Buffer,
    control_index_buffer: wgpu::Buffer,
    factor_buffer: wgpu::Buffer,
    model_transform: Cell<Mat4>,
}

impl TessellatedMesh {
    /// Upload `asset`. With `indexed`, control points are fetched through the
    /// submesh's index buffer.
    pub fn new(ctx: &GpuContext, asset: &MeshAsset, indexed: bool) -> Result<Self, RendererError> {
        let layout = PatchLayout::from_asset(asset, indexed)?;
        let label = layout.name;

        let control_point_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_control_points")),
                contents: bytemuck::cast_slice(layout.control_points),
                usage: wgpu::BufferUsages::STORAGE,
            });

        // Bound even when unused; storage bindings cannot be empty.
        let words = layout
            .indices
            .map(|indices| indices.packed_words())
            .unwrap_or_else(|| vec![0]);
        let control_index_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_control_indices")),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let factor_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_tess_factors")),
            size: layout.factor_buffer_size(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        tracing::info!(
            mesh = label,
            topology = ?layout.topology,
            patches = layout.patch_count,
            "tessellated mesh uploaded"
        );

        Ok(Self {
            name: label.to_string(),
            topology: layout.topology,
            patch_count: layout.patch_count,
            index_format: layout.index_format(),
            control_point_buffer,
            control_index_buffer,
            factor_buffer,
            model_transform: Cell::new(Mat4::IDENTITY),
        })
    }

    /// Resolve `name` through `library` and upload it.
    pub fn load(
        ctx: &GpuContext,
        library: &AssetLibrary,
        name: &str,
        indexed: bool,
    ) -> Result<Self, RendererError> {
        let asset = library.load_mesh(name)?;
        Self::new(ctx, &asset, indexed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> PatchTopology {
        self.topology
    }

    pub fn patch_count(&self) -> u32 {
        self.patch_count
    }

    pub fn control_points_per_patch(&self) -> u32 {
        self.topology.control_points_per_patch()
    }

    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    pub fn control_point_buffer(&self) -> &wgpu::Buffer {
        &self.control_point_buffer
    }

    pub fn control_index_buffer(&self) -> &wgpu::Buffer {
        &self.control_index_buffer
    }

    pub fn factor_buffer(&self) -> &wgpu::Buffer {
        &self.factor_buffer
    }

    pub fn factor_buffer_size(&self) -> u64 {
        self.patch_count as u64 * self.topology.factor_record_size()
    }

    pub fn model_transform(&self) -> Mat4 {
        self.model_transform.get()
    }

    pub fn set_model_transform(&self, transform: Mat4) {
        self.model_transform.set(transform);
    }
}
