//! wgpu backend for adaptive patch tessellation.
//!
//! A compute pass writes per-patch tessellation factors, then one instanced
//! patch expansion draw per mesh turns each patch into triangles at its
//! factor's level. `SceneRenderer` paces frames against GPU completion and
//! feeds the camera's view-projection through a ring of uniform slots.
//!
//! # Invariants
//! - Per mesh, the factor compute pass is recorded before its draw.
//! - The factor buffer is written only by compute and read only by draws.
//! - A completion callback does nothing but release a frame slot.

mod context;
mod mesh;
mod mesh_renderer;
mod scene;
mod shaders;

pub use context::GpuContext;
pub use mesh::TessellatedMesh;
pub use mesh_renderer::{MeshRenderer, TessellatedMeshRenderer};
pub use scene::{FramebufferDescriptor, SceneRenderer};

pub fn crate_info() -> &'static str {
    "tessera-render-wgpu v0.1.0"
}

/// Errors from GPU setup and renderer construction.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("adapter lacks {0}")]
    MissingCapability(&'static str),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to build pipeline `{label}`: {message}")]
    PipelineBuild { label: String, message: String },
    #[error("buffer map failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("readback callback dropped")]
    Readback,
    #[error(transparent)]
    Asset(#[from] tessera_assets::AssetError),
    #[error(transparent)]
    Mesh(#[from] tessera_render::MeshError),
}
