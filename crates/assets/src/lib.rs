//! Patch mesh assets: the control-point data the tessellation renderer
//! consumes, plus the small named resources it samples.
//!
//! Meshes keep their authored face topology. Control points are stored per
//! face corner (position + normal), so a uniform triangle or quad mesh maps
//! directly onto three- or four-point patches.

mod library;
pub mod mesh;
pub mod obj;
pub mod primitives;
pub mod ramp;

pub use library::AssetLibrary;
pub use mesh::{ControlPoint, IndexBuffer, IndexWidth, Mesh, MeshAsset, Submesh, Topology};
pub use ramp::TextureData;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("OBJ parse error: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("asset not found: {0}")]
    NotFound(String),
}

pub fn crate_info() -> &'static str {
    "tessera-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
