use std::fmt;

use crate::camera::FlyCamera;
use crate::factors::{TessellationSettings, pow2_factor};
use crate::patch::{IndexFormat, PatchLayout, PatchTopology};

/// Owned description of one validated patch mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSummary {
    pub name: String,
    pub topology: PatchTopology,
    pub patch_count: u32,
    pub control_points: usize,
    pub index_format: Option<IndexFormat>,
}

impl From<&PatchLayout<'_>> for PatchSummary {
    fn from(layout: &PatchLayout<'_>) -> Self {
        Self {
            name: layout.name.to_string(),
            topology: layout.topology,
            patch_count: layout.patch_count,
            control_points: layout.control_points.len(),
            index_format: layout.index_format(),
        }
    }
}

impl PatchSummary {
    pub fn factor_bytes(&self) -> u64 {
        self.patch_count as u64 * self.topology.factor_record_size()
    }

    /// Triangles emitted for the whole mesh at `level`.
    pub fn triangles_at(&self, level: u32) -> u64 {
        self.patch_count as u64 * (self.topology.vertices_per_patch(level) / 3) as u64
    }
}

/// Human-readable snapshot of scene state: camera, tunables, meshes.
///
/// Reads state only. Used for CLI output and logging.
#[derive(Debug, Clone)]
pub struct SceneReport<'a> {
    pub camera: &'a FlyCamera,
    pub settings: TessellationSettings,
    pub max_factor: u32,
    pub meshes: &'a [PatchSummary],
}

impl fmt::Display for SceneReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = pow2_factor(self.settings.inside_factor, self.max_factor) as u32;
        writeln!(f, "=== Scene (meshes={}) ===", self.meshes.len())?;
        let (eye, look) = (self.camera.eye, self.camera.look());
        writeln!(
            f,
            "Camera: eye=({:.2}, {:.2}, {:.2}) look=({:.3}, {:.3}, {:.3}) fov={:.0}",
            eye.x,
            eye.y,
            eye.z,
            look.x,
            look.y,
            look.z,
            self.camera.fov_y.to_degrees()
        )?;
        writeln!(
            f,
            "{} (max {}) wireframe={} spherify={}",
            self.settings.label(),
            self.max_factor,
            self.settings.wireframe,
            self.settings.spherify
        )?;
        for mesh in self.meshes {
            let indexed = match mesh.index_format {
                Some(IndexFormat::U16) => "u16",
                Some(IndexFormat::U32) => "u32",
                None => "none",
            };
            writeln!(
                f,
                "  [{}] {:?} patches={} points={} indices={} factors={}B triangles={}",
                mesh.name,
                mesh.topology,
                mesh.patch_count,
                mesh.control_points,
                indexed,
                mesh.factor_bytes(),
                mesh.triangles_at(level)
            )?;
        }
        Ok(())
    }
}
