use tessera_assets::{ControlPoint, IndexBuffer, IndexWidth, Mesh, MeshAsset, Topology};

/// Errors raised while turning a mesh asset into a patch mesh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("asset `{0}` contains no mesh")]
    NoMesh(String),
    #[error("mesh `{0}` has no submesh")]
    NoSubmesh(String),
    #[error("unsupported topology {0:?}: expected uniform triangles or quads")]
    UnsupportedTopology(Topology),
    #[error("{count} control points do not form whole {per_patch}-point patches")]
    PartialPatch { count: usize, per_patch: u32 },
    #[error("mesh `{0}` has no patches")]
    NoPatches(String),
    #[error("indexed control points requested but mesh `{0}` has no index buffer")]
    MissingIndices(String),
    #[error("control point index {index} out of range for {vertex_count} points")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Patch domain: which fixed-topology patch the draw expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchTopology {
    Triangle,
    Quad,
}

impl PatchTopology {
    pub fn from_topology(topology: Topology) -> Result<Self, MeshError> {
        match topology {
            Topology::Triangles => Ok(Self::Triangle),
            Topology::Quads => Ok(Self::Quad),
            other => Err(MeshError::UnsupportedTopology(other)),
        }
    }

    pub fn control_points_per_patch(self) -> u32 {
        match self {
            Self::Triangle => 3,
            Self::Quad => 4,
        }
    }

    /// Floats in one factor record: edge factors followed by inside factors.
    pub fn factor_record_floats(self) -> usize {
        match self {
            Self::Triangle => 4,
            Self::Quad => 6,
        }
    }

    /// Bytes in one factor record (16 for triangles, 24 for quads).
    pub fn factor_record_size(self) -> u64 {
        (self.factor_record_floats() * std::mem::size_of::<f32>()) as u64
    }

    /// Compute entry point that writes this topology's factor records.
    pub fn factor_entry_point(self) -> &'static str {
        match self {
            Self::Triangle => "compute_tess_factors_tri",
            Self::Quad => "compute_tess_factors_quad",
        }
    }

    /// Vertex entry point that evaluates this topology's patch domain.
    pub fn vertex_entry_point(self) -> &'static str {
        match self {
            Self::Triangle => "vs_patch_tri",
            Self::Quad => "vs_patch_quad",
        }
    }

    /// Vertex budget of one patch expanded at `level` subdivisions per edge.
    ///
    /// A triangle patch at level `n` has `n²` sub-triangles, a quad patch
    /// `2n²`. Each sub-triangle is three non-indexed vertices.
    pub fn vertices_per_patch(self, level: u32) -> u32 {
        match self {
            Self::Triangle => 3 * level * level,
            Self::Quad => 6 * level * level,
        }
    }
}

/// Element width of the optional control-point index buffer as the patch
/// program sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// Value of the `index_format` draw uniform. 0 is reserved for direct
    /// (non-indexed) fetch.
    pub fn shader_code(self) -> u32 {
        match self {
            Self::U16 => 1,
            Self::U32 => 2,
        }
    }
}

impl From<IndexWidth> for IndexFormat {
    fn from(width: IndexWidth) -> Self {
        match width {
            IndexWidth::U16 => Self::U16,
            IndexWidth::U32 => Self::U32,
        }
    }
}

/// A validated view of the first submesh of an asset as a patch list.
#[derive(Debug, Clone, Copy)]
pub struct PatchLayout<'a> {
    pub name: &'a str,
    pub topology: PatchTopology,
    pub patch_count: u32,
    pub control_points: &'a [ControlPoint],
    pub indices: Option<&'a IndexBuffer>,
}

impl<'a> PatchLayout<'a> {
    /// Validate `asset` for patch rendering.
    ///
    /// Only the first mesh and its first submesh are considered. With
    /// `indexed`, control points are fetched through the submesh's index
    /// buffer and the patch count derives from the index count; otherwise
    /// points are consumed in order.
    pub fn from_asset(asset: &'a MeshAsset, indexed: bool) -> Result<Self, MeshError> {
        let mesh = asset
            .first_mesh()
            .ok_or_else(|| MeshError::NoMesh(asset.name.clone()))?;
        Self::from_mesh(mesh, indexed)
    }

    pub fn from_mesh(mesh: &'a Mesh, indexed: bool) -> Result<Self, MeshError> {
        let submesh = mesh
            .first_submesh()
            .ok_or_else(|| MeshError::NoSubmesh(mesh.name.clone()))?;
        let topology = PatchTopology::from_topology(submesh.topology)?;
        let per_patch = topology.control_points_per_patch();

        let indices = if indexed {
            let indices = submesh
                .indices
                .as_ref()
                .ok_or_else(|| MeshError::MissingIndices(mesh.name.clone()))?;
            let vertex_count = mesh.vertex_count();
            for i in 0..indices.len() {
                if let Some(index) = indices.get(i).filter(|&v| v as usize >= vertex_count) {
                    return Err(MeshError::IndexOutOfRange { index, vertex_count });
                }
            }
            Some(indices)
        } else {
            None
        };

        let count = indices.map_or(mesh.vertex_count(), IndexBuffer::len);
        if count % per_patch as usize != 0 {
            return Err(MeshError::PartialPatch { count, per_patch });
        }
        let patch_count = (count / per_patch as usize) as u32;
        if patch_count == 0 {
            return Err(MeshError::NoPatches(mesh.name.clone()));
        }

        tracing::debug!(
            mesh = %mesh.name,
            ?topology,
            patch_count,
            indexed = indices.is_some(),
            "validated patch layout"
        );

        Ok(Self {
            name: &mesh.name,
            topology,
            patch_count,
            control_points: &mesh.control_points,
            indices,
        })
    }

    pub fn index_format(&self) -> Option<IndexFormat> {
        self.indices.map(|i| i.width().into())
    }

    /// Size of the factor buffer backing this layout.
    pub fn factor_buffer_size(&self) -> u64 {
        self.patch_count as u64 * self.topology.factor_record_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_assets::{Submesh, mesh::mesh_from_faces, primitives};

    fn triangles(count: usize) -> Mesh {
        let positions: Vec<Vec3> = (0..count)
            .map(|i| Vec3::new(i as f32, (i % 3) as f32, 0.0))
            .collect();
        let mut mesh = mesh_from_faces("tris", 3, &positions[..count - count % 3]);
        // Keep the raw point count, including any trailing partial patch.
        mesh.control_points = positions
            .iter()
            .map(|p| ControlPoint::new(*p, Vec3::Z))
            .collect();
        mesh
    }

    #[test]
    fn box_yields_six_quad_patches() {
        let asset = primitives::builtin("box").unwrap();
        let layout = PatchLayout::from_asset(&asset, false).unwrap();
        assert_eq!(layout.topology, PatchTopology::Quad);
        assert_eq!(layout.patch_count, 6);
        assert_eq!(layout.factor_buffer_size(), 6 * 24);
        assert_eq!(layout.index_format(), None);
    }

    #[test]
    fn thirty_six_points_yield_twelve_triangle_patches() {
        let mesh = triangles(36);
        let layout = PatchLayout::from_mesh(&mesh, false).unwrap();
        assert_eq!(layout.topology, PatchTopology::Triangle);
        assert_eq!(layout.patch_count, 12);
        assert_eq!(layout.factor_buffer_size(), 12 * 16);
    }

    #[test]
    fn partial_patch_is_rejected() {
        let mesh = triangles(10);
        let err = PatchLayout::from_mesh(&mesh, false).unwrap_err();
        assert_eq!(err, MeshError::PartialPatch { count: 10, per_patch: 3 });
    }

    #[test]
    fn empty_asset_is_rejected() {
        let asset = MeshAsset {
            name: "void".into(),
            meshes: Vec::new(),
        };
        assert!(matches!(
            PatchLayout::from_asset(&asset, false),
            Err(MeshError::NoMesh(_))
        ));
    }

    #[test]
    fn mesh_without_submesh_is_rejected() {
        let mut mesh = triangles(6);
        mesh.submeshes.clear();
        assert!(matches!(
            PatchLayout::from_mesh(&mesh, false),
            Err(MeshError::NoSubmesh(_))
        ));
    }

    #[test]
    fn polygon_topology_is_rejected() {
        let mut mesh = triangles(6);
        mesh.submeshes[0].topology = Topology::Polygons;
        assert_eq!(
            PatchLayout::from_mesh(&mesh, false).unwrap_err(),
            MeshError::UnsupportedTopology(Topology::Polygons)
        );
    }

    #[test]
    fn indexed_layout_counts_indices() {
        let mut mesh = triangles(6);
        mesh.submeshes = vec![Submesh {
            name: "shared".into(),
            topology: Topology::Triangles,
            indices: Some(IndexBuffer::from_indices(vec![0, 1, 2, 2, 1, 3, 3, 4, 5])),
        }];
        let layout = PatchLayout::from_mesh(&mesh, true).unwrap();
        assert_eq!(layout.patch_count, 3);
        assert_eq!(layout.index_format(), Some(IndexFormat::U16));

        let direct = PatchLayout::from_mesh(&mesh, false).unwrap();
        assert_eq!(direct.patch_count, 2);
        assert!(direct.indices.is_none());
    }

    #[test]
    fn indexed_layout_checks_range() {
        let mut mesh = triangles(3);
        mesh.submeshes[0].indices = Some(IndexBuffer::from_indices(vec![0, 1, 7]));
        assert_eq!(
            PatchLayout::from_mesh(&mesh, true).unwrap_err(),
            MeshError::IndexOutOfRange { index: 7, vertex_count: 3 }
        );
    }

    #[test]
    fn indexed_without_indices_is_rejected() {
        let mut mesh = triangles(3);
        mesh.submeshes[0].indices = None;
        assert!(matches!(
            PatchLayout::from_mesh(&mesh, true),
            Err(MeshError::MissingIndices(_))
        ));
    }

    #[test]
    fn topology_tables() {
        assert_eq!(PatchTopology::Triangle.factor_record_size(), 16);
        assert_eq!(PatchTopology::Quad.factor_record_size(), 24);
        assert_eq!(PatchTopology::Triangle.vertices_per_patch(16), 768);
        assert_eq!(PatchTopology::Quad.vertices_per_patch(16), 1536);
        assert_eq!(PatchTopology::Quad.vertices_per_patch(1), 6);
        assert_eq!(PatchTopology::Triangle.factor_entry_point(), "compute_tess_factors_tri");
        assert_eq!(PatchTopology::Quad.vertex_entry_point(), "vs_patch_quad");
    }
}
