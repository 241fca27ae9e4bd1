use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One tessellator input vertex: interleaved position and normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ControlPoint {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl ControlPoint {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Primitive topology of a submesh as read from the source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Every face has three corners.
    Triangles,
    /// Every face has four corners.
    Quads,
    /// Mixed arities or n-gons.
    Polygons,
}

impl Topology {
    /// Classify a face list by its per-face corner counts.
    pub fn from_face_arities(arities: &[u32]) -> Topology {
        match arities.first() {
            Some(&first) if arities.iter().all(|a| *a == first) => match first {
                3 => Topology::Triangles,
                4 => Topology::Quads,
                _ => Topology::Polygons,
            },
            Some(_) => Topology::Polygons,
            None => Topology::Triangles,
        }
    }

    /// Corners per face for uniform topologies.
    pub fn corners_per_face(&self) -> Option<u32> {
        match self {
            Topology::Triangles => Some(3),
            Topology::Quads => Some(4),
            Topology::Polygons => None,
        }
    }
}

/// Element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn bytes(&self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Index data referencing a mesh's control points.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Store `indices` at the narrowest width that can hold them.
    pub fn from_indices(indices: Vec<u32>) -> Self {
        if indices.iter().all(|i| *i <= u16::MAX as u32) {
            IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            IndexBuffer::U32(indices)
        }
    }

    /// Identity indices `0..count`.
    pub fn sequential(count: usize) -> Self {
        Self::from_indices((0..count as u32).collect())
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.get(i).map(|x| *x as u32),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    /// Indices packed into 32-bit words. 16-bit indices are stored two per
    /// word, element `2k` in the low half.
    pub fn packed_words(&self) -> Vec<u32> {
        match self {
            IndexBuffer::U16(v) => v
                .chunks(2)
                .map(|pair| pair[0] as u32 | (pair.get(1).copied().unwrap_or(0) as u32) << 16)
                .collect(),
            IndexBuffer::U32(v) => v.clone(),
        }
    }
}

/// A run of faces sharing one topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Submesh {
    pub name: String,
    pub topology: Topology,
    pub indices: Option<IndexBuffer>,
}

/// Control points plus the submeshes that reference them.
///
/// Control points are laid out per face corner, so a uniform-topology mesh
/// can be consumed directly as patches without an index buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub control_points: Vec<ControlPoint>,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.control_points.len()
    }

    pub fn first_submesh(&self) -> Option<&Submesh> {
        self.submeshes.first()
    }
}

/// A loaded mesh file: zero or more meshes.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    pub meshes: Vec<Mesh>,
}

impl MeshAsset {
    pub fn first_mesh(&self) -> Option<&Mesh> {
        self.meshes.first()
    }
}

/// Build a mesh whose faces all share `corners` corners from a flat list of
/// positions, assigning each face its own flat normal.
pub fn mesh_from_faces(name: &str, corners: usize, positions: &[Vec3]) -> Mesh {
    let mut control_points = Vec::with_capacity(positions.len());
    for face in positions.chunks(corners) {
        let normal = face_normal(face);
        control_points.extend(face.iter().map(|p| ControlPoint::new(*p, normal)));
    }
    let topology = match corners {
        3 => Topology::Triangles,
        4 => Topology::Quads,
        _ => Topology::Polygons,
    };
    let count = control_points.len();
    Mesh {
        name: name.to_string(),
        control_points,
        submeshes: vec![Submesh {
            name: format!("{name}_faces"),
            topology,
            indices: Some(IndexBuffer::sequential(count)),
        }],
    }
}

/// Newell's method; robust for non-planar quads.
pub(crate) fn face_normal(corners: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in corners.iter().enumerate() {
        let b = corners[(i + 1) % corners.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n.normalize_or_zero()
}
