//! Wavefront OBJ import that keeps the authored face topology.
//!
//! Faces are not triangulated: quads stay quads so they can be fed to the
//! tessellator as four-point patches.

use std::io::BufRead;
use std::path::Path;

use glam::Vec3;

use crate::AssetError;
use crate::mesh::{ControlPoint, IndexBuffer, Mesh, MeshAsset, Submesh, Topology, face_normal};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: false,
        single_index: true,
        ..Default::default()
    }
}

/// Load an OBJ file from disk.
pub fn load_obj(path: impl AsRef<Path>) -> Result<MeshAsset, AssetError> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("obj")
        .to_string();
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    tracing::debug!(path = %path.display(), models = models.len(), "loaded OBJ");
    Ok(asset_from_models(name, models))
}

/// Parse OBJ text from a reader. Material libraries are ignored.
pub fn parse_obj(name: &str, reader: &mut impl BufRead) -> Result<MeshAsset, AssetError> {
    let (models, _materials) =
        tobj::load_obj_buf(reader, &load_options(), |_| Ok(Default::default()))?;
    Ok(asset_from_models(name.to_string(), models))
}

fn asset_from_models(name: String, models: Vec<tobj::Model>) -> MeshAsset {
    let meshes = models.into_iter().map(mesh_from_model).collect();
    MeshAsset { name, meshes }
}

fn mesh_from_model(model: tobj::Model) -> Mesh {
    let src = &model.mesh;
    let arities: Vec<u32> = if src.face_arities.is_empty() {
        vec![3; src.indices.len() / 3]
    } else {
        src.face_arities.clone()
    };

    let position = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(src.positions[i], src.positions[i + 1], src.positions[i + 2])
    };
    let has_normals = src.normals.len() == src.positions.len();

    let mut control_points = Vec::with_capacity(src.indices.len());
    let mut cursor = 0usize;
    for arity in &arities {
        let face = &src.indices[cursor..cursor + *arity as usize];
        cursor += *arity as usize;
        let corners: Vec<Vec3> = face.iter().map(|i| position(*i)).collect();
        let flat = face_normal(&corners);
        for (corner, index) in corners.iter().zip(face) {
            let normal = if has_normals {
                let n = *index as usize * 3;
                Vec3::new(src.normals[n], src.normals[n + 1], src.normals[n + 2])
            } else {
                flat
            };
            control_points.push(ControlPoint::new(*corner, normal));
        }
    }

    let mut submeshes = Vec::new();
    if !arities.is_empty() {
        let topology = Topology::from_face_arities(&arities);
        if topology == Topology::Polygons {
            tracing::warn!(model = %model.name, "OBJ model has mixed or polygonal faces");
        }
        submeshes.push(Submesh {
            name: model.name.clone(),
            topology,
            indices: Some(IndexBuffer::sequential(control_points.len())),
        });
    }

    Mesh {
        name: model.name,
        control_points,
        submeshes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Write};

    const QUAD_PLANE: &str = "\
o plane
v 0 0 0
v 1 0 0
v 1 0 -1
v 0 0 -1
v 2 0 0
v 2 0 -1
f 1 2 3 4
f 2 5 6 3
";

    const TRIANGLES: &str = "\
o tris
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
f 1//1 3//1 2//1
";

    const MIXED: &str = "\
o mixed
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
f 1 2 3
";

    fn parse(text: &str) -> MeshAsset {
        parse_obj("test", &mut BufReader::new(Cursor::new(text))).unwrap()
    }

    #[test]
    fn quads_are_preserved() {
        let asset = parse(QUAD_PLANE);
        let mesh = asset.first_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.first_submesh().unwrap().topology, Topology::Quads);
        // Flat normal of a counter-clockwise face seen from +Y.
        assert!((mesh.control_points[0].normal() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn authored_normals_are_kept() {
        let asset = parse(TRIANGLES);
        let mesh = asset.first_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.first_submesh().unwrap().topology, Topology::Triangles);
        assert!(mesh.control_points.iter().all(|p| p.normal() == Vec3::Z));
    }

    #[test]
    fn mixed_faces_are_polygons() {
        let asset = parse(MIXED);
        let sub = asset.first_mesh().unwrap().first_submesh().unwrap();
        assert_eq!(sub.topology, Topology::Polygons);
    }

    #[test]
    fn load_from_disk_uses_file_stem() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(QUAD_PLANE.as_bytes()).unwrap();
        let asset = load_obj(file.path()).unwrap();
        assert!(!asset.name.is_empty());
        assert_eq!(asset.meshes.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_obj("/nonexistent/mesh.obj").is_err());
    }
}
