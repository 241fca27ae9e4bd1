//! Procedural patch meshes used when no asset file is supplied.

use glam::Vec3;

use crate::mesh::{Mesh, MeshAsset, mesh_from_faces};

/// Axis-aligned box built from six quad patches (24 control points).
pub fn quad_box(half_extent: f32) -> MeshAsset {
    let p = half_extent;
    #[rustfmt::skip]
    let corners = [
        // +Z face
        Vec3::new(-p, -p,  p), Vec3::new( p, -p,  p), Vec3::new( p,  p,  p), Vec3::new(-p,  p,  p),
        // -Z face
        Vec3::new( p, -p, -p), Vec3::new(-p, -p, -p), Vec3::new(-p,  p, -p), Vec3::new( p,  p, -p),
        // +X face
        Vec3::new( p, -p,  p), Vec3::new( p, -p, -p), Vec3::new( p,  p, -p), Vec3::new( p,  p,  p),
        // -X face
        Vec3::new(-p, -p, -p), Vec3::new(-p, -p,  p), Vec3::new(-p,  p,  p), Vec3::new(-p,  p, -p),
        // +Y face
        Vec3::new(-p,  p,  p), Vec3::new( p,  p,  p), Vec3::new( p,  p, -p), Vec3::new(-p,  p, -p),
        // -Y face
        Vec3::new(-p, -p, -p), Vec3::new( p, -p, -p), Vec3::new( p, -p,  p), Vec3::new(-p, -p,  p),
    ];
    single("box", mesh_from_faces("box", 4, &corners))
}

/// Regular icosahedron built from twenty triangle patches (60 control points).
pub fn icosahedron(radius: f32) -> MeshAsset {
    let phi = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let v = [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ]
    .map(|p| p.normalize() * radius);

    #[rustfmt::skip]
    let faces: [[usize; 3]; 20] = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    let mut corners = Vec::with_capacity(60);
    for [a, b, c] in faces {
        let (a, b, c) = (v[a], v[b], v[c]);
        // Wind every face counter-clockwise seen from outside.
        if (b - a).cross(c - a).dot(a + b + c) >= 0.0 {
            corners.extend([a, b, c]);
        } else {
            corners.extend([a, c, b]);
        }
    }
    single("ico", mesh_from_faces("ico", 3, &corners))
}

/// Resolve a built-in primitive by name.
pub fn builtin(name: &str) -> Option<MeshAsset> {
    match name {
        "box" | "cube" => Some(quad_box(1.0)),
        "ico" | "icosahedron" => Some(icosahedron(1.0)),
        _ => None,
    }
}

fn single(name: &str, mesh: Mesh) -> MeshAsset {
    MeshAsset {
        name: name.to_string(),
        meshes: vec![mesh],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Topology;

    fn assert_outward(asset: &MeshAsset, corners: usize) {
        let mesh = asset.first_mesh().unwrap();
        for face in mesh.control_points.chunks(corners) {
            let centroid = face.iter().map(|p| p.position()).sum::<Vec3>() / corners as f32;
            let n = face[0].normal();
            assert!(n.dot(centroid) > 0.0, "face normal points inward");
            let winding = (face[1].position() - face[0].position())
                .cross(face[2].position() - face[0].position());
            assert!(winding.dot(centroid) > 0.0, "face wound clockwise");
        }
    }

    #[test]
    fn box_has_six_quads() {
        let asset = quad_box(1.0);
        let mesh = asset.first_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.first_submesh().unwrap().topology, Topology::Quads);
        assert_outward(&asset, 4);
    }

    #[test]
    fn icosahedron_has_twenty_triangles() {
        let asset = icosahedron(2.0);
        let mesh = asset.first_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 60);
        assert_eq!(mesh.first_submesh().unwrap().topology, Topology::Triangles);
        assert!(
            mesh.control_points
                .iter()
                .all(|p| (p.position().length() - 2.0).abs() < 1e-5)
        );
        assert_outward(&asset, 3);
    }

    #[test]
    fn builtin_lookup() {
        assert!(builtin("box").is_some());
        assert!(builtin("ico").is_some());
        assert!(builtin("teapot").is_none());
    }
}
