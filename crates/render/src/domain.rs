//! Patch domain enumeration shared with the patch vertex program.
//!
//! The patch expansion draw emits a fixed vertex budget per patch. Vertex
//! `i` of a patch maps to a domain coordinate here exactly as it does in
//! `vs_patch_tri` / `vs_patch_quad`; vertices past the patch's level map to
//! `None` and are collapsed into degenerate triangles on the GPU.

use glam::{Vec2, Vec3};

/// Snap a domain parameter on a patch edge to that edge's own factor.
pub fn snap_to_edge(t: f32, edge_factor: f32) -> f32 {
    (t * edge_factor).round_ties_even() / edge_factor
}

/// Barycentric `(u, v, w)` of vertex `vertex` of a triangle patch at
/// `level` subdivisions per side.
///
/// Sub-triangles are enumerated row by row from the `v = 0` edge. Row `r`
/// alternates upward and downward triangles, `2(level - r) - 1` in all.
/// `edges[k]` is the factor of edge `k`: edge 0 is `u = 0`, edge 1 is
/// `v = 0`, edge 2 is `w = 0`.
pub fn triangle_point(vertex: u32, level: u32, edges: [f32; 3]) -> Option<Vec3> {
    let n = level.max(1);
    let tri = vertex / 3;
    if tri >= n * n {
        return None;
    }
    let corner = vertex % 3;

    let mut row = 0;
    let mut start = 0;
    while row + 1 < n {
        let count = 2 * (n - row) - 1;
        if tri < start + count {
            break;
        }
        start += count;
        row += 1;
    }
    let local = tri - start;
    let k = local / 2;
    let (i, j) = if local % 2 == 0 {
        [(k, row), (k + 1, row), (k, row + 1)][corner as usize]
    } else {
        [(k + 1, row), (k + 1, row + 1), (k, row + 1)][corner as usize]
    };

    let nf = n as f32;
    let mut u = i as f32 / nf;
    let mut v = j as f32 / nf;
    if i == 0 {
        v = snap_to_edge(v, edges[0]);
    } else if j == 0 {
        u = snap_to_edge(u, edges[1]);
    } else if i + j == n {
        u = snap_to_edge(u, edges[2]);
        v = 1.0 - u;
    }
    Some(Vec3::new(u, v, 1.0 - u - v))
}

/// Domain `(u, v)` of vertex `vertex` of a quad patch with `levels`
/// subdivisions along u and v.
///
/// Each cell is two triangles, six vertices. `edges[k]`: edge 0 is `u = 0`,
/// edge 1 is `v = 0`, edge 2 is `u = 1`, edge 3 is `v = 1`.
pub fn quad_point(vertex: u32, levels: [u32; 2], edges: [f32; 4]) -> Option<Vec2> {
    const CORNERS: [(u32, u32); 6] = [(0, 0), (1, 0), (1, 1), (0, 0), (1, 1), (0, 1)];
    let (nu, nv) = (levels[0].max(1), levels[1].max(1));
    let cell = vertex / 6;
    if cell >= nu * nv {
        return None;
    }
    let (dx, dy) = CORNERS[(vertex % 6) as usize];
    let x = cell % nu + dx;
    let y = cell / nu + dy;

    let mut u = x as f32 / nu as f32;
    let mut v = y as f32 / nv as f32;
    if x == 0 {
        v = snap_to_edge(v, edges[0]);
    } else if x == nu {
        v = snap_to_edge(v, edges[2]);
    }
    if y == 0 {
        u = snap_to_edge(u, edges[1]);
    } else if y == nv {
        u = snap_to_edge(u, edges[3]);
    }
    Some(Vec2::new(u, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchTopology;

    fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
        0.5 * (b - a).perp_dot(c - a)
    }

    fn triangles(level: u32, max: u32) -> Vec<[Vec2; 3]> {
        let budget = PatchTopology::Triangle.vertices_per_patch(max);
        let f = level as f32;
        (0..budget)
            .step_by(3)
            .filter_map(|base| {
                let p = |k| triangle_point(base + k, level, [f; 3]).map(|b| Vec2::new(b.x, b.y));
                Some([p(0)?, p(1)?, p(2)?])
            })
            .collect()
    }

    #[test]
    fn triangle_patch_is_covered_once() {
        for level in [1, 2, 4, 8, 16] {
            let tris = triangles(level, 16);
            assert_eq!(tris.len() as u32, level * level);
            // u/v space area of the whole patch is 1/2, all counter-clockwise.
            let total: f32 = tris.iter().map(|t| signed_area(t[0], t[1], t[2])).sum();
            assert!((total - 0.5).abs() < 1e-4, "level {level}: area {total}");
            assert!(tris.iter().all(|t| signed_area(t[0], t[1], t[2]) > 0.0));
        }
    }

    #[test]
    fn barycentrics_sum_to_one() {
        for vertex in 0..PatchTopology::Triangle.vertices_per_patch(8) {
            let b = triangle_point(vertex, 8, [8.0; 3]).unwrap();
            assert!((b.x + b.y + b.z - 1.0).abs() < 1e-6);
            assert!(b.min_element() >= -1e-6);
        }
    }

    #[test]
    fn vertices_past_level_are_dropped() {
        let budget = PatchTopology::Triangle.vertices_per_patch(16);
        assert!(triangle_point(3 * 4 - 1, 2, [2.0; 3]).is_some());
        assert!(triangle_point(3 * 4, 2, [2.0; 3]).is_none());
        assert!(triangle_point(budget - 1, 2, [2.0; 3]).is_none());
    }

    #[test]
    fn coarse_edge_collapses_boundary_vertices() {
        // Inside level 4, edge 1 (v = 0) at factor 1: every v = 0 vertex
        // snaps to a patch corner.
        for vertex in 0..PatchTopology::Triangle.vertices_per_patch(4) {
            let b = triangle_point(vertex, 4, [4.0, 1.0, 4.0]).unwrap();
            if b.y == 0.0 {
                assert!(b.x == 0.0 || b.x == 1.0, "u = {} on coarse edge", b.x);
            }
        }
    }

    #[test]
    fn quad_patch_is_covered_once() {
        for level in [1, 2, 4, 16] {
            let budget = PatchTopology::Quad.vertices_per_patch(16);
            let f = level as f32;
            let mut area = 0.0;
            let mut count = 0;
            for base in (0..budget).step_by(3) {
                let p = |k| quad_point(base + k, [level, level], [f; 4]);
                if let (Some(a), Some(b), Some(c)) = (p(0), p(1), p(2)) {
                    let s = signed_area(a, b, c);
                    assert!(s > 0.0);
                    area += s;
                    count += 1;
                }
            }
            assert_eq!(count, 2 * level * level);
            assert!((area - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn quad_corners_are_exact() {
        let last = PatchTopology::Quad.vertices_per_patch(2) - 1;
        assert_eq!(quad_point(0, [2, 2], [2.0; 4]), Some(Vec2::ZERO));
        assert_eq!(quad_point(last - 1, [2, 2], [2.0; 4]), Some(Vec2::ONE));
        assert_eq!(quad_point(last + 1, [2, 2], [2.0; 4]), None);
    }

    #[test]
    fn snapping_matches_across_shared_edges() {
        // Parameters seen from opposite sides of an edge snap to the same point.
        for j in 0..=8 {
            let t = j as f32 / 8.0;
            for e in [2.0, 4.0, 8.0] {
                let a = snap_to_edge(t, e);
                let b = 1.0 - snap_to_edge(1.0 - t, e);
                assert!((a - b).abs() < 1e-6, "t={t} e={e}: {a} vs {b}");
            }
            // A factor-1 edge keeps only its two corners from either side.
            let s = snap_to_edge(t, 1.0);
            assert!(s == 0.0 || s == 1.0, "t={t} snapped to {s}");
        }
    }
}
