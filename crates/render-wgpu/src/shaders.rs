/// WGSL compute program writing one tessellation factor record per patch.
///
/// Triangle records are `[e0, e1, e2, inside]`, quad records
/// `[e0, e1, e2, e3, inside0, inside1]`. Factors are clamped to
/// `[1, max_factor]` and rounded up to a power of two.
pub const FACTOR_SHADER: &str = r#"
struct FactorParams {
    edge: f32,
    inside: f32,
    patch_count: u32,
    max_factor: f32,
};

@group(0) @binding(0)
var<storage, read_write> factors: array<f32>;

@group(0) @binding(1)
var<uniform> params: FactorParams;

fn pow2_factor(f: f32) -> f32 {
    let n = u32(ceil(clamp(f, 1.0, params.max_factor)));
    if (n <= 1u) {
        return 1.0;
    }
    return f32(1u << (32u - countLeadingZeros(n - 1u)));
}

@compute @workgroup_size(64)
fn compute_tess_factors_tri(@builtin(global_invocation_id) id: vec3<u32>) {
    let patch_id = id.x;
    if (patch_id >= params.patch_count) {
        return;
    }
    let edge = pow2_factor(params.edge);
    let base = patch_id * 4u;
    factors[base] = edge;
    factors[base + 1u] = edge;
    factors[base + 2u] = edge;
    factors[base + 3u] = pow2_factor(params.inside);
}

@compute @workgroup_size(64)
fn compute_tess_factors_quad(@builtin(global_invocation_id) id: vec3<u32>) {
    let patch_id = id.x;
    if (patch_id >= params.patch_count) {
        return;
    }
    let edge = pow2_factor(params.edge);
    let inside = pow2_factor(params.inside);
    let base = patch_id * 6u;
    factors[base] = edge;
    factors[base + 1u] = edge;
    factors[base + 2u] = edge;
    factors[base + 3u] = edge;
    factors[base + 4u] = inside;
    factors[base + 5u] = inside;
}
"#;

/// WGSL patch expansion program.
///
/// One instance per patch. Each vertex derives its domain coordinate from
/// `vertex_index` and the patch's factor record, then evaluates the patch
/// from its control points. Vertices past the patch's level are emitted
/// outside the clip volume so their triangles are discarded.
pub const PATCH_SHADER: &str = r#"
struct FrameUniforms {
    view_proj: mat4x4<f32>,
};

struct DrawUniforms {
    model: mat4x4<f32>,
    spherify: u32,
    index_format: u32,
    max_level: u32,
    _pad: u32,
};

struct ControlPoint {
    position: vec3<f32>,
    normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) bary: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> frame_uniforms: FrameUniforms;
@group(0) @binding(1)
var color_ramp: texture_2d<f32>;
@group(0) @binding(2)
var ramp_sampler: sampler;

@group(1) @binding(0)
var<uniform> draw_uniforms: DrawUniforms;
@group(1) @binding(1)
var<storage, read> control_points: array<f32>;
@group(1) @binding(2)
var<storage, read> control_indices: array<u32>;
@group(1) @binding(3)
var<storage, read> factors: array<f32>;

const CULLED: vec4<f32> = vec4<f32>(2.0, 2.0, 2.0, 1.0);

fn control_index(patch_id: u32, corner: u32, per_patch: u32) -> u32 {
    let i = patch_id * per_patch + corner;
    var point = i;
    if (draw_uniforms.index_format == 1u) {
        let word = control_indices[i / 2u];
        point = select(word & 0xffffu, word >> 16u, (i & 1u) == 1u);
    } else if (draw_uniforms.index_format == 2u) {
        point = control_indices[i];
    }
    return point;
}

fn fetch_point(patch_id: u32, corner: u32, per_patch: u32) -> ControlPoint {
    let base = control_index(patch_id, corner, per_patch) * 6u;
    var cp: ControlPoint;
    cp.position = vec3<f32>(control_points[base], control_points[base + 1u], control_points[base + 2u]);
    cp.normal = vec3<f32>(control_points[base + 3u], control_points[base + 4u], control_points[base + 5u]);
    return cp;
}

fn level_of(factor: f32) -> u32 {
    return clamp(u32(factor), 1u, draw_uniforms.max_level);
}

fn snap_to_edge(t: f32, edge_factor: f32) -> f32 {
    return round(t * edge_factor) / edge_factor;
}

fn corner_bary(corner: u32) -> vec3<f32> {
    return vec3<f32>(f32(corner == 0u), f32(corner == 1u), f32(corner == 2u));
}

fn finish(position: vec3<f32>, normal: vec3<f32>, radius: f32, corner: u32) -> VertexOutput {
    var p = position;
    var n = normal;
    if (draw_uniforms.spherify != 0u) {
        p = normalize(p) * radius;
        n = normalize(p);
    }
    let world = draw_uniforms.model * vec4<f32>(p, 1.0);
    var out: VertexOutput;
    out.clip_position = frame_uniforms.view_proj * world;
    out.world_normal = normalize((draw_uniforms.model * vec4<f32>(n, 0.0)).xyz);
    out.bary = corner_bary(corner);
    return out;
}

fn culled() -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = CULLED;
    out.world_normal = vec3<f32>(0.0, 1.0, 0.0);
    out.bary = vec3<f32>(1.0, 0.0, 0.0);
    return out;
}

@vertex
fn vs_patch_tri(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) patch_id: u32,
) -> VertexOutput {
    let record = patch_id * 4u;
    let n = level_of(factors[record + 3u]);
    let tri = vertex_index / 3u;
    if (tri >= n * n) {
        return culled();
    }
    let corner = vertex_index % 3u;

    var row = 0u;
    var start = 0u;
    for (; row + 1u < n; row++) {
        let count = 2u * (n - row) - 1u;
        if (tri < start + count) {
            break;
        }
        start += count;
    }
    let local = tri - start;
    let k = local / 2u;
    var gi: u32;
    var gj: u32;
    if ((local & 1u) == 0u) {
        gi = k + u32(corner == 1u);
        gj = row + u32(corner == 2u);
    } else {
        gi = k + u32(corner != 2u);
        gj = row + u32(corner != 0u);
    }

    let nf = f32(n);
    var u = f32(gi) / nf;
    var v = f32(gj) / nf;
    if (gi == 0u) {
        v = snap_to_edge(v, factors[record]);
    } else if (gj == 0u) {
        u = snap_to_edge(u, factors[record + 1u]);
    } else if (gi + gj == n) {
        u = snap_to_edge(u, factors[record + 2u]);
        v = 1.0 - u;
    }
    let w = 1.0 - u - v;

    let p0 = fetch_point(patch_id, 0u, 3u);
    let p1 = fetch_point(patch_id, 1u, 3u);
    let p2 = fetch_point(patch_id, 2u, 3u);
    let position = u * p0.position + v * p1.position + w * p2.position;
    let normal = normalize(u * p0.normal + v * p1.normal + w * p2.normal);
    let radius = (length(p0.position) + length(p1.position) + length(p2.position)) / 3.0;
    return finish(position, normal, radius, corner);
}

@vertex
fn vs_patch_quad(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) patch_id: u32,
) -> VertexOutput {
    let record = patch_id * 6u;
    let nu = level_of(factors[record + 4u]);
    let nv = level_of(factors[record + 5u]);
    let cell = vertex_index / 6u;
    if (cell >= nu * nv) {
        return culled();
    }
    let corner = vertex_index % 6u;

    var offsets = array<vec2<u32>, 6>(
        vec2<u32>(0u, 0u), vec2<u32>(1u, 0u), vec2<u32>(1u, 1u),
        vec2<u32>(0u, 0u), vec2<u32>(1u, 1u), vec2<u32>(0u, 1u),
    );
    let offset = offsets[corner];
    let x = cell % nu + offset.x;
    let y = cell / nu + offset.y;

    var u = f32(x) / f32(nu);
    var v = f32(y) / f32(nv);
    if (x == 0u) {
        v = snap_to_edge(v, factors[record]);
    } else if (x == nu) {
        v = snap_to_edge(v, factors[record + 2u]);
    }
    if (y == 0u) {
        u = snap_to_edge(u, factors[record + 1u]);
    } else if (y == nv) {
        u = snap_to_edge(u, factors[record + 3u]);
    }

    let p0 = fetch_point(patch_id, 0u, 4u);
    let p1 = fetch_point(patch_id, 1u, 4u);
    let p2 = fetch_point(patch_id, 2u, 4u);
    let p3 = fetch_point(patch_id, 3u, 4u);
    let position = mix(mix(p0.position, p1.position, u), mix(p3.position, p2.position, u), v);
    let normal = normalize(mix(mix(p0.normal, p1.normal, u), mix(p3.normal, p2.normal, u), v));
    let radius = (length(p0.position) + length(p1.position) + length(p2.position) + length(p3.position)) / 4.0;
    return finish(position, normal, radius, corner % 3u);
}

fn shade(world_normal: vec3<f32>) -> vec3<f32> {
    let light_dir = normalize(vec3<f32>(0.3, 1.0, 0.5));
    let ndotl = dot(normalize(world_normal), light_dir);
    return textureSample(color_ramp, ramp_sampler, vec2<f32>(ndotl * 0.5 + 0.5, 0.5)).rgb;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(shade(in.world_normal), 1.0);
}

@fragment
fn fs_wireframe(in: VertexOutput) -> @location(0) vec4<f32> {
    let width = fwidth(in.bary) * 1.5;
    let edge = smoothstep(vec3<f32>(0.0), width, in.bary);
    let coverage = 1.0 - min(edge.x, min(edge.y, edge.z));
    let color = shade(in.world_normal);
    if (coverage < 0.5) {
        discard;
    }
    return vec4<f32>(color, 1.0);
}
"#;
