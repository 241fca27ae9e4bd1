//! Tessellation factor tunables and the CPU mirror of the factor program's
//! power-of-two partitioning.

/// Largest tessellation factor the patch expansion draw is sized for.
pub const DEFAULT_MAX_FACTOR: u32 = 16;

/// Upper bound on any configured maximum factor. Keeps the per-patch vertex
/// budget (`6·max²` for quads) well inside `u32`.
pub const MAX_TESSELLATION_FACTOR: u32 = 64;

/// Threads per workgroup of the factor compute program.
pub const FACTOR_WORKGROUP_SIZE: u32 = 64;

/// Map a `[0, 1]` slider position to a factor in log space, rounding up to
/// the next power of two: `2^ceil(t·log2(max_factor))`.
pub fn factor_from_slider(t: f32, max_factor: u32) -> f32 {
    let log_max = max_factor.max(1).ilog2() as f32;
    (t.clamp(0.0, 1.0) * log_max).ceil().exp2()
}

/// Clamp `factor` to `[1, max_factor]` and round it up to a power of two.
pub fn pow2_factor(factor: f32, max_factor: u32) -> f32 {
    factor.clamp(1.0, max_factor.max(1) as f32).log2().ceil().exp2()
}

/// Workgroups needed to cover `patch_count` patches, one thread per patch.
pub fn workgroup_count(patch_count: u32) -> u32 {
    patch_count.div_ceil(FACTOR_WORKGROUP_SIZE)
}

/// Per-renderer settings exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationSettings {
    pub edge_factor: f32,
    pub inside_factor: f32,
    pub wireframe: bool,
    pub spherify: bool,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            edge_factor: 1.0,
            inside_factor: 1.0,
            wireframe: false,
            spherify: true,
        }
    }
}

impl TessellationSettings {
    /// Set both factors from one slider position.
    pub fn with_slider(mut self, t: f32, max_factor: u32) -> Self {
        let factor = factor_from_slider(t, max_factor);
        self.edge_factor = factor;
        self.inside_factor = factor;
        self
    }

    pub fn label(&self) -> String {
        format!(
            "Tessellation factors: [{}, {}]",
            self.edge_factor, self.inside_factor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_endpoints() {
        assert_eq!(factor_from_slider(0.0, 16), 1.0);
        assert_eq!(factor_from_slider(1.0, 16), 16.0);
        assert_eq!(factor_from_slider(0.5, 16), 4.0);
        assert_eq!(factor_from_slider(0.3, 16), 4.0);
        assert_eq!(factor_from_slider(0.26, 16), 4.0);
        assert_eq!(factor_from_slider(0.25, 16), 2.0);
    }

    #[test]
    fn slider_output_is_power_of_two_in_range() {
        for max in [1, 2, 8, 16, 64] {
            for step in 0..=100 {
                let f = factor_from_slider(step as f32 / 100.0, max);
                assert!((1.0..=max as f32).contains(&f), "{f} outside [1, {max}]");
                assert!(f.fract() == 0.0 && (f as u32).is_power_of_two(), "{f} is not a power of two");
            }
        }
    }

    #[test]
    fn slider_clamps_out_of_range_input() {
        assert_eq!(factor_from_slider(-3.0, 16), 1.0);
        assert_eq!(factor_from_slider(7.0, 16), 16.0);
    }

    #[test]
    fn pow2_partitioning() {
        assert_eq!(pow2_factor(0.2, 16), 1.0);
        assert_eq!(pow2_factor(3.0, 16), 4.0);
        assert_eq!(pow2_factor(4.0, 16), 4.0);
        assert_eq!(pow2_factor(9.5, 16), 16.0);
        assert_eq!(pow2_factor(100.0, 16), 16.0);
    }

    #[test]
    fn workgroups_cover_all_patches() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(6), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(200), 4);
    }

    #[test]
    fn settings_defaults_and_label() {
        let s = TessellationSettings::default();
        assert!(s.spherify && !s.wireframe);
        let s = s.with_slider(1.0, 16);
        assert_eq!(s.label(), "Tessellation factors: [16, 16]");
    }
}
