//! Renderer-agnostic core of the tessellation viewer.
//!
//! Holds everything that does not touch a GPU device: the fly camera, patch
//! layout validation, tessellation factor math, frame pacing primitives and
//! scene configuration. `tessera-render-wgpu` builds the GPU side on top.
//!
//! # Invariants
//! - `FlyCamera::look` is unit length after every update.
//! - At most `FRAMES_IN_FLIGHT` frames are acquired and not yet completed.
//! - A patch layout always covers a whole number of patches.

pub mod camera;
pub mod config;
pub mod domain;
pub mod factors;
pub mod frame;
pub mod patch;
mod report;

pub use camera::FlyCamera;
pub use config::{ConfigError, SceneConfig, check_max_factor};
pub use factors::{MAX_TESSELLATION_FACTOR, TessellationSettings, factor_from_slider};
pub use frame::{Acquire, FRAMES_IN_FLIGHT, FrameCompletion, FrameRing, FrameThrottle};
pub use patch::{IndexFormat, MeshError, PatchLayout, PatchTopology};
pub use report::{PatchSummary, SceneReport};

pub fn crate_info() -> &'static str {
    "tessera-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
