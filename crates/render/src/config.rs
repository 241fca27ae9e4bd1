use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::factors::{DEFAULT_MAX_FACTOR, MAX_TESSELLATION_FACTOR, TessellationSettings};
use crate::frame::DEFAULT_ACQUIRE_TIMEOUT;

/// Errors from loading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max_factor must be a power of two, got {0}")]
    InvalidMaxFactor(u32),
    #[error("max_factor {got} exceeds the supported maximum of {limit}")]
    MaxFactorTooLarge { got: u32, limit: u32 },
    #[error("sample_count must be 1, 2, 4 or 8, got {0}")]
    InvalidSampleCount(u32),
    #[error("max_pitch_degrees must be in (0, 90), got {0}")]
    InvalidMaxPitch(f32),
    #[error("slider must be in [0, 1], got {0}")]
    InvalidSlider(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub fov_y_degrees: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub max_pitch_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 6.0),
            fov_y_degrees: 60.0,
            speed: 2.0,
            sensitivity: 0.0125,
            max_pitch_degrees: 0.98 * 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationConfig {
    pub max_factor: u32,
    /// Initial slider position in `[0, 1]`.
    pub slider: f32,
    pub wireframe: bool,
    pub spherify: bool,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self {
            max_factor: DEFAULT_MAX_FACTOR,
            slider: 0.0,
            wireframe: false,
            spherify: true,
        }
    }
}

impl TessellationConfig {
    pub fn settings(&self) -> TessellationSettings {
        TessellationSettings {
            wireframe: self.wireframe,
            spherify: self.spherify,
            ..TessellationSettings::default()
        }
        .with_slider(self.slider, self.max_factor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferConfig {
    pub sample_count: u32,
    /// Linear RGBA clear color.
    pub clear_color: [f64; 4],
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            sample_count: 4,
            clear_color: [0.11, 0.11, 0.12, 1.0],
        }
    }
}

/// One mesh placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Built-in primitive, `<assets>/<name>.obj`, or a path to an OBJ file.
    pub name: String,
    #[serde(default)]
    pub translation: Vec3,
    /// Fetch control points through the mesh's index buffer.
    #[serde(default)]
    pub indexed: bool,
}

impl MeshConfig {
    pub fn new(name: impl Into<String>, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            translation,
            indexed: false,
        }
    }
}

/// Check that `max_factor` is a power of two no larger than
/// [`MAX_TESSELLATION_FACTOR`].
pub fn check_max_factor(max_factor: u32) -> Result<(), ConfigError> {
    if !max_factor.is_power_of_two() {
        return Err(ConfigError::InvalidMaxFactor(max_factor));
    }
    if max_factor > MAX_TESSELLATION_FACTOR {
        return Err(ConfigError::MaxFactorTooLarge {
            got: max_factor,
            limit: MAX_TESSELLATION_FACTOR,
        });
    }
    Ok(())
}

/// Scene description for the viewer and the headless renderer.
///
/// Every field has a default, so a config file only lists what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub tessellation: TessellationConfig,
    pub framebuffer: FramebufferConfig,
    pub frame_acquire_timeout_ms: u64,
    /// Color ramp texture name.
    pub color_ramp: String,
    pub meshes: Vec<MeshConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            tessellation: TessellationConfig::default(),
            framebuffer: FramebufferConfig::default(),
            frame_acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT.as_millis() as u64,
            color_ramp: "plasma".to_string(),
            meshes: vec![
                MeshConfig::new("box", Vec3::new(-2.0, 0.0, 0.0)),
                MeshConfig::new("ico", Vec3::new(2.0, 0.0, 0.0)),
            ],
        }
    }
}

impl SceneConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), meshes = config.meshes.len(), "loaded scene config");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_max_factor(self.tessellation.max_factor)?;
        if !matches!(self.framebuffer.sample_count, 1 | 2 | 4 | 8) {
            return Err(ConfigError::InvalidSampleCount(self.framebuffer.sample_count));
        }
        let pitch = self.camera.max_pitch_degrees;
        if !(pitch > 0.0 && pitch < 90.0) {
            return Err(ConfigError::InvalidMaxPitch(pitch));
        }
        let slider = self.tessellation.slider;
        if !(0.0..=1.0).contains(&slider) {
            return Err(ConfigError::InvalidSlider(slider));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_acquire_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_describe_two_mesh_scene() {
        let config = SceneConfig::default();
        config.validate().unwrap();
        assert_eq!(config.meshes.len(), 2);
        assert_eq!(config.meshes[0].name, "box");
        assert_eq!(config.meshes[1].translation, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(config.tessellation.max_factor, 16);
        assert_eq!(config.framebuffer.sample_count, 4);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(1));
        assert_eq!(config.camera.eye, Vec3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(SceneConfig::from_json("{}").unwrap(), SceneConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = SceneConfig::from_json(
            r#"{
                "camera": { "speed": 5.0 },
                "tessellation": { "slider": 1.0, "wireframe": true },
                "meshes": [ { "name": "ico", "indexed": true } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.camera.speed, 5.0);
        assert_eq!(config.camera.fov_y_degrees, 60.0);
        assert_eq!(config.meshes.len(), 1);
        assert!(config.meshes[0].indexed);
        assert_eq!(config.meshes[0].translation, Vec3::ZERO);

        let settings = config.tessellation.settings();
        assert_eq!(settings.edge_factor, 16.0);
        assert_eq!(settings.inside_factor, 16.0);
        assert!(settings.wireframe && settings.spherify);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = SceneConfig::from_json(r#"{ "tessellation": { "max_factor": 12 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxFactor(12)));

        let err = SceneConfig::from_json(r#"{ "tessellation": { "max_factor": 65536 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MaxFactorTooLarge { got: 65536, limit: 64 }
        ));

        let err = SceneConfig::from_json(r#"{ "framebuffer": { "sample_count": 3 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampleCount(3)));

        let err = SceneConfig::from_json(r#"{ "camera": { "max_pitch_degrees": 90.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxPitch(_)));

        let err = SceneConfig::from_json(r#"{ "tessellation": { "slider": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSlider(_)));

        let err = SceneConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn max_factor_bound_keeps_vertex_budget_in_range() {
        use crate::patch::PatchTopology;

        check_max_factor(MAX_TESSELLATION_FACTOR).unwrap();
        assert!(check_max_factor(MAX_TESSELLATION_FACTOR * 2).is_err());
        assert!(check_max_factor(1 << 31).is_err());
        assert!(matches!(check_max_factor(0), Err(ConfigError::InvalidMaxFactor(0))));
        assert_eq!(
            PatchTopology::Quad.vertices_per_patch(MAX_TESSELLATION_FACTOR),
            6 * 64 * 64
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{ "color_ramp": "gray", "frame_acquire_timeout_ms": 250 }}"#).unwrap();
        drop(file);

        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.color_ramp, "gray");
        assert_eq!(config.acquire_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn json_output_reloads() {
        let mut config = SceneConfig::default();
        config.framebuffer.sample_count = 1;
        let text = config.to_json().unwrap();
        assert_eq!(SceneConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SceneConfig::load(Path::new("/nonexistent/scene.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/scene.json"));
    }
}
