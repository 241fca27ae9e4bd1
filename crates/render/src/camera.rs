use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec2, Vec3};
use tessera_input::MoveFlags;

use crate::config::CameraConfig;

/// Near clip plane distance.
pub const NEAR_PLANE: f32 = 0.1;
/// Far clip plane distance.
pub const FAR_PLANE: f32 = 100.0;

/// Free-flying first-person camera.
///
/// Orientation is a unit `look` vector rotated in place by yaw (about world
/// up) and pitch (about the camera's right axis). Pitch is clamped so `look`
/// never gets closer than `90° - max_pitch` to straight up or down.
///
/// `look` parallel to `up` makes the view basis degenerate (NaN). The pitch
/// clamp keeps integration away from it; callers setting `look` directly must
/// do the same.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub eye: Vec3,
    look: Vec3,
    up: Vec3,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    /// Units per second.
    pub speed: f32,
    /// Radians per cursor unit.
    pub sensitivity: f32,
    /// Maximum deviation of `look` from the horizon, radians.
    pub max_pitch: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl FlyCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            eye: config.eye,
            look: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            speed: config.speed,
            sensitivity: config.sensitivity,
            max_pitch: config.max_pitch_degrees.to_radians(),
        }
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Point the camera along `direction` (normalized here).
    pub fn set_look(&mut self, direction: Vec3) {
        self.look = direction.normalize();
    }

    /// Camera right axis, `normalize(look × up)`.
    pub fn across(&self) -> Vec3 {
        self.look.cross(self.up).normalize()
    }

    /// World-to-eye transform (right-handed, camera looks down -Z).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.look, self.up)
    }

    /// Right-handed perspective with clip-space depth in `[0, 1]`.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect_ratio, NEAR_PLANE, FAR_PLANE)
    }

    pub fn view_projection(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Advance the camera by one tick of `dt` seconds.
    ///
    /// Horizontal and vertical movement are applied independently, so holding
    /// a horizontal key together with up/down moves faster than either alone.
    /// Yaw is applied before the pitch clamp is evaluated.
    pub fn integrate(&mut self, dt: f32, cursor_delta: Vec2, flags: MoveFlags) {
        let across = self.across();
        let (x, z) = flags.horizontal_axes();
        if x.hypot(z) > 1e-4 {
            let intent = (across * x + self.look * z).normalize();
            self.eye += intent * self.speed * dt;
        }

        let y = flags.vertical_axis();
        if y.abs() > 1e-4 {
            self.eye += self.up * y.signum() * self.speed * dt;
        }

        if cursor_delta.x != 0.0 {
            let yaw = -cursor_delta.x * self.sensitivity;
            self.look = (Quat::from_axis_angle(self.up, yaw) * self.look).normalize();
        }

        if cursor_delta.y != 0.0 {
            let across = self.across();
            let angle_to_up = self.look.dot(self.up).clamp(-1.0, 1.0).acos();
            let angle_to_down = self.look.dot(-self.up).clamp(-1.0, 1.0).acos();
            let margin = FRAC_PI_2 - self.max_pitch;
            let max_up = (angle_to_up - margin).max(0.0);
            let max_down = (angle_to_down - margin).max(0.0);
            let pitch = (cursor_delta.y * self.sensitivity).clamp(-max_down, max_up);
            self.look = (Quat::from_axis_angle(across, pitch) * self.look).normalize();
        }
    }
}
