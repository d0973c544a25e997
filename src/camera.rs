//! Orbit camera with damped controls.
//!
//! Yaw/pitch/distance around a fixed target, driven by mouse drag and
//! scroll. Input moves a set of target values; `update` eases the camera
//! toward them each frame so motion keeps gliding briefly after release.

use glam::{Mat3, Mat4, Vec3};

/// Near clip plane, shared with the depth-of-field pass.
pub const NEAR: f32 = 0.1;
/// Far clip plane, shared with the depth-of-field pass.
pub const FAR: f32 = 50.0;

const FOV_Y: f32 = 75.0;
const DRAG_SENSITIVITY: f32 = 0.005;
const ZOOM_STEP: f32 = 0.3;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 40.0;
const PITCH_LIMIT: f32 = 1.5;
const DAMPING: f32 = 10.0;

/// Orbiting perspective camera.
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
    pub aspect: f32,
    goal_yaw: f32,
    goal_pitch: f32,
    goal_distance: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        // Matches a start position of roughly (0, 1, 3) looking at the origin.
        let yaw = 0.0;
        let pitch = 0.32;
        let distance = 3.2;
        Self {
            yaw,
            pitch,
            distance,
            target: Vec3::ZERO,
            aspect,
            goal_yaw: yaw,
            goal_pitch: pitch,
            goal_distance: distance,
        }
    }

    /// Apply a mouse drag in screen pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.goal_yaw -= dx * DRAG_SENSITIVITY;
        self.goal_pitch = (self.goal_pitch + dy * DRAG_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Apply a scroll step (positive zooms in).
    pub fn zoom(&mut self, scroll: f32) {
        self.goal_distance =
            (self.goal_distance - scroll * ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Ease toward the control targets.
    pub fn update(&mut self, dt: f32) {
        let k = 1.0 - (-dt * DAMPING).exp();
        self.yaw += (self.goal_yaw - self.yaw) * k;
        self.pitch += (self.goal_pitch - self.pitch) * k;
        self.distance += (self.goal_distance - self.distance) * k;
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y.to_radians(), self.aspect, NEAR, FAR)
    }

    /// Inverse of the rotation-only view-projection, used to turn NDC
    /// corners back into world-space sky rays.
    pub fn sky_matrix(&self) -> Mat4 {
        let rotation = Mat4::from_mat3(Mat3::from_mat4(self.view_matrix()));
        (self.projection_matrix() * rotation).inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_on_axis_at_zero_angles() {
        let mut cam = OrbitCamera::new(1.0);
        cam.yaw = 0.0;
        cam.pitch = 0.0;
        cam.distance = 5.0;
        let pos = cam.position();
        assert!((pos - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = OrbitCamera::new(1.0);
        for _ in 0..1000 {
            cam.zoom(1.0);
        }
        cam.update(10.0);
        assert!(cam.distance >= MIN_DISTANCE - 1e-4);
        for _ in 0..1000 {
            cam.zoom(-1.0);
        }
        cam.update(10.0);
        assert!(cam.distance <= MAX_DISTANCE + 1e-4);
    }

    #[test]
    fn damping_converges_to_goal() {
        let mut cam = OrbitCamera::new(1.0);
        cam.orbit(100.0, -40.0);
        for _ in 0..300 {
            cam.update(1.0 / 60.0);
        }
        assert!((cam.yaw - cam.goal_yaw).abs() < 1e-3);
        assert!((cam.pitch - cam.goal_pitch).abs() < 1e-3);
    }

    #[test]
    fn pitch_is_limited() {
        let mut cam = OrbitCamera::new(1.0);
        cam.orbit(0.0, 1e6);
        cam.update(10.0);
        assert!(cam.pitch <= PITCH_LIMIT + 1e-3);
    }

    #[test]
    fn sky_matrix_ignores_translation() {
        let cam = OrbitCamera::new(16.0 / 9.0);
        let m = cam.sky_matrix();
        // A forward ray through the NDC center must be finite and nonzero.
        let ray = m * glam::Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!(ray.is_finite());
        assert!(ray.truncate().length() > 0.0);
    }
}
