//! Orbit camera
//!
//! Circles the origin at a fixed distance and elevation, producing the
//! view-projection matrix handed to the render pass every tick.

use glam::{Mat4, Vec3};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

pub const DEFAULT_FOV: f32 = PI / 4.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 100.0;
pub const DEFAULT_DISTANCE: f32 = 4.0;

/// Radians per second around the vertical axis.
pub const DEFAULT_SPIN: f32 = 0.25;

const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub distance: f32,
    /// Horizontal angle in radians (0 = looking along -Z)
    pub azimuth: f32,
    pub elevation: f32,
    pub spin: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            azimuth: 0.0,
            elevation: 0.3,
            spin: DEFAULT_SPIN,
            fov: DEFAULT_FOV,
            aspect,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.azimuth = (self.azimuth + self.spin * dt).rem_euclid(TAU);
    }

    pub fn eye(&self) -> Vec3 {
        let elevation = self.elevation.clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
        let horizontal = self.distance * elevation.cos();
        Vec3::new(
            horizontal * self.azimuth.sin(),
            self.distance * elevation.sin(),
            horizontal * self.azimuth.cos(),
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn eye_stays_on_sphere() {
        let mut camera = OrbitCamera::new(1.0);
        for _ in 0..10 {
            camera.advance(1.0);
            assert!((camera.eye().length() - camera.distance).abs() < 1e-4);
        }
    }

    #[test]
    fn origin_projects_to_center() {
        let camera = OrbitCamera::new(16.0 / 9.0);
        let clip = camera.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn zero_height_keeps_aspect() {
        let mut camera = OrbitCamera::new(2.0);
        camera.set_aspect(800, 0);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
