use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Perspective camera looking down -Z from a fixed eye.
pub struct Camera {
    pub eye: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::from_array(config.eye),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: width as f32 / height as f32,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }

    pub fn target(&self) -> Vec3 { self.eye + self.forward }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height as f32; }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target(), self.up)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scene_layout() {
        let cam = Camera::new(800, 600);
        assert_eq!(cam.eye, Vec3::new(0.0, 1.0, 18.0));
        assert_eq!(cam.aspect, 800.0 / 600.0);
        assert!((cam.fov_y - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn globe_center_projects_inside_clip_space() {
        let cam = Camera::new(1280, 720);
        let clip = cam.view_proj() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y < 0.0 && ndc.y > -1.0, "eye sits above the globe, center should be below middle");
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn aspect_tracks_resize() {
        let mut cam = Camera::new(800, 600);
        cam.set_aspect(1920, 1080);
        assert_eq!(cam.aspect, 1920.0 / 1080.0);
    }
}
