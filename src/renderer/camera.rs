use glam::{Mat4, Quat, Vec3};

use crate::renderer::shared::{CameraProperties, SharedProgramState};

/// Perspective camera; `fov` is the vertical field of view in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov: f32,
    pub aspect: f32,
    pub near_z: f32,
    pub far_z: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov: 60.0,
            aspect: 16.0 / 9.0,
            near_z: 0.1,
            far_z: 100.0,
        }
    }
}

impl Camera {
    /// Places the camera at `eye` looking towards `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let world_to_view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = world_to_view.inverse().to_scale_rotation_translation();
        Self {
            position: eye,
            rotation,
            ..Self::default()
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect, self.near_z, self.far_z)
    }

    pub fn properties(&self) -> CameraProperties {
        CameraProperties {
            position: self.position,
            fov: self.fov,
            aspect: self.aspect,
            near_z: self.near_z,
            far_z: self.far_z,
        }
    }

    pub fn apply(&self, shared: &mut SharedProgramState) {
        shared.set_view_matrix(self.view());
        shared.set_projection_matrix(self.projection());
        shared.set_camera_properties(self.properties());
    }
}
