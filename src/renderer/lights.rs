use glam::Vec3;

use crate::renderer::texture::Texture;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// World-space direction the light travels in.
    pub direction: Vec3,
    pub color: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub radius: f32,
    /// Optional 1D falloff lookup indexed by normalized distance.
    pub dist_att_texture: Option<Texture>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Light::Directional(DirectionalLight {
            direction: direction.normalize_or_zero(),
            color,
        })
    }

    pub fn point(position: Vec3, color: Vec3, radius: f32) -> Self {
        Light::Point(PointLight {
            position,
            color,
            radius,
            dist_att_texture: None,
        })
    }

    pub fn color(&self) -> Vec3 {
        match self {
            Light::Directional(light) => light.color,
            Light::Point(light) => light.color,
        }
    }
}

/// The lights one deferred frame accumulates, in submission order.
#[derive(Clone, Debug, Default)]
pub struct LightSet {
    pub ambient: Vec3,
    lights: Vec<Light>,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ambient(ambient: Vec3) -> Self {
        Self {
            ambient,
            lights: Vec::new(),
        }
    }

    pub fn add(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn has_ambient(&self) -> bool {
        self.ambient != Vec3::ZERO
    }
}
