// renderer/shared.rs
//
// Per-frame values every pass may read: transform matrices and the
// quantities derived from them, camera and viewport scalars, time, plus a
// small registry of engine-wide textures.
use std::collections::HashMap;

use bitflags::bitflags;
use glam::{Mat4, Vec3};

use crate::renderer::device::Device;
use crate::renderer::pass::StateError;
use crate::renderer::program::{Sampler, Uniform};
use crate::renderer::texture::Texture;
use crate::renderer::uniforms::{UniformType, UniformValue};

/// Identifies a shared uniform or sampler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedId {
    Model,
    View,
    Projection,
    ModelView,
    ViewProjection,
    ModelViewProjection,
    InverseModel,
    InverseView,
    InverseProjection,
    InverseModelView,
    InverseViewProjection,
    InverseModelViewProjection,
    CameraNearZ,
    CameraFarZ,
    CameraAspectRatio,
    CameraFov,
    CameraPosition,
    ViewportWidth,
    ViewportHeight,
    Time,
    /// Application-defined slot, filled with `set_custom_uniform` or
    /// `register_sampler`.
    Custom(u16),
}

/// A shared uniform a reflection provider may bind by name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSignature {
    pub name: String,
    pub ty: UniformType,
    pub id: SharedId,
}

impl SharedSignature {
    pub fn new(name: impl Into<String>, ty: UniformType, id: SharedId) -> Self {
        Self {
            name: name.into(),
            ty,
            id,
        }
    }
}

/// The nine matrices computed from model, view and projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedMatrix {
    ModelView,
    ViewProjection,
    ModelViewProjection,
    InverseModel,
    InverseView,
    InverseProjection,
    InverseModelView,
    InverseViewProjection,
    InverseModelViewProjection,
}

impl DerivedMatrix {
    pub const ALL: [DerivedMatrix; 9] = [
        Self::ModelView,
        Self::ViewProjection,
        Self::ModelViewProjection,
        Self::InverseModel,
        Self::InverseView,
        Self::InverseProjection,
        Self::InverseModelView,
        Self::InverseViewProjection,
        Self::InverseModelViewProjection,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn flag(self) -> DirtyMatrices {
        DirtyMatrices::from_bits_truncate(1 << self.index())
    }
}

bitflags! {
    /// Derived matrices whose cached value is stale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyMatrices: u16 {
        const MODEL_VIEW = 1 << 0;
        const VIEW_PROJECTION = 1 << 1;
        const MODEL_VIEW_PROJECTION = 1 << 2;
        const INVERSE_MODEL = 1 << 3;
        const INVERSE_VIEW = 1 << 4;
        const INVERSE_PROJECTION = 1 << 5;
        const INVERSE_MODEL_VIEW = 1 << 6;
        const INVERSE_VIEW_PROJECTION = 1 << 7;
        const INVERSE_MODEL_VIEW_PROJECTION = 1 << 8;

        const MODEL_DEPENDENTS = Self::MODEL_VIEW.bits()
            | Self::MODEL_VIEW_PROJECTION.bits()
            | Self::INVERSE_MODEL.bits()
            | Self::INVERSE_MODEL_VIEW.bits()
            | Self::INVERSE_MODEL_VIEW_PROJECTION.bits();
        const VIEW_DEPENDENTS = Self::MODEL_VIEW.bits()
            | Self::VIEW_PROJECTION.bits()
            | Self::MODEL_VIEW_PROJECTION.bits()
            | Self::INVERSE_VIEW.bits()
            | Self::INVERSE_MODEL_VIEW.bits()
            | Self::INVERSE_VIEW_PROJECTION.bits()
            | Self::INVERSE_MODEL_VIEW_PROJECTION.bits();
        const PROJECTION_DEPENDENTS = Self::VIEW_PROJECTION.bits()
            | Self::MODEL_VIEW_PROJECTION.bits()
            | Self::INVERSE_PROJECTION.bits()
            | Self::INVERSE_VIEW_PROJECTION.bits()
            | Self::INVERSE_MODEL_VIEW_PROJECTION.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProperties {
    pub position: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near_z: f32,
    pub far_z: f32,
}

impl Default for CameraProperties {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            fov: 90.0,
            aspect: 1.0,
            near_z: 0.1,
            far_z: 100.0,
        }
    }
}

/// Lazily evaluated per-frame program state.
///
/// Writing a base matrix only marks its dependents dirty; a derived matrix is
/// recomputed the first time it is read afterwards and cached until one of
/// its inputs changes again.
#[derive(Debug, Clone)]
pub struct SharedProgramState {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    derived: [Mat4; 9],
    dirty: DirtyMatrices,
    recomputes: [u32; 9],
    camera: CameraProperties,
    viewport_width: f32,
    viewport_height: f32,
    time: f32,
    custom: HashMap<u16, UniformValue>,
    samplers: HashMap<SharedId, Texture>,
}

impl Default for SharedProgramState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedProgramState {
    pub fn new() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            derived: [Mat4::IDENTITY; 9],
            dirty: DirtyMatrices::all(),
            recomputes: [0; 9],
            camera: CameraProperties::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
            time: 0.0,
            custom: HashMap::new(),
            samplers: HashMap::new(),
        }
    }

    /// Signatures of every built-in shared uniform.
    pub fn reserve_supported() -> Vec<SharedSignature> {
        use UniformType as T;

        [
            ("wyM", T::Mat4, SharedId::Model),
            ("wyV", T::Mat4, SharedId::View),
            ("wyP", T::Mat4, SharedId::Projection),
            ("wyMV", T::Mat4, SharedId::ModelView),
            ("wyVP", T::Mat4, SharedId::ViewProjection),
            ("wyMVP", T::Mat4, SharedId::ModelViewProjection),
            ("wyInvM", T::Mat4, SharedId::InverseModel),
            ("wyInvV", T::Mat4, SharedId::InverseView),
            ("wyInvP", T::Mat4, SharedId::InverseProjection),
            ("wyInvMV", T::Mat4, SharedId::InverseModelView),
            ("wyInvVP", T::Mat4, SharedId::InverseViewProjection),
            ("wyInvMVP", T::Mat4, SharedId::InverseModelViewProjection),
            ("wyCameraNearZ", T::Float, SharedId::CameraNearZ),
            ("wyCameraFarZ", T::Float, SharedId::CameraFarZ),
            ("wyCameraAspectRatio", T::Float, SharedId::CameraAspectRatio),
            ("wyCameraFOV", T::Float, SharedId::CameraFov),
            ("wyCameraPosition", T::Vec3, SharedId::CameraPosition),
            ("wyViewportWidth", T::Float, SharedId::ViewportWidth),
            ("wyViewportHeight", T::Float, SharedId::ViewportHeight),
            ("wyTime", T::Float, SharedId::Time),
        ]
        .into_iter()
        .map(|(name, ty, id)| SharedSignature::new(name, ty, id))
        .collect()
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn camera_properties(&self) -> CameraProperties {
        self.camera
    }

    pub fn viewport_size(&self) -> (f32, f32) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_model_matrix(&mut self, matrix: Mat4) {
        self.model = matrix;
        self.dirty |= DirtyMatrices::MODEL_DEPENDENTS;
    }

    pub fn set_view_matrix(&mut self, matrix: Mat4) {
        self.view = matrix;
        self.dirty |= DirtyMatrices::VIEW_DEPENDENTS;
    }

    pub fn set_projection_matrix(&mut self, matrix: Mat4) {
        self.projection = matrix;
        self.dirty |= DirtyMatrices::PROJECTION_DEPENDENTS;
    }

    /// Orthographic projection over `[0, width] x [0, height] x [-1, 1]`.
    pub fn set_ortho_projection(&mut self, width: f32, height: f32) {
        self.set_projection_matrix(Mat4::orthographic_rh_gl(0.0, width, 0.0, height, -1.0, 1.0));
    }

    pub fn set_ortho_volume(&mut self, min: Vec3, max: Vec3) {
        self.set_projection_matrix(Mat4::orthographic_rh_gl(
            min.x, max.x, min.y, max.y, min.z, max.z,
        ));
    }

    /// `fov` is the vertical field of view in degrees.
    pub fn set_perspective_projection(&mut self, fov: f32, aspect: f32, near_z: f32, far_z: f32) {
        self.set_projection_matrix(Mat4::perspective_rh_gl(
            fov.to_radians(),
            aspect,
            near_z,
            far_z,
        ));
    }

    pub fn set_camera_properties(&mut self, camera: CameraProperties) {
        self.camera = camera;
    }

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn set_custom_uniform(&mut self, id: u16, value: impl Into<UniformValue>) {
        self.custom.insert(id, value.into());
    }

    pub fn register_sampler(&mut self, id: SharedId, texture: Texture) {
        self.samplers.insert(id, texture);
    }

    pub fn unregister_sampler(&mut self, id: SharedId) -> Option<Texture> {
        self.samplers.remove(&id)
    }

    pub fn is_dirty(&self, which: DerivedMatrix) -> bool {
        self.dirty.contains(which.flag())
    }

    /// How many times `which` has been recomputed since construction.
    pub fn recompute_count(&self, which: DerivedMatrix) -> u32 {
        self.recomputes[which.index()]
    }

    /// Returns a derived matrix, recomputing it first if it is stale.
    pub fn derived(&mut self, which: DerivedMatrix) -> Mat4 {
        if self.dirty.contains(which.flag()) {
            let value = match which {
                DerivedMatrix::ModelView => self.view * self.model,
                DerivedMatrix::ViewProjection => self.projection * self.view,
                DerivedMatrix::ModelViewProjection => {
                    self.derived(DerivedMatrix::ViewProjection) * self.model
                }
                DerivedMatrix::InverseModel => self.model.inverse(),
                DerivedMatrix::InverseView => self.view.inverse(),
                DerivedMatrix::InverseProjection => self.projection.inverse(),
                DerivedMatrix::InverseModelView => self.derived(DerivedMatrix::ModelView).inverse(),
                DerivedMatrix::InverseViewProjection => {
                    self.derived(DerivedMatrix::ViewProjection).inverse()
                }
                DerivedMatrix::InverseModelViewProjection => {
                    self.derived(DerivedMatrix::ModelViewProjection).inverse()
                }
            };
            self.derived[which.index()] = value;
            self.dirty.remove(which.flag());
            self.recomputes[which.index()] += 1;
        }
        self.derived[which.index()]
    }

    /// Current value of a shared slot, or `None` for an unknown custom slot.
    pub fn value(&mut self, id: SharedId) -> Option<UniformValue> {
        let value: UniformValue = match id {
            SharedId::Model => self.model.into(),
            SharedId::View => self.view.into(),
            SharedId::Projection => self.projection.into(),
            SharedId::ModelView => self.derived(DerivedMatrix::ModelView).into(),
            SharedId::ViewProjection => self.derived(DerivedMatrix::ViewProjection).into(),
            SharedId::ModelViewProjection => {
                self.derived(DerivedMatrix::ModelViewProjection).into()
            }
            SharedId::InverseModel => self.derived(DerivedMatrix::InverseModel).into(),
            SharedId::InverseView => self.derived(DerivedMatrix::InverseView).into(),
            SharedId::InverseProjection => self.derived(DerivedMatrix::InverseProjection).into(),
            SharedId::InverseModelView => self.derived(DerivedMatrix::InverseModelView).into(),
            SharedId::InverseViewProjection => {
                self.derived(DerivedMatrix::InverseViewProjection).into()
            }
            SharedId::InverseModelViewProjection => {
                self.derived(DerivedMatrix::InverseModelViewProjection).into()
            }
            SharedId::CameraNearZ => self.camera.near_z.into(),
            SharedId::CameraFarZ => self.camera.far_z.into(),
            SharedId::CameraAspectRatio => self.camera.aspect.into(),
            SharedId::CameraFov => self.camera.fov.into(),
            SharedId::CameraPosition => self.camera.position.into(),
            SharedId::ViewportWidth => self.viewport_width.into(),
            SharedId::ViewportHeight => self.viewport_height.into(),
            SharedId::Time => self.time.into(),
            SharedId::Custom(slot) => return self.custom.get(&slot).copied(),
        };
        Some(value)
    }

    /// Uploads the value of a shared uniform to `location`.
    ///
    /// Slots this state does not know about are skipped silently so programs
    /// may reference shared inputs that nothing provides yet.
    pub fn update_uniform<D: Device + ?Sized>(
        &mut self,
        uniform: &Uniform,
        location: u32,
        device: &mut D,
    ) -> Result<(), StateError> {
        let Some(id) = uniform.shared else {
            return Ok(());
        };
        let Some(value) = self.value(id) else {
            return Ok(());
        };
        if value.uniform_type() != uniform.ty {
            return Err(StateError::TypeMismatch {
                name: uniform.name.clone(),
                expected: uniform.ty,
                found: value.uniform_type(),
            });
        }
        device.upload_uniform(location, &[value]);
        Ok(())
    }

    /// Binds the registered texture for a shared sampler to `unit`.
    pub fn update_sampler<D: Device + ?Sized>(
        &self,
        sampler: &Sampler,
        unit: u32,
        device: &mut D,
    ) -> Result<(), StateError> {
        let Some(texture) = sampler.shared.and_then(|id| self.samplers.get(&id)) else {
            return Ok(());
        };
        if !sampler.ty.accepts(texture.kind) {
            return Err(StateError::SamplerMismatch {
                name: sampler.name.clone(),
                expected: sampler.ty,
                found: texture.kind,
            });
        }
        device.bind_texture(unit, Some(texture));
        Ok(())
    }
}
