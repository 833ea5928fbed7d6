// renderer/deferred.rs
//
// Deferred shading: a fill pass writes surface attributes into the G-buffer,
// then each light adds its contribution to the output with a full-screen
// quad.
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec4};
use thiserror::Error;
use winit::dpi::PhysicalSize;

use crate::renderer::camera::Camera;
use crate::renderer::device::{ClearFlags, Device, DeviceError, RenderTarget, TargetId};
use crate::renderer::lights::{DirectionalLight, Light, LightSet, PointLight};
use crate::renderer::pass::{Pass, SamplerStateIndex, StateError, UniformStateIndex};
use crate::renderer::primitive::{
    BufferId, GeometryPool, LightVertex, PrimitiveRange, PrimitiveType,
};
use crate::renderer::program::{
    AttributeType, InterfaceError, ProgramInterface, ProgramReflection, SamplerType,
};
use crate::renderer::queue::{Bucket, RenderQueue};
use crate::renderer::render_context::RenderContext;
use crate::renderer::state::RenderState;
use crate::renderer::texture::{Texture, TextureDescriptor, TextureFormat};
use crate::renderer::uniforms::UniformType;
use crate::settings::PipelineSettings;

/// Buffer the light quads are written into.
pub const LIGHT_QUAD_BUFFER: BufferId = BufferId(0);

const QUAD_VERTICES: u32 = 4;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create {what} for the deferred renderer: {source}")]
    Device {
        what: &'static str,
        #[source]
        source: DeviceError,
    },
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Where the pipeline is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    Idle,
    Fill,
    Light,
    Done,
}

/// The three light accumulation programs.
#[derive(Debug, Clone)]
pub struct DeferredPrograms {
    pub ambient: Arc<ProgramReflection>,
    pub directional: Arc<ProgramReflection>,
    pub point: Arc<ProgramReflection>,
}

fn gbuffer_interface() -> ProgramInterface {
    ProgramInterface::new()
        .sampler("colorTexture", SamplerType::SamplerRect)
        .attribute("position", AttributeType::Vec2)
        .attribute("mapping", AttributeType::Vec2)
}

pub fn ambient_interface() -> ProgramInterface {
    gbuffer_interface().uniform("light.color", UniformType::Vec3)
}

pub fn directional_interface() -> ProgramInterface {
    gbuffer_interface()
        .sampler("normalTexture", SamplerType::SamplerRect)
        .sampler("depthTexture", SamplerType::SamplerRect)
        .uniform("nearZ", UniformType::Float)
        .uniform("nearOverFarZminusOne", UniformType::Float)
        .uniform("light.direction", UniformType::Vec3)
        .uniform("light.color", UniformType::Vec3)
        .attribute("clipOverF", AttributeType::Vec2)
}

pub fn point_interface() -> ProgramInterface {
    gbuffer_interface()
        .sampler("normalTexture", SamplerType::SamplerRect)
        .sampler("depthTexture", SamplerType::SamplerRect)
        .sampler("light.distAttTexture", SamplerType::Sampler1D)
        .uniform("nearZ", UniformType::Float)
        .uniform("nearOverFarZminusOne", UniformType::Float)
        .uniform("light.position", UniformType::Vec3)
        .uniform("light.color", UniformType::Vec3)
        .uniform("light.radius", UniformType::Float)
        .attribute("clipOverF", AttributeType::Vec2)
}

#[derive(Debug, Clone, Copy)]
pub struct GBuffer {
    /// Albedo and emission.
    pub color: Texture,
    /// Normal and specularity.
    pub normal: Texture,
    pub depth: Texture,
    pub target: TargetId,
}

impl GBuffer {
    fn create<D: Device>(device: &mut D, size: PhysicalSize<u32>) -> Result<Self, PipelineError> {
        let mut texture = |what: &'static str, format| {
            let desc = TextureDescriptor::render_target(what, format, size.width, size.height);
            device
                .create_texture(&desc)
                .map_err(|source| PipelineError::Device { what, source })
        };

        let color = texture("color texture", TextureFormat::Rgba8)?;
        let normal = texture("normal/specularity texture", TextureFormat::Rgba8)?;
        let depth = texture("depth texture", TextureFormat::Depth32Float)?;

        let target = device
            .create_target(&[color, normal], Some(&depth))
            .map_err(|source| PipelineError::Device {
                what: "G-buffer target",
                source,
            })?;

        Ok(Self {
            color,
            normal,
            depth,
            target,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct DepthIndices {
    near_z: UniformStateIndex,
    near_over_far: UniformStateIndex,
}

impl DepthIndices {
    fn resolve(pass: &Pass) -> Result<Self, StateError> {
        Ok(Self {
            near_z: pass.uniform_state_index("nearZ")?,
            near_over_far: pass.uniform_state_index("nearOverFarZminusOne")?,
        })
    }

    fn write(&self, pass: &mut Pass, camera: &Camera) -> Result<(), StateError> {
        pass.set_uniform_at(self.near_z, camera.near_z)?;
        pass.set_uniform_at(self.near_over_far, camera.near_z / camera.far_z - 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct DirectionalIndices {
    depth: DepthIndices,
    direction: UniformStateIndex,
    color: UniformStateIndex,
}

#[derive(Debug, Clone, Copy)]
struct PointIndices {
    depth: DepthIndices,
    position: UniformStateIndex,
    color: UniformStateIndex,
    radius: UniformStateIndex,
    dist_att: SamplerStateIndex,
}

pub struct DeferredPipeline {
    gbuffer: GBuffer,
    size: PhysicalSize<u32>,
    clear_color: Vec4,
    ambient_pass: Pass,
    ambient_color: UniformStateIndex,
    directional_pass: Pass,
    directional: DirectionalIndices,
    point_pass: Pass,
    point: PointIndices,
    pool: GeometryPool,
    phase: FramePhase,
}

impl DeferredPipeline {
    pub fn new<D: Device>(
        context: &mut RenderContext<D>,
        programs: DeferredPrograms,
        size: PhysicalSize<u32>,
        settings: &PipelineSettings,
    ) -> Result<Self, PipelineError> {
        ambient_interface().matches(&programs.ambient)?;
        directional_interface().matches(&programs.directional)?;
        point_interface().matches(&programs.point)?;

        let gbuffer = GBuffer::create(context.device_mut(), size)?;

        let ambient_pass = light_pass(programs.ambient);
        let directional_pass = light_pass(programs.directional);
        let point_pass = light_pass(programs.point);

        let ambient_color = ambient_pass.uniform_state_index("light.color")?;
        let directional = DirectionalIndices {
            depth: DepthIndices::resolve(&directional_pass)?,
            direction: directional_pass.uniform_state_index("light.direction")?,
            color: directional_pass.uniform_state_index("light.color")?,
        };
        let point = PointIndices {
            depth: DepthIndices::resolve(&point_pass)?,
            position: point_pass.uniform_state_index("light.position")?,
            color: point_pass.uniform_state_index("light.color")?,
            radius: point_pass.uniform_state_index("light.radius")?,
            dist_att: point_pass.sampler_state_index("light.distAttTexture")?,
        };

        let mut pipeline = Self {
            gbuffer,
            size,
            clear_color: Vec4::from_array(settings.clear_color),
            ambient_pass,
            ambient_color,
            directional_pass,
            directional,
            point_pass,
            point,
            pool: GeometryPool::new(LIGHT_QUAD_BUFFER, settings.geometry_pool_vertices),
            phase: FramePhase::Idle,
        };
        pipeline.bind_gbuffer()?;

        log::info!(
            "Deferred pipeline ready at {}x{}",
            size.width,
            size.height
        );
        Ok(pipeline)
    }

    /// Recreates the G-buffer at `size` and rebinds it to the light passes.
    pub fn resize<D: Device>(
        &mut self,
        context: &mut RenderContext<D>,
        size: PhysicalSize<u32>,
    ) -> Result<(), PipelineError> {
        if size == self.size {
            return Ok(());
        }

        self.gbuffer = GBuffer::create(context.device_mut(), size)?;
        self.size = size;
        self.bind_gbuffer()?;
        log::debug!("Deferred G-buffer resized to {}x{}", size.width, size.height);
        Ok(())
    }

    fn bind_gbuffer(&mut self) -> Result<(), StateError> {
        let GBuffer {
            color,
            normal,
            depth,
            ..
        } = self.gbuffer;

        self.ambient_pass.set_sampler("colorTexture", Some(color))?;
        for pass in [&mut self.directional_pass, &mut self.point_pass] {
            pass.set_sampler("colorTexture", Some(color))?;
            pass.set_sampler("normalTexture", Some(normal))?;
            pass.set_sampler("depthTexture", Some(depth))?;
        }
        Ok(())
    }

    /// Renders one frame: the opaque bucket of `queue` into the G-buffer,
    /// then the ambient term and every light of `lights` onto the output.
    ///
    /// The active shared state is left with the 2D light-pass projection;
    /// the next frame's camera write replaces it.
    pub fn render<D: Device>(
        &mut self,
        context: &mut RenderContext<D>,
        queue: &mut RenderQueue<'_>,
        camera: &Camera,
        lights: &LightSet,
    ) {
        self.pool.reset();

        self.phase = FramePhase::Fill;
        match context.shared_state_mut() {
            Some(shared) => camera.apply(shared),
            None => log::error!("No shared program state is active; camera not applied"),
        }
        context.set_target(RenderTarget::Offscreen(self.gbuffer.target));
        context.clear(ClearFlags::COLOR | ClearFlags::DEPTH, Vec4::ZERO);
        queue.render_bucket(context, Bucket::Opaque);

        self.phase = FramePhase::Light;
        context.set_target(RenderTarget::Output);
        context.clear(ClearFlags::COLOR, self.clear_color);
        if let Some(shared) = context.shared_state_mut() {
            shared.set_ortho_projection(1.0, 1.0);
            shared.set_view_matrix(Mat4::IDENTITY);
            shared.set_model_matrix(Mat4::IDENTITY);
        }

        let quad = light_quad(camera, self.size);

        if lights.has_ambient() {
            match self
                .ambient_pass
                .set_uniform_at(self.ambient_color, lights.ambient)
            {
                Ok(()) => draw_quad(context, &mut self.pool, &self.ambient_pass, &quad),
                Err(_) => context.stats.state_errors += 1,
            }
        }

        let view = camera.view();
        for light in lights.lights() {
            let written = match light {
                Light::Directional(light) => write_directional(
                    &mut self.directional_pass,
                    &self.directional,
                    camera,
                    &view,
                    light,
                )
                .map(|()| &self.directional_pass),
                Light::Point(light) => {
                    write_point(&mut self.point_pass, &self.point, camera, &view, light)
                        .map(|()| &self.point_pass)
                }
            };

            match written {
                Ok(pass) => draw_quad(context, &mut self.pool, pass, &quad),
                Err(_) => context.stats.state_errors += 1,
            }
        }

        self.phase = FramePhase::Done;
        log::debug!(
            "Deferred frame done: {} lights, {:?}",
            lights.lights().len(),
            context.stats()
        );
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    pub fn color_texture(&self) -> &Texture {
        &self.gbuffer.color
    }

    pub fn normal_texture(&self) -> &Texture {
        &self.gbuffer.normal
    }

    pub fn depth_texture(&self) -> &Texture {
        &self.gbuffer.depth
    }
}

fn light_pass(program: Arc<ProgramReflection>) -> Pass {
    let mut pass = Pass::with_program(program);
    pass.set_state(RenderState::additive_overlay());
    pass
}

fn write_directional(
    pass: &mut Pass,
    indices: &DirectionalIndices,
    camera: &Camera,
    view: &Mat4,
    light: &DirectionalLight,
) -> Result<(), StateError> {
    indices.depth.write(pass, camera)?;
    let direction = view.transform_vector3(light.direction).normalize_or_zero();
    pass.set_uniform_at(indices.direction, direction)?;
    pass.set_uniform_at(indices.color, light.color)
}

fn write_point(
    pass: &mut Pass,
    indices: &PointIndices,
    camera: &Camera,
    view: &Mat4,
    light: &PointLight,
) -> Result<(), StateError> {
    indices.depth.write(pass, camera)?;
    pass.set_uniform_at(indices.position, view.transform_point3(light.position))?;
    pass.set_uniform_at(indices.color, light.color)?;
    pass.set_uniform_at(indices.radius, light.radius)?;
    pass.set_sampler_at(indices.dist_att, light.dist_att_texture)
}

/// Full-screen quad in triangle strip order.
///
/// `mapping` addresses G-buffer texels at their centers; `clip_over_f` is
/// the view-space ray through each corner divided by depth.
fn light_quad(camera: &Camera, size: PhysicalSize<u32>) -> [LightVertex; 4] {
    let f = (camera.fov.to_radians() / 2.0).tan();
    let ray = Vec2::new(f * camera.aspect, f);
    let extent = Vec2::new(size.width as f32, size.height as f32);

    [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)].map(
        |corner| {
            let signed = corner * 2.0 - Vec2::ONE;
            LightVertex {
                position: corner.to_array(),
                mapping: (corner * extent + Vec2::splat(0.5)).to_array(),
                clip_over_f: (signed * ray).to_array(),
            }
        },
    )
}

fn draw_quad<D: Device>(
    context: &mut RenderContext<D>,
    pool: &mut GeometryPool,
    pass: &Pass,
    vertices: &[LightVertex; 4],
) {
    let Some(range) = pool.allocate(QUAD_VERTICES) else {
        context.failed_allocation("light quad vertices");
        return;
    };

    context
        .device_mut()
        .write_vertices(&range, bytemuck::cast_slice(vertices));
    pass.apply(context);
    context.draw(&PrimitiveRange::new(PrimitiveType::TriangleStrip, range));
}
