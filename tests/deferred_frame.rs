//! Whole deferred frames rendered against a recording device.
use std::sync::Arc;

use drawstate::renderer::deferred::point_interface;
use drawstate::renderer::{
    AttributeType, BufferId, Camera, ClearFlags, DeferredPipeline, DeferredPrograms, DeviceCall,
    FramePhase, Light, LightSet, Pass, PipelineError, PrimitiveRange, PrimitiveType, ProgramId,
    ProgramReflection, RecordingDevice, RenderContext, RenderQueue, RenderTarget, SamplerType,
    SharedProgramState, UniformType, UniformValue, VertexRange,
};
use drawstate::PipelineSettings;
use glam::{Mat4, Vec3, Vec4};
use winit::dpi::PhysicalSize;

const DIRECTIONAL: ProgramId = ProgramId(2);
const POINT: ProgramId = ProgramId(3);

// uniform locations shared by both light programs
const NEAR_Z: u32 = 0;
const NEAR_OVER_FAR: u32 = 1;
const LIGHT_COLOR: u32 = 2;
const LIGHT_DIRECTION: u32 = 3;
const LIGHT_POSITION: u32 = 3;

fn light_program(id: ProgramId, name: &str) -> ProgramReflection {
    ProgramReflection::new(id, name)
        .with_attribute("position", AttributeType::Vec2)
        .with_attribute("mapping", AttributeType::Vec2)
        .with_attribute("clipOverF", AttributeType::Vec2)
        .with_sampler("colorTexture", SamplerType::SamplerRect)
        .with_sampler("normalTexture", SamplerType::SamplerRect)
        .with_sampler("depthTexture", SamplerType::SamplerRect)
        .with_uniform("nearZ", UniformType::Float)
        .with_uniform("nearOverFarZminusOne", UniformType::Float)
        .with_uniform("light.color", UniformType::Vec3)
}

fn point_program() -> ProgramReflection {
    light_program(POINT, "point")
        .with_uniform("light.position", UniformType::Vec3)
        .with_uniform("light.radius", UniformType::Float)
        .with_sampler("light.distAttTexture", SamplerType::Sampler1D)
}

fn programs() -> DeferredPrograms {
    DeferredPrograms {
        ambient: Arc::new(
            ProgramReflection::new(ProgramId(1), "ambient")
                .with_attribute("position", AttributeType::Vec2)
                .with_attribute("mapping", AttributeType::Vec2)
                .with_sampler("colorTexture", SamplerType::SamplerRect)
                .with_uniform("light.color", UniformType::Vec3),
        ),
        directional: Arc::new(
            light_program(DIRECTIONAL, "directional")
                .with_uniform("light.direction", UniformType::Vec3),
        ),
        point: Arc::new(point_program()),
    }
}

fn setup(settings: &PipelineSettings) -> (RenderContext<RecordingDevice>, DeferredPipeline) {
    let mut context = RenderContext::new(RecordingDevice::new());
    context.set_shared_state(Some(SharedProgramState::new()));
    let pipeline = DeferredPipeline::new(
        &mut context,
        programs(),
        PhysicalSize::new(320, 240),
        settings,
    )
    .expect("valid programs");
    (context, pipeline)
}

fn calls_after_output(context: &RenderContext<RecordingDevice>) -> Vec<DeviceCall> {
    let calls = context.device().calls();
    let start = calls
        .iter()
        .position(|c| *c == DeviceCall::SetTarget(RenderTarget::Output))
        .expect("output target restored");
    calls[start + 1..].to_vec()
}

fn uploaded(calls: &[DeviceCall], location: u32) -> Vec<UniformValue> {
    calls
        .iter()
        .filter_map(|call| match call {
            DeviceCall::Uniform { location: l, values } if *l == location => values.first().copied(),
            _ => None,
        })
        .collect()
}

fn vec3_of(value: UniformValue) -> Vec3 {
    match value {
        UniformValue::Vec3(v) => v,
        other => panic!("expected vec3, got {other:?}"),
    }
}

#[test]
fn zero_lights_leave_only_the_clear() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);
    let mut queue = RenderQueue::new();

    assert_eq!(pipeline.phase(), FramePhase::Idle);
    pipeline.render(&mut context, &mut queue, &Camera::default(), &LightSet::new());

    assert_eq!(
        calls_after_output(&context),
        vec![DeviceCall::Clear {
            flags: ClearFlags::COLOR,
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            depth: 1.0,
        }]
    );
    assert_eq!(context.device().draw_count(), 0);
    assert_eq!(pipeline.phase(), FramePhase::Done);
}

#[test]
fn fill_targets_gbuffer_and_replays_opaque_only() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);

    let surface = Arc::new(
        ProgramReflection::new(ProgramId(10), "surface").with_uniform("albedo", UniformType::Vec4),
    );
    let opaque = Pass::with_program(surface);
    let mut glass = opaque.clone();
    glass.set_state(drawstate::renderer::RenderState::additive_overlay());

    let cube = PrimitiveRange::new(
        PrimitiveType::Triangles,
        VertexRange {
            buffer: BufferId(9),
            start: 0,
            count: 36,
        },
    );
    let mut queue = RenderQueue::new();
    queue.add_operation(Mat4::IDENTITY, &opaque, cube).expect("room");
    queue.add_operation(Mat4::IDENTITY, &glass, cube).expect("room");

    pipeline.render(&mut context, &mut queue, &Camera::default(), &LightSet::new());

    let calls = context.device().calls();
    assert_eq!(
        calls[0],
        DeviceCall::SetTarget(RenderTarget::Offscreen(pipeline.gbuffer().target))
    );
    assert_eq!(
        calls[1],
        DeviceCall::Clear {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: Vec4::ZERO,
            depth: 1.0,
        }
    );
    assert_eq!(context.device().draw_count(), 1);
}

#[test]
fn directional_light_draws_one_quad_in_view_space() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);
    let mut lights = LightSet::new();
    lights.add(Light::directional(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.5)));

    // yawed 90 degrees left: world +X points towards the viewer's back
    let camera = Camera {
        rotation: glam::Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        near_z: 0.5,
        far_z: 50.0,
        ..Camera::default()
    };
    pipeline.render(&mut context, &mut RenderQueue::new(), &camera, &lights);

    let calls = calls_after_output(&context);
    assert!(calls.contains(&DeviceCall::SetProgram(DIRECTIONAL)));
    assert_eq!(uploaded(&calls, NEAR_Z), vec![UniformValue::Float(0.5)]);
    assert_eq!(
        uploaded(&calls, NEAR_OVER_FAR),
        vec![UniformValue::Float(0.5 / 50.0 - 1.0)]
    );
    assert_eq!(
        uploaded(&calls, LIGHT_COLOR),
        vec![UniformValue::Vec3(Vec3::splat(0.5))]
    );

    let direction = vec3_of(uploaded(&calls, LIGHT_DIRECTION)[0]);
    assert!(direction.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));

    let draws: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            DeviceCall::Draw(range) => Some(*range),
            _ => None,
        })
        .collect();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].primitive, PrimitiveType::TriangleStrip);
    assert_eq!(draws[0].vertices.count, 4);

    let written = calls
        .iter()
        .find_map(|c| match c {
            DeviceCall::WriteVertices { bytes, .. } => Some(bytes.len()),
            _ => None,
        })
        .expect("quad vertices written");
    assert_eq!(written, 4 * 24);
}

#[test]
fn point_light_position_is_transformed_to_view_space() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);
    let mut lights = LightSet::new();
    lights.add(Light::point(Vec3::ZERO, Vec3::ONE, 4.0));

    let camera = Camera {
        position: Vec3::new(0.0, 0.0, 5.0),
        ..Camera::default()
    };
    pipeline.render(&mut context, &mut RenderQueue::new(), &camera, &lights);

    let calls = calls_after_output(&context);
    assert!(calls.contains(&DeviceCall::SetProgram(POINT)));
    let position = vec3_of(uploaded(&calls, LIGHT_POSITION)[0]);
    assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));

    // no falloff texture: unit 3 is bound to nothing
    assert!(calls.contains(&DeviceCall::BindTexture {
        unit: 3,
        texture: None
    }));
}

#[test]
fn lights_follow_ambient_in_submission_order() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);
    let mut lights = LightSet::with_ambient(Vec3::splat(0.1));
    lights.add(Light::point(Vec3::ZERO, Vec3::ONE, 1.0));
    lights.add(Light::directional(Vec3::NEG_Y, Vec3::ONE));

    pipeline.render(&mut context, &mut RenderQueue::new(), &Camera::default(), &lights);

    let programs: Vec<ProgramId> = calls_after_output(&context)
        .iter()
        .filter_map(|c| match c {
            DeviceCall::SetProgram(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(programs, vec![ProgramId(1), POINT, DIRECTIONAL]);
    assert_eq!(context.device().draw_count(), 3);
}

#[test]
fn exhausted_pool_skips_the_light() {
    let settings = PipelineSettings {
        geometry_pool_vertices: 4,
        ..PipelineSettings::default()
    };
    let (mut context, mut pipeline) = setup(&settings);
    let mut lights = LightSet::with_ambient(Vec3::splat(0.2));
    lights.add(Light::directional(Vec3::NEG_Z, Vec3::ONE));

    pipeline.render(&mut context, &mut RenderQueue::new(), &Camera::default(), &lights);

    assert_eq!(context.device().draw_count(), 1);
    assert_eq!(context.stats().failed_allocations, 1);
    assert_eq!(pipeline.phase(), FramePhase::Done);

    // the pool is reset every frame
    context.take_stats();
    pipeline.render(&mut context, &mut RenderQueue::new(), &Camera::default(), &lights);
    assert_eq!(context.stats().failed_allocations, 1);
    assert_eq!(context.stats().draws, 1);
}

#[test]
fn mismatched_program_is_refused() {
    let mut programs = programs();
    programs.point = Arc::new(
        light_program(POINT, "point").with_uniform("light.position", UniformType::Vec3),
    );
    assert!(point_interface().matches(&programs.point).is_err());

    let mut context = RenderContext::new(RecordingDevice::new());
    let result = DeferredPipeline::new(
        &mut context,
        programs,
        PhysicalSize::new(64, 64),
        &PipelineSettings::default(),
    );
    assert!(matches!(result, Err(PipelineError::Interface(_))));
}

#[test]
fn texture_creation_failure_is_reported() {
    let mut context = RenderContext::new(RecordingDevice::with_texture_budget(2));
    let result = DeferredPipeline::new(
        &mut context,
        programs(),
        PhysicalSize::new(64, 64),
        &PipelineSettings::default(),
    );
    assert!(matches!(
        result,
        Err(PipelineError::Device {
            what: "depth texture",
            ..
        })
    ));
}

#[test]
fn resize_rebinds_the_new_gbuffer() {
    let settings = PipelineSettings::default();
    let (mut context, mut pipeline) = setup(&settings);
    let old_color = *pipeline.color_texture();

    pipeline
        .resize(&mut context, PhysicalSize::new(800, 600))
        .expect("textures available");
    let new_color = *pipeline.color_texture();
    assert_ne!(old_color.id, new_color.id);
    assert_eq!((new_color.width, new_color.height), (800, 600));

    let mut lights = LightSet::new();
    lights.add(Light::directional(Vec3::NEG_Z, Vec3::ONE));
    pipeline.render(&mut context, &mut RenderQueue::new(), &Camera::default(), &lights);

    assert!(calls_after_output(&context).contains(&DeviceCall::BindTexture {
        unit: 0,
        texture: Some(new_color.id),
    }));
}
