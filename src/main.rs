use std::sync::Arc;

use drawstate::renderer::{
    AttributeType, BufferId, Camera, DeferredPipeline, DeferredPrograms, Light, LightSet, Pass,
    PrimitiveRange, PrimitiveType, ProgramId, ProgramReflection, RecordingDevice, RenderContext,
    RenderQueue, SamplerType, SharedProgramState, UniformType, VertexRange,
};
use drawstate::time::FrameClock;
use drawstate::PipelineSettings;
use glam::{Mat4, Vec3, Vec4};

const FRAMES: usize = 3;

fn light_program(id: u32, name: &str) -> ProgramReflection {
    ProgramReflection::new(ProgramId(id), name)
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

fn programs() -> DeferredPrograms {
    let ambient = ProgramReflection::new(ProgramId(1), "DeferredAmbient")
        .with_attribute("position", AttributeType::Vec2)
        .with_attribute("mapping", AttributeType::Vec2)
        .with_sampler("colorTexture", SamplerType::SamplerRect)
        .with_uniform("light.color", UniformType::Vec3);
    let directional = light_program(2, "DeferredDirLight")
        .with_uniform("light.direction", UniformType::Vec3);
    let point = light_program(3, "DeferredPointLight")
        .with_uniform("light.position", UniformType::Vec3)
        .with_uniform("light.radius", UniformType::Float)
        .with_sampler("light.distAttTexture", SamplerType::Sampler1D);

    DeferredPrograms {
        ambient: Arc::new(ambient),
        directional: Arc::new(directional),
        point: Arc::new(point),
    }
}

fn surface_program() -> Arc<ProgramReflection> {
    Arc::new(
        ProgramReflection::new(ProgramId(10), "Surface")
            .with_attribute("position", AttributeType::Vec3)
            .with_attribute("normal", AttributeType::Vec3)
            .with_uniform("wyMVP", UniformType::Mat4)
            .with_uniform("wyMV", UniformType::Mat4)
            .with_uniform("albedo", UniformType::Vec4)
            .resolve_shared(&SharedProgramState::reserve_supported()),
    )
}

fn main() {
    drawstate::init_logging();

    let settings = PipelineSettings::load_from_path("pipeline.json");
    let mut context = RenderContext::new(RecordingDevice::new());
    context.set_shared_state(Some(SharedProgramState::new()));

    let mut pipeline =
        match DeferredPipeline::new(&mut context, programs(), settings.output_size(), &settings) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                log::error!("Failed to create deferred pipeline: {}", err);
                return;
            }
        };

    let mut red = Pass::with_program(surface_program());
    let mut blue = red.clone();
    if let Err(err) = red
        .set_uniform("albedo", Vec4::new(0.8, 0.1, 0.1, 1.0))
        .and_then(|()| blue.set_uniform("albedo", Vec4::new(0.1, 0.1, 0.8, 1.0)))
    {
        log::error!("Failed to configure surface passes: {}", err);
        return;
    }

    let cube = PrimitiveRange::new(
        PrimitiveType::Triangles,
        VertexRange {
            buffer: BufferId(1),
            start: 0,
            count: 36,
        },
    );

    let output = settings.output_size();
    let mut camera = Camera::look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
    camera.aspect = output.width as f32 / output.height as f32;

    let mut lights = LightSet::with_ambient(Vec3::splat(0.05));
    lights.add(Light::directional(Vec3::new(-1.0, -1.0, -0.5), Vec3::splat(0.7)));
    lights.add(Light::point(Vec3::new(2.0, 1.0, 0.0), Vec3::new(1.0, 0.8, 0.6), 5.0));

    let mut clock = FrameClock::new();
    for frame in 0..FRAMES {
        clock.tick();
        if let Some(shared) = context.shared_state_mut() {
            shared.set_time(clock.elapsed_seconds());
            shared.set_viewport_size(output.width as f32, output.height as f32);
        }

        let mut queue = RenderQueue::with_capacity(settings.queue_capacity);
        for (i, pass) in [&red, &blue, &red, &blue].into_iter().enumerate() {
            let transform = Mat4::from_translation(Vec3::new(i as f32 * 2.0 - 3.0, 0.0, 0.0));
            if let Err(err) = queue.add_operation(transform, pass, cube) {
                log::warn!("{}", err);
            }
        }

        pipeline.render(&mut context, &mut queue, &camera, &lights);

        let stats = context.take_stats();
        log::info!(
            "Frame {}: {} draws, {} passes applied, {} device calls, {} errors",
            frame,
            stats.draws,
            stats.passes_applied,
            context.device_mut().take_calls().len(),
            stats.state_errors
        );
    }
}
