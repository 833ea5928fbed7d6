use std::sync::Arc;

use drawstate::renderer::{
    BlendFactor, Bucket, BufferId, DeviceCall, Pass, PrimitiveRange, PrimitiveType, ProgramId,
    ProgramReflection, QueueError, RecordingDevice, RenderContext, RenderQueue,
    SharedProgramState, UniformType, UniformValue, VertexRange,
};
use glam::{Mat4, Vec3};

fn program() -> Arc<ProgramReflection> {
    Arc::new(
        ProgramReflection::new(ProgramId(1), "unlit")
            .with_uniform("wyM", UniformType::Mat4)
            .with_uniform("color", UniformType::Vec3)
            .resolve_shared(&SharedProgramState::reserve_supported()),
    )
}

fn range(count: u32) -> PrimitiveRange {
    PrimitiveRange::new(
        PrimitiveType::Triangles,
        VertexRange {
            buffer: BufferId(1),
            start: 0,
            count,
        },
    )
}

fn tag(x: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
}

fn blended(pass: &Pass) -> Pass {
    let mut pass = pass.clone();
    pass.set_blend_factors(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    pass
}

#[test]
fn opaque_first_and_ties_keep_submission_order() {
    let p1 = Pass::with_program(program());
    let p2 = Pass::with_program(program());
    let p1_blended = blended(&p1);

    let mut queue = RenderQueue::new();
    queue.add_operation(tag(1.0), &p1, range(3)).expect("room");
    queue.add_operation(tag(2.0), &p2, range(3)).expect("room");
    queue.add_operation(tag(3.0), &p1_blended, range(3)).expect("room");
    queue.add_operation(tag(4.0), &p1, range(3)).expect("room");

    let order: Vec<f32> = queue.operations().map(|op| op.transform.w_axis.x).collect();

    let position = |x: f32| order.iter().position(|v| *v == x).expect("present");
    let (a, b, c, d) = (position(1.0), position(2.0), position(3.0), position(4.0));
    assert!(a < c && b < c && d < c);
    assert!(a < d);
    // same pass, same bucket: adjacent
    assert_eq!(d, a + 1);

    assert_eq!(queue.submitted()[2].bucket, Bucket::Blended);
}

#[test]
fn keys_are_sorted_on_read() {
    let p1 = Pass::with_program(program());
    let p2 = Pass::with_program(program());
    let mut queue = RenderQueue::new();

    queue.add_operation(tag(0.0), &p2, range(3)).expect("room");
    queue.add_operation(tag(1.0), &p1, range(3)).expect("room");
    queue.add_operation(tag(2.0), &p2, range(3)).expect("room");

    let keys = queue.keys().to_vec();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(keys.len(), 3);
}

#[test]
fn replay_pushes_transform_before_each_draw() {
    let pass = Pass::with_program(program());
    let mut queue = RenderQueue::new();
    queue.add_operation(tag(5.0), &pass, range(6)).expect("room");

    let mut context = RenderContext::new(RecordingDevice::new());
    context.set_shared_state(Some(SharedProgramState::new()));
    queue.render(&mut context);

    let calls = context.device().calls();
    assert!(calls.contains(&DeviceCall::Uniform {
        location: 0,
        values: vec![UniformValue::Mat4(tag(5.0))],
    }));
    assert_eq!(calls.last(), Some(&DeviceCall::Draw(range(6))));
    assert_eq!(context.stats().draws, 1);
}

#[test]
fn pass_without_program_is_skipped() {
    let empty = Pass::new();
    let pass = Pass::with_program(program());
    let mut queue = RenderQueue::new();
    queue.add_operation(tag(0.0), &empty, range(3)).expect("room");
    queue.add_operation(tag(1.0), &pass, range(3)).expect("room");

    let mut context = RenderContext::new(RecordingDevice::new());
    context.set_shared_state(Some(SharedProgramState::new()));
    queue.render(&mut context);

    assert_eq!(context.device().draw_count(), 1);
    assert_eq!(context.stats().skipped_operations, 1);
}

#[test]
fn bucket_replay_filters_operations() {
    let opaque = Pass::with_program(program());
    let transparent = blended(&opaque);
    let mut queue = RenderQueue::new();
    queue.add_operation(tag(0.0), &transparent, range(3)).expect("room");
    queue.add_operation(tag(1.0), &opaque, range(3)).expect("room");

    let mut context = RenderContext::new(RecordingDevice::new());
    context.set_shared_state(Some(SharedProgramState::new()));

    queue.render_bucket(&mut context, Bucket::Opaque);
    assert_eq!(context.device().draw_count(), 1);
    context.device_mut().take_calls();

    queue.render_bucket(&mut context, Bucket::Blended);
    assert_eq!(context.device().draw_count(), 1);
}

#[test]
fn layers_order_within_a_bucket() {
    let p1 = Pass::with_program(program());
    let p2 = Pass::with_program(program());
    let mut queue = RenderQueue::new();

    queue
        .add_operation_in_layer(tag(0.0), &p1, range(3), 2)
        .expect("room");
    queue
        .add_operation_in_layer(tag(1.0), &p2, range(3), 1)
        .expect("room");

    let order: Vec<f32> = queue.operations().map(|op| op.transform.w_axis.x).collect();
    assert_eq!(order, vec![1.0, 0.0]);
}

#[test]
fn full_queue_rejects_operations() {
    let pass = Pass::with_program(program());
    let mut queue = RenderQueue::with_capacity(1);

    queue.add_operation(tag(0.0), &pass, range(3)).expect("room");
    assert_eq!(
        queue.add_operation(tag(1.0), &pass, range(3)),
        Err(QueueError::Full { capacity: 1 })
    );
    assert_eq!(queue.len(), 1);

    queue.clear();
    assert!(queue.is_empty());
    assert!(queue.add_operation(tag(2.0), &pass, range(3)).is_ok());
}
