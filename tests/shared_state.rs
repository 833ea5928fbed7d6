use drawstate::renderer::{DerivedMatrix, SharedProgramState};
use glam::{Mat4, Quat, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn model(rng: &mut SmallRng) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(rng.gen_range(0.5..1.5)),
        Quat::from_euler(
            glam::EulerRot::YXZ,
            rng.gen_range(0.0..6.0),
            rng.gen::<f32>(),
            rng.gen::<f32>(),
        ),
        Vec3::new(rng.gen_range(-2.0..2.0), rng.gen::<f32>(), rng.gen_range(-2.0..2.0)),
    )
}

fn view(rng: &mut SmallRng) -> Mat4 {
    let eye = Vec3::new(
        rng.gen_range(-5.0..5.0),
        rng.gen_range(1.0..4.0),
        rng.gen_range(6.0..7.0),
    );
    Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y)
}

fn projection(rng: &mut SmallRng) -> Mat4 {
    Mat4::perspective_rh_gl(rng.gen_range(0.6..1.6), rng.gen_range(1.0..2.0), 0.5, 50.0)
}

fn expected(which: DerivedMatrix, m: Mat4, v: Mat4, p: Mat4) -> Mat4 {
    match which {
        DerivedMatrix::ModelView => v * m,
        DerivedMatrix::ViewProjection => p * v,
        DerivedMatrix::ModelViewProjection => p * v * m,
        DerivedMatrix::InverseModel => m.inverse(),
        DerivedMatrix::InverseView => v.inverse(),
        DerivedMatrix::InverseProjection => p.inverse(),
        DerivedMatrix::InverseModelView => (v * m).inverse(),
        DerivedMatrix::InverseViewProjection => (p * v).inverse(),
        DerivedMatrix::InverseModelViewProjection => (p * v * m).inverse(),
    }
}

fn close(a: Mat4, b: Mat4) -> bool {
    let scale = b.to_cols_array().iter().fold(1.0f32, |acc, v| acc.max(v.abs()));
    a.abs_diff_eq(b, 1e-4 * scale)
}

#[test]
fn interleaved_writes_and_reads_match_direct_computation() {
    let mut rng = SmallRng::seed_from_u64(0x5EED_CAFE);
    let mut state = SharedProgramState::new();
    let (mut m, mut v, mut p) = (Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY);

    for _ in 0..500 {
        match rng.gen_range(0..5) {
            0 => {
                m = model(&mut rng);
                state.set_model_matrix(m);
            }
            1 => {
                v = view(&mut rng);
                state.set_view_matrix(v);
            }
            2 => {
                p = projection(&mut rng);
                state.set_projection_matrix(p);
            }
            _ => {
                let which = DerivedMatrix::ALL[rng.gen_range(0..DerivedMatrix::ALL.len())];
                let value = state.derived(which);
                assert!(close(value, expected(which, m, v, p)), "{which:?} diverged");
            }
        }
    }
}

#[test]
fn reads_between_writes_recompute_at_most_once() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut state = SharedProgramState::new();

    for _ in 0..50 {
        state.set_model_matrix(model(&mut rng));
        if rng.gen_bool(0.5) {
            state.set_view_matrix(view(&mut rng));
        }

        let before: Vec<u32> = DerivedMatrix::ALL
            .iter()
            .map(|m| state.recompute_count(*m))
            .collect();
        for _ in 0..4 {
            for which in DerivedMatrix::ALL {
                state.derived(which);
            }
        }
        for (which, count) in DerivedMatrix::ALL.iter().zip(before) {
            assert!(state.recompute_count(*which) <= count + 1, "{which:?}");
        }
    }
}

#[test]
fn model_writes_never_touch_view_projection() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut state = SharedProgramState::new();
    state.set_view_matrix(view(&mut rng));
    state.set_projection_matrix(projection(&mut rng));
    state.derived(DerivedMatrix::ViewProjection);

    for _ in 0..100 {
        state.set_model_matrix(model(&mut rng));
        state.derived(DerivedMatrix::ModelViewProjection);
    }

    assert_eq!(state.recompute_count(DerivedMatrix::ViewProjection), 1);
    assert_eq!(state.recompute_count(DerivedMatrix::ModelViewProjection), 100);
}
