//! Frame loop benchmarks: transform hierarchies, dirty-object compiles and picking.

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use glam::{Vec2, Vec3};

use strata::{ObjectDesc, PickParams, Scene, TransformKey, TranslateDesc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A chain of `depth` translates with one object on the leaf of each of `width` chains.
fn build_scene(width: usize, depth: usize) -> (Scene, Vec<TransformKey>) {
    let mut scene = Scene::new();
    let mut roots = Vec::with_capacity(width);
    for i in 0..width {
        let mut parent = None;
        for d in 0..depth {
            let key = scene
                .create_translate(TranslateDesc {
                    id: None,
                    xyz: Vec3::new(i as f32 * 0.1, d as f32 * 0.1, 0.0),
                    parent,
                })
                .expect("translate");
            if d == 0 {
                roots.push(key);
            }
            parent = Some(key);
        }
        scene
            .create_object(ObjectDesc {
                transform: parent,
                ..ObjectDesc::default()
            })
            .expect("object");
    }
    scene.tick_at(0.0);
    (scene, roots)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_idle_tick(c: &mut Criterion) {
    let (mut scene, _) = build_scene(64, 4);
    let mut time = 0.0;
    c.bench_function("idle_tick_64_objects", |b| {
        b.iter(|| {
            time += 0.016;
            black_box(scene.tick_at(time))
        });
    });
}

fn bench_root_translate(c: &mut Criterion) {
    let (mut scene, roots) = build_scene(64, 8);
    let mut time = 0.0;
    let mut step = 0.0_f32;
    c.bench_function("translate_roots_64x8", |b| {
        b.iter(|| {
            step += 0.01;
            for root in &roots {
                scene.set_translate_xyz(*root, Vec3::new(step, 0.0, 0.0));
            }
            time += 0.016;
            black_box(scene.tick_at(time))
        });
    });
}

fn bench_first_compile(c: &mut Criterion) {
    c.bench_function("first_frame_256_objects", |b| {
        b.iter_batched(
            || {
                let mut scene = Scene::new();
                for _ in 0..256 {
                    scene.create_object(ObjectDesc::default()).expect("object");
                }
                scene
            },
            |mut scene| black_box(scene.tick_at(0.0)),
            BatchSize::SmallInput,
        );
    });
}

fn bench_pick(c: &mut Criterion) {
    let (mut scene, _) = build_scene(16, 2);
    c.bench_function("pick_16_boxes", |b| {
        b.iter(|| {
            black_box(scene.pick(PickParams {
                canvas_pos: black_box(Vec2::new(410.0, 295.0)),
            }))
        });
    });
}

criterion_group!(benches, bench_idle_tick, bench_root_translate, bench_first_compile, bench_pick);
criterion_main!(benches);
