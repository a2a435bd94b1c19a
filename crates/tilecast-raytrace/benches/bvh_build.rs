#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tilecast_math::{Color, Mat4, Vec3};
use tilecast_raytrace::{render, Bvh, BvhSettings, FrameParams, SceneView};
use tilecast_scene::{Light, ObjectKind, WorldObject};

/// A square farm of floor tiles with a wall every seventh tile.
fn farm(side: usize) -> Vec<WorldObject> {
    (0..side * side)
        .map(|i| {
            let (x, z) = ((i % side) as f32, (i / side) as f32);
            let (kind, height) = if i % 7 == 0 {
                (ObjectKind::Object, 128.0)
            } else {
                (ObjectKind::Tile, 64.0)
            };
            WorldObject::new(
                Vec3::new(x * 64.0, 0.0, z * 64.0),
                Vec3::new(64.0, height, 64.0),
                Color::rgba(36, 36, 36, 255),
                kind,
            )
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_build");
    for side in [16, 64, 128] {
        let objects = farm(side);
        group.bench_with_input(BenchmarkId::new("sequential", side * side), &objects, |b, objects| {
            let settings = BvhSettings {
                parallel_threshold: usize::MAX,
                ..BvhSettings::default()
            };
            b.iter(|| Bvh::build(black_box(objects.clone()), &settings))
        });
        group.bench_with_input(BenchmarkId::new("parallel", side * side), &objects, |b, objects| {
            b.iter(|| Bvh::build(black_box(objects.clone()), &BvhSettings::default()))
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let Ok(bvh) = Bvh::build(farm(64), &BvhSettings::default()) else {
        return;
    };
    let lights = [Light::sun()];
    let scene = SceneView::new(&bvh, &[], &lights);
    let eye = Vec3::new(2048.0, 600.0, -200.0);
    let view = Mat4::look_at_rh(&eye.into(), &Vec3::new(2048.0, 0.0, 1024.0).into(), &Vec3::y());
    let projection = Mat4::new_perspective(16.0 / 9.0, 70f32.to_radians(), 0.05, 5000.0);
    let Ok(frame) = FrameParams::new(&view, &projection, eye, 320, 180) else {
        return;
    };
    let mut out = vec![Color::TRANSPARENT; frame.pixel_count()];

    c.bench_function("render_320x180", |b| {
        b.iter(|| render(black_box(&scene), &frame, &mut out))
    });
}

criterion_group!(benches, bench_build, bench_render);
criterion_main!(benches);
