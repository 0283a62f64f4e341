use criterion::{black_box, criterion_group, criterion_main, Criterion};
use virtual_piano::angles::FrameAngles;
use virtual_piano::hand_tracking::{Fingertip, FingertipObservation};
use virtual_piano::keyboard::VirtualKeyboard;
use virtual_piano::mapper::KeyStateMapper;

fn bench_angles(c: &mut Criterion) {
    let rig = FrameAngles::new(640, 480, 49.0, None).unwrap();

    c.bench_function("angles_from_center", |b| {
        b.iter(|| rig.angles_from_center(black_box(420.0), black_box(200.0), true, true));
    });

    c.bench_function("location", |b| {
        b.iter(|| {
            rig.location(
                black_box(14.21),
                black_box((20.0, 5.0)),
                black_box((-20.0, 5.0)),
                true,
                true,
            )
        });
    });
}

fn bench_keyboard(c: &mut Criterion) {
    let kb = VirtualKeyboard::new(640, 480, 22).unwrap();

    c.bench_function("find_key", |b| {
        b.iter(|| kb.find_key(black_box(300.0), black_box(180.0)));
    });
}

fn bench_mapper(c: &mut Criterion) {
    let kb = VirtualKeyboard::new(640, 480, 22).unwrap();
    let (x0, _, _, y1) = kb.bounding_box();

    // Ten fingertips spread across the keys, all pressing
    let observations: Vec<FingertipObservation> = (0..10)
        .map(|i| FingertipObservation {
            hand: i / 5,
            tip: Fingertip::ALL[i % 5],
            x: x0 + kb.white_key_width() * (i as f64 * 2.0 + 0.5),
            y: y1 - 1.0,
        })
        .collect();
    let heights = vec![70.0; observations.len()];

    c.bench_function("compute_edges_ten_tips", |b| {
        let mut mapper = KeyStateMapper::new();
        b.iter(|| {
            mapper.compute_edges(
                black_box(&kb),
                black_box(&observations),
                black_box(&heights),
                68.5,
                kb.total_keys(),
            )
        });
    });

    c.bench_function("compute_edges_silent", |b| {
        let mut mapper = KeyStateMapper::new();
        b.iter(|| mapper.compute_edges(black_box(&kb), &[], &[], 68.5, kb.total_keys()));
    });
}

criterion_group!(benches, bench_angles, bench_keyboard, bench_mapper);
criterion_main!(benches);
