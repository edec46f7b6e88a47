#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use eigenmatch::math::{euclidean_distance, vector_inner_product, vector_sub};
use eigenmatch::{FaceRecognizer, FloatImage, TargetFace};

const GALLERY_SIZE: usize = 8;
const IMAGE_SIDE: u32 = 32;

fn synthetic_gallery() -> Vec<TargetFace> {
    (0..GALLERY_SIZE)
        .map(|i| {
            let data = (0..(IMAGE_SIDE * IMAGE_SIDE))
                .map(|p| ((p as usize * (i + 3) + i * 17) % 256) as f32)
                .collect();
            TargetFace {
                key: format!("face-{}", i),
                image: FloatImage::from_vec(IMAGE_SIDE, IMAGE_SIDE, data).unwrap(),
                points: None,
                id: (i as i32 + 1) * 100,
            }
        })
        .collect()
}

fn bench_vector_inner_product(c: &mut Criterion) {
    let vec: Vec<f32> = (0..1000).map(|i| i as f32).collect();
    c.bench_function("math_vector_inner_product", |b| {
        b.iter(|| vector_inner_product(black_box(&vec), black_box(&vec)))
    });
}

fn bench_vector_sub(c: &mut Criterion) {
    let vec: Vec<f32> = (0..1000).map(|i| i as f32).collect();
    let mut dest = vec![0.0f32; 1000];
    c.bench_function("math_vector_sub", move |b| {
        b.iter(|| vector_sub(black_box(&vec), black_box(&vec), &mut dest))
    });
}

fn bench_euclidean_distance(c: &mut Criterion) {
    let a: Vec<f32> = (0..1000).map(|i| i as f32).collect();
    let b_vec: Vec<f32> = (0..1000).map(|i| (1000 - i) as f32).collect();
    c.bench_function("math_euclidean_distance", move |b| {
        b.iter(|| euclidean_distance(black_box(&a), black_box(&b_vec)))
    });
}

fn bench_enroll(c: &mut Criterion) {
    let faces = synthetic_gallery();
    c.bench_function("enroll_gallery", move |b| {
        b.iter(|| FaceRecognizer::new(black_box(&faces)).unwrap())
    });
}

fn bench_recognize_image(c: &mut Criterion) {
    let faces = synthetic_gallery();
    let recognizer = FaceRecognizer::new(&faces).unwrap();
    let query = faces[GALLERY_SIZE / 2].image.clone();
    c.bench_function("recognize_image", move |b| {
        b.iter(|| recognizer.recognize_image(black_box(&query)).unwrap())
    });
}

criterion_group!(
    math,
    bench_vector_inner_product,
    bench_vector_sub,
    bench_euclidean_distance
);
criterion_group!(recognition_perf, bench_enroll, bench_recognize_image);
criterion_main!(math, recognition_perf);
