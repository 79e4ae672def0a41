//! Criterion benchmarks for frame compositing.
//!
//! Run with: cargo bench --bench composite_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use zenwebp_anim::codec::{encode_fragment, EncodeParams};
use zenwebp_anim::mux::{BlendMethod, DisposeMethod, LoopCount, WebPMux};
use zenwebp_anim::{decode, encode, AnimatedWebP, AnimationFrame, Bitmap, DecodeConfig, EncodeConfig, PixelLayout};

const CANVAS: u32 = 256;
const FRAMES: usize = 24;

/// Full-canvas key frame followed by blended sprite patches.
fn make_sprite_animation() -> Vec<u8> {
    let params = EncodeParams::default();
    let mut mux = WebPMux::new(CANVAS, CANVAS);
    mux.set_animation([0; 4], LoopCount::Forever);

    let background: Vec<u8> = (0..CANVAS * CANVAS)
        .flat_map(|i| [(i % CANVAS) as u8, (i / CANVAS) as u8, 64, 255])
        .collect();
    let key = encode_fragment(&background, CANVAS, CANVAS, PixelLayout::Rgba8, &params).unwrap();
    mux.push_frame(key.into_mux_frame(40, DisposeMethod::None, BlendMethod::Overwrite))
        .unwrap();

    let sprite: Vec<u8> = (0..32 * 32).flat_map(|i| [255, (i % 256) as u8, 0, 160]).collect();
    for i in 1..FRAMES as u32 {
        let patch = encode_fragment(&sprite, 32, 32, PixelLayout::Rgba8, &params).unwrap();
        let mut frame = patch.into_mux_frame(40, DisposeMethod::None, BlendMethod::AlphaBlend);
        frame.x_offset = (i * 8) % (CANVAS - 32);
        frame.y_offset = (i * 6) % (CANVAS - 32);
        mux.push_frame(frame).unwrap();
    }
    mux.assemble().unwrap()
}

fn bench_frame_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_access");
    let data = make_sprite_animation();
    group.throughput(Throughput::Elements(u64::from(CANVAS * CANVAS)));

    group.bench_function("sequential", |b| {
        let anim = AnimatedWebP::open(&data).unwrap();
        b.iter(|| {
            for i in 0..anim.frame_count() {
                black_box(anim.frame_at(i).unwrap());
            }
        })
    });

    for index in [1, FRAMES / 2, FRAMES - 1] {
        group.bench_with_input(BenchmarkId::new("random", index), &index, |b, &index| {
            let anim = AnimatedWebP::open(&data).unwrap();
            b.iter(|| {
                // Alternate so every request replays.
                black_box(anim.frame_at(0).unwrap());
                black_box(anim.frame_at(black_box(index)).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_one_shot(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_shot");
    group.sample_size(20);
    let data = make_sprite_animation();

    group.bench_function("decode_all", |b| {
        b.iter(|| black_box(decode(black_box(&data), &DecodeConfig::default()).unwrap()))
    });

    let thumbnail = DecodeConfig::default().target_pixel_size(64, 64);
    group.bench_function("decode_thumbnails", |b| {
        b.iter(|| black_box(decode(black_box(&data), &thumbnail).unwrap()))
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.sample_size(10);

    let frames: Vec<_> = (0..8u32)
        .map(|f| {
            let pixels: Vec<u8> = (0..128 * 128u32)
                .flat_map(|i| [(i % 128 + f * 16) as u8, (i / 128) as u8, 32])
                .collect();
            AnimationFrame {
                bitmap: Bitmap::new(128, 128, PixelLayout::Rgb8, pixels).unwrap(),
                duration: Duration::from_millis(50),
            }
        })
        .collect();

    for quality in [1.0f32, 0.6] {
        let config = EncodeConfig::new().with_quality(quality);
        group.bench_with_input(
            BenchmarkId::new("quality", quality),
            &config,
            |b, config| b.iter(|| black_box(encode(black_box(&frames), config).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_frame_access, bench_one_shot, bench_encode);
criterion_main!(benches);
