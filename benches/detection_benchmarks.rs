//! Benchmarks for scene detection and clip sampling.
//!
//! Run with: cargo bench
//!
//! The detection benchmarks use synthetic frames. The decoding benchmark
//! additionally needs `tests/fixtures/sample_video.mp4`.

use std::hint::black_box;
use std::path::Path;

use criterion::{BenchmarkId, Criterion};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reelcut::{
    ClipSampler, ClipSamplerOptions, SceneDetectionOptions, SilentReporter,
    detect_scene_boundaries,
};

#[cfg(feature = "ffmpeg")]
const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// 64 frames of a 640x360 video with a cut every 16 frames.
fn gray_frames() -> Vec<DynamicImage> {
    (0..64u32)
        .map(|index| {
            let value = ((index / 16) * 60) as u8;
            DynamicImage::ImageLuma8(GrayImage::from_pixel(640, 360, Luma([value])))
        })
        .collect()
}

fn rgb_frames() -> Vec<DynamicImage> {
    (0..64u32)
        .map(|index| {
            let value = ((index / 16) * 60) as u8;
            DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 360, Rgb([value, 0, 255 - value])))
        })
        .collect()
}

fn benchmark_scene_detection(criterion: &mut Criterion) {
    let options = SceneDetectionOptions::default();
    let mut group = criterion.benchmark_group("scene detection (64 frames, 640x360)");

    for (label, frames) in [("gray8", gray_frames()), ("rgb8", rgb_frames())] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &frames, |bencher, frames| {
            bencher.iter(|| {
                let scan = detect_scene_boundaries(
                    frames.iter().cloned().map(Ok),
                    &options,
                    &SilentReporter,
                );
                black_box(scan.boundaries.len())
            });
        });
    }

    group.finish();
}

fn benchmark_clip_sampling(criterion: &mut Criterion) {
    let boundaries: Vec<u64> = (0..2_000).map(|index| index * 48).collect();
    let sampler = ClipSampler::new(ClipSamplerOptions::new().clip_count_range(10, 10))
        .expect("default sampler options are valid");
    let output_dir = Path::new("target/reelcut-bench-empty");

    criterion.bench_function("sample 10 clips from 2000 boundaries", |bencher| {
        let mut rng = StdRng::seed_from_u64(17);
        bencher.iter(|| {
            let plan = sampler
                .sample(
                    Path::new("bench.mp4"),
                    &boundaries,
                    24.0,
                    output_dir,
                    &mut rng,
                    &SilentReporter,
                )
                .unwrap();
            black_box(plan.clips.len())
        });
    });
}

#[cfg(feature = "ffmpeg")]
fn benchmark_decode_and_detect(criterion: &mut Criterion) {
    use reelcut::{FfmpegLogLevel, FrameSource, MediaFile};

    reelcut::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("decode and detect (sample video)", |bencher| {
        bencher.iter(|| {
            let mut media = MediaFile::open(SAMPLE_VIDEO).unwrap();
            let scan = detect_scene_boundaries(
                media.frames().unwrap(),
                &SceneDetectionOptions::default(),
                &SilentReporter,
            );
            black_box(scan.frames_read)
        });
    });
}

#[cfg(not(feature = "ffmpeg"))]
fn benchmark_decode_and_detect(_criterion: &mut Criterion) {}

criterion::criterion_group!(
    benches,
    benchmark_scene_detection,
    benchmark_clip_sampling,
    benchmark_decode_and_detect,
);
criterion::criterion_main!(benches);
