//! Clip sampler integration tests.
//!
//! Uses seeded `StdRng` for property checks and `ScriptedRandom` where the
//! exact sequence of candidates matters.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use reelcut::{
    ClipSampler, ClipSamplerOptions, Event, MemoryReporter, OverlapPolicy, ReelcutError,
    Rejection, ScriptedRandom, Severity, SilentReporter,
};

fn sampler(options: ClipSamplerOptions) -> ClipSampler {
    ClipSampler::new(options).expect("valid sampler options")
}

/// Boundaries every 2 seconds at 25 fps over ten minutes.
fn regular_boundaries() -> Vec<u64> {
    (0..300).map(|index| index * 50).collect()
}

// ── Properties ─────────────────────────────────────────────────────

#[test]
fn accepted_clips_respect_duration_window() {
    let dir = tempfile::tempdir().unwrap();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = sampler(ClipSamplerOptions::default())
            .sample(
                Path::new("talk.mp4"),
                &regular_boundaries(),
                25.0,
                dir.path(),
                &mut rng,
                &SilentReporter,
            )
            .unwrap();

        assert!((4..=10).contains(&plan.target));
        assert_eq!(plan.clips.len(), plan.target, "seed {seed}");
        assert!(!plan.exhausted);
        for clip in &plan.clips {
            let duration = clip.range.duration();
            assert!((25.0..=60.0).contains(&duration), "seed {seed}: {duration}");
            assert!(clip.range.start() < clip.range.end());
        }
    }
}

#[test]
fn accepted_ranges_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let options = ClipSamplerOptions::new().clip_count_range(10, 10);
    let plan = sampler(options)
        .sample(
            Path::new("talk.mp4"),
            &regular_boundaries(),
            25.0,
            dir.path(),
            &mut rng,
            &SilentReporter,
        )
        .unwrap();

    let unique: HashSet<(u64, u64)> = plan
        .clips
        .iter()
        .map(|clip| (clip.range.start().to_bits(), clip.range.end().to_bits()))
        .collect();
    assert_eq!(unique.len(), plan.clips.len());
}

#[test]
fn ordinals_and_names_follow_acceptance_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let plan = sampler(ClipSamplerOptions::new().clip_count_range(3, 3))
        .sample(
            Path::new("/videos/talk.webm"),
            &regular_boundaries(),
            25.0,
            dir.path(),
            &mut rng,
            &SilentReporter,
        )
        .unwrap();

    let names: Vec<&str> = plan.clips.iter().map(|clip| clip.output_name.as_str()).collect();
    assert_eq!(names, vec!["short_talk_1.mp4", "short_talk_2.mp4", "short_talk_3.mp4"]);
    for (index, clip) in plan.clips.iter().enumerate() {
        assert_eq!(clip.ordinal, index + 1);
        assert_eq!(clip.output, dir.path().join(&clip.output_name));
    }
}

#[test]
fn same_seed_same_plan() {
    let dir = tempfile::tempdir().unwrap();
    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        sampler(ClipSamplerOptions::default())
            .sample(
                Path::new("talk.mp4"),
                &regular_boundaries(),
                25.0,
                dir.path(),
                &mut rng,
                &SilentReporter,
            )
            .unwrap()
            .clips
    };
    assert_eq!(run(11), run(11));
}

// ── Scripted scenarios ─────────────────────────────────────────────

#[test]
fn reversed_pair_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = MemoryReporter::new();
    // Boundaries [10, 50, 90, 140] at 10 fps.
    // First draw: start index 2 -> 90, end index 0 -> 50 (reversed).
    // Second draw: start index 1 -> 50, end index 1 -> 90 (4 s).
    let mut rng = ScriptedRandom::new(vec![1], vec![2, 0, 1, 1]);
    let plan = sampler(
        ClipSamplerOptions::new()
            .duration_range(3.0, 8.0)
            .clip_count_range(1, 1),
    )
    .sample(
        Path::new("talk.mp4"),
        &[10, 50, 90, 140],
        10.0,
        dir.path(),
        &mut rng,
        &reporter,
    )
    .unwrap();

    assert_eq!(plan.attempts, 2);
    assert_eq!(plan.rejections.end_not_after_start, 1);
    assert_eq!((plan.clips[0].range.start(), plan.clips[0].range.end()), (5.0, 9.0));
    assert_eq!(
        reporter.events()[0],
        Event::ClipRejected(Rejection::EndNotAfterStart {
            start_frame: 90,
            end_frame: 50
        })
    );
}

#[test]
fn exact_duplicate_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    // Every draw picks the same (50, 90) pair.
    let mut rng = ScriptedRandom::new(vec![2], vec![1]);
    let plan = sampler(
        ClipSamplerOptions::new()
            .duration_range(3.0, 8.0)
            .clip_count_range(2, 2)
            .attempts_per_clip(3),
    )
    .sample(
        Path::new("talk.mp4"),
        &[10, 50, 90, 140],
        10.0,
        dir.path(),
        &mut rng,
        &SilentReporter,
    )
    .unwrap();

    assert_eq!(plan.clips.len(), 1);
    assert_eq!(plan.attempts, 6);
    assert_eq!(plan.rejections.already_used, 5);
    assert!(plan.exhausted);
    assert!(plan.is_partial());
}

#[test]
fn overlapping_clips_allowed_by_default() {
    let dir = tempfile::tempdir().unwrap();
    // (10, 90) then (50, 140): distinct but overlapping.
    let mut rng = ScriptedRandom::new(vec![2], vec![0, 1, 1, 2]);
    let plan = sampler(
        ClipSamplerOptions::new()
            .duration_range(3.0, 10.0)
            .clip_count_range(2, 2),
    )
    .sample(
        Path::new("talk.mp4"),
        &[10, 50, 90, 140],
        10.0,
        dir.path(),
        &mut rng,
        &SilentReporter,
    )
    .unwrap();

    assert_eq!(plan.clips.len(), 2);
    assert!(plan.clips[0].range.overlaps(&plan.clips[1].range));
}

#[test]
fn overlap_policy_rejects_overlapping_clips() {
    let dir = tempfile::tempdir().unwrap();
    // (10, 90), then overlapping (50, 140), then disjoint (90, 140).
    let mut rng = ScriptedRandom::new(vec![2], vec![0, 1, 1, 2, 2, 2]);
    let plan = sampler(
        ClipSamplerOptions::new()
            .duration_range(3.0, 10.0)
            .clip_count_range(2, 2)
            .overlap_policy(OverlapPolicy::RejectOverlapping),
    )
    .sample(
        Path::new("talk.mp4"),
        &[10, 50, 90, 140],
        10.0,
        dir.path(),
        &mut rng,
        &SilentReporter,
    )
    .unwrap();

    assert_eq!(plan.attempts, 3);
    assert_eq!(plan.rejections.overlapping, 1);
    let ranges: Vec<(f64, f64)> = plan
        .clips
        .iter()
        .map(|clip| (clip.range.start(), clip.range.end()))
        .collect();
    assert_eq!(ranges, vec![(1.0, 9.0), (9.0, 14.0)]);
}

#[test]
fn existing_output_blocks_ordinal() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("short_talk_1.mp4")).unwrap();
    let reporter = MemoryReporter::new();

    let mut rng = StdRng::seed_from_u64(3);
    let plan = sampler(ClipSamplerOptions::new().clip_count_range(1, 1).attempts_per_clip(500))
        .sample(
            Path::new("talk.mp4"),
            &regular_boundaries(),
            25.0,
            dir.path(),
            &mut rng,
            &reporter,
        )
        .unwrap();

    // Ordinal 1 is never freed, so no clip can ever be accepted.
    assert!(plan.clips.is_empty());
    assert!(plan.exhausted);
    assert_eq!(plan.attempts, 500);
    assert!(plan.rejections.output_exists > 0);
    assert!(reporter.events().iter().any(|event| matches!(
        event,
        Event::SamplingExhausted { accepted: 0, target: 1, attempts: 500 }
    )));
}

// ── Failure modes ──────────────────────────────────────────────────

#[test]
fn unreachable_duration_window_exhausts_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = MemoryReporter::new();
    let mut rng = StdRng::seed_from_u64(1);
    let plan = sampler(
        ClipSamplerOptions::new()
            .duration_range(100.0, 200.0)
            .clip_count_range(2, 2)
            .attempts_per_clip(25),
    )
    .sample(
        Path::new("talk.mp4"),
        &[0, 250, 500, 750],
        25.0,
        dir.path(),
        &mut rng,
        &reporter,
    )
    .unwrap();

    assert!(plan.clips.is_empty());
    assert_eq!(plan.attempts, 50);
    assert_eq!(plan.rejections.total(), 50);
    // Reversed pairs are informational; every other rejection and the
    // exhaustion notice are warnings.
    let reversed = plan.rejections.end_not_after_start;
    assert_eq!(reporter.count(Severity::Warning) as u64, 51 - reversed);
    assert_eq!(reporter.count(Severity::Info) as u64, reversed);
}

#[test]
fn fewer_than_two_boundaries_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = sampler(ClipSamplerOptions::default()).sample(
        Path::new("talk.mp4"),
        &[120],
        25.0,
        dir.path(),
        &mut StdRng::seed_from_u64(0),
        &SilentReporter,
    );
    assert!(matches!(result, Err(ReelcutError::InsufficientScenes { found: 1 })));
}

#[test]
fn inverted_options_are_rejected_up_front() {
    let result = ClipSampler::new(ClipSamplerOptions::new().duration_range(60.0, 25.0));
    assert!(matches!(result, Err(ReelcutError::InvalidConfiguration(_))));
}
