use std::{
    error::Error,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{SeedableRng, rngs::StdRng};
use reelcut::{
    BatchSummary, ClipSamplerOptions, DEFAULT_MAX_SEGMENT_SECONDS, DEFAULT_THRESHOLD,
    DEFAULT_VIDEO_EXTENSIONS, Event, FfmpegEncoder, FfmpegLogLevel, FfmpegOpener, FrameSource,
    MediaFile, OverlapPolicy, Pipeline, ProgressInfo, Rejection, ReelcutError, Reporter,
    SceneDetectionOptions, SegmentOptions, Severity, detect_scene_boundaries, discover_videos,
};
use serde_json::{Value, json};

const CLI_AFTER_HELP: &str = "Examples:\n  reelcut split lecture.mp4 --max-duration 600 --out parts\n  reelcut shorts --dir videos --min-clips 4 --max-clips 10 --out shorts --progress\n  reelcut scenes lecture.mp4 --json\n  reelcut probe lecture.mp4\n  reelcut completions zsh > _reelcut";

#[derive(Debug, Parser)]
#[command(
    name = "reelcut",
    version,
    about = "Split long videos into parts or sample scene-aligned short clips",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output, including every rejected clip.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a spinner during scene detection.
    #[arg(long, global = true)]
    progress: bool,

    /// Replace existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Path to the ffmpeg executable used for export.
    #[arg(long, global = true, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Split videos into consecutive fixed-length parts.
    #[command(
        about = "Split videos into fixed-length parts",
        after_help = "Examples:\n  reelcut split lecture.mp4\n  reelcut split a.mp4 b.mp4 --max-duration 300 --out parts --dry-run"
    )]
    Split {
        /// Source videos.
        #[arg(required = true)]
        videos: Vec<PathBuf>,
        /// Longest part, in seconds.
        #[arg(long, default_value_t = DEFAULT_MAX_SEGMENT_SECONDS)]
        max_duration: f64,
        /// Output directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Plan and print parts without encoding.
        #[arg(long)]
        dry_run: bool,
    },

    /// Sample short clips bounded by scene cuts.
    #[command(
        about = "Create short clips from scene cuts",
        after_help = "Examples:\n  reelcut shorts --dir videos\n  reelcut shorts --video talk.mp4 --min-duration 20 --max-duration 45 --seed 7 --dry-run"
    )]
    Shorts {
        /// Directory scanned for .mp4 and .webm files.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Explicit source videos; replaces the directory scan.
        #[arg(long = "video", value_name = "PATH")]
        videos: Vec<PathBuf>,
        /// Minimum number of clips per video.
        #[arg(long, default_value_t = 4)]
        min_clips: usize,
        /// Maximum number of clips per video.
        #[arg(long, default_value_t = 10)]
        max_clips: usize,
        /// Shortest clip, in seconds.
        #[arg(long, default_value_t = 25.0)]
        min_duration: f64,
        /// Longest clip, in seconds.
        #[arg(long, default_value_t = 60.0)]
        max_duration: f64,
        /// Changed-pixel count above which two frames are a scene cut.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: u64,
        /// Attempt budget per targeted clip.
        #[arg(long, default_value_t = 1000)]
        attempts_per_clip: u64,
        /// Reject clips overlapping an already accepted clip.
        #[arg(long)]
        reject_overlaps: bool,
        /// Seed for reproducible sampling.
        #[arg(long)]
        seed: Option<u64>,
        /// Output directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Plan and print clips without encoding.
        #[arg(long)]
        dry_run: bool,
    },

    /// List detected scene cuts without exporting anything.
    #[command(
        about = "List scene cuts",
        after_help = "Examples:\n  reelcut scenes lecture.mp4\n  reelcut scenes lecture.mp4 --threshold 20000 --json"
    )]
    Scenes {
        /// Source video.
        video: PathBuf,
        /// Changed-pixel count above which two frames are a scene cut.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: u64,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print video properties.
    #[command(
        about = "Print video properties",
        visible_alias = "info",
        after_help = "Examples:\n  reelcut probe lecture.mp4\n  reelcut probe lecture.mp4 --json"
    )]
    Probe {
        /// Source video.
        video: PathBuf,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Prints events as colored lines on stderr and drives the optional spinner.
struct TerminalReporter {
    verbose: bool,
    spinner: Option<ProgressBar>,
}

impl TerminalReporter {
    fn new(verbose: bool, progress: bool) -> Result<Self, Box<dyn Error>> {
        let spinner = if progress {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.green} {elapsed} {msg}")?);
            spinner.enable_steady_tick(Duration::from_millis(120));
            Some(spinner)
        } else {
            None
        };
        Ok(Self { verbose, spinner })
    }

    fn print(&self, line: String) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    }

    fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, event: &Event) {
        if let Some(line) = format_event(event, self.verbose) {
            self.print(line);
        }
        if let (Some(spinner), Event::ScenesDetected { .. }) = (&self.spinner, event) {
            spinner.set_message("");
        }
    }

    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(spinner) = &self.spinner {
            let message = match info.percentage {
                Some(percentage) => {
                    format!("detecting scenes: frame {} ({percentage:.0}%)", info.current)
                }
                None => format!("detecting scenes: frame {}", info.current),
            };
            spinner.set_message(message);
        }
    }
}

/// The line printed for `event`, or `None` when it is only shown with
/// `--verbose`.
fn format_event(event: &Event, verbose: bool) -> Option<String> {
    let verbose_only = matches!(
        event,
        Event::ClipAccepted { .. }
            | Event::ClipRejected(Rejection::EndNotAfterStart { .. })
            | Event::ScenesDetected { .. }
    );
    if verbose_only && !verbose {
        return None;
    }

    let line = match event.severity() {
        Severity::Info => match event {
            Event::VideoStarted { .. } => format!("{}", event.to_string().bold()),
            Event::OutputWritten { .. } => format!("{} {event}", "created:".green().bold()),
            Event::OutputPlanned { .. } => format!("{} {event}", "planned:".cyan().bold()),
            _ => event.to_string(),
        },
        Severity::Warning => format!(
            "{} {}",
            "warning:".yellow().bold(),
            event.to_string().yellow()
        ),
        Severity::Error => format!("{} {}", "error:".red().bold(), event.to_string().red()),
    };
    Some(line)
}

fn scenes_payload(video: &Path, boundaries: &[u64], frames_per_second: f64, threshold: u64) -> Value {
    let cuts: Vec<Value> = boundaries
        .iter()
        .map(|&frame| {
            json!({
                "frame": frame,
                "seconds": seconds_at(frame, frames_per_second),
            })
        })
        .collect();
    json!({
        "video": video.display().to_string(),
        "fps": frames_per_second,
        "threshold": threshold,
        "boundaries": cuts,
    })
}

fn seconds_at(frame: u64, frames_per_second: f64) -> f64 {
    if frames_per_second > 0.0 {
        frame as f64 / frames_per_second
    } else {
        0.0
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "reelcut=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn Error>> {
    init_logging(global.verbose);
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        reelcut::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn build_encoder(global: &GlobalOptions) -> FfmpegEncoder {
    let encoder = FfmpegEncoder::new().overwrite(global.overwrite);
    match &global.ffmpeg {
        Some(binary) => encoder.binary(binary),
        None => encoder,
    }
}

fn print_summary(summary: &BatchSummary) {
    let label = if summary.videos_failed > 0 || summary.outputs_failed > 0 {
        "done (with errors):".yellow().bold()
    } else {
        "done:".green().bold()
    };
    eprintln!("{label} {summary}");
}

/// Fail on the first input path that does not exist.
fn require_inputs(paths: &[PathBuf]) -> Result<(), ReelcutError> {
    match paths.iter().find(|path| !path.exists()) {
        Some(missing) => Err(ReelcutError::FileOpen {
            path: missing.clone(),
            reason: "No such file or directory".to_string(),
        }),
        None => Ok(()),
    }
}

/// Sampler settings for `shorts`, validated before any video is looked at.
fn shorts_sampling(
    (min_clips, max_clips): (usize, usize),
    (min_duration, max_duration): (f64, f64),
    attempts_per_clip: u64,
    reject_overlaps: bool,
) -> Result<ClipSamplerOptions, ReelcutError> {
    let overlap_policy = if reject_overlaps {
        OverlapPolicy::RejectOverlapping
    } else {
        OverlapPolicy::ExactDuplicate
    };
    let sampling = ClipSamplerOptions::new()
        .clip_count_range(min_clips, max_clips)
        .duration_range(min_duration, max_duration)
        .attempts_per_clip(attempts_per_clip)
        .overlap_policy(overlap_policy);
    sampling.validate()?;
    Ok(sampling)
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Split {
            videos,
            max_duration,
            out,
            dry_run,
        } => {
            require_inputs(&videos)?;
            let segments = SegmentOptions::new().max_segment_length(max_duration);
            segments.validate()?;

            let reporter = TerminalReporter::new(cli.global.verbose, false)?;
            let encoder = build_encoder(&cli.global);
            let pipeline = Pipeline::new(&FfmpegOpener, &encoder, &reporter)
                .output_dir(out)
                .dry_run(dry_run)
                .segment_options(segments);

            let mut summary = BatchSummary::default();
            for video in &videos {
                summary.merge(&pipeline.split_video(video)?);
            }
            print_summary(&summary);
        }
        Commands::Shorts {
            dir,
            videos,
            min_clips,
            max_clips,
            min_duration,
            max_duration,
            threshold,
            attempts_per_clip,
            reject_overlaps,
            seed,
            out,
            dry_run,
        } => {
            let sampling = shorts_sampling(
                (min_clips, max_clips),
                (min_duration, max_duration),
                attempts_per_clip,
                reject_overlaps,
            )?;
            let videos = if videos.is_empty() {
                discover_videos(&dir, DEFAULT_VIDEO_EXTENSIONS)?
            } else {
                require_inputs(&videos)?;
                videos
            };
            if videos.is_empty() {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("no .mp4 or .webm files found in {}", dir.display()).yellow()
                );
                return Ok(());
            }

            let reporter = TerminalReporter::new(cli.global.verbose, cli.global.progress)?;
            let encoder = build_encoder(&cli.global);
            let pipeline = Pipeline::new(&FfmpegOpener, &encoder, &reporter)
                .output_dir(out)
                .dry_run(dry_run)
                .scene_detection(SceneDetectionOptions::new().threshold(threshold))
                .sampler_options(sampling);

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let summary = pipeline.create_shorts(&videos, &mut rng);
            reporter.finish();
            print_summary(&summary?);
        }
        Commands::Scenes {
            video,
            threshold,
            json,
        } => {
            let mut media = MediaFile::open(&video)?;
            let metadata = media.metadata().clone();
            let options = SceneDetectionOptions::new()
                .threshold(threshold)
                .expected_frames(metadata.frame_count);

            let reporter = TerminalReporter::new(cli.global.verbose, cli.global.progress)?;
            let scan = detect_scene_boundaries(media.frames()?, &options, &reporter);
            reporter.finish();

            if scan.read_failed() {
                let reason = scan
                    .decode_error
                    .unwrap_or_else(|| "no frames could be read".to_string());
                return Err(format!("failed to read {}: {reason}", video.display()).into());
            }
            if let Some(error) = &scan.decode_error {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("detection stopped early: {error}").yellow()
                );
            }

            let fps = metadata.frames_per_second;
            if json {
                let payload = scenes_payload(&video, &scan.boundaries, fps, threshold);
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for &frame in &scan.boundaries {
                    println!("cut at {:.3}s (frame {frame})", seconds_at(frame, fps));
                }
                println!("{} scenes in {} frames", scan.boundaries.len(), scan.frames_read);
            }
        }
        Commands::Probe { video, json } => {
            let media = MediaFile::open(&video)?;
            let metadata = media.metadata();
            if json {
                let mut payload = metadata.to_json();
                payload["path"] = json!(video.display().to_string());
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Path: {}", video.display());
                println!("Duration: {:.2} seconds", metadata.duration_seconds());
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec
                );
                println!("Frames (estimated): {}", metadata.frame_count);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "reelcut", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use reelcut::{Event, OverlapPolicy, ReelcutError, Rejection, TimeRange};

    use super::{
        Cli, Commands, format_event, require_inputs, scenes_payload, seconds_at, shorts_sampling,
    };

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn shorts_defaults_are_short_form_sized() {
        let cli = Cli::try_parse_from(["reelcut", "shorts"]).unwrap();
        match cli.command {
            Commands::Shorts {
                dir,
                min_clips,
                max_clips,
                min_duration,
                max_duration,
                ..
            } => {
                assert_eq!(dir, PathBuf::from("."));
                assert_eq!((min_clips, max_clips), (4, 10));
                assert_eq!((min_duration, max_duration), (25.0, 60.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn split_requires_a_video() {
        assert!(Cli::try_parse_from(["reelcut", "split"]).is_err());
        let cli = Cli::try_parse_from(["reelcut", "split", "a.mp4", "--max-duration", "300"]).unwrap();
        assert!(matches!(cli.command, Commands::Split { max_duration, .. } if max_duration == 300.0));
    }

    #[test]
    fn missing_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("talk.mp4");
        std::fs::write(&present, b"").unwrap();
        let missing = dir.path().join("does-not-exist.mp4");

        assert!(require_inputs(std::slice::from_ref(&present)).is_ok());
        let result = require_inputs(&[present, missing.clone()]);
        assert!(matches!(result, Err(ReelcutError::FileOpen { path, .. }) if path == missing));
    }

    #[test]
    fn inverted_clip_bounds_fail_before_discovery() {
        let result = shorts_sampling((10, 4), (25.0, 60.0), 1000, false);
        assert!(matches!(result, Err(ReelcutError::InvalidConfiguration(_))));

        let result = shorts_sampling((4, 10), (60.0, 25.0), 1000, false);
        assert!(matches!(result, Err(ReelcutError::InvalidConfiguration(_))));

        let sampling = shorts_sampling((4, 10), (25.0, 60.0), 1000, true).unwrap();
        assert_eq!(sampling.overlap_policy, OverlapPolicy::RejectOverlapping);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["reelcut", "probe", "a.mp4", "--verbose"]).unwrap();
        assert!(cli.global.verbose);
    }

    #[test]
    fn routine_rejections_need_verbose() {
        colored::control::set_override(false);
        let event = Event::ClipRejected(Rejection::EndNotAfterStart {
            start_frame: 9,
            end_frame: 3,
        });
        assert!(format_event(&event, false).is_none());
        assert!(format_event(&event, true).is_some());

        let event = Event::ClipRejected(Rejection::DurationOutOfRange { duration: 70.0 });
        let line = format_event(&event, false).unwrap();
        assert!(line.starts_with("warning: Generated clip duration"));
    }

    #[test]
    fn written_outputs_are_labelled() {
        colored::control::set_override(false);
        let event = Event::OutputWritten {
            output: PathBuf::from("short_a_1.mp4"),
            range: TimeRange::new(5.0, 9.0).unwrap(),
        };
        assert_eq!(
            format_event(&event, false).unwrap(),
            "created: Created short_a_1.mp4 from 5.00s..9.00s"
        );
    }

    #[test]
    fn scenes_json_lists_frames_and_seconds() {
        let payload = scenes_payload(std::path::Path::new("a.mp4"), &[10, 45], 5.0, 10_000);
        assert_eq!(payload["boundaries"][1]["frame"], 45);
        assert_eq!(payload["boundaries"][1]["seconds"], 9.0);
        assert_eq!(payload["threshold"], 10_000);
        assert_eq!(seconds_at(3, 0.0), 0.0);
    }
}
