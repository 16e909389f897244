use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use vidthumb::{
    FfmpegElement, FfmpegLogLevel, HostCapabilities, OperationType, ProgressCallback,
    ProgressInfo, SamplingOverrides, Session, SessionOptions, StartupStrategy, VideoSource,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidthumb metadata input.mp4 --json\n  vidthumb thumbnails input.mp4 --out thumbs --interval 2 --scale 0.5 --progress\n  vidthumb thumbnails clip.webm --out thumbs --blob --sprite 5\n  vidthumb completions zsh > _vidthumb";

#[derive(Debug, Parser)]
#[command(
    name = "vidthumb",
    version,
    about = "Probe video metadata and sample thumbnails",
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
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while sampling.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print video dimensions and duration.
    #[command(
        visible_alias = "probe",
        after_help = "Examples:\n  vidthumb metadata input.mp4\n  vidthumb metadata recording.webm --json --blob"
    )]
    Metadata {
        /// Input video path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,

        /// Load the input into memory and probe it as a blob.
        #[arg(long)]
        blob: bool,
    },

    /// Sample evenly spaced JPEG thumbnails into a directory.
    #[command(
        after_help = "Examples:\n  vidthumb thumbnails input.mp4 --out thumbs\n  vidthumb thumbnails input.mp4 --out thumbs --start 0:10 --end 0:20 --interval 0.5"
    )]
    Thumbnails {
        /// Input video path or URL.
        input: String,
        /// Output directory for thumbnail images.
        #[arg(long)]
        out: PathBuf,
        /// Seconds between thumbnails.
        #[arg(long)]
        interval: Option<String>,
        /// First sample position (seconds or [hh:]mm:ss).
        #[arg(long)]
        start: Option<String>,
        /// Stop sampling at this position (seconds or [hh:]mm:ss).
        #[arg(long)]
        end: Option<String>,
        /// Scale factor applied to the video dimensions.
        #[arg(long)]
        scale: Option<f64>,
        /// JPEG quality between 0 and 1.
        #[arg(long)]
        quality: Option<f64>,
        /// Also write a sprite sheet with this many columns.
        #[arg(long, value_name = "COLUMNS")]
        sprite: Option<u32>,
        /// Print a JSON listing of the written thumbnails.
        #[arg(long)]
        json: bool,
        /// Load the input into memory and sample it as a blob.
        #[arg(long)]
        blob: bool,
        /// Encode through data URLs instead of direct blobs.
        #[arg(long)]
        data_url: bool,
        /// Start playback once buffering progresses before sampling.
        #[arg(long)]
        nudge_playback: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("invalid time value: {trimmed}").into());
        }
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid seconds in time value: {trimmed}").into());
    }
    Ok((hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds)
}

fn load_source(input: &str, blob: bool) -> Result<VideoSource, Box<dyn std::error::Error>> {
    if !blob {
        return Ok(VideoSource::from(input));
    }
    if input.contains("://") {
        return Err("--blob needs a local file, not a URL".into());
    }
    Ok(VideoSource::Blob(fs::read(input)?))
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global);

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        vidthumb::set_ffmpeg_log_level(parsed);
    } else if !global.verbose {
        vidthumb::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }

    Ok(())
}

/// Mirrors sampling progress onto an indicatif bar.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::no_length();
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.operation != OperationType::Sampling {
            return;
        }
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
        if let Some(timestamp) = info.timestamp {
            self.bar.set_message(format!("{timestamp:.2}s"));
        }
    }
}

fn sampling_overrides(
    interval: Option<String>,
    start: Option<String>,
    end: Option<String>,
    scale: Option<f64>,
    quality: Option<f64>,
) -> Result<SamplingOverrides, Box<dyn std::error::Error>> {
    let mut overrides = SamplingOverrides::new();
    if let Some(interval) = interval {
        overrides = overrides.interval(parse_timecode(&interval)?);
    }
    if let Some(start) = start {
        overrides = overrides.start(parse_timecode(&start)?);
    }
    if let Some(end) = end {
        overrides = overrides.end(parse_timecode(&end)?);
    }
    if let Some(scale) = scale {
        overrides = overrides.scale(scale);
    }
    if let Some(quality) = quality {
        overrides = overrides.quality(quality);
    }
    Ok(overrides)
}

async fn run_metadata(
    input: String,
    json: bool,
    blob: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(load_source(&input, blob)?)?;
    let metadata = session.metadata().await?;

    if json {
        let payload = json!({
            "input": input,
            "width": metadata.width,
            "height": metadata.height,
            "duration": metadata.duration,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Input: {input}");
        println!("Dimensions: {}x{}", metadata.width, metadata.height);
        println!("Duration: {:.2}s", metadata.duration);
    }
    Ok(())
}

async fn run_thumbnails(
    command: Commands,
    global: &GlobalOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let Commands::Thumbnails {
        input,
        out,
        interval,
        start,
        end,
        scale,
        quality,
        sprite,
        json,
        blob,
        data_url,
        nudge_playback,
    } = command
    else {
        return Ok(());
    };

    if sprite == Some(0) {
        return Err("--sprite must be greater than 0".into());
    }
    let overrides = sampling_overrides(interval, start, end, scale, quality)?;

    if out.exists() {
        if !global.overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("writing into existing directory {}", out.display()).yellow()
        );
    }
    fs::create_dir_all(&out)?;

    let mut element = FfmpegElement::open(load_source(&input, blob)?)?;
    if data_url {
        element = element.with_capabilities(HostCapabilities {
            blob_encoding: false,
        });
    }

    let mut session_options = SessionOptions::new();
    if nudge_playback {
        session_options = session_options.with_startup(StartupStrategy::NudgePlayback);
    }
    let progress = if global.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        session_options = session_options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let mut session = Session::new(element).with_session_options(session_options);
    let thumbnails = session.thumbnails(Some(overrides)).await?;

    if let Some(progress) = progress {
        progress.bar.finish_with_message("done");
    }

    let mut written = Vec::with_capacity(thumbnails.len());
    for (index, thumbnail) in thumbnails.iter().enumerate() {
        let Some(blob) = &thumbnail.blob else {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("thumbnail {index} at {:.2}s is empty", thumbnail.current_time).yellow()
            );
            continue;
        };
        let path = out.join(format!("thumb_{index:04}.jpg"));
        ensure_writable_path(&path, global.overwrite)?;
        blob.save(&path)?;
        if global.verbose {
            eprintln!("saved {:.2}s -> {}", thumbnail.current_time, path.display());
        }
        written.push(json!({
            "index": index,
            "current_time": thumbnail.current_time,
            "path": path.display().to_string(),
            "bytes": blob.len(),
        }));
    }

    let sheet_path = match sprite {
        Some(columns) => match vidthumb::sprite_sheet(&thumbnails, columns)? {
            Some(sheet) => {
                let path = out.join("sprite.jpg");
                ensure_writable_path(&path, global.overwrite)?;
                sheet.to_rgb8().save(&path)?;
                Some(path)
            }
            None => None,
        },
        None => None,
    };

    if json {
        let payload = json!({
            "input": input,
            "thumbnails": written,
            "sprite": sheet_path.as_ref().map(|path| path.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!("Wrote {} thumbnail(s) to {}", written.len(), out.display()).green()
        );
        if let Some(path) = sheet_path {
            println!("{} {}", "saved".green().bold(), path.display());
        }
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "vidthumb", &mut std::io::stdout());
        return Ok(());
    }

    apply_global_options(&cli.global)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Metadata { input, json, blob } => run_metadata(input, json, blob).await,
            command @ Commands::Thumbnails { .. } => run_thumbnails(command, &cli.global).await,
            Commands::Completions { .. } => Ok(()),
        }
    })
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
