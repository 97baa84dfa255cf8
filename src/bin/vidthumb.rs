use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vidthumb::{
    ContactSheet, FfmpegLogLevel, GridShape, OperationType, Orientation, ProgressCallback,
    ProgressInfo, SheetOptions, TargetBox,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidthumb input.mp4 sheet.png\n  vidthumb --portrait --columns 4 --rows 3 scans.zip pages.png\n  vidthumb input.mkv sheet.png --progress --json\n  vidthumb --completions zsh > _vidthumb";

#[derive(Debug, Parser)]
#[command(
    name = "vidthumb",
    version,
    about = "Build a contact sheet of representative frames from a video or image archive",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video file or ZIP archive of images.
    #[arg(required_unless_present = "completions")]
    input: Option<PathBuf>,

    /// Output image path (PNG recommended).
    #[arg(required_unless_present = "completions")]
    output: Option<PathBuf>,

    /// Use the portrait cell preset (890x1280) instead of landscape (320x200).
    #[arg(short, long)]
    portrait: bool,

    /// Number of thumbnail columns.
    #[arg(long, default_value_t = 6)]
    columns: u32,

    /// Number of thumbnail rows.
    #[arg(long, default_value_t = 6)]
    rows: u32,

    /// Override the preset cell width.
    #[arg(long)]
    width: Option<u32>,

    /// Override the preset cell height.
    #[arg(long)]
    height: Option<u32>,

    /// Show progress bars while scanning and extracting.
    #[arg(long)]
    progress: bool,

    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Allow overwriting an existing output file.
    #[arg(long)]
    overwrite: bool,

    /// Print a machine-readable summary of the selection.
    #[arg(long)]
    json: bool,

    /// Print shell completions and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Route the library's `log` records to stderr through `tracing-subscriber`.
///
/// `RUST_LOG` takes precedence over `--verbose` when set.
fn install_logger(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| format!("cannot install logger: {error}").into())
}

/// Resolve the cell box from the preset and any explicit overrides.
fn resolve_target_box(portrait: bool, width: Option<u32>, height: Option<u32>) -> TargetBox {
    let preset = if portrait {
        Orientation::Portrait
    } else {
        Orientation::Landscape
    }
    .target_box();
    TargetBox::new(
        width.unwrap_or(preset.width).max(1),
        height.unwrap_or(preset.height).max(1),
    )
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

/// One indicatif bar per pass, replaced when the pass changes.
struct TerminalProgress {
    bar: Mutex<Option<(OperationType, ProgressBar)>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_bar(operation: OperationType, total: Option<u64>) -> ProgressBar {
        let (bar, template) = match total {
            Some(total) => (
                ProgressBar::new(total),
                "{spinner:.green} {msg:>10} {bar:40.cyan/blue} {pos}/{len} (eta {eta})",
            ),
            None => (ProgressBar::new_spinner(), "{spinner:.green} {msg:>10} {pos}"),
        };
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(match operation {
            OperationType::FrameAnalysis => "scanning",
            OperationType::FrameExtraction => "extracting",
            _ => "working",
        });
        bar
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some((_, bar)) = slot.take() {
                bar.finish();
            }
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let stale = !matches!(&*slot, Some((operation, _)) if *operation == info.operation);
        if stale {
            if let Some((_, bar)) = slot.take() {
                bar.finish();
            }
            *slot = Some((info.operation, Self::start_bar(info.operation, info.total)));
        }
        if let Some((_, bar)) = &*slot {
            if let Some(total) = info.total {
                // Frame counts are estimates for video; let the bar grow.
                if info.current > total {
                    bar.set_length(info.current);
                }
            }
            bar.set_position(info.current);
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "vidthumb", &mut std::io::stdout());
        return Ok(());
    }

    install_logger(cli.verbose)?;
    if let Some(level) = &cli.log_level {
        let parsed =
            FfmpegLogLevel::parse(level).ok_or(format!("unsupported --log-level: {level}"))?;
        vidthumb::initialize_ffmpeg()?;
        vidthumb::set_ffmpeg_log_level(parsed);
    }

    let input = cli.input.ok_or("missing INPUT")?;
    let output = cli.output.ok_or("missing OUTPUT")?;
    ensure_writable_path(&output, cli.overwrite)?;

    let grid = GridShape::new(cli.columns, cli.rows);
    let target = resolve_target_box(cli.portrait, cli.width, cli.height);
    let mut options = SheetOptions::new()
        .with_grid(grid)
        .with_target_box(target)
        .with_batch_size(10);

    let progress = cli.progress.then(|| Arc::new(TerminalProgress::new()));
    if let Some(progress) = &progress {
        options = options.with_progress(progress.clone());
    }

    let result = ContactSheet::generate(&input, &options);
    if let Some(progress) = &progress {
        progress.finish();
    }
    let sheet = result?;
    sheet.save(&output)?;

    if cli.json {
        let statistics = sheet.statistics();
        let metadata = sheet.metadata();
        let payload = json!({
            "input": input.display().to_string(),
            "output": output.display().to_string(),
            "backend": format!("{:?}", metadata.backend),
            "format": metadata.format,
            "frames_scanned": statistics.frame_count(),
            "candidates": sheet.candidate_count(),
            "columns": sheet.plan().grid().columns,
            "rows": sheet.plan().grid().rows,
            "selected": sheet.plan().frames(),
            "placed": sheet.placed(),
            "median_difference": statistics.median_difference(),
            "median_contrast": statistics.median_contrast(),
            "difference_invalid": statistics.any_difference_invalid(),
            "ended_early": statistics.ended_early(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let grid = sheet.plan().grid();
        println!(
            "{} {}",
            "saved".green().bold(),
            format!(
                "{} ({}x{}, {} of {} frames)",
                output.display(),
                grid.columns,
                grid.rows,
                sheet.placed(),
                sheet.statistics().frame_count()
            )
        );
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
