// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use clcam::pipelines::photo::{Color, EncodingFormat};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser)]
#[command(name = "clcam")]
#[command(about = "Grab a single frame from a V4L2 camera, filter it and save it")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    capture: CaptureArgs,

    /// Read defaults from this file instead of ~/.config/clcam/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available filters
    Filters,

    /// Inspect or reset hardware controls
    Controls {
        #[command(subcommand)]
        action: ControlsAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ControlsAction {
    /// Show every control with its current value and range
    List,
    /// Restore every control to its default
    Reset,
}

/// Capture options; each one overrides the config file
#[derive(Args, Debug, Default, Clone)]
struct CaptureArgs {
    /// Video device to open
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Requested width (the driver may adjust it)
    #[arg(short = 'x', long)]
    width: Option<u32>,

    /// Requested height (the driver may adjust it)
    #[arg(short = 'y', long)]
    height: Option<u32>,

    /// Capture in greyscale
    #[arg(short = 'z', long)]
    greyscale: bool,

    /// Output type: ppm, ppm-ascii, jpeg or png
    #[arg(short = 'i', long = "type", value_name = "TYPE")]
    output_type: Option<EncodingFormat>,

    /// Output file, "-" for stdout (default: capture.<ext>)
    #[arg(short, long)]
    output: Option<String>,

    /// JPEG quality (0-100, 0 encodes as 1)
    #[arg(short, long)]
    quality: Option<u8>,

    /// PNG compression level (0 stores uncompressed, 9 is smallest)
    #[arg(long)]
    compression: Option<u8>,

    /// Request interlaced PNG output
    ///
    /// Adam7 interlacing is not supported by the PNG encoder, so the file is
    /// written non-interlaced and a warning is logged.
    #[arg(long)]
    interlace: bool,

    /// Text stamp, strftime directives are expanded
    #[arg(short, long)]
    text: Option<String>,

    /// Stamp text color (hex RRGGBB)
    #[arg(short = 'Y', long)]
    foreground: Option<Color>,

    /// Stamp cell background color (hex RRGGBB)
    #[arg(short = 'Z', long)]
    background: Option<Color>,

    /// Filter to apply, repeatable; applied in the order given
    #[arg(short, long = "filter", value_name = "NAME[=VALUE]")]
    filters: Vec<String>,

    /// Seed the noise filter for reproducible output
    #[arg(long)]
    noise_seed: Option<u64>,

    /// Hardware control to set (or reset when no value is given), repeatable
    #[arg(short, long = "control", value_name = "NAME[=VALUE]")]
    controls: Vec<String>,

    /// Seconds to wait for a frame
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout may carry image data, so logs go to stderr
    // Set RUST_LOG to override, e.g. RUST_LOG=clcam=trace
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let result = match cli.command {
        Some(Commands::Filters) => {
            cli::print_filters();
            Ok(())
        }
        Some(Commands::Controls { action }) => {
            cli::controls(&cli.capture, cli.config.as_deref(), action)
        }
        None => cli::capture(&cli.capture, cli.config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
