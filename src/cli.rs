// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Capturing a frame with the merged config file and flags
//! - Listing the available filters
//! - Listing or resetting hardware controls

use crate::{CaptureArgs, ControlsAction};
use clcam::backends::camera::{CaptureChannel, v4l2_controls};
use clcam::config::Config;
use clcam::errors::AppResult;
use clcam::pipelines::photo::PhotoPipeline;
use clcam::pipelines::photo::filters::FILTER_HELP;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::debug;

/// Capture one frame as configured
pub fn capture(args: &CaptureArgs, config_path: Option<&Path>) -> AppResult<()> {
    let config = merged_config(args, config_path)?;
    let session = config.to_session()?;
    debug!(?session, "Capture session");

    PhotoPipeline::new(session).run()
}

/// Print every filter with its argument and description
pub fn print_filters() {
    println!("Filters:");
    for (name, argument, description) in FILTER_HELP {
        let usage = match argument {
            Some(argument) => format!("{}=<{}>", name, argument),
            None => name.to_string(),
        };
        println!("  --filter {:<22}{}", usage, description);
    }
    println!();
    println!("REMEMBER: Filters are applied in the order in which you specify them!");
}

/// List or reset the hardware controls of the configured device
pub fn controls(
    args: &CaptureArgs,
    config_path: Option<&Path>,
    action: ControlsAction,
) -> AppResult<()> {
    let config = merged_config(args, config_path)?;
    let channel = CaptureChannel::open(&config.device)?;
    let fd = channel.as_raw_fd();

    match action {
        ControlsAction::List => {
            let caps = channel.capabilities();
            println!("{} ({}, {})", caps.card, caps.driver, channel.path());
            let controls = v4l2_controls::list_controls(fd);
            if controls.is_empty() {
                println!("  No controls.");
            }
            for control in controls {
                println!("  {}", control);
            }
        }
        ControlsAction::Reset => {
            let count = v4l2_controls::reset_all(fd);
            println!("Reset {} controls to their defaults", count);
        }
    }

    channel.close()?;
    Ok(())
}

/// Load the config file and apply the command-line overrides on top
fn merged_config(args: &CaptureArgs, config_path: Option<&Path>) -> AppResult<Config> {
    let mut config = Config::load_or_default(config_path)?;
    apply_overrides(&mut config, args);
    Ok(config)
}

/// Flags win over file values; repeated lists replace the file's list
fn apply_overrides(config: &mut Config, args: &CaptureArgs) {
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config.greyscale |= args.greyscale;
    if let Some(output_type) = args.output_type {
        config.output_type = output_type;
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(quality) = args.quality {
        config.quality = quality;
    }
    if let Some(compression) = args.compression {
        config.compression = compression;
    }
    config.interlace |= args.interlace;
    if let Some(text) = &args.text {
        config.text = Some(text.clone());
    }
    if let Some(foreground) = args.foreground {
        config.foreground = foreground;
    }
    if let Some(background) = args.background {
        config.background = Some(background);
    }
    if !args.filters.is_empty() {
        config.filters = args.filters.clone();
    }
    if let Some(seed) = args.noise_seed {
        config.noise_seed = Some(seed);
    }
    if !args.controls.is_empty() {
        config.controls = args.controls.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
}
