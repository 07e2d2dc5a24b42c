// SPDX-License-Identifier: GPL-3.0-only

//! clcam - single-frame console capture for V4L2 cameras
//!
//! Grabs one YUYV frame through memory-mapped streaming I/O, converts it to
//! RGB, runs an ordered filter chain, optionally stamps a strftime text band
//! and writes PPM, JPEG or PNG to a file or stdout.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: V4L2 capture channel and hardware controls
//! - [`media`]: Raster buffers and YUYV conversion
//! - [`pipelines`]: Filter chain, text stamp, encoders and the capture pipeline
//! - [`config`]: Config file and session validation
//!
//! # Example
//!
//! ```no_run
//! use clcam::pipelines::photo::{CaptureSession, PhotoPipeline};
//!
//! let session = CaptureSession::default();
//! PhotoPipeline::new(session).run()?;
//! # Ok::<(), clcam::errors::AppError>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{Channels, Raster};
pub use pipelines::photo::{CaptureSession, FilterChain, PhotoPipeline};
