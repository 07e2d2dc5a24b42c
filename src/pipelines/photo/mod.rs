// SPDX-License-Identifier: GPL-3.0-only

//! Single-frame photo pipeline
//!
//! ```text
//! CaptureChannel → YUYV→RGB → FilterChain → Text stamp → Encoder
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: open, negotiate, map, start, and dequeue exactly one frame
//! 2. **Conversion**: YUYV to an RGB (or luma) raster
//! 3. **Filtering**: the ordered filter chain
//! 4. **Stamp**: optional strftime text band
//! 5. **Encoding**: PPM, JPEG or PNG to a file or stdout
//!
//! The device is stopped, unmapped and closed after encoding.

pub mod encoding;
pub mod filters;
mod font;
pub mod stamp;

pub use encoding::{Destination, EncodingFormat, EncodingParams, PhotoEncoder};
pub use filters::{Filter, FilterChain};
pub use stamp::{Color, TextOverlay};

use crate::backends::camera::v4l2_controls::{self, ControlRequest};
use crate::backends::camera::{CaptureChannel, CaptureFormat};
use crate::constants::capture::{
    DEFAULT_DEVICE, DEFAULT_HEIGHT, DEFAULT_TIMEOUT, DEFAULT_WIDTH, FRAME_COUNT,
};
use crate::errors::{AppResult, CaptureError, EncodeError};
use crate::media::format_converters::convert_yuyv;
use crate::media::raster::{Channels, Raster};
use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::{debug, info};

/// Validated, immutable description of one capture run
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    /// Capture device path
    pub device: String,
    /// Requested frame width (the driver may adjust it)
    pub width: u32,
    /// Requested frame height (the driver may adjust it)
    pub height: u32,
    /// Raster depth for the whole run
    pub channels: Channels,
    pub filters: FilterChain,
    pub overlay: Option<TextOverlay>,
    pub format: EncodingFormat,
    pub params: EncodingParams,
    pub destination: Destination,
    /// Readiness wait for the frame
    pub timeout: Duration,
    /// Hardware control changes applied right after opening the device
    pub controls: Vec<ControlRequest>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        let format = EncodingFormat::default();
        Self {
            device: DEFAULT_DEVICE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            channels: Channels::Rgb,
            filters: FilterChain::new(),
            overlay: None,
            format,
            params: EncodingParams::default(),
            destination: Destination::default_for(format),
            timeout: DEFAULT_TIMEOUT,
            controls: Vec::new(),
        }
    }
}

/// Complete photo capture pipeline
///
/// Orchestrates the capture → convert → filter → stamp → encode workflow.
pub struct PhotoPipeline {
    session: CaptureSession,
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    pub fn new(session: CaptureSession) -> Self {
        let encoder = PhotoEncoder::new(session.format, session.params);
        Self { session, encoder }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Convert a captured YUYV frame into a raster of the session depth
    pub fn develop(&self, frame: &[u8], format: &CaptureFormat) -> Raster {
        convert_yuyv(
            frame,
            format.width,
            format.height,
            format.bytes_per_line as usize,
            self.session.channels,
        )
    }

    /// Run the filter chain and stamp the result with the current local time
    pub fn process(&self, raster: Raster) -> Raster {
        self.process_at(raster, &Local::now())
    }

    /// Run the filter chain and stamp the result with `now`
    pub fn process_at<Tz: TimeZone>(&self, raster: Raster, now: &DateTime<Tz>) -> Raster
    where
        Tz::Offset: fmt::Display,
    {
        let mut raster = self.session.filters.apply(raster);
        if let Some(overlay) = &self.session.overlay {
            stamp::stamp(&mut raster, overlay, now);
        }
        raster
    }

    /// Encode a finished raster to the session destination
    pub fn save(&self, raster: &Raster) -> Result<(), EncodeError> {
        self.encoder.save(raster, &self.session.destination)
    }

    /// Capture one frame and write it out
    pub fn run(&self) -> AppResult<()> {
        let session = &self.session;
        let mut channel = CaptureChannel::open(&session.device)?;

        for request in &session.controls {
            v4l2_controls::apply_request(channel.as_raw_fd(), request)?;
        }

        let format = channel.negotiate(session.width, session.height)?;
        channel.map_buffer()?;
        channel.start()?;

        let mut captured = None;
        for frame_index in 0..FRAME_COUNT {
            let frame = channel.acquire_one(session.timeout)?;
            debug!(
                frame_index,
                sequence = frame.sequence(),
                bytes = frame.len(),
                "Converting frame"
            );
            captured = Some(self.develop(&frame, &format));
        }
        let raster = captured.ok_or(CaptureError::InvalidState("no frame was captured"))?;

        let raster = self.process(raster);
        let saved = self.save(&raster);
        let closed = channel.close();

        saved?;
        closed?;

        info!(
            device_path = %session.device,
            width = raster.width(),
            height = raster.height(),
            destination = %session.destination,
            "Capture complete"
        );
        Ok(())
    }
}
