// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! - [`v4l2_capture`]: single-buffer memory-mapped capture channel
//! - [`v4l2_controls`]: hardware control lookup, set, reset and listing
//! - [`v4l2_utils`]: kernel structures and the ioctl wrapper they share

pub mod types;
pub mod v4l2_capture;
pub mod v4l2_controls;
pub mod v4l2_utils;

pub use types::{CaptureFormat, DeviceCapabilities};
pub use v4l2_capture::{CaptureChannel, Frame, MappedBuffer};
pub use v4l2_controls::{ControlInfo, ControlRequest, ControlState};
