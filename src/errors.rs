// SPDX-License-Identifier: GPL-3.0-only

//! Error types for clcam
//!
//! Errors fall into three classes that the binary maps to exit statuses:
//!
//! - [`ConfigError`]: rejected before the device is touched (bad filter chain,
//!   unknown names, malformed colors, unreadable config file)
//! - [`CaptureError`]: fatal device failures, each carrying the failing
//!   operation and the OS error
//! - [`EncodeError`]: the destination could not be opened or written
//!
//! Filter scratch-buffer allocation failures ([`FilterError`]) never escape
//! the filter chain; they are logged and the step is skipped.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug)]
pub enum AppError {
    /// Invalid configuration, detected before capture starts
    Config(ConfigError),
    /// Device errors during capture
    Capture(CaptureError),
    /// Output encoding errors
    Encode(EncodeError),
}

impl AppError {
    /// Process exit status for this error class
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Capture(_) | AppError::Encode(_) => 1,
        }
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Filter chain already holds the maximum number of entries
    TooManyFilters { max: usize },
    /// Filter name not recognised
    UnknownFilter(String),
    /// Filter parameter missing, extra or out of range
    InvalidFilterParameter { filter: String, reason: String },
    /// Hardware control name not recognised
    UnknownControl(String),
    /// Hardware control value could not be parsed
    InvalidControlValue { control: String, value: String },
    /// Color could not be parsed as hex RGB
    InvalidColor(String),
    /// Unknown output type
    UnknownOutputType(String),
    /// A numeric option is out of range
    OutOfRange {
        option: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// Config file could not be read or parsed
    File { path: PathBuf, reason: String },
}

/// Fatal capture errors
///
/// Every variant that wraps an `io::Error` records the operation that failed
/// so the diagnostic reads like `VIDIOC_DQBUF error 5, Input/output error`.
#[derive(Debug)]
pub enum CaptureError {
    /// Path could not be identified (stat failed)
    DeviceNotFound { path: String, source: io::Error },
    /// Path exists but is not a character device
    NotACharDevice(String),
    /// Device could not be opened read/write
    Open { path: String, source: io::Error },
    /// Device does not answer VIDIOC_QUERYCAP
    NotV4l2Device(String),
    /// Device lacks video capture capability
    NotCaptureDevice(String),
    /// Device lacks streaming I/O
    NoStreaming(String),
    /// Device does not support memory-mapped buffers
    NoMmap(String),
    /// Driver granted zero buffers
    InsufficientBuffers(String),
    /// Driver refused YUYV and offered another pixel format
    UnsupportedPixelFormat { path: String, fourcc: String },
    /// Readiness wait elapsed without a frame
    Timeout { seconds: u64 },
    /// Operation was attempted in the wrong lifecycle state
    InvalidState(&'static str),
    /// Any other failing system call
    Ioctl {
        operation: &'static str,
        source: io::Error,
    },
}

/// Output errors
#[derive(Debug)]
pub enum EncodeError {
    /// Destination file could not be created
    Open { path: PathBuf, source: io::Error },
    /// Writing the encoded bytes failed
    Write(io::Error),
    /// The codec rejected the raster
    Codec(String),
}

/// Soft per-filter failures
#[derive(Debug)]
pub enum FilterError {
    /// Scratch raster could not be allocated
    Allocation { bytes: usize },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Encode(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TooManyFilters { max } => {
                write!(f, "Too many filters, at most {} may be chained", max)
            }
            ConfigError::UnknownFilter(name) => write!(f, "Unknown filter '{}'", name),
            ConfigError::InvalidFilterParameter { filter, reason } => {
                write!(f, "Invalid parameter for filter '{}': {}", filter, reason)
            }
            ConfigError::UnknownControl(name) => write!(f, "Unknown control '{}'", name),
            ConfigError::InvalidControlValue { control, value } => {
                write!(f, "Invalid value '{}' for control '{}'", value, control)
            }
            ConfigError::InvalidColor(value) => write!(f, "Invalid color '{}'", value),
            ConfigError::UnknownOutputType(value) => {
                write!(f, "Unknown output type '{}' (expected PPM, JPEG or PNG)", value)
            }
            ConfigError::OutOfRange {
                option,
                value,
                min,
                max,
            } => write!(
                f,
                "{} must be between {} and {}, got {}",
                option, min, max, value
            ),
            ConfigError::File { path, reason } => {
                write!(f, "Cannot load config '{}': {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceNotFound { path, source } => write!(
                f,
                "Cannot identify '{}': {}, {}",
                path,
                source.raw_os_error().unwrap_or(0),
                source
            ),
            CaptureError::NotACharDevice(path) => write!(f, "{} is no device", path),
            CaptureError::Open { path, source } => write!(
                f,
                "Cannot open '{}': {}, {}",
                path,
                source.raw_os_error().unwrap_or(0),
                source
            ),
            CaptureError::NotV4l2Device(path) => write!(f, "{} is no V4L2 device", path),
            CaptureError::NotCaptureDevice(path) => {
                write!(f, "{} is no video capture device", path)
            }
            CaptureError::NoStreaming(path) => {
                write!(f, "{} does not support streaming i/o", path)
            }
            CaptureError::NoMmap(path) => write!(f, "{} does not support memory mapping", path),
            CaptureError::InsufficientBuffers(path) => {
                write!(f, "Insufficient buffer memory on {}", path)
            }
            CaptureError::UnsupportedPixelFormat { path, fourcc } => {
                write!(f, "{} cannot deliver YUYV (offered {})", path, fourcc)
            }
            CaptureError::Timeout { seconds } => {
                write!(f, "No frame within {} seconds (select timeout)", seconds)
            }
            CaptureError::InvalidState(msg) => write!(f, "Invalid capture state: {}", msg),
            CaptureError::Ioctl { operation, source } => write!(
                f,
                "{} error {}, {}",
                operation,
                source.raw_os_error().unwrap_or(0),
                source
            ),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Open { path, source } => {
                write!(f, "Could not open '{}': {}", path.display(), source)
            }
            EncodeError::Write(e) => write!(f, "Write failed: {}", e),
            EncodeError::Codec(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Allocation { bytes } => {
                write!(f, "Could not allocate {} byte scratch raster", bytes)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Capture(e) => Some(e),
            AppError::Encode(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::DeviceNotFound { source, .. }
            | CaptureError::Open { source, .. }
            | CaptureError::Ioctl { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Open { source, .. } => Some(source),
            EncodeError::Write(e) => Some(e),
            EncodeError::Codec(_) => None,
        }
    }
}

impl std::error::Error for FilterError {}

// Conversions from sub-errors to AppError
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        AppError::Encode(err)
    }
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::Write(err)
    }
}

impl From<image::ImageError> for EncodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => EncodeError::Write(e),
            other => EncodeError::Codec(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_class() {
        let config: AppError = ConfigError::TooManyFilters { max: 10 }.into();
        let capture: AppError = CaptureError::Timeout { seconds: 3 }.into();
        assert_eq!(config.exit_code(), 2);
        assert_eq!(capture.exit_code(), 1);
    }

    #[test]
    fn test_ioctl_error_message_names_operation() {
        let err = CaptureError::Ioctl {
            operation: "VIDIOC_DQBUF",
            source: io::Error::from_raw_os_error(libc::EIO),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("VIDIOC_DQBUF error 5"), "{}", msg);
    }
}
