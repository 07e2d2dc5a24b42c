// SPDX-License-Identifier: GPL-3.0-only

//! Persistent defaults for capture runs
//!
//! Read from `$XDG_CONFIG_HOME/clcam/config.json` (or `--config PATH`).
//! Every field is optional in the file; command-line flags override whatever
//! the file sets.

use crate::backends::camera::ControlRequest;
use crate::constants::capture::{DEFAULT_DEVICE, DEFAULT_HEIGHT, DEFAULT_TIMEOUT, DEFAULT_WIDTH};
use crate::constants::output::{DEFAULT_JPEG_QUALITY, DEFAULT_PNG_COMPRESSION};
use crate::errors::ConfigError;
use crate::media::Channels;
use crate::pipelines::photo::{
    CaptureSession, Color, Destination, EncodingFormat, EncodingParams, FilterChain, TextOverlay,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Directory below the user config dir holding our files
const CONFIG_DIR: &str = "clcam";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Capture device path
    pub device: String,
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Capture single-channel luma instead of RGB
    pub greyscale: bool,
    /// Output encoding (ppm, ppm-ascii, jpeg, png)
    pub output_type: EncodingFormat,
    /// Output path, "-" for stdout; `capture.<ext>` when unset
    pub output: Option<String>,
    /// JPEG quality (0-100, 0 encodes as 1)
    pub quality: u8,
    /// PNG compression level (0-9)
    pub compression: u8,
    /// Request interlaced PNG output (written non-interlaced, with a warning)
    pub interlace: bool,
    /// strftime template for the text stamp
    pub text: Option<String>,
    pub foreground: Color,
    pub background: Option<Color>,
    /// Filter specs (`name[=value]`) applied in order
    pub filters: Vec<String>,
    /// Fixed seed for the noise filter
    pub noise_seed: Option<u64>,
    /// Hardware control requests (`name[=value]`)
    pub controls: Vec<String>,
    /// Seconds to wait for a frame
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            greyscale: false,
            output_type: EncodingFormat::default(),
            output: None,
            quality: DEFAULT_JPEG_QUALITY,
            compression: DEFAULT_PNG_COMPRESSION,
            interlace: false,
            text: None,
            foreground: Color::default(),
            background: None,
            filters: Vec::new(),
            noise_seed: None,
            controls: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load a config file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::File`] if the file is missing, unreadable or
    /// not valid config JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| file_error(path, e))?;
        let config = serde_json::from_str(&contents).map_err(|e| file_error(path, e))?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `path`, or the default location when `path` is `None`
    ///
    /// Only the default location may be absent, in which case the built-in
    /// defaults are returned. An explicitly requested file must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) => match fs::metadata(&path) {
                Ok(_) => Self::load(&path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
                Err(e) => Err(file_error(&path, e)),
            },
            None => Ok(Self::default()),
        }
    }

    /// Validate every value and build the session it describes
    ///
    /// Nothing here touches the device, so a bad filter chain or control name
    /// is reported before capture starts.
    pub fn to_session(&self) -> Result<CaptureSession, ConfigError> {
        check_range("width", self.width.into(), 1, u32::MAX.into())?;
        check_range("height", self.height.into(), 1, u32::MAX.into())?;
        check_range("quality", self.quality.into(), 0, 100)?;
        check_range("compression", self.compression.into(), 0, 9)?;
        check_range(
            "timeout",
            i64::try_from(self.timeout_secs).unwrap_or(i64::MAX),
            1,
            u32::MAX.into(),
        )?;

        let filters = FilterChain::parse_specs(&self.filters)?.with_noise_seed(self.noise_seed);
        let controls = self
            .controls
            .iter()
            .map(|spec| spec.parse::<ControlRequest>())
            .collect::<Result<Vec<_>, _>>()?;

        let overlay = self.text.as_ref().map(|template| TextOverlay {
            template: template.clone(),
            foreground: self.foreground,
            background: self.background,
        });

        let destination = match &self.output {
            Some(output) => Destination::parse(output),
            None => Destination::default_for(self.output_type),
        };

        Ok(CaptureSession {
            device: self.device.clone(),
            width: self.width,
            height: self.height,
            channels: if self.greyscale {
                Channels::Grey
            } else {
                Channels::Rgb
            },
            filters,
            overlay,
            format: self.output_type,
            params: EncodingParams {
                jpeg_quality: self.quality,
                png_compression: self.compression,
                png_interlace: self.interlace,
            },
            destination,
            timeout: Duration::from_secs(self.timeout_secs),
            controls,
        })
    }
}

fn check_range(option: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            option,
            value,
            min,
            max,
        })
    }
}

fn file_error(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::File {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "width": 320, "output_type": "png" }"#).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.output_type, EncodingFormat::Png);
        assert_eq!(config.quality, 85);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{ "widht": 320 }"#).is_err());
    }

    #[test]
    fn test_default_config_builds_default_session() {
        let session = Config::default().to_session().unwrap();
        assert_eq!(session, CaptureSession::default());
    }

    #[test]
    fn test_session_from_config() {
        let config = Config {
            greyscale: true,
            output_type: EncodingFormat::Png,
            output: Some("-".to_string()),
            text: Some("%Y".to_string()),
            filters: vec!["mirror".to_string(), "brightness=10".to_string()],
            controls: vec!["brightness=200".to_string(), "gain".to_string()],
            ..Default::default()
        };
        let session = config.to_session().unwrap();
        assert_eq!(session.channels, Channels::Grey);
        assert_eq!(session.destination, Destination::Stdout);
        assert_eq!(session.filters.len(), 2);
        assert_eq!(session.controls.len(), 2);
        assert_eq!(session.controls[1].value, None);
        assert_eq!(session.overlay.unwrap().foreground, Color::WHITE);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let config = Config {
            quality: 101,
            ..Default::default()
        };
        assert!(matches!(
            config.to_session(),
            Err(ConfigError::OutOfRange {
                option: "quality",
                value: 101,
                ..
            })
        ));

        let config = Config {
            compression: 10,
            ..Default::default()
        };
        assert!(config.to_session().is_err());
    }

    #[test]
    fn test_quality_zero_accepted() {
        let config = Config {
            quality: 0,
            ..Default::default()
        };
        assert_eq!(config.to_session().unwrap().params.jpeg_quality, 0);
    }

    #[test]
    fn test_bad_names_rejected_before_capture() {
        let config = Config {
            filters: vec!["sepia".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.to_session(),
            Err(ConfigError::UnknownFilter(_))
        ));

        let config = Config {
            controls: vec!["warp_drive=1".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.to_session(),
            Err(ConfigError::UnknownControl(_))
        ));
    }

    #[test]
    fn test_colors_as_hex_strings() {
        let config: Config =
            serde_json::from_str(r##"{ "foreground": "#ff0000", "background": "000080" }"##)
                .unwrap();
        assert_eq!(config.foreground, Color { r: 255, g: 0, b: 0 });
        assert_eq!(config.background, Some(Color { r: 0, g: 0, b: 128 }));
    }
}
