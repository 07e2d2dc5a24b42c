// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! This module writes a finished raster in one of the supported formats:
//! - PPM, binary (P6) or ASCII (P3)
//! - JPEG (with quality control)
//! - PNG (with compression level)
//!
//! Greyscale rasters are written as 8-bit grey where the format supports it
//! and replicated to RGB for PPM.

use crate::constants::output::{
    DEFAULT_FILE_STEM, DEFAULT_JPEG_QUALITY, DEFAULT_PNG_COMPRESSION, STDOUT_SENTINEL,
};
use crate::errors::{ConfigError, EncodeError};
use crate::media::raster::{Channels, Raster};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingFormat {
    /// Binary PPM (P6)
    #[serde(alias = "ppm")]
    PpmRaw,
    /// ASCII PPM (P3)
    PpmAscii,
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::PpmRaw | EncodingFormat::PpmAscii => "ppm",
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

impl FromStr for EncodingFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ppm" | "ppm-raw" | "p6" => Ok(EncodingFormat::PpmRaw),
            "ppm-ascii" | "p3" => Ok(EncodingFormat::PpmAscii),
            "jpeg" | "jpg" => Ok(EncodingFormat::Jpeg),
            "png" => Ok(EncodingFormat::Png),
            _ => Err(ConfigError::UnknownOutputType(s.to_string())),
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodingFormat::PpmRaw => "ppm",
            EncodingFormat::PpmAscii => "ppm-ascii",
            EncodingFormat::Jpeg => "jpeg",
            EncodingFormat::Png => "png",
        })
    }
}

/// Format-specific encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingParams {
    /// JPEG quality, 0-100 (0 encodes as 1)
    pub jpeg_quality: u8,
    /// PNG compression level, 0 (stored) to 9 (smallest)
    pub png_compression: u8,
    /// Request Adam7 interlacing for PNG
    pub png_interlace: bool,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            png_compression: DEFAULT_PNG_COMPRESSION,
            png_interlace: false,
        }
    }
}

impl EncodingParams {
    fn png_compression_type(&self) -> CompressionType {
        match self.png_compression {
            0 => CompressionType::Uncompressed,
            level => CompressionType::Level(level.min(9)),
        }
    }
}

/// Where encoded bytes go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Stdout,
}

impl Destination {
    /// Interpret a command-line argument; `-` is standard output
    pub fn parse(arg: &str) -> Self {
        if arg == STDOUT_SENTINEL {
            Destination::Stdout
        } else {
            Destination::File(PathBuf::from(arg))
        }
    }

    /// `capture.<ext>` in the working directory
    pub fn default_for(format: EncodingFormat) -> Self {
        Destination::File(PathBuf::from(format!(
            "{}.{}",
            DEFAULT_FILE_STEM,
            format.extension()
        )))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::File(path) => write!(f, "{}", path.display()),
            Destination::Stdout => f.write_str("<stdout>"),
        }
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    params: EncodingParams,
}

impl PhotoEncoder {
    pub fn new(format: EncodingFormat, params: EncodingParams) -> Self {
        Self { format, params }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode into memory
    pub fn encode(&self, raster: &Raster) -> Result<Vec<u8>, EncodeError> {
        let mut buffer = Vec::new();
        self.encode_to(raster, &mut buffer)?;
        Ok(buffer)
    }

    /// Encode into any writer
    pub fn encode_to<W: Write>(&self, raster: &Raster, writer: W) -> Result<(), EncodeError> {
        debug!(
            width = raster.width(),
            height = raster.height(),
            format = %self.format,
            "Starting encoding"
        );

        match self.format {
            EncodingFormat::PpmRaw => Self::encode_ppm_raw(raster, writer),
            EncodingFormat::PpmAscii => Self::encode_ppm_ascii(raster, writer),
            EncodingFormat::Jpeg => Self::encode_jpeg(raster, writer, self.params.jpeg_quality),
            EncodingFormat::Png => self.encode_png(raster, writer),
        }
    }

    /// Encode to a file or standard output
    pub fn save(&self, raster: &Raster, destination: &Destination) -> Result<(), EncodeError> {
        match destination {
            Destination::File(path) => {
                let file = File::create(path).map_err(|source| EncodeError::Open {
                    path: path.clone(),
                    source,
                })?;
                let mut writer = BufWriter::new(file);
                self.encode_to(raster, &mut writer)?;
                writer.flush()?;
            }
            Destination::Stdout => {
                let mut writer = BufWriter::new(std::io::stdout().lock());
                self.encode_to(raster, &mut writer)?;
                writer.flush()?;
            }
        }

        info!(destination = %destination, format = %self.format, "Photo saved");
        Ok(())
    }

    fn encode_ppm_raw<W: Write>(raster: &Raster, mut writer: W) -> Result<(), EncodeError> {
        write!(writer, "P6\n{} {}\n255\n", raster.width(), raster.height())?;
        match raster.channels() {
            Channels::Rgb => writer.write_all(raster.as_raw())?,
            Channels::Grey => {
                let rgb: Vec<u8> = raster.as_raw().iter().flat_map(|&v| [v, v, v]).collect();
                writer.write_all(&rgb)?;
            }
        }
        Ok(())
    }

    fn encode_ppm_ascii<W: Write>(raster: &Raster, mut writer: W) -> Result<(), EncodeError> {
        write!(writer, "P3\n{} {}\n255\n", raster.width(), raster.height())?;
        match raster.channels() {
            Channels::Rgb => {
                for pixel in raster.as_raw().chunks_exact(3) {
                    writeln!(writer, "{:03} {:03} {:03}", pixel[0], pixel[1], pixel[2])?;
                }
            }
            Channels::Grey => {
                for &v in raster.as_raw() {
                    writeln!(writer, "{:03} {:03} {:03}", v, v, v)?;
                }
            }
        }
        Ok(())
    }

    fn color_type(raster: &Raster) -> ExtendedColorType {
        match raster.channels() {
            Channels::Grey => ExtendedColorType::L8,
            Channels::Rgb => ExtendedColorType::Rgb8,
        }
    }

    fn encode_jpeg<W: Write>(raster: &Raster, mut writer: W, quality: u8) -> Result<(), EncodeError> {
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
        encoder.encode(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            Self::color_type(raster),
        )?;
        Ok(())
    }

    fn encode_png<W: Write>(&self, raster: &Raster, writer: W) -> Result<(), EncodeError> {
        if self.params.png_interlace {
            warn!("Adam7 interlacing is not supported by the PNG encoder, writing non-interlaced");
        }

        let encoder = PngEncoder::new_with_quality(
            writer,
            self.params.png_compression_type(),
            FilterType::Adaptive,
        );
        encoder.write_image(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            Self::color_type(raster),
        )?;
        Ok(())
    }
}

/// Encode `raster` as `format` to `destination`
pub fn write_raster(
    raster: &Raster,
    format: EncodingFormat,
    params: &EncodingParams,
    destination: &Destination,
) -> Result<(), EncodeError> {
    PhotoEncoder::new(format, *params).save(raster, destination)
}
