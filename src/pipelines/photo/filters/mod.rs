// SPDX-License-Identifier: GPL-3.0-only

//! Ordered image filter chain
//!
//! A chain is data, not code: an owned list of [`Filter`] variants, each
//! carrying its own parameter, dispatched through a single `match`. Filters
//! run strictly in the order they were added and chains are not commutative
//! (`negative, brightness=50` differs from `brightness=50, negative`).
//!
//! Every filter reads the current raster and writes a freshly allocated
//! replacement, so input and output never alias. Only `rotate` changes the
//! raster dimensions.
//!
//! # Border policy
//!
//! Neighbourhood filters (lowpass, highpass, sobel, laplace, despeckle) copy
//! any pixel whose neighbourhood would fall outside the raster unchanged.

mod geometry;
mod neighborhood;
mod point;

use crate::constants::filters::MAX_FILTERS;
use crate::errors::{ConfigError, FilterError};
use crate::media::raster::Raster;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub use geometry::{flip, mirror, rotate};
pub use neighborhood::{despeckle, highpass, laplace, lowpass, sobel};
pub use point::{brightness, gamma, gamma_table, greyscale, negative, noise, predator};

/// A single filter invocation with its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Add `amount` to every byte, saturating at 255
    Brightness(u8),
    /// Gamma curve with exponent `g / 255`
    Gamma(u8),
    /// Invert every byte
    Negative,
    /// Vertical mirror
    Flip,
    /// Horizontal mirror
    Mirror,
    /// 3×3 box blur
    Lowpass,
    /// 3×3 sharpen
    Highpass,
    /// Sobel edge detection
    Sobel,
    /// Laplace edge detection
    Laplace,
    /// Salt-and-pepper noise with density 0-255
    Noise(u8),
    /// Remove isolated bright specks
    Despeckle,
    /// Pseudo-thermal dominant channel effect
    Predator,
    /// Luminosity greyscale
    Greyscale,
    /// Rotate about the center by whole degrees
    Rotate(i32),
}

/// Name, argument placeholder and description of every filter, in help order
pub const FILTER_HELP: &[(&str, Option<&str>, &str)] = &[
    ("brightness", Some("0-255"), "adjusts the image brightness"),
    ("despeckle", None, "despeckle filter"),
    ("flip", None, "flips the image vertically"),
    ("gamma", Some("0-255"), "adjusts the image gamma"),
    ("greyscale", None, "converts the image to greyscale (luminosity method)"),
    ("highpass", None, "sharpness image filter"),
    ("laplace", None, "performs laplace edge detection on the image"),
    ("lowpass", None, "smoothing image filter"),
    ("mirror", None, "mirrors the image horizontally"),
    ("negative", None, "transforms the image to a negative of the original"),
    ("noise", Some("0-255"), "adds amount of noise in the image"),
    ("predator", None, "pseudo-thermal dominant color effect"),
    ("rotate", Some("degrees"), "rotates the image (best effort, may leave gaps)"),
    ("sobel", None, "performs sobel edge detection on the image"),
];

impl Filter {
    /// Name used on the command line and in config files
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Brightness(_) => "brightness",
            Filter::Gamma(_) => "gamma",
            Filter::Negative => "negative",
            Filter::Flip => "flip",
            Filter::Mirror => "mirror",
            Filter::Lowpass => "lowpass",
            Filter::Highpass => "highpass",
            Filter::Sobel => "sobel",
            Filter::Laplace => "laplace",
            Filter::Noise(_) => "noise",
            Filter::Despeckle => "despeckle",
            Filter::Predator => "predator",
            Filter::Greyscale => "greyscale",
            Filter::Rotate(_) => "rotate",
        }
    }

    /// Run this filter, producing a replacement raster
    pub fn apply(&self, input: &Raster, rng: &mut fastrand::Rng) -> Result<Raster, FilterError> {
        match *self {
            Filter::Brightness(amount) => brightness(input, amount),
            Filter::Gamma(g) => gamma(input, g),
            Filter::Negative => negative(input),
            Filter::Flip => flip(input),
            Filter::Mirror => mirror(input),
            Filter::Lowpass => lowpass(input),
            Filter::Highpass => highpass(input),
            Filter::Sobel => sobel(input),
            Filter::Laplace => laplace(input),
            Filter::Noise(density) => noise(input, density, rng),
            Filter::Despeckle => despeckle(input),
            Filter::Predator => predator(input),
            Filter::Greyscale => greyscale(input),
            Filter::Rotate(degrees) => rotate(input, degrees),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Brightness(v) | Filter::Gamma(v) | Filter::Noise(v) => {
                write!(f, "{}={}", self.name(), v)
            }
            Filter::Rotate(degrees) => write!(f, "{}={}", self.name(), degrees),
            _ => f.write_str(self.name()),
        }
    }
}

fn byte_parameter(filter: &str, value: Option<&str>) -> Result<u8, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::InvalidFilterParameter {
        filter: filter.to_string(),
        reason: "a value between 0 and 255 is required".to_string(),
    })?;
    value
        .trim()
        .parse::<u8>()
        .map_err(|_| ConfigError::InvalidFilterParameter {
            filter: filter.to_string(),
            reason: format!("'{}' is not between 0 and 255", value),
        })
}

fn no_parameter(filter: Filter, value: Option<&str>) -> Result<Filter, ConfigError> {
    match value {
        None => Ok(filter),
        Some(v) => Err(ConfigError::InvalidFilterParameter {
            filter: filter.name().to_string(),
            reason: format!("takes no value, got '{}'", v),
        }),
    }
}

impl FromStr for Filter {
    type Err = ConfigError;

    /// Parse `name` or `name=value`
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (name, value) = match spec.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value)),
            None => (spec.trim(), None),
        };

        match name.to_ascii_lowercase().as_str() {
            "brightness" => Ok(Filter::Brightness(byte_parameter(name, value)?)),
            "gamma" => Ok(Filter::Gamma(byte_parameter(name, value)?)),
            "noise" => Ok(Filter::Noise(byte_parameter(name, value)?)),
            "rotate" => {
                let degrees = value
                    .and_then(|v| v.trim().parse::<i32>().ok())
                    .ok_or_else(|| ConfigError::InvalidFilterParameter {
                        filter: name.to_string(),
                        reason: "an angle in whole degrees is required".to_string(),
                    })?;
                Ok(Filter::Rotate(degrees))
            }
            "negative" => no_parameter(Filter::Negative, value),
            "flip" => no_parameter(Filter::Flip, value),
            "mirror" => no_parameter(Filter::Mirror, value),
            "lowpass" => no_parameter(Filter::Lowpass, value),
            "highpass" => no_parameter(Filter::Highpass, value),
            "sobel" => no_parameter(Filter::Sobel, value),
            "laplace" => no_parameter(Filter::Laplace, value),
            "despeckle" => no_parameter(Filter::Despeckle, value),
            "predator" => no_parameter(Filter::Predator, value),
            "greyscale" | "grayscale" => no_parameter(Filter::Greyscale, value),
            _ => Err(ConfigError::UnknownFilter(name.to_string())),
        }
    }
}

/// Bounded, ordered list of filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<Filter>,
    noise_seed: Option<u64>,
}

impl FilterChain {
    /// Maximum number of filters a chain accepts
    pub const CAPACITY: usize = MAX_FILTERS;

    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from filters, rejecting more than [`Self::CAPACITY`]
    pub fn from_filters(filters: impl IntoIterator<Item = Filter>) -> Result<Self, ConfigError> {
        let mut chain = Self::new();
        for filter in filters {
            chain.push(filter)?;
        }
        Ok(chain)
    }

    /// Parse `name[=value]` specs in order
    pub fn parse_specs<S: AsRef<str>>(
        specs: impl IntoIterator<Item = S>,
    ) -> Result<Self, ConfigError> {
        let mut chain = Self::new();
        for spec in specs {
            chain.push(spec.as_ref().parse()?)?;
        }
        Ok(chain)
    }

    /// Seed the noise generator so runs are reproducible
    pub fn with_noise_seed(mut self, seed: Option<u64>) -> Self {
        self.noise_seed = seed;
        self
    }

    /// Append a filter
    pub fn push(&mut self, filter: Filter) -> Result<(), ConfigError> {
        if self.filters.len() >= Self::CAPACITY {
            return Err(ConfigError::TooManyFilters {
                max: Self::CAPACITY,
            });
        }
        self.filters.push(filter);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    /// Run every filter in order
    ///
    /// A filter whose scratch raster cannot be allocated is skipped with a
    /// warning; the chain continues with the unchanged raster.
    pub fn apply(&self, raster: Raster) -> Raster {
        let mut rng = match self.noise_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        self.filters
            .iter()
            .enumerate()
            .fold(raster, |current, (index, filter)| {
                match filter.apply(&current, &mut rng) {
                    Ok(next) => {
                        debug!(
                            index,
                            filter = %filter,
                            width = next.width(),
                            height = next.height(),
                            "Filter applied"
                        );
                        next
                    }
                    Err(e) => {
                        warn!(index, filter = %filter, error = %e, "Filter skipped");
                        current
                    }
                }
            })
    }
}

impl<'a> IntoIterator for &'a FilterChain {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
