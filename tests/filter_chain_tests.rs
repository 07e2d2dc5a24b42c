// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the filter chain and colour conversion

use clcam::errors::ConfigError;
use clcam::media::format_converters::{convert_yuyv, yuyv_to_rgb};
use clcam::pipelines::photo::{Filter, FilterChain};
use clcam::{Channels, Raster};

fn gradient(width: u32, height: u32) -> Raster {
    let data = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
    Raster::from_raw(width, height, Channels::Rgb, data).unwrap()
}

#[test]
fn test_filter_order_matters() {
    let input = Raster::from_raw(1, 1, Channels::Rgb, vec![250, 250, 250]).unwrap();

    let brighten_first = FilterChain::parse_specs(["brightness=10", "negative"]).unwrap();
    let negate_first = FilterChain::parse_specs(["negative", "brightness=10"]).unwrap();

    assert_eq!(brighten_first.apply(input.clone()).as_raw(), &[0, 0, 0]);
    assert_eq!(negate_first.apply(input).as_raw(), &[15, 15, 15]);
}

#[test]
fn test_negative_and_brightness_do_not_commute() {
    let data = (0..=255u8).collect();
    let input = Raster::from_raw(256, 1, Channels::Grey, data).unwrap();

    let a = FilterChain::parse_specs(["negative", "brightness=50"]).unwrap();
    let b = FilterChain::parse_specs(["brightness=50", "negative"]).unwrap();
    assert_ne!(a.apply(input.clone()), b.apply(input));
}

#[test]
fn test_involutions_through_chain() {
    let input = gradient(5, 4);
    for name in ["negative", "flip", "mirror"] {
        let chain = FilterChain::parse_specs([name, name]).unwrap();
        assert_eq!(chain.apply(input.clone()), input, "{} twice", name);
    }
}

#[test]
fn test_greyscale_is_idempotent() {
    let once = FilterChain::parse_specs(["greyscale"]).unwrap();
    let twice = FilterChain::parse_specs(["greyscale", "grayscale"]).unwrap();
    let input = gradient(4, 3);
    assert_eq!(once.apply(input.clone()), twice.apply(input));
}

#[test]
fn test_brightness_saturates_at_white() {
    let input = gradient(3, 3);
    let out = FilterChain::parse_specs(["brightness=255"]).unwrap().apply(input);
    assert!(out.as_raw().iter().all(|&b| b == 255));
}

#[test]
fn test_chain_capacity_boundary() {
    let mut chain = FilterChain::from_filters([Filter::Mirror; 10]).unwrap();
    assert_eq!(chain.len(), FilterChain::CAPACITY);
    assert!(matches!(
        chain.push(Filter::Flip),
        Err(ConfigError::TooManyFilters { max: 10 })
    ));
    assert_eq!(chain.len(), 10);
}

#[test]
fn test_rotate_changes_geometry() {
    let out = FilterChain::parse_specs(["rotate=90"])
        .unwrap()
        .apply(gradient(6, 2));
    assert_eq!((out.width(), out.height()), (2, 6));
}

#[test]
fn test_neutral_yuyv_is_mid_grey() {
    let rgb = yuyv_to_rgb(&[128, 128, 128, 128], 2, 1);
    assert_eq!(rgb.as_raw(), &[128, 128, 128, 128, 128, 128]);

    let grey = convert_yuyv(&[128, 128, 128, 128], 2, 1, 4, Channels::Grey);
    assert_eq!(grey.as_raw(), &[128, 128]);
}

#[test]
fn test_greyscale_raster_through_every_filter() {
    let specs = [
        "brightness=5",
        "gamma=200",
        "negative",
        "flip",
        "mirror",
        "lowpass",
        "highpass",
        "sobel",
        "laplace",
        "despeckle",
    ];
    let data = (0..36u8).collect();
    let input = Raster::from_raw(6, 6, Channels::Grey, data).unwrap();
    let out = FilterChain::parse_specs(specs).unwrap().apply(input);
    assert_eq!(out.channels(), Channels::Grey);
    assert_eq!((out.width(), out.height()), (6, 6));
}
