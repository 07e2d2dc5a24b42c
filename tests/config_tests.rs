// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use clcam::Config;
use clcam::errors::ConfigError;
use clcam::pipelines::photo::{Destination, EncodingFormat};
use std::io::Write;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.device, "/dev/video0");
    assert_eq!((config.width, config.height), (640, 480));
    assert_eq!(config.output_type, EncodingFormat::Jpeg);
    assert!(config.filters.is_empty(), "No filters by default");
}

#[test]
fn test_config_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "device": "/dev/video3",
            "output_type": "ppm",
            "output": "-",
            "filters": ["greyscale", "noise=40"],
            "noise_seed": 7
        }}"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.device, "/dev/video3");
    assert_eq!(config.output_type, EncodingFormat::PpmRaw);

    let session = config.to_session().unwrap();
    assert_eq!(session.destination, Destination::Stdout);
    assert_eq!(session.filters.len(), 2);
}

#[test]
fn test_config_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(
        Config::load_or_default(Some(&missing)),
        Err(ConfigError::File { .. })
    ));
}

#[test]
fn test_config_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"width\": \"wide\" }}").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Cannot load config"));
}

#[test]
fn test_too_many_filters_rejected() {
    let config = Config {
        filters: vec!["negative".to_string(); 11],
        ..Default::default()
    };
    assert!(matches!(
        config.to_session(),
        Err(ConfigError::TooManyFilters { max: 10 })
    ));

    let config = Config {
        filters: vec!["negative".to_string(); 10],
        ..Default::default()
    };
    assert_eq!(config.to_session().unwrap().filters.len(), 10);
}
