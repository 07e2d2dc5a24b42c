// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for output encoding

use clcam::errors::EncodeError;
use clcam::pipelines::photo::encoding::write_raster;
use clcam::pipelines::photo::{Destination, EncodingFormat, EncodingParams, PhotoEncoder};
use clcam::{Channels, Raster};

#[test]
fn test_grey_ppm_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.ppm");
    let raster = Raster::from_raw(2, 1, Channels::Grey, vec![10, 200]).unwrap();

    write_raster(
        &raster,
        EncodingFormat::PpmRaw,
        &EncodingParams::default(),
        &Destination::File(path.clone()),
    )
    .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes, b"P6\n2 1\n255\n\x0a\x0a\x0a\xc8\xc8\xc8");
}

#[test]
fn test_jpeg_and_png_files_decode() {
    let dir = tempfile::tempdir().unwrap();
    let data = (0..16 * 8 * 3).map(|i| (i % 251) as u8).collect();
    let raster = Raster::from_raw(16, 8, Channels::Rgb, data).unwrap();

    for format in [EncodingFormat::Jpeg, EncodingFormat::Png] {
        let path = dir.path().join(format!("capture.{}", format.extension()));
        PhotoEncoder::new(format, EncodingParams::default())
            .save(&raster, &Destination::File(path.clone()))
            .unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8), "{}", format);
    }
}

#[test]
fn test_greyscale_png_keeps_one_channel() {
    let raster = Raster::from_raw(3, 2, Channels::Grey, vec![10, 20, 30, 40, 50, 60]).unwrap();
    let bytes = PhotoEncoder::new(EncodingFormat::Png, EncodingParams::default())
        .encode(&raster)
        .unwrap();

    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.color(), image::ColorType::L8);
    assert_eq!(decoded.as_bytes(), raster.as_raw());
}

#[test]
fn test_unwritable_destination_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("capture.jpg");
    let raster = Raster::new(2, 2, Channels::Rgb);

    let err = PhotoEncoder::new(EncodingFormat::Jpeg, EncodingParams::default())
        .save(&raster, &Destination::File(path.clone()))
        .unwrap_err();
    assert!(matches!(err, EncodeError::Open { path: p, .. } if p == path));
}

#[test]
fn test_output_type_names() {
    assert_eq!("PPM".parse::<EncodingFormat>().unwrap(), EncodingFormat::PpmRaw);
    assert_eq!("jpg".parse::<EncodingFormat>().unwrap(), EncodingFormat::Jpeg);
    assert!("gif".parse::<EncodingFormat>().is_err());
    assert_eq!(Destination::parse("-"), Destination::Stdout);
}
