//! End-to-end runs through the real codec stack: source file in, cached
//! and published derivative files out.

use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use thumbsmith::config::Config;
use thumbsmith::pipeline::{PipelineRequest, ThumbnailPipeline};
use thumbsmith::progress::NullReporter;
use thumbsmith::transcode::{CodecTranscoder, CompressionOptions};

fn test_config(tmp: &TempDir) -> Config {
    Config {
        path_prefix: String::new(),
        source_prefix: tmp.path().join("site").to_string_lossy().into_owned(),
        cache_dir: tmp.path().join("cache"),
        publish_dir: tmp.path().join("dist"),
    }
}

/// Write a gradient JPEG source under the site directory.
fn write_jpeg(tmp: &TempDir, rel: &str, width: u32, height: u32) {
    let path = tmp.path().join("site").join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 90);
    img.write_with_encoder(encoder).unwrap();
    fs::write(path, buf).unwrap();
}

/// Write a two-tone PNG source (quantizes cleanly at any quality band).
fn write_png(tmp: &TempDir, rel: &str, width: u32, height: u32) {
    let path = tmp.path().join("site").join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            image::Rgb([200, 40, 40])
        } else {
            image::Rgb([40, 40, 200])
        }
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

fn decoded_width(path: &Path, format: ImageFormat) -> u32 {
    let bytes = fs::read(path).unwrap();
    image::load_from_memory_with_format(&bytes, format)
        .unwrap()
        .width()
}

#[test]
fn jpeg_source_produces_the_full_derivative_set() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/photo.jpg", 1600, 1000);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());

    let report = pipeline
        .run(&PipelineRequest::new("/img/photo.jpg"), &NullReporter)
        .unwrap();
    assert!(!report.cache_hit);
    assert_eq!(report.jobs, 8);

    for (suffix, width) in [("sm", 250), ("md", 500), ("lg", 800), ("hd", 1368)] {
        for root in ["cache", "dist"] {
            let native = tmp.path().join(root).join(format!("photo-{suffix}.jpg"));
            let modern = tmp
                .path()
                .join(root)
                .join(format!("photo-modern-{suffix}.webp"));
            assert_eq!(decoded_width(&native, ImageFormat::Jpeg), width, "{root} {suffix}");
            assert_eq!(decoded_width(&modern, ImageFormat::WebP), width, "{root} {suffix}");
        }
    }
}

#[test]
fn second_run_reuses_the_cache_verbatim() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/photo.jpg", 1600, 1000);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());
    let request = PipelineRequest::new("/img/photo.jpg");

    pipeline.run(&request, &NullReporter).unwrap();
    let before = fs::read(tmp.path().join("dist/photo-md.jpg")).unwrap();

    let report = pipeline.run(&request, &NullReporter).unwrap();
    assert!(report.cache_hit);
    assert_eq!(report.jobs, 0);
    let after = fs::read(tmp.path().join("dist/photo-md.jpg")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn narrow_source_is_published_without_upscaling() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/icon.jpg", 150, 150);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());

    pipeline
        .run(&PipelineRequest::new("/img/icon.jpg"), &NullReporter)
        .unwrap();

    // All four sizes exist, none wider than the source
    for suffix in ["sm", "md", "lg", "hd"] {
        let path = tmp.path().join("dist").join(format!("icon-{suffix}.jpg"));
        assert_eq!(decoded_width(&path, ImageFormat::Jpeg), 150, "{suffix}");
    }
}

#[test]
fn png_source_keeps_png_natives_and_webp_moderns() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp, "img/chart.png", 1000, 600);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());

    pipeline
        .run(&PipelineRequest::new("/img/chart.png"), &NullReporter)
        .unwrap();

    let native = tmp.path().join("dist/chart-md.png");
    let modern = tmp.path().join("dist/chart-modern-md.webp");
    assert_eq!(decoded_width(&native, ImageFormat::Png), 500);
    assert_eq!(decoded_width(&modern, ImageFormat::WebP), 500);
}

#[test]
fn deleting_one_cache_file_regenerates_and_republishes() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/photo.jpg", 1600, 1000);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());
    let request = PipelineRequest::new("/img/photo.jpg");

    pipeline.run(&request, &NullReporter).unwrap();
    fs::remove_file(tmp.path().join("cache/photo-lg.jpg")).unwrap();

    let report = pipeline.run(&request, &NullReporter).unwrap();
    assert!(!report.cache_hit);
    assert_eq!(report.jobs, 8);
    assert!(tmp.path().join("cache/photo-lg.jpg").exists());
}

#[test]
fn width_overrides_apply_to_generated_files() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/banner.jpg", 1600, 400);
    let pipeline = ThumbnailPipeline::new(test_config(&tmp), CodecTranscoder::new());

    let request = PipelineRequest {
        width_overrides: Some(vec![320, 640]),
        ..PipelineRequest::new("/img/banner.jpg")
    };
    pipeline.run(&request, &NullReporter).unwrap();

    let sm = tmp.path().join("dist/banner-sm.jpg");
    let md = tmp.path().join("dist/banner-md.jpg");
    assert_eq!(decoded_width(&sm, ImageFormat::Jpeg), 320);
    assert_eq!(decoded_width(&md, ImageFormat::Jpeg), 640);
    // Untouched tail of the default table
    let hd = tmp.path().join("dist/banner-hd.jpg");
    assert_eq!(decoded_width(&hd, ImageFormat::Jpeg), 1368);
}

#[test]
fn quality_setting_shrinks_output() {
    let tmp = TempDir::new().unwrap();
    write_jpeg(&tmp, "img/photo.jpg", 1600, 1000);

    let size_at = |quality: u32, dir: &str| {
        let mut config = test_config(&tmp);
        config.cache_dir = tmp.path().join(format!("{dir}-cache"));
        config.publish_dir = tmp.path().join(format!("{dir}-dist"));
        let pipeline = ThumbnailPipeline::new(config, CodecTranscoder::new());
        let request = PipelineRequest {
            compression: CompressionOptions {
                quality: Some(quality),
                ..CompressionOptions::default()
            },
            ..PipelineRequest::new("/img/photo.jpg")
        };
        pipeline.run(&request, &NullReporter).unwrap();
        fs::read(tmp.path().join(format!("{dir}-dist/photo-hd.jpg")))
            .unwrap()
            .len()
    };

    assert!(size_at(20, "low") <= size_at(95, "high"));
}
