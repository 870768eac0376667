//! Production transcoder — in-process codecs, statically linked.
//!
//! ## Crate mapping
//!
//! | Stage | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate |
//! | Resize | `image::DynamicImage::resize` with `Lanczos3` (never upscales) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `webp` (libwebp), lossless by default |
//! | Recompress JPEG | `mozjpeg` (quality + progressive) |
//! | Recompress PNG | `imagequant` (libimagequant) + `lodepng` |
//! | Recompress WebP | `webp` lossy at the requested quality |
//!
//! The recompression pass is mandatory: the codec-level encoders and the
//! dedicated compressors produce materially different byte sizes at the
//! same quality setting. It reuses the job's options, so e.g. the PNG pass
//! quantizes inside the `[q, q+20]` band derived from the single `quality`
//! value.

use super::backend::{ImageTranscoder, TranscodeError, TranscodeStage};
use super::params::{ResolvedCompression, TranscodeJob};
use crate::naming::FormatFamily;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

/// Transcoder backed by real codecs. Stateless; safe to share across the
/// fan-out threads.
#[derive(Debug, Default)]
pub struct CodecTranscoder;

impl CodecTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageTranscoder for CodecTranscoder {
    fn transcode(&self, job: &TranscodeJob) -> Result<Vec<u8>, TranscodeError> {
        let img = image::load_from_memory(&job.source)
            .map_err(|e| TranscodeError::new(TranscodeStage::Decode, job.family, e))?;
        let resized = resize_down(img, job.width);
        let encoded = encode(&resized, job.family, job.options)?;
        compress(&encoded, job.family, job.options)
    }
}

/// Resize to at most `width`, preserving aspect ratio. A source narrower
/// than the target is returned untouched — upscaling is never allowed.
fn resize_down(img: DynamicImage, width: u32) -> DynamicImage {
    if img.width() <= width {
        img
    } else {
        img.resize(width, u32::MAX, FilterType::Lanczos3)
    }
}

/// Codec-level encode into the target family.
fn encode(
    img: &DynamicImage,
    format: FormatFamily,
    options: ResolvedCompression,
) -> Result<Vec<u8>, TranscodeError> {
    let fail = |e: &dyn std::fmt::Display| {
        TranscodeError::new(TranscodeStage::Encode, format, e)
    };
    match format {
        FormatFamily::Jpeg => {
            let mut buf = Vec::new();
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut buf,
                options.quality.value() as u8,
            );
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| fail(&e))?;
            Ok(buf)
        }
        FormatFamily::Png => {
            let mut buf = Vec::new();
            let encoder = image::codecs::png::PngEncoder::new(&mut buf);
            img.to_rgba8()
                .write_with_encoder(encoder)
                .map_err(|e| fail(&e))?;
            Ok(buf)
        }
        FormatFamily::WebP => {
            let rgba = img.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
            let mem = encoder
                .encode_simple(options.lossless, options.quality.value() as f32)
                .map_err(|e| fail(&format!("webp encode failed: {e:?}")))?;
            Ok(mem.to_vec())
        }
    }
}

/// Lossy recompression pass over the codec-encoded bytes.
fn compress(
    bytes: &[u8],
    format: FormatFamily,
    options: ResolvedCompression,
) -> Result<Vec<u8>, TranscodeError> {
    match format {
        FormatFamily::Jpeg => compress_jpeg(bytes, options),
        FormatFamily::Png => compress_png(bytes, options),
        FormatFamily::WebP => compress_webp(bytes, options),
    }
}

fn compress_jpeg(bytes: &[u8], options: ResolvedCompression) -> Result<Vec<u8>, TranscodeError> {
    let fail =
        |e: &dyn std::fmt::Display| TranscodeError::new(TranscodeStage::Compress, FormatFamily::Jpeg, e);

    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| fail(&e))?
        .to_rgb8();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(rgb.width() as usize, rgb.height() as usize);
    comp.set_quality(options.quality.value() as f32);
    if options.jpeg_progressive {
        comp.set_progressive_mode();
    }
    let mut started = comp.start_compress(Vec::new()).map_err(|e| fail(&e))?;
    started.write_scanlines(rgb.as_raw()).map_err(|e| fail(&e))?;
    started.finish().map_err(|e| fail(&e))
}

fn compress_png(bytes: &[u8], options: ResolvedCompression) -> Result<Vec<u8>, TranscodeError> {
    let fail =
        |e: &dyn std::fmt::Display| TranscodeError::new(TranscodeStage::Compress, FormatFamily::Png, e);

    let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| fail(&e))?
        .to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);
    let pixels: Vec<imagequant::RGBA> = rgba
        .as_raw()
        .chunks_exact(4)
        .map(|p| imagequant::RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let mut attr = imagequant::new();
    attr.set_speed(options.png_speed).map_err(|e| fail(&e))?;
    let (min, max) = options.png_quality_range();
    attr.set_quality(min, max).map_err(|e| fail(&e))?;

    let mut img = attr
        .new_image(pixels, width, height, 0.0)
        .map_err(|e| fail(&e))?;
    let mut quantized = attr.quantize(&mut img).map_err(|e| fail(&e))?;
    quantized
        .set_dithering_level(options.png_dithering)
        .map_err(|e| fail(&e))?;
    let (palette, indexed) = quantized.remapped(&mut img).map_err(|e| fail(&e))?;

    let mut encoder = lodepng::Encoder::new();
    encoder.set_palette(&palette).map_err(|e| fail(&e))?;
    encoder.encode(&indexed, width, height).map_err(|e| fail(&e))
}

fn compress_webp(bytes: &[u8], options: ResolvedCompression) -> Result<Vec<u8>, TranscodeError> {
    let fail =
        |e: &dyn std::fmt::Display| TranscodeError::new(TranscodeStage::Compress, FormatFamily::WebP, e);

    let rgba = image::load_from_memory_with_format(bytes, ImageFormat::WebP)
        .map_err(|e| fail(&e))?
        .to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    // The recompression pass is always lossy, whatever the codec-level
    // encode did.
    let mem = encoder
        .encode_simple(false, options.quality.value() as f32)
        .map_err(|e| fail(&format!("webp encode failed: {e:?}")))?;
    Ok(mem.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::Variant;
    use crate::transcode::params::CompressionOptions;
    use image::RgbImage;
    use std::sync::Arc;

    /// Encode a gradient JPEG of the given size.
    fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 90);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    /// Encode a two-tone PNG (quantizes losslessly inside any band).
    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgb([200, 40, 40])
            } else {
                image::Rgb([40, 40, 200])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    fn job(source: Vec<u8>, width: u32, family: FormatFamily, variant: Variant) -> TranscodeJob {
        TranscodeJob {
            source: Arc::new(source),
            width,
            variant,
            family,
            options: CompressionOptions::default().resolve(),
        }
    }

    #[test]
    fn jpeg_native_resizes_to_target_width() {
        let out = CodecTranscoder::new()
            .transcode(&job(test_jpeg(400, 200), 100, FormatFamily::Jpeg, Variant::Native))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn narrow_source_is_never_upscaled() {
        let out = CodecTranscoder::new()
            .transcode(&job(test_jpeg(120, 60), 800, FormatFamily::Jpeg, Variant::Native))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.width(), 120);
    }

    #[test]
    fn png_native_survives_quantization() {
        let out = CodecTranscoder::new()
            .transcode(&job(test_png(200, 100), 100, FormatFamily::Png, Variant::Native))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 100);
    }

    #[test]
    fn modern_variant_produces_webp() {
        let out = CodecTranscoder::new()
            .transcode(&job(test_jpeg(400, 200), 250, FormatFamily::WebP, Variant::Modern))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.width(), 250);
    }

    #[test]
    fn png_source_to_modern_webp() {
        let out = CodecTranscoder::new()
            .transcode(&job(test_png(300, 150), 150, FormatFamily::WebP, Variant::Modern))
            .unwrap();
        assert!(image::load_from_memory_with_format(&out, ImageFormat::WebP).is_ok());
    }

    #[test]
    fn garbage_buffer_fails_at_decode_stage() {
        let err = CodecTranscoder::new()
            .transcode(&job(
                b"not an image".to_vec(),
                250,
                FormatFamily::Jpeg,
                Variant::Native,
            ))
            .unwrap_err();
        assert_eq!(err.stage, TranscodeStage::Decode);
        assert_eq!(err.format, FormatFamily::Jpeg);
    }

    #[test]
    fn recompression_respects_quality_knob() {
        // A lower quality setting must not produce a larger file than a
        // high one for the same input.
        let source = test_jpeg(400, 200);
        let run = |quality: u32| {
            let mut j = job(source.clone(), 400, FormatFamily::Jpeg, Variant::Native);
            j.options = CompressionOptions {
                quality: Some(quality),
                ..Default::default()
            }
            .resolve();
            CodecTranscoder::new().transcode(&j).unwrap().len()
        };
        assert!(run(20) <= run(95));
    }
}
