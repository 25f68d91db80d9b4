//! Image codecs.
//!
//! The runtime only needs two operations from a codec: turn file bytes into a
//! single plane of `f32` pixels, and back. [`ImageCrateCodec`] handles the
//! formats supported by the `image` crate; [`RawCodec`] stores the samples
//! verbatim behind a small header and is lossless.

use crate::core::error::{RuntimeError, RuntimeResult};
use bytemuck::{Pod, Zeroable};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::io::Cursor;
use std::path::Path;

/// Pixels produced by a decoder, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Luminance samples.
    pub pixels: Vec<f32>,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

/// Bytes <-> pixels.
pub trait ImageCodec: Send + Sync {
    /// Codec name for logs.
    fn name(&self) -> &str;

    /// Decode file contents.
    fn decode(&self, bytes: &[u8]) -> RuntimeResult<DecodedImage>;

    /// Encode `width * height` row-major pixels.
    fn encode(&self, pixels: &[f32], width: usize, height: usize) -> RuntimeResult<Vec<u8>>;
}

/// Pick a codec from a file extension.
///
/// `.f32` and `.raw` use [`RawCodec`]; anything the `image` crate recognises
/// uses [`ImageCrateCodec`].
pub fn codec_for_path(path: &Path) -> Option<Box<dyn ImageCodec>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)?;
    match extension.as_str() {
        "f32" | "raw" => Some(Box::new(RawCodec)),
        _ => ImageFormat::from_extension(&extension)
            .map(|format| Box::new(ImageCrateCodec::new(format)) as Box<dyn ImageCodec>),
    }
}

// ============================================================================
// image crate
// ============================================================================

/// Codec backed by the `image` crate.
///
/// Decoding converts to luminance in `[0, 1]`. PNG and TIFF are written as
/// 16-bit luminance, other formats as 8-bit; values are clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateCodec {
    format: ImageFormat,
}

impl ImageCrateCodec {
    /// Codec for `format`.
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }

    /// Container format written and expected.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    fn is_wide(&self) -> bool {
        matches!(self.format, ImageFormat::Png | ImageFormat::Tiff)
    }
}

fn dimensions(width: usize, height: usize) -> RuntimeResult<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(RuntimeError::EncodeFailure(format!(
            "{}x{} exceeds the codec's dimension limit",
            width, height
        ))),
    }
}

impl ImageCodec for ImageCrateCodec {
    fn name(&self) -> &str {
        self.format.extensions_str().first().copied().unwrap_or("image")
    }

    fn decode(&self, bytes: &[u8]) -> RuntimeResult<DecodedImage> {
        let img = image::load_from_memory_with_format(bytes, self.format)
            .map_err(|e| RuntimeError::DecodeFailure(e.to_string()))?;
        let (width, height) = (img.width() as usize, img.height() as usize);
        if width == 0 || height == 0 {
            return Err(RuntimeError::DecodeFailure(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }
        Ok(DecodedImage {
            pixels: img.to_luma32f().into_raw(),
            width,
            height,
        })
    }

    fn encode(&self, pixels: &[f32], width: usize, height: usize) -> RuntimeResult<Vec<u8>> {
        let (w, h) = dimensions(width, height)?;
        let buffer = if self.is_wide() {
            let samples = pixels
                .iter()
                .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
                .collect();
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, samples).map(DynamicImage::ImageLuma16)
        } else {
            let samples = pixels
                .iter()
                .map(|&v| (v.clamp(0.0, 1.0) * u8::MAX as f32).round() as u8)
                .collect();
            ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, samples).map(DynamicImage::ImageLuma8)
        };
        let img = buffer.ok_or_else(|| {
            RuntimeError::EncodeFailure(format!(
                "{} pixels do not fill {}x{}",
                pixels.len(),
                width,
                height
            ))
        })?;

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), self.format)
            .map_err(|e| RuntimeError::EncodeFailure(e.to_string()))?;
        Ok(bytes)
    }
}

// ============================================================================
// Raw f32
// ============================================================================

/// Lossless raw layout: `width: u32`, `height: u32`, then `width * height`
/// `f32` samples, all little-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    width: u32,
    height: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<RawHeader>();

impl ImageCodec for RawCodec {
    fn name(&self) -> &str {
        "raw"
    }

    fn decode(&self, bytes: &[u8]) -> RuntimeResult<DecodedImage> {
        if bytes.len() < HEADER_LEN {
            return Err(RuntimeError::DecodeFailure(format!(
                "raw file is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        let header: RawHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
        let width = u32::from_le(header.width) as usize;
        let height = u32::from_le(header.height) as usize;
        let body = &bytes[HEADER_LEN..];
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()));
        if width == 0 || height == 0 || expected != Some(body.len()) {
            return Err(RuntimeError::DecodeFailure(format!(
                "raw header says {}x{} but {} sample bytes follow",
                width,
                height,
                body.len()
            )));
        }
        let mut pixels: Vec<f32> = bytemuck::pod_collect_to_vec(body);
        if cfg!(target_endian = "big") {
            for v in &mut pixels {
                *v = f32::from_bits(u32::from_le(v.to_bits()));
            }
        }
        Ok(DecodedImage {
            pixels,
            width,
            height,
        })
    }

    fn encode(&self, pixels: &[f32], width: usize, height: usize) -> RuntimeResult<Vec<u8>> {
        let (w, h) = dimensions(width, height)?;
        if pixels.len() != width * height {
            return Err(RuntimeError::EncodeFailure(format!(
                "{} pixels do not fill {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        let header = RawHeader {
            width: w.to_le(),
            height: h.to_le(),
        };
        let mut bytes = Vec::with_capacity(HEADER_LEN + pixels.len() * 4);
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        if cfg!(target_endian = "big") {
            for v in pixels {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        } else {
            bytes.extend_from_slice(bytemuck::cast_slice(pixels));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_selection() {
        assert_eq!(codec_for_path(Path::new("a/b.f32")).unwrap().name(), "raw");
        assert_eq!(codec_for_path(Path::new("x.RAW")).unwrap().name(), "raw");
        assert_eq!(codec_for_path(Path::new("x.png")).unwrap().name(), "png");
        assert!(codec_for_path(Path::new("x.unknown")).is_none());
        assert!(codec_for_path(Path::new("no_extension")).is_none());
    }

    #[test]
    fn test_raw_is_lossless() {
        let pixels = vec![-3.5, 0.0, 1e-7, 42.25, f32::MAX, 0.5];
        let bytes = RawCodec.encode(&pixels, 3, 2).unwrap();
        assert_eq!(bytes.len(), 8 + 6 * 4);
        assert_eq!(&bytes[..4], &3u32.to_le_bytes());
        let decoded = RawCodec.decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn test_raw_rejects_truncated_body() {
        let mut bytes = RawCodec.encode(&[1.0, 2.0], 2, 1).unwrap();
        bytes.pop();
        assert!(matches!(RawCodec.decode(&bytes), Err(RuntimeError::DecodeFailure(_))));
        assert!(matches!(RawCodec.decode(&[0, 1]), Err(RuntimeError::DecodeFailure(_))));
    }

    #[test]
    fn test_png_round_trip_is_16_bit() {
        let codec = ImageCrateCodec::new(ImageFormat::Png);
        let pixels: Vec<f32> = (0..12).map(|v| v as f32 / 11.0).collect();
        let bytes = codec.encode(&pixels, 4, 3).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        for (a, b) in pixels.iter().zip(decoded.pixels.iter()) {
            assert!((a - b).abs() <= 1.0 / 65535.0);
        }
    }

    #[test]
    fn test_png_clamps_out_of_range() {
        let codec = ImageCrateCodec::new(ImageFormat::Png);
        let bytes = codec.encode(&[-1.0, 2.0], 2, 1).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap().pixels, vec![0.0, 1.0]);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let codec = ImageCrateCodec::new(ImageFormat::Png);
        assert!(matches!(
            codec.decode(b"definitely not a png"),
            Err(RuntimeError::DecodeFailure(_))
        ));
    }

    #[test]
    fn test_encode_rejects_short_pixels() {
        let codec = ImageCrateCodec::new(ImageFormat::Jpeg);
        assert!(matches!(
            codec.encode(&[0.5; 3], 2, 2),
            Err(RuntimeError::EncodeFailure(_))
        ));
    }
}
