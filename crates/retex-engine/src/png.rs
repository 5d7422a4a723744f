//! Deterministic PNG decode and encode.
//!
//! Encoding uses fixed compression settings so the same buffer always
//! produces byte-identical output; the `*_with_hash` variants return a
//! BLAKE3 hash of the encoded stream for reproducibility checks.

use std::io::{Read, Write};
use std::path::Path;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType, Transformations};
use thiserror::Error;

use crate::buffer::{GrayscaleBuffer, TextureBuffer};
use crate::color::Color;

/// Errors from PNG operations.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),

    #[error("PNG decoding error: {0}")]
    Decoding(#[from] png::DecodingError),

    #[error("unsupported PNG layout: {0}")]
    UnsupportedLayout(String),

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// PNG export configuration for deterministic output.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level. Fixed for determinism.
    pub compression: Compression,
    /// Filter type. `NoFilter` gives maximum determinism.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

/// Decode a PNG stream into an RGBA texture buffer.
///
/// Palette images are expanded and 16-bit depths collapse to 8 bits.
/// Grayscale decodes with the gray value broadcast to R/G/B.
pub fn decode<R: Read>(reader: R) -> Result<TextureBuffer, PngError> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(Transformations::normalize_to_color8());
    let mut png_reader = decoder.read_info()?;

    let mut data = vec![0u8; png_reader.output_buffer_size()];
    let info = png_reader.next_frame(&mut data)?;
    let bytes = &data[..info.buffer_size()];

    let width = info.width;
    let height = info.height;
    if width == 0 || height == 0 {
        return Err(PngError::InvalidDimensions(format!(
            "{}x{}",
            width, height
        )));
    }

    let mut buffer = TextureBuffer::new(width, height, Color::black());
    let pixels = (width as usize) * (height as usize);

    match info.color_type {
        ColorType::Grayscale => {
            for (i, chunk) in bytes.chunks_exact(1).take(pixels).enumerate() {
                let g = chunk[0] as f32 / 255.0;
                buffer.data[i] = Color::rgb(g, g, g);
            }
        }
        ColorType::GrayscaleAlpha => {
            for (i, chunk) in bytes.chunks_exact(2).take(pixels).enumerate() {
                let g = chunk[0] as f32 / 255.0;
                let a = chunk[1] as f32 / 255.0;
                buffer.data[i] = Color::rgba(g, g, g, a);
            }
        }
        ColorType::Rgb => {
            for (i, chunk) in bytes.chunks_exact(3).take(pixels).enumerate() {
                buffer.data[i] = Color::rgb(
                    chunk[0] as f32 / 255.0,
                    chunk[1] as f32 / 255.0,
                    chunk[2] as f32 / 255.0,
                );
            }
        }
        ColorType::Rgba => {
            for (i, chunk) in bytes.chunks_exact(4).take(pixels).enumerate() {
                buffer.data[i] = Color::from_rgba8([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
        }
        other => {
            return Err(PngError::UnsupportedLayout(format!("{:?}", other)));
        }
    }

    Ok(buffer)
}

/// Read only the dimensions of a PNG stream.
pub fn probe_dimensions<R: Read>(reader: R) -> Result<(u32, u32), PngError> {
    let decoder = png::Decoder::new(reader);
    let png_reader = decoder.read_info()?;
    let info = png_reader.info();
    Ok((info.width, info.height))
}

/// Write an RGBA texture buffer to any writer.
pub fn write_rgba_to_writer<W: Write>(
    buffer: &TextureBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(ColorType::Rgba);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_rgba8())?;
    Ok(())
}

/// Write an RGB texture buffer to any writer.
pub fn write_rgb_to_writer<W: Write>(
    buffer: &TextureBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_rgb8())?;
    Ok(())
}

/// Write a grayscale buffer to any writer.
pub fn write_grayscale_to_writer<W: Write>(
    buffer: &GrayscaleBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.width, buffer.height);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_bytes())?;
    Ok(())
}

/// Write an RGBA buffer to a file.
pub fn write_rgba(buffer: &TextureBuffer, path: &Path, config: &PngConfig) -> Result<(), PngError> {
    let file = std::fs::File::create(path)?;
    write_rgba_to_writer(buffer, std::io::BufWriter::new(file), config)
}

/// Encode an RGBA buffer to memory and hash the result.
pub fn write_rgba_to_vec_with_hash(
    buffer: &TextureBuffer,
    config: &PngConfig,
) -> Result<(Vec<u8>, String), PngError> {
    let mut data = Vec::new();
    write_rgba_to_writer(buffer, &mut data, config)?;
    let hash = blake3::hash(&data).to_hex().to_string();
    Ok((data, hash))
}

/// Encode an RGB buffer to memory and hash the result.
pub fn write_rgb_to_vec_with_hash(
    buffer: &TextureBuffer,
    config: &PngConfig,
) -> Result<(Vec<u8>, String), PngError> {
    let mut data = Vec::new();
    write_rgb_to_writer(buffer, &mut data, config)?;
    let hash = blake3::hash(&data).to_hex().to_string();
    Ok((data, hash))
}

/// Encode a grayscale buffer to memory and hash the result.
pub fn write_grayscale_to_vec_with_hash(
    buffer: &GrayscaleBuffer,
    config: &PngConfig,
) -> Result<(Vec<u8>, String), PngError> {
    let mut data = Vec::new();
    write_grayscale_to_writer(buffer, &mut data, config)?;
    let hash = blake3::hash(&data).to_hex().to_string();
    Ok((data, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> TextureBuffer {
        let mut buf = TextureBuffer::new(width, height, Color::black());
        for y in 0..height {
            for x in 0..width {
                let t = (x + y * width) as f32 / ((width * height - 1).max(1)) as f32;
                buf.set(x, y, Color::rgba(t, 1.0 - t, 0.5, 1.0));
            }
        }
        buf
    }

    #[test]
    fn rgba_encode_decode_round_trip_is_byte_exact() {
        let original = gradient(8, 4);
        let (data, _) = write_rgba_to_vec_with_hash(&original, &PngConfig::default()).unwrap();
        let decoded = decode(&data[..]).unwrap();
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 4);
        assert_eq!(decoded.to_rgba8(), original.to_rgba8());
    }

    #[test]
    fn encoding_is_deterministic() {
        let buf = gradient(16, 16);
        let (a, hash_a) = write_rgba_to_vec_with_hash(&buf, &PngConfig::default()).unwrap();
        let (b, hash_b) = write_rgba_to_vec_with_hash(&buf, &PngConfig::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn grayscale_decodes_with_broadcast() {
        let mut gray = GrayscaleBuffer::new(2, 1, 0.0);
        gray.set(1, 0, 1.0);
        let (data, _) = write_grayscale_to_vec_with_hash(&gray, &PngConfig::default()).unwrap();
        let decoded = decode(&data[..]).unwrap();
        let c = decoded.get(1, 0);
        assert_eq!(c.to_rgba8(), [255, 255, 255, 255]);
        let c = decoded.get(0, 0);
        assert_eq!(c.to_rgba8(), [0, 0, 0, 255]);
    }

    #[test]
    fn probe_reads_dimensions_without_full_decode() {
        let buf = gradient(5, 7);
        let (data, _) = write_rgba_to_vec_with_hash(&buf, &PngConfig::default()).unwrap();
        assert_eq!(probe_dimensions(&data[..]).unwrap(), (5, 7));
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let result = decode(&b"not a png"[..]);
        assert!(matches!(result, Err(PngError::Decoding(_))));
    }

    #[test]
    fn write_to_disk_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buf = gradient(4, 4);
        write_rgba(&buf, &path, &PngConfig::default()).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let decoded = decode(file).unwrap();
        assert_eq!(decoded.to_rgba8(), buf.to_rgba8());
    }
}
