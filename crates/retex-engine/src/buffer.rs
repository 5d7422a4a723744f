//! Pixel buffers: the RGBA working buffer the compositor paints into and
//! the scalar buffer the generators consume and produce.

use retex_spec::PixelChannel;

use crate::color::Color;
use crate::filter::FilterKind;
use crate::regions::PixelRect;

/// A 2D RGBA texture buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data, row-major.
    pub data: Vec<Color>,
}

impl TextureBuffer {
    /// Create a new buffer filled with a color.
    pub fn new(width: u32, height: u32, fill: Color) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![fill; size],
        }
    }

    /// Get a pixel at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        let idx = (y * self.width + x) as usize;
        self.data[idx]
    }

    /// Set a pixel at the given coordinates.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let idx = (y * self.width + x) as usize;
        self.data[idx] = color;
    }

    /// Get a pixel with wrapping coordinates.
    #[inline]
    pub fn get_wrapped(&self, x: i32, y: i32) -> Color {
        let wx = x.rem_euclid(self.width as i32) as u32;
        let wy = y.rem_euclid(self.height as i32) as u32;
        self.get(wx, wy)
    }

    /// Read one channel as a raw byte.
    #[inline]
    pub fn channel_byte(&self, x: u32, y: u32, channel: PixelChannel) -> u8 {
        (self.get(x, y).channel(channel).clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Write one channel from a raw byte.
    #[inline]
    pub fn set_channel_byte(&mut self, x: u32, y: u32, channel: PixelChannel, byte: u8) {
        let idx = (y * self.width + x) as usize;
        self.data[idx].set_channel(channel, byte as f32 / 255.0);
    }

    /// Resample into a new buffer of the given size.
    pub fn resized(&self, width: u32, height: u32, filter: FilterKind) -> TextureBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = TextureBuffer::new(width, height, Color::black());
        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let v = (y as f32 + 0.5) / height as f32;
                out.set(x, y, filter.sample(self, u, v));
            }
        }
        out
    }

    /// Copy out a sub-rectangle, used when slicing a finished working
    /// buffer along publish regions. The rectangle is clamped to the
    /// buffer.
    pub fn crop(&self, rect: PixelRect) -> TextureBuffer {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let width = rect.width.min(self.width - x0).max(1);
        let height = rect.height.min(self.height - y0).max(1);
        let mut out = TextureBuffer::new(width, height, Color::black());
        for y in 0..height {
            for x in 0..width {
                out.set(x, y, self.get(x0 + x, y0 + y));
            }
        }
        out
    }

    /// Extract one channel into a scalar buffer.
    pub fn extract_channel(&self, channel: PixelChannel) -> GrayscaleBuffer {
        let data = self.data.iter().map(|c| c.channel(channel)).collect();
        GrayscaleBuffer {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Convert to 8-bit RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * 4);
        for color in &self.data {
            bytes.extend_from_slice(&color.to_rgba8());
        }
        bytes
    }

    /// Convert to 8-bit RGB bytes.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() * 3);
        for color in &self.data {
            bytes.extend_from_slice(&color.to_rgb8());
        }
        bytes
    }

    /// Convert to 8-bit grayscale bytes, reading the red channel.
    pub fn to_gray8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|c| (c.r.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// Grayscale texture buffer (single channel).
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data, single channel, row-major.
    pub data: Vec<f32>,
}

impl GrayscaleBuffer {
    /// Create a new buffer filled with a value.
    pub fn new(width: u32, height: u32, fill: f32) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: vec![fill; size],
        }
    }

    /// Get a pixel at the given coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        let idx = (y * self.width + x) as usize;
        self.data[idx]
    }

    /// Set a pixel at the given coordinates.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let idx = (y * self.width + x) as usize;
        self.data[idx] = value;
    }

    /// Get a pixel with wrapping coordinates.
    #[inline]
    pub fn get_wrapped(&self, x: i32, y: i32) -> f32 {
        let wx = x.rem_euclid(self.width as i32) as u32;
        let wy = y.rem_euclid(self.height as i32) as u32;
        self.get(wx, wy)
    }

    /// Bilinear sample at fractional pixel coordinates with wrapping.
    pub fn sample_wrapped(&self, fx: f32, fy: f32) -> f32 {
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let x0 = x0 as i32;
        let y0 = y0 as i32;

        let v00 = self.get_wrapped(x0, y0);
        let v10 = self.get_wrapped(x0 + 1, y0);
        let v01 = self.get_wrapped(x0, y0 + 1);
        let v11 = self.get_wrapped(x0 + 1, y0 + 1);

        let top = v00 + (v10 - v00) * tx;
        let bottom = v01 + (v11 - v01) * tx;
        top + (bottom - top) * ty
    }

    /// Resample into a new buffer of the given size (bilinear, texel
    /// centers aligned).
    pub fn resized(&self, width: u32, height: u32) -> GrayscaleBuffer {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = GrayscaleBuffer::new(width, height, 0.0);
        for y in 0..height {
            for x in 0..width {
                let fx = (x as f32 + 0.5) / width as f32 * self.width as f32 - 0.5;
                let fy = (y as f32 + 0.5) / height as f32 * self.height as f32 - 0.5;
                out.set(x, y, self.sample_wrapped(fx, fy));
            }
        }
        out
    }

    /// Box-downsample by an integer factor.
    pub fn downsampled(&self, factor: u32) -> GrayscaleBuffer {
        let factor = factor.max(1);
        let width = (self.width / factor).max(1);
        let height = (self.height / factor).max(1);
        let mut out = GrayscaleBuffer::new(width, height, 0.0);
        for y in 0..height {
            for x in 0..width {
                let mut sum = 0.0;
                let mut count = 0u32;
                for dy in 0..factor {
                    for dx in 0..factor {
                        let sx = x * factor + dx;
                        let sy = y * factor + dy;
                        if sx < self.width && sy < self.height {
                            sum += self.get(sx, sy);
                            count += 1;
                        }
                    }
                }
                out.set(x, y, sum / count.max(1) as f32);
            }
        }
        out
    }

    /// Convert to 8-bit bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}
