//! Color values for working buffers.

use retex_spec::PixelChannel;

/// RGBA color with f32 components in the 0.0 to 1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color with alpha = 1.0.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a new color with alpha.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a grayscale color.
    pub const fn gray(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    /// Create black.
    pub const fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Create white.
    pub const fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    /// Read the component named by a pixel-channel selector. `Magnitude`
    /// and `None` read as 0.
    pub fn channel(&self, channel: PixelChannel) -> f32 {
        match channel {
            PixelChannel::Red => self.r,
            PixelChannel::Green => self.g,
            PixelChannel::Blue => self.b,
            PixelChannel::Alpha => self.a,
            PixelChannel::Magnitude | PixelChannel::None => 0.0,
        }
    }

    /// Write the component named by a pixel-channel selector. `Magnitude`
    /// and `None` are ignored.
    pub fn set_channel(&mut self, channel: PixelChannel, value: f32) {
        match channel {
            PixelChannel::Red => self.r = value,
            PixelChannel::Green => self.g = value,
            PixelChannel::Blue => self.b = value,
            PixelChannel::Alpha => self.a = value,
            PixelChannel::Magnitude | PixelChannel::None => {}
        }
    }

    /// Linearly interpolate between two colors.
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Clamp all components to [0.0, 1.0].
    pub fn clamp(&self) -> Color {
        Color {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    /// Convert to 8-bit RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let c = self.clamp();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
            (c.a * 255.0).round() as u8,
        ]
    }

    /// Convert to 8-bit RGB.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamp();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }

    /// Create from 8-bit RGBA.
    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::rgba(
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_conversion_round_trips_every_value() {
        for b in 0..=255u8 {
            let color = Color::from_rgba8([b, b, b, b]);
            assert_eq!(color.to_rgba8(), [b, b, b, b]);
        }
    }

    #[test]
    fn channel_selectors_read_and_write() {
        let mut color = Color::black();
        color.set_channel(PixelChannel::Green, 0.5);
        color.set_channel(PixelChannel::Alpha, 0.25);
        assert_eq!(color.channel(PixelChannel::Green), 0.5);
        assert_eq!(color.channel(PixelChannel::Alpha), 0.25);
        assert_eq!(color.channel(PixelChannel::Red), 0.0);

        // Non-color selectors are inert.
        color.set_channel(PixelChannel::Magnitude, 0.9);
        assert_eq!(color.channel(PixelChannel::Magnitude), 0.0);
    }

    #[test]
    fn lerp_midpoint() {
        let a = Color::black();
        let b = Color::white();
        let mid = a.lerp(&b, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);
    }
}
