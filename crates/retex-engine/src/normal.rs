//! Normal map derivation from height fields.
//!
//! Normals use the OpenGL convention: R = X (right positive), G = Y (up
//! positive), B = Z (out of the surface), stored remapped from [-1, 1]
//! to [0, 1]. A flat field encodes as (128, 128, 255).

use retex_spec::{NormalFilterSettings, NormalMethod, NormalSettings};

use crate::buffer::{GrayscaleBuffer, TextureBuffer};
use crate::color::Color;
use crate::rng::DeterministicRng;

/// Derives tangent-space normals from a height buffer.
pub struct NormalGenerator {
    method: NormalMethod,
    strength: f32,
    low_strength: f32,
    variance_strength: f32,
    variance_blur: f32,
    low_downscale: u32,
}

impl NormalGenerator {
    pub fn from_settings(settings: &NormalSettings) -> Self {
        Self {
            method: settings.method,
            strength: settings.strength,
            low_strength: settings.low_strength,
            variance_strength: settings.variance_strength.clamp(0.0, 0.99),
            variance_blur: settings.variance_blur.max(0.0),
            low_downscale: settings.low_downscale.max(2),
        }
    }

    /// Scale gradient strengths by the ratio of working-buffer to source
    /// resolution, preserving apparent slope under up/downscaling.
    pub fn with_resolution_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.strength *= scale;
            self.low_strength *= scale;
        }
        self
    }

    /// Derive an encoded normal buffer from a height field. Z is always
    /// restored afterwards, so output vectors are unit length.
    pub fn generate(&self, height: &GrayscaleBuffer) -> TextureBuffer {
        let mut normal = match self.method {
            NormalMethod::Sobel3 => gradient_normals(height, self.strength, 1),
            NormalMethod::Sobel5 => gradient_normals(height, self.strength, 2),
            NormalMethod::Sobel9 => gradient_normals(height, self.strength, 4),
            NormalMethod::SobelHigh => {
                let low = low_pass(height, self.low_downscale);
                let detail = difference(height, &low);
                gradient_normals(&detail, self.strength, 1)
            }
            NormalMethod::SobelLow => {
                let low = low_pass(height, self.low_downscale);
                gradient_normals(&low, self.low_strength, 1)
            }
            NormalMethod::Variance => self.variance_blend(height),
        };
        restore_z(&mut normal);
        normal
    }

    /// Frequency-split blend: a high-frequency pass at full resolution
    /// and a low-frequency pass on downsampled height, blended per pixel
    /// by blurred local height variance.
    fn variance_blend(&self, height: &GrayscaleBuffer) -> TextureBuffer {
        let low_height = low_pass(height, self.low_downscale);
        let high = gradient_normals(height, self.strength, 1);
        let low = gradient_normals(&low_height, self.low_strength, 1);

        let mut variance = difference(height, &low_height);
        for v in &mut variance.data {
            *v = v.abs();
        }
        if self.variance_blur > 0.0 {
            gaussian_blur(&mut variance, self.variance_blur);
        }
        let gain = 1.0 / (1.0 - self.variance_strength);

        let mut out = TextureBuffer::new(height.width, height.height, Color::rgb(0.5, 0.5, 1.0));
        for y in 0..height.height {
            for x in 0..height.width {
                let weight = (variance.get(x, y) * gain).clamp(0.0, 1.0);
                let h = decode_normal(high.get(x, y));
                let l = decode_normal(low.get(x, y));
                let blended = [
                    l[0] + (h[0] - l[0]) * weight,
                    l[1] + (h[1] - l[1]) * weight,
                    l[2] + (h[2] - l[2]) * weight,
                ];
                out.set(x, y, encode_normal(normalize(blended)));
            }
        }
        out
    }
}

/// Decode an encoded normal pixel to a signed vector.
pub fn decode_normal(color: Color) -> [f32; 3] {
    [
        color.r * 2.0 - 1.0,
        color.g * 2.0 - 1.0,
        color.b * 2.0 - 1.0,
    ]
}

/// Encode a signed vector as a normal pixel.
pub fn encode_normal(n: [f32; 3]) -> Color {
    Color::rgb(
        (n[0] + 1.0) * 0.5,
        (n[1] + 1.0) * 0.5,
        (n[2] + 1.0) * 0.5,
    )
}

fn normalize(n: [f32; 3]) -> [f32; 3] {
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len <= 1e-6 {
        [0.0, 0.0, 1.0]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}

/// Recompute Z from X/Y so every vector is unit length with a
/// non-negative Z.
pub fn restore_z(buffer: &mut TextureBuffer) {
    for pixel in &mut buffer.data {
        let mut x = pixel.r * 2.0 - 1.0;
        let mut y = pixel.g * 2.0 - 1.0;
        let planar = x * x + y * y;
        if planar > 1.0 {
            let len = planar.sqrt();
            x /= len;
            y /= len;
        }
        let z = (1.0 - (x * x + y * y)).max(0.0).sqrt();
        *pixel = encode_normal([x, y, z]);
    }
}

/// Curvature wrap and angular noise, applied after derivation.
pub fn apply_filter(buffer: &mut TextureBuffer, settings: &NormalFilterSettings) {
    let curve_x = settings.curve_x.to_radians();
    let curve_y = settings.curve_y.to_radians();
    let noise = settings.noise_angle.to_radians();
    if curve_x == 0.0 && curve_y == 0.0 && noise == 0.0 {
        return;
    }

    let seed = DeterministicRng::derive_variant_seed(settings.seed, "normal-noise");
    let mut rng = DeterministicRng::new(seed);

    let width = buffer.width;
    let height = buffer.height;
    for y in 0..height {
        for x in 0..width {
            let mut angle_x = curve_x * ((x as f32 + 0.5) / width as f32 - 0.5);
            let mut angle_y = curve_y * ((y as f32 + 0.5) / height as f32 - 0.5);
            if noise != 0.0 {
                angle_x += rng.gen_signed_f32() * noise;
                angle_y += rng.gen_signed_f32() * noise;
            }

            let n = decode_normal(buffer.get(x, y));

            // Rotate about the Y axis (x/z plane), then the X axis.
            let (sx, cx) = angle_x.sin_cos();
            let nx = n[0] * cx + n[2] * sx;
            let nz = -n[0] * sx + n[2] * cx;

            let (sy, cy) = angle_y.sin_cos();
            let ny = n[1] * cy + nz * sy;
            let nz = -n[1] * sy + nz * cy;

            buffer.set(x, y, encode_normal(normalize([nx, ny, nz])));
        }
    }
}

/// Multi-tap gradient operator. `radius` 1 is the classic Sobel; larger
/// radii extend the kernel with `d / (dx^2 + dy^2)` weights.
fn gradient_normals(height: &GrayscaleBuffer, strength: f32, radius: i32) -> TextureBuffer {
    let width = height.width;
    let rows = height.height;
    let mut buffer = TextureBuffer::new(width, rows, Color::rgb(0.5, 0.5, 1.0));

    // Normalizer turning the weighted tap sum into a central-difference
    // slope in height units per texel.
    let mut weight_sum = 0.0f32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            weight_sum += (dx * dx) as f32 / ((dx * dx + dy * dy) as f32);
        }
    }

    for y in 0..rows {
        for x in 0..width {
            let mut gx = 0.0f32;
            let mut gy = 0.0f32;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let sample = height.get_wrapped(x as i32 + dx, y as i32 + dy);
                    let inv = 1.0 / ((dx * dx + dy * dy) as f32);
                    gx += sample * dx as f32 * inv;
                    gy += sample * dy as f32 * inv;
                }
            }
            gx = gx / weight_sum * strength;
            gy = gy / weight_sum * strength;

            // Positive x-gradient tilts the normal left; y is flipped
            // for the Y-up convention.
            let n = normalize([-gx, gy, 1.0]);
            buffer.set(x, y, encode_normal(n));
        }
    }
    buffer
}

/// Downsample then upsample, removing frequencies above the factor.
fn low_pass(height: &GrayscaleBuffer, factor: u32) -> GrayscaleBuffer {
    height
        .downsampled(factor)
        .resized(height.width, height.height)
}

/// Per-pixel difference `a - b`.
fn difference(a: &GrayscaleBuffer, b: &GrayscaleBuffer) -> GrayscaleBuffer {
    let mut out = GrayscaleBuffer::new(a.width, a.height, 0.0);
    for (i, v) in out.data.iter_mut().enumerate() {
        *v = a.data[i] - b.data[i];
    }
    out
}

/// Separable Gaussian blur with wrapping edges.
fn gaussian_blur(buffer: &mut GrayscaleBuffer, sigma: f32) {
    let width = buffer.width;
    let height = buffer.height;

    let kernel_size = ((sigma * 3.0).ceil() as usize * 2 + 1).max(3);
    let half = kernel_size / 2;

    let mut kernel = vec![0.0f32; kernel_size];
    let mut sum = 0.0;
    for (i, k) in kernel.iter_mut().enumerate() {
        let t = i as f32 - half as f32;
        let value = (-t * t / (2.0 * sigma * sigma)).exp();
        *k = value;
        sum += value;
    }
    for k in &mut kernel {
        *k /= sum;
    }

    let mut temp = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let offset = i as i32 - half as i32;
                let sx = (x as i32 + offset).rem_euclid(width as i32) as u32;
                acc += buffer.get(sx, y) * k;
            }
            temp[(y * width + x) as usize] = acc;
        }
    }
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let offset = i as i32 - half as i32;
                let sy = (y as i32 + offset).rem_euclid(height as i32) as u32;
                acc += temp[(sy * width + x) as usize] * k;
            }
            buffer.set(x, y, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32) -> GrayscaleBuffer {
        GrayscaleBuffer::new(width, height, 0.5)
    }

    fn slope(width: u32, height: u32) -> GrayscaleBuffer {
        let mut buf = GrayscaleBuffer::new(width, height, 0.0);
        for y in 0..height {
            for x in 0..width {
                buf.set(x, y, x as f32 * 0.1);
            }
        }
        buf
    }

    fn generator(method: NormalMethod) -> NormalGenerator {
        let mut settings = NormalSettings::default();
        settings.method = method;
        NormalGenerator::from_settings(&settings)
    }

    #[test]
    fn flat_height_yields_straight_up_normals() {
        for method in [
            NormalMethod::Sobel3,
            NormalMethod::Sobel5,
            NormalMethod::Sobel9,
            NormalMethod::Variance,
        ] {
            let normal = generator(method).generate(&flat(16, 16));
            let center = normal.get(8, 8).to_rgba8();
            assert!(
                (center[0] as i32 - 128).abs() <= 1,
                "{:?}: x = {}",
                method,
                center[0]
            );
            assert!((center[1] as i32 - 128).abs() <= 1);
            assert_eq!(center[2], 255);
        }
    }

    #[test]
    fn every_output_normal_is_unit_length() {
        let normal = generator(NormalMethod::Sobel3).generate(&slope(16, 16));
        for y in 0..16 {
            for x in 0..16 {
                let n = decode_normal(normal.get(x, y));
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                assert!((len - 1.0).abs() < 0.02, "({}, {}): |n| = {}", x, y, len);
            }
        }
    }

    #[test]
    fn rising_slope_tilts_normals_negative_x() {
        let normal = generator(NormalMethod::Sobel3).generate(&slope(16, 16));
        // Interior pixel, away from the wrap seam.
        let n = decode_normal(normal.get(8, 8));
        assert!(n[0] < -0.01, "expected negative x tilt, got {}", n[0]);
    }

    #[test]
    fn resolution_scale_steepens_gradients() {
        let height = slope(16, 16);
        let plain = generator(NormalMethod::Sobel3).generate(&height);
        let scaled = generator(NormalMethod::Sobel3)
            .with_resolution_scale(4.0)
            .generate(&height);
        let a = decode_normal(plain.get(8, 8));
        let b = decode_normal(scaled.get(8, 8));
        assert!(b[0] < a[0], "stronger gradient must tilt further");
    }

    #[test]
    fn restore_z_clamps_oversized_xy() {
        let mut buffer = TextureBuffer::new(1, 1, Color::rgb(1.0, 1.0, 0.0));
        restore_z(&mut buffer);
        let n = decode_normal(buffer.get(0, 0));
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-3);
    }

    #[test]
    fn identity_filter_is_a_no_op() {
        let mut normal = generator(NormalMethod::Sobel3).generate(&slope(8, 8));
        let before = normal.clone();
        apply_filter(&mut normal, &NormalFilterSettings::default());
        assert_eq!(normal, before);
    }

    #[test]
    fn curve_filter_tilts_edges_apart() {
        let mut normal = generator(NormalMethod::Sobel3).generate(&flat(16, 16));
        let settings = NormalFilterSettings {
            curve_x: 90.0,
            curve_y: 0.0,
            noise_angle: 0.0,
            seed: 0,
        };
        apply_filter(&mut normal, &settings);
        let left = decode_normal(normal.get(0, 8));
        let right = decode_normal(normal.get(15, 8));
        assert!(left[0] < -0.1, "left edge should tilt one way: {}", left[0]);
        assert!(right[0] > 0.1, "right edge the other: {}", right[0]);
    }

    #[test]
    fn noise_filter_is_deterministic() {
        let settings = NormalFilterSettings {
            curve_x: 0.0,
            curve_y: 0.0,
            noise_angle: 10.0,
            seed: 42,
        };
        let mut a = generator(NormalMethod::Sobel3).generate(&flat(8, 8));
        let mut b = a.clone();
        apply_filter(&mut a, &settings);
        apply_filter(&mut b, &settings);
        assert_eq!(a, b);
    }

    #[test]
    fn variance_blend_matches_low_pass_on_smooth_fields() {
        // A field with no detail beyond the low pass should weight fully
        // toward the low-frequency normals, which are near-flat.
        let normal = generator(NormalMethod::Variance).generate(&flat(32, 32));
        let n = decode_normal(normal.get(16, 16));
        assert!(n[2] > 0.99);
    }
}
