//! Ambient occlusion from height fields via horizon ray marching.
//!
//! Each texel marches a fixed ring of directions outward, tracking the
//! steepest horizon angle raised by neighboring higher terrain. Output
//! is `1 - occlusion`, so 1.0 is fully lit.

use std::f32::consts::FRAC_PI_2;

use retex_spec::OcclusionSettings;

use crate::buffer::GrayscaleBuffer;

/// Number of horizontal march directions around each texel.
const RAY_DIRECTIONS: u32 = 8;

/// Steps taken at quality 1.0.
const STEPS_PER_QUALITY: f32 = 64.0;

/// Computes a scalar occlusion buffer from a height buffer.
pub struct OcclusionGenerator {
    quality: f32,
    step_distance: f32,
    z_scale: f32,
    z_bias: f32,
}

impl OcclusionGenerator {
    pub fn from_settings(settings: &OcclusionSettings) -> Self {
        Self {
            quality: settings.quality.max(0.0),
            step_distance: settings.step_distance.max(0.01),
            z_scale: settings.z_scale,
            z_bias: settings.z_bias,
        }
    }

    /// Scale the height axis by the ratio of working-buffer to source
    /// resolution.
    pub fn with_resolution_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.z_scale *= scale;
            self.z_bias *= scale;
        }
        self
    }

    fn step_count(&self) -> u32 {
        ((self.quality * STEPS_PER_QUALITY).round() as u32).max(1)
    }

    /// March the height field and return the lit buffer.
    pub fn generate(&self, height: &GrayscaleBuffer) -> GrayscaleBuffer {
        let width = height.width;
        let rows = height.height;
        let steps = self.step_count();

        let directions: Vec<(f32, f32)> = (0..RAY_DIRECTIONS)
            .map(|i| {
                let angle = i as f32 / RAY_DIRECTIONS as f32 * std::f32::consts::TAU;
                (angle.cos(), angle.sin())
            })
            .collect();

        let mut buffer = GrayscaleBuffer::new(width, rows, 1.0);
        for y in 0..rows {
            for x in 0..width {
                let center = height.get(x, y) * self.z_scale + self.z_bias;

                let mut occlusion = 0.0f32;
                for &(dx, dy) in &directions {
                    let mut max_slope = 0.0f32;
                    for step in 1..=steps {
                        let distance = step as f32 * self.step_distance;
                        let sample = height
                            .sample_wrapped(x as f32 + dx * distance, y as f32 + dy * distance)
                            * self.z_scale;
                        let slope = (sample - center) / distance;
                        if slope > max_slope {
                            max_slope = slope;
                        }
                    }
                    // Fraction of the hemisphere blocked in this
                    // direction.
                    occlusion += max_slope.atan() / FRAC_PI_2;
                }

                let occlusion = (occlusion / RAY_DIRECTIONS as f32).clamp(0.0, 1.0);
                buffer.set(x, y, 1.0 - occlusion);
            }
        }
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OcclusionSettings {
        OcclusionSettings::default()
    }

    #[test]
    fn flat_height_is_fully_lit() {
        let height = GrayscaleBuffer::new(32, 32, 0.5);
        let occ = OcclusionGenerator::from_settings(&settings()).generate(&height);
        for y in 0..32 {
            for x in 0..32 {
                assert!(occ.get(x, y) > 0.999, "({}, {}) = {}", x, y, occ.get(x, y));
            }
        }
    }

    #[test]
    fn pit_center_is_occluded() {
        let mut height = GrayscaleBuffer::new(32, 32, 1.0);
        for y in 12..20 {
            for x in 12..20 {
                height.set(x, y, 0.0);
            }
        }
        let occ = OcclusionGenerator::from_settings(&settings()).generate(&height);
        let pit = occ.get(15, 15);
        let rim = occ.get(0, 0);
        assert!(pit < rim, "pit {} must be darker than rim {}", pit, rim);
        assert!(pit < 0.9);
    }

    #[test]
    fn z_bias_reduces_occlusion() {
        let mut height = GrayscaleBuffer::new(16, 16, 1.0);
        height.set(8, 8, 0.0);
        let base = OcclusionGenerator::from_settings(&settings()).generate(&height);

        let mut biased_settings = settings();
        biased_settings.z_bias = 0.5;
        let biased = OcclusionGenerator::from_settings(&biased_settings).generate(&height);

        assert!(biased.get(8, 8) >= base.get(8, 8));
    }

    #[test]
    fn quality_controls_step_count() {
        let mut low = settings();
        low.quality = 0.05;
        let mut high = settings();
        high.quality = 1.0;
        assert!(
            OcclusionGenerator::from_settings(&high).step_count()
                > OcclusionGenerator::from_settings(&low).step_count()
        );
    }

    #[test]
    fn generation_is_deterministic() {
        let mut height = GrayscaleBuffer::new(16, 16, 0.5);
        height.set(4, 4, 1.0);
        let gen = OcclusionGenerator::from_settings(&settings());
        assert_eq!(gen.generate(&height), gen.generate(&height));
    }
}
