//! Per-material properties: literal channel values, intensity adjustment,
//! sizing, and the procedural generation settings.
//!
//! Everything here is fully defaulted at deserialization time so the
//! engine's hot path never consults layered fallbacks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;

/// Gradient operator used when deriving a normal map from height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NormalMethod {
    /// 3-tap Sobel.
    #[default]
    Sobel3,
    /// 5-tap Sobel.
    Sobel5,
    /// 9-tap Sobel.
    Sobel9,
    /// 3-tap Sobel on full-resolution height only.
    SobelHigh,
    /// 3-tap Sobel on downsampled height only.
    SobelLow,
    /// Frequency-split blend of high and low passes weighted by local
    /// height variance.
    Variance,
}

fn default_true() -> bool {
    true
}

fn default_strength() -> f32 {
    1.0
}

fn default_low_strength() -> f32 {
    0.3
}

fn default_variance_strength() -> f32 {
    0.7
}

fn default_variance_blur() -> f32 {
    3.0
}

fn default_low_downscale() -> u32 {
    4
}

/// Normal map generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalSettings {
    /// Derive a normal map from height when no explicit normal channels
    /// are mapped.
    #[serde(default = "default_true")]
    pub auto_generate: bool,
    #[serde(default)]
    pub method: NormalMethod,
    /// Gradient strength for the full-resolution pass.
    #[serde(default = "default_strength")]
    pub strength: f32,
    /// Gradient strength for the downsampled pass (variance and low
    /// methods only).
    #[serde(default = "default_low_strength")]
    pub low_strength: f32,
    /// Blend weight gain for the variance method, in `[0, 1)`.
    #[serde(default = "default_variance_strength")]
    pub variance_strength: f32,
    /// Gaussian sigma applied to the variance map.
    #[serde(default = "default_variance_blur")]
    pub variance_blur: f32,
    /// Integer factor the height field is downsampled by for the low
    /// pass.
    #[serde(default = "default_low_downscale")]
    pub low_downscale: u32,
}

impl Default for NormalSettings {
    fn default() -> Self {
        Self {
            auto_generate: true,
            method: NormalMethod::Sobel3,
            strength: default_strength(),
            low_strength: default_low_strength(),
            variance_strength: default_variance_strength(),
            variance_blur: default_variance_blur(),
            low_downscale: default_low_downscale(),
        }
    }
}

fn default_quality() -> f32 {
    0.1
}

fn default_step_distance() -> f32 {
    1.0
}

/// Occlusion map generation settings. `z_scale` and `z_bias` are
/// expressed at source resolution; the engine rescales them to the
/// working buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcclusionSettings {
    /// Steps per texel of ray distance; higher is slower and smoother.
    #[serde(default = "default_quality")]
    pub quality: f32,
    /// Distance between ray steps, in texels.
    #[serde(default = "default_step_distance")]
    pub step_distance: f32,
    #[serde(default = "default_strength")]
    pub z_scale: f32,
    #[serde(default)]
    pub z_bias: f32,
    /// Multiplier applied when occlusion is baked into diffuse channels.
    #[serde(default = "default_strength")]
    pub strength: f32,
    /// Leave emissive pixels undarkened during the bake pass.
    #[serde(default)]
    pub exclude_emissive: bool,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            step_distance: default_step_distance(),
            z_scale: 1.0,
            z_bias: 0.0,
            strength: 1.0,
            exclude_emissive: false,
        }
    }
}

/// Post-derivation normal filter: curvature wrap and angular noise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalFilterSettings {
    /// Degrees of rotation across the full width (wrap around a curved
    /// surface).
    #[serde(default)]
    pub curve_x: f32,
    /// Degrees of rotation across the full height.
    #[serde(default)]
    pub curve_y: f32,
    /// Maximum random angular perturbation, in degrees.
    #[serde(default)]
    pub noise_angle: f32,
    /// Seed for the angular noise.
    #[serde(default)]
    pub seed: u32,
}

fn default_texture_scale() -> f32 {
    1.0
}

/// Flat, fully-defaulted material configuration consumed by one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub name: String,
    /// Literal channel values declared directly in configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<ChannelId, f32>,
    /// Value-space shift per channel (intensity adjustment).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shifts: BTreeMap<ChannelId, f32>,
    /// Value-space scale per channel (intensity adjustment).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scales: BTreeMap<ChannelId, f32>,
    /// Explicit output width; height follows the source aspect ratio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_size: Option<u32>,
    /// Multiplier applied to inferred source bounds.
    #[serde(default = "default_texture_scale")]
    pub texture_scale: f32,
    #[serde(default)]
    pub normal: NormalSettings,
    #[serde(default)]
    pub occlusion: OcclusionSettings,
    /// Optional curvature/noise filter applied after normal derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NormalFilterSettings>,
}

impl MaterialProperties {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
            shifts: BTreeMap::new(),
            scales: BTreeMap::new(),
            texture_size: None,
            texture_scale: 1.0,
            normal: NormalSettings::default(),
            occlusion: OcclusionSettings::default(),
            filter: None,
        }
    }

    /// Literal value declared for the channel, if any.
    pub fn value(&self, channel: ChannelId) -> Option<f32> {
        self.values.get(&channel).copied()
    }

    /// Value-space intensity adjustment `(shift, scale)` for the channel.
    pub fn intensity(&self, channel: ChannelId) -> (f32, f32) {
        (
            self.shifts.get(&channel).copied().unwrap_or(0.0),
            self.scales.get(&channel).copied().unwrap_or(1.0),
        )
    }

    /// Declare a literal channel value.
    pub fn with_value(mut self, channel: ChannelId, value: f32) -> Self {
        self.values.insert(channel, value);
        self
    }

    /// Declare a value-space intensity adjustment.
    pub fn with_intensity(mut self, channel: ChannelId, shift: f32, scale: f32) -> Self {
        self.shifts.insert(channel, shift);
        self.scales.insert(channel, scale);
        self
    }

    /// Set the explicit output width.
    pub fn with_texture_size(mut self, size: u32) -> Self {
        self.texture_size = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intensity_defaults_to_identity() {
        let material = MaterialProperties::new("stone");
        assert_eq!(material.intensity(ChannelId::Height), (0.0, 1.0));
    }

    #[test]
    fn material_deserializes_from_minimal_json() {
        let material: MaterialProperties =
            serde_json::from_str(r#"{"name": "oak_planks"}"#).unwrap();
        assert_eq!(material.name, "oak_planks");
        assert_eq!(material.texture_scale, 1.0);
        assert!(material.normal.auto_generate);
        assert_eq!(material.normal.method, NormalMethod::Sobel3);
        assert_eq!(material.occlusion.quality, 0.1);
    }

    #[test]
    fn literal_values_round_trip_through_json() {
        let material = MaterialProperties::new("lava")
            .with_value(ChannelId::Emissive, 0.8)
            .with_value(ChannelId::Rough, 0.2);
        let json = serde_json::to_string(&material).unwrap();
        let back: MaterialProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(ChannelId::Emissive), Some(0.8));
        assert_eq!(back.value(ChannelId::Rough), Some(0.2));
        assert_eq!(back.value(ChannelId::Metal), None);
    }

    #[test]
    fn normal_method_uses_kebab_names() {
        let json = serde_json::to_string(&NormalMethod::SobelHigh).unwrap();
        assert_eq!(json, "\"sobel-high\"");
    }
}
