//! Channel descriptors: how one semantic material property maps to one
//! numeric pixel channel of one texture file.

use serde::{Deserialize, Serialize};

/// Tag identifying one texture file slot within a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureTag {
    /// Base color without baked lighting.
    Albedo,
    /// Base color with baked-in occlusion.
    Diffuse,
    /// Height/displacement field.
    Height,
    /// Alternate height field, preferred over `Height` when deriving normals.
    Bump,
    /// Tangent-space normal vectors.
    Normal,
    /// Ambient occlusion.
    Occlusion,
    /// Specular/reflectance.
    Specular,
    /// Perceptual smoothness.
    Smooth,
    /// Roughness.
    Rough,
    /// Metalness.
    Metal,
    /// Index-of-refraction reflectance at normal incidence.
    F0,
    /// Porosity.
    Porosity,
    /// Emissive intensity.
    Emissive,
    /// Item/inventory composite.
    Item,
}

impl TextureTag {
    /// All known tags, in canonical order.
    pub const ALL: [TextureTag; 14] = [
        TextureTag::Albedo,
        TextureTag::Diffuse,
        TextureTag::Height,
        TextureTag::Bump,
        TextureTag::Normal,
        TextureTag::Occlusion,
        TextureTag::Specular,
        TextureTag::Smooth,
        TextureTag::Rough,
        TextureTag::Metal,
        TextureTag::F0,
        TextureTag::Porosity,
        TextureTag::Emissive,
        TextureTag::Item,
    ];

    /// Canonical lowercase name, as used in file names and serialized specs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureTag::Albedo => "albedo",
            TextureTag::Diffuse => "diffuse",
            TextureTag::Height => "height",
            TextureTag::Bump => "bump",
            TextureTag::Normal => "normal",
            TextureTag::Occlusion => "occlusion",
            TextureTag::Specular => "specular",
            TextureTag::Smooth => "smooth",
            TextureTag::Rough => "rough",
            TextureTag::Metal => "metal",
            TextureTag::F0 => "f0",
            TextureTag::Porosity => "porosity",
            TextureTag::Emissive => "emissive",
            TextureTag::Item => "item",
        }
    }
}

impl std::fmt::Display for TextureTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel-channel selector within a texture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelChannel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
    /// Auxiliary scalar channel carried alongside a vector-valued channel
    /// (normal-vector length). Handled by the generators, not the resolver.
    Magnitude,
    /// Channel intentionally not stored in any pixel.
    None,
}

impl PixelChannel {
    /// True for the four channels physically present in an image.
    pub fn is_color(&self) -> bool {
        matches!(
            self,
            PixelChannel::Red | PixelChannel::Green | PixelChannel::Blue | PixelChannel::Alpha
        )
    }
}

/// Semantic material property channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelId {
    AlbedoRed,
    AlbedoGreen,
    AlbedoBlue,
    AlbedoAlpha,
    DiffuseRed,
    DiffuseGreen,
    DiffuseBlue,
    Height,
    Occlusion,
    NormalX,
    NormalY,
    NormalZ,
    NormalMagnitude,
    Specular,
    Smooth,
    Rough,
    Metal,
    F0,
    Porosity,
    Emissive,
}

impl ChannelId {
    /// Texture tag this channel conventionally lives in.
    pub fn default_tag(&self) -> TextureTag {
        match self {
            ChannelId::AlbedoRed
            | ChannelId::AlbedoGreen
            | ChannelId::AlbedoBlue
            | ChannelId::AlbedoAlpha => TextureTag::Albedo,
            ChannelId::DiffuseRed | ChannelId::DiffuseGreen | ChannelId::DiffuseBlue => {
                TextureTag::Diffuse
            }
            ChannelId::Height => TextureTag::Height,
            ChannelId::Occlusion => TextureTag::Occlusion,
            ChannelId::NormalX
            | ChannelId::NormalY
            | ChannelId::NormalZ
            | ChannelId::NormalMagnitude => TextureTag::Normal,
            ChannelId::Specular => TextureTag::Specular,
            ChannelId::Smooth => TextureTag::Smooth,
            ChannelId::Rough => TextureTag::Rough,
            ChannelId::Metal => TextureTag::Metal,
            ChannelId::F0 => TextureTag::F0,
            ChannelId::Porosity => TextureTag::Porosity,
            ChannelId::Emissive => TextureTag::Emissive,
        }
    }

    /// Type-specific default literal, used when a channel resolves to
    /// nothing else. Most channels have none and stay at background.
    pub fn default_value(&self) -> Option<f32> {
        match self {
            ChannelId::AlbedoAlpha => Some(1.0),
            ChannelId::NormalZ => Some(1.0),
            ChannelId::NormalMagnitude => Some(1.0),
            _ => None,
        }
    }

    /// True for the vector components of a tangent-space normal.
    pub fn is_normal_component(&self) -> bool {
        matches!(
            self,
            ChannelId::NormalX | ChannelId::NormalY | ChannelId::NormalZ
        )
    }

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::AlbedoRed => "albedo-red",
            ChannelId::AlbedoGreen => "albedo-green",
            ChannelId::AlbedoBlue => "albedo-blue",
            ChannelId::AlbedoAlpha => "albedo-alpha",
            ChannelId::DiffuseRed => "diffuse-red",
            ChannelId::DiffuseGreen => "diffuse-green",
            ChannelId::DiffuseBlue => "diffuse-blue",
            ChannelId::Height => "height",
            ChannelId::Occlusion => "occlusion",
            ChannelId::NormalX => "normal-x",
            ChannelId::NormalY => "normal-y",
            ChannelId::NormalZ => "normal-z",
            ChannelId::NormalMagnitude => "normal-magnitude",
            ChannelId::Specular => "specular",
            ChannelId::Smooth => "smooth",
            ChannelId::Rough => "rough",
            ChannelId::Metal => "metal",
            ChannelId::F0 => "f0",
            ChannelId::Porosity => "porosity",
            ChannelId::Emissive => "emissive",
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resampling filter used when a source channel is drawn at a different
/// resolution than the working buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Point sampling. The default, so that identity re-encodes are
    /// byte-exact.
    #[default]
    Nearest,
    Bilinear,
    /// Catmull-Rom bicubic.
    Bicubic,
}

fn default_max_value() -> f32 {
    1.0
}

fn default_range_max() -> u8 {
    255
}

fn default_power() -> f32 {
    1.0
}

/// Describes how one semantic channel is encoded into one pixel channel.
///
/// Values are always expressed in the physical domain `[min_value,
/// max_value]` before quantization into the byte domain `[range_min,
/// range_max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// The semantic channel being described.
    pub channel: ChannelId,
    /// Texture file tag the pixel channel lives in.
    pub texture: TextureTag,
    /// Pixel-channel selector within that file.
    pub color: PixelChannel,
    /// Lower bound of the physical value domain.
    #[serde(default)]
    pub min_value: f32,
    /// Upper bound of the physical value domain.
    #[serde(default = "default_max_value")]
    pub max_value: f32,
    /// Lowest raw byte considered a valid sample.
    #[serde(default)]
    pub range_min: u8,
    /// Highest raw byte considered a valid sample.
    #[serde(default = "default_range_max")]
    pub range_max: u8,
    /// Cyclic byte shift applied inside `[range_min, range_max]`.
    #[serde(default)]
    pub shift: i32,
    /// Power-curve exponent; 1 disables the curve.
    #[serde(default = "default_power")]
    pub power: f32,
    /// Invert within the value domain (`max + min - value`).
    #[serde(default)]
    pub invert: bool,
    /// Literal value attached directly in configuration; when present,
    /// no texture sample is consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
    /// Per-channel resampling filter override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerKind>,
    /// Tie-break when multiple inputs could satisfy the same output.
    #[serde(default)]
    pub priority: i32,
    /// Descriptor-level default literal, consulted before the
    /// channel-type default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f32>,
}

impl ChannelDescriptor {
    /// Create a descriptor with the unit value domain, full byte range,
    /// no shift, no curve, no inversion.
    pub fn new(channel: ChannelId, texture: TextureTag, color: PixelChannel) -> Self {
        Self {
            channel,
            texture,
            color,
            min_value: 0.0,
            max_value: 1.0,
            range_min: 0,
            range_max: 255,
            shift: 0,
            power: 1.0,
            invert: false,
            value: None,
            sampler: None,
            priority: 0,
            default_value: None,
        }
    }

    /// Create a descriptor in the channel's conventional texture tag.
    pub fn for_channel(channel: ChannelId, color: PixelChannel) -> Self {
        Self::new(channel, channel.default_tag(), color)
    }

    /// Set the physical value domain.
    pub fn with_values(mut self, min: f32, max: f32) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Set the valid raw byte range.
    pub fn with_range(mut self, min: u8, max: u8) -> Self {
        self.range_min = min;
        self.range_max = max;
        self
    }

    /// Set the cyclic byte shift.
    pub fn with_shift(mut self, shift: i32) -> Self {
        self.shift = shift;
        self
    }

    /// Set the power-curve exponent.
    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    /// Mark the channel as inverted.
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Attach a literal value.
    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    /// Override the resampling filter.
    pub fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the resolution priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the descriptor-level default literal.
    pub fn with_default(mut self, value: f32) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn channel_names_round_trip_through_serde() {
        for channel in [
            ChannelId::AlbedoRed,
            ChannelId::NormalX,
            ChannelId::NormalMagnitude,
            ChannelId::F0,
        ] {
            let json = serde_json::to_string(&channel).unwrap();
            assert_eq!(json, format!("\"{}\"", channel.as_str()));
            let back: ChannelId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, channel);
        }
    }

    #[test]
    fn descriptor_defaults_fill_missing_fields() {
        let desc: ChannelDescriptor = serde_json::from_str(
            r#"{"channel": "height", "texture": "height", "color": "red"}"#,
        )
        .unwrap();
        assert_eq!(desc.min_value, 0.0);
        assert_eq!(desc.max_value, 1.0);
        assert_eq!(desc.range_min, 0);
        assert_eq!(desc.range_max, 255);
        assert_eq!(desc.shift, 0);
        assert_eq!(desc.power, 1.0);
        assert!(!desc.invert);
        assert_eq!(desc.value, None);
        assert_eq!(desc.priority, 0);
    }

    #[test]
    fn builder_chain_sets_all_fields() {
        let desc = ChannelDescriptor::for_channel(ChannelId::Emissive, PixelChannel::Alpha)
            .with_range(0, 254)
            .with_shift(-1)
            .with_power(2.0)
            .inverted()
            .with_priority(2);
        assert_eq!(desc.texture, TextureTag::Emissive);
        assert_eq!(desc.range_max, 254);
        assert_eq!(desc.shift, -1);
        assert_eq!(desc.power, 2.0);
        assert!(desc.invert);
        assert_eq!(desc.priority, 2);
    }

    #[test]
    fn normal_z_has_unit_default() {
        assert_eq!(ChannelId::NormalZ.default_value(), Some(1.0));
        assert_eq!(ChannelId::Rough.default_value(), None);
    }
}
