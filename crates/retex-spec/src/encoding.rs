//! Encoding definitions: ordered channel descriptor sets describing how a
//! complete texture set is laid out, plus the built-in format presets.

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelDescriptor, ChannelId, PixelChannel, TextureTag};

/// An ordered set of channel descriptors describing one pixel-encoding
/// scheme, used both for inputs (how source files are read) and outputs
/// (how the working buffer is written).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodingDef {
    pub channels: Vec<ChannelDescriptor>,
}

impl EncodingDef {
    pub fn new(channels: Vec<ChannelDescriptor>) -> Self {
        Self { channels }
    }

    /// True when the encoding declares no channels at all.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// All descriptors for the given semantic channel, in declaration order.
    pub fn candidates(&self, channel: ChannelId) -> impl Iterator<Item = &ChannelDescriptor> {
        self.channels.iter().filter(move |d| d.channel == channel)
    }

    /// Best descriptor for the given semantic channel: highest priority,
    /// first declared on ties.
    pub fn find(&self, channel: ChannelId) -> Option<&ChannelDescriptor> {
        let mut best: Option<&ChannelDescriptor> = None;
        for desc in self.candidates(channel) {
            match best {
                Some(b) if desc.priority <= b.priority => {}
                _ => best = Some(desc),
            }
        }
        best
    }

    /// All descriptors stored in the given texture tag, in declaration order.
    pub fn for_texture(&self, tag: TextureTag) -> Vec<&ChannelDescriptor> {
        self.channels.iter().filter(|d| d.texture == tag).collect()
    }

    /// Distinct texture tags referenced by this encoding, in first-use order.
    pub fn textures(&self) -> Vec<TextureTag> {
        let mut tags = Vec::new();
        for desc in &self.channels {
            if !tags.contains(&desc.texture) {
                tags.push(desc.texture);
            }
        }
        tags
    }

    /// Raw encoding: every property in its own grayscale (or RGBA for
    /// color) file, unit ranges, no curves.
    pub fn raw() -> Self {
        use ChannelId::*;
        use PixelChannel::*;
        Self::new(vec![
            ChannelDescriptor::for_channel(AlbedoRed, Red),
            ChannelDescriptor::for_channel(AlbedoGreen, Green),
            ChannelDescriptor::for_channel(AlbedoBlue, Blue),
            ChannelDescriptor::for_channel(AlbedoAlpha, Alpha),
            ChannelDescriptor::for_channel(Height, Red),
            ChannelDescriptor::for_channel(Occlusion, Red).inverted(),
            ChannelDescriptor::for_channel(NormalX, Red).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(NormalY, Green).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(NormalZ, Blue).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(Specular, Red),
            ChannelDescriptor::for_channel(Smooth, Red),
            ChannelDescriptor::for_channel(Rough, Red),
            ChannelDescriptor::for_channel(Metal, Red),
            ChannelDescriptor::for_channel(F0, Red),
            ChannelDescriptor::for_channel(Porosity, Red),
            ChannelDescriptor::for_channel(Emissive, Red),
        ])
    }

    /// Conventional PBR set: RGBA albedo, packed RGB normal, one grayscale
    /// file each for height, occlusion, roughness, metalness, emissive.
    pub fn default_pbr() -> Self {
        use ChannelId::*;
        use PixelChannel::*;
        Self::new(vec![
            ChannelDescriptor::for_channel(AlbedoRed, Red),
            ChannelDescriptor::for_channel(AlbedoGreen, Green),
            ChannelDescriptor::for_channel(AlbedoBlue, Blue),
            ChannelDescriptor::for_channel(AlbedoAlpha, Alpha),
            ChannelDescriptor::for_channel(Height, Red),
            ChannelDescriptor::for_channel(Occlusion, Red).inverted(),
            ChannelDescriptor::for_channel(NormalX, Red).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(NormalY, Green).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(NormalZ, Blue).with_values(-1.0, 1.0),
            ChannelDescriptor::for_channel(Rough, Red),
            ChannelDescriptor::for_channel(Metal, Red),
            ChannelDescriptor::for_channel(Emissive, Red),
        ])
    }

    /// LabPBR 1.3-style packed layout: normal X/Y plus occlusion and
    /// height packed into the normal file, perceptual smoothness, F0,
    /// 0–0.25 porosity band and 254-capped emissive packed into the
    /// specular file.
    pub fn labpbr_13() -> Self {
        use ChannelId::*;
        use PixelChannel::*;
        Self::new(vec![
            ChannelDescriptor::for_channel(AlbedoRed, Red),
            ChannelDescriptor::for_channel(AlbedoGreen, Green),
            ChannelDescriptor::for_channel(AlbedoBlue, Blue),
            ChannelDescriptor::for_channel(AlbedoAlpha, Alpha),
            ChannelDescriptor::new(NormalX, TextureTag::Normal, Red).with_values(-1.0, 1.0),
            ChannelDescriptor::new(NormalY, TextureTag::Normal, Green).with_values(-1.0, 1.0),
            ChannelDescriptor::new(Occlusion, TextureTag::Normal, Blue).inverted(),
            ChannelDescriptor::new(Height, TextureTag::Normal, Alpha),
            ChannelDescriptor::new(Smooth, TextureTag::Specular, Red).with_power(2.0),
            ChannelDescriptor::new(F0, TextureTag::Specular, Green).with_range(0, 229),
            ChannelDescriptor::new(Porosity, TextureTag::Specular, Blue)
                .with_range(0, 64)
                .with_values(0.0, 0.25),
            ChannelDescriptor::new(Emissive, TextureTag::Specular, Alpha).with_range(0, 254),
        ])
    }
}
