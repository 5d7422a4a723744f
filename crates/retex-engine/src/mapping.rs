//! Channel mapping resolution: deciding, for every output channel of the
//! target encoding, where its value comes from.
//!
//! Resolution never fails for a channel; an output that resolves to
//! nothing is simply omitted from composition and keeps the buffer's
//! background value. Only a corrupt source file (metadata decode) aborts.

use std::path::PathBuf;
use std::sync::Arc;

use retex_spec::{
    ChannelDescriptor, ChannelId, EncodingDef, MaterialProperties, PixelChannel,
};

use crate::buffer::{GrayscaleBuffer, TextureBuffer};
use crate::error::BuildError;
use crate::filter::FilterKind;
use crate::source::{InputReader, SourceCache};

/// Procedurally generated buffers a mapping can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedTag {
    /// The derived or recomposed tangent-space normal buffer.
    Normal,
    /// The auxiliary normal-magnitude scalar buffer.
    Magnitude,
    /// The ray-marched occlusion buffer.
    Occlusion,
}

/// Generated buffers shared across one material session. Prepared by the
/// graph facade before mappings bind to them; a missing buffer leaves
/// its channels unresolved.
#[derive(Clone, Default)]
pub struct GeneratedBuffers {
    pub normal: Option<Arc<TextureBuffer>>,
    pub magnitude: Option<Arc<GrayscaleBuffer>>,
    pub occlusion: Option<Arc<GrayscaleBuffer>>,
    /// Frame count of the sources the buffers were generated from.
    pub frame_count: u32,
}

impl GeneratedBuffers {
    pub fn frames(&self) -> u32 {
        self.frame_count.max(1)
    }

    fn has(&self, tag: GeneratedTag) -> bool {
        match tag {
            GeneratedTag::Normal => self.normal.is_some(),
            GeneratedTag::Magnitude => self.magnitude.is_some(),
            GeneratedTag::Occlusion => self.occlusion.is_some(),
        }
    }
}

/// Where a resolved output channel reads from.
#[derive(Debug, Clone)]
pub enum MappingSource {
    /// A pixel channel of a named source file.
    File {
        path: PathBuf,
        input: ChannelDescriptor,
    },
    /// A procedurally generated buffer.
    Generated(GeneratedTag),
    /// A literal physical value.
    Value(f32),
}

/// One resolved output channel.
#[derive(Debug, Clone)]
pub struct ChannelMapping {
    pub output: ChannelDescriptor,
    pub source: MappingSource,
    /// Multiply this channel by the occlusion buffer after painting.
    pub apply_occlusion: bool,
    pub sampler: FilterKind,
    /// Material-level value-space `(shift, scale)` for this channel.
    pub intensity: (f32, f32),
}

impl ChannelMapping {
    /// True when the mapping carries a literal value.
    pub fn literal_value(&self) -> Option<f32> {
        match &self.source {
            MappingSource::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Output of one resolution pass.
pub struct ResolvedMappings {
    pub mappings: Vec<ChannelMapping>,
    /// Maximum frame count across all resolved sources; the working
    /// buffer's animation depth.
    pub frame_count: u32,
}

/// Resolve every output channel of `output` against the material, the
/// input encoding, the reader's files, and the generated buffers.
pub fn resolve_mappings(
    input: &EncodingDef,
    output: &EncodingDef,
    material: &MaterialProperties,
    reader: &dyn InputReader,
    cache: &mut SourceCache,
    generated: &GeneratedBuffers,
    create_empty: bool,
) -> Result<ResolvedMappings, BuildError> {
    let mut mappings = Vec::new();
    let mut frame_count = 1u32;

    for out in &output.channels {
        // Magnitude-selector outputs are written by the generators.
        if out.color == PixelChannel::Magnitude || out.color == PixelChannel::None {
            continue;
        }

        let Some((source, apply_occlusion)) =
            resolve_source(out, input, material, reader, generated, create_empty)
        else {
            continue;
        };

        match &source {
            MappingSource::File { path, .. } => {
                let meta = cache.metadata(reader, path)?;
                frame_count = frame_count.max(meta.frame_count);
            }
            MappingSource::Generated(_) => {
                frame_count = frame_count.max(generated.frames());
            }
            MappingSource::Value(_) => {}
        }

        let sampler = out
            .sampler
            .or(match &source {
                MappingSource::File { input, .. } => input.sampler,
                _ => None,
            })
            .map(FilterKind::from)
            .unwrap_or_default();

        mappings.push(ChannelMapping {
            output: out.clone(),
            source,
            apply_occlusion,
            sampler,
            intensity: material.intensity(out.channel),
        });
    }

    Ok(ResolvedMappings {
        mappings,
        frame_count,
    })
}

/// Resolve one output channel. Returns the source and the
/// apply-occlusion flag, or `None` when the channel stays unmapped.
fn resolve_source(
    out: &ChannelDescriptor,
    input: &EncodingDef,
    material: &MaterialProperties,
    reader: &dyn InputReader,
    generated: &GeneratedBuffers,
    create_empty: bool,
) -> Option<(MappingSource, bool)> {
    // 1. Literal declared directly on the material.
    if let Some(value) = material.value(out.channel) {
        return Some((MappingSource::Value(value), false));
    }

    // 2. Generated vector buffers, once the normal generator has run.
    if out.channel.is_normal_component() && generated.has(GeneratedTag::Normal) {
        return Some((MappingSource::Generated(GeneratedTag::Normal), false));
    }
    if out.channel == ChannelId::NormalMagnitude && generated.has(GeneratedTag::Magnitude) {
        return Some((MappingSource::Generated(GeneratedTag::Magnitude), false));
    }

    // 3. A real file on the configured search path.
    if let Some(binding) = file_binding(out.channel, input, reader, false) {
        return Some((binding, false));
    }

    if create_empty {
        // 4. Procedural occlusion.
        if out.channel == ChannelId::Occlusion && generated.has(GeneratedTag::Occlusion) {
            return Some((MappingSource::Generated(GeneratedTag::Occlusion), false));
        }

        // 5. Cross-channel fallbacks.
        if let Some(source) = diffuse_fallback(out.channel, input, material, reader) {
            return Some((source, true));
        }
        if let Some(source) = inverse_fallback(out.channel, input, material, reader) {
            return Some((source, false));
        }
    }

    // 6. Type-specific default literal.
    out.default_value
        .or_else(|| out.channel.default_value())
        .map(|v| (MappingSource::Value(v), false))
}

/// Bind a semantic channel to its input descriptor: the descriptor's own
/// literal if it carries one, else the first enumerated file for its
/// texture tag. `invert` flips the descriptor's polarity for the
/// smooth/rough substitution.
fn file_binding(
    channel: ChannelId,
    input: &EncodingDef,
    reader: &dyn InputReader,
    invert: bool,
) -> Option<MappingSource> {
    let desc = input.find(channel)?;
    let mut desc = desc.clone();
    if invert {
        desc.invert = !desc.invert;
    }
    if let Some(value) = desc.value {
        let value = if invert {
            desc.max_value + desc.min_value - value
        } else {
            value
        };
        return Some(MappingSource::Value(value));
    }
    if !desc.color.is_color() {
        return None;
    }
    let path = reader.enumerate(desc.texture).into_iter().next()?;
    Some(MappingSource::File { path, input: desc })
}

/// Diffuse channels fall back to albedo with occlusion applied on write.
fn diffuse_fallback(
    channel: ChannelId,
    input: &EncodingDef,
    material: &MaterialProperties,
    reader: &dyn InputReader,
) -> Option<MappingSource> {
    let albedo = match channel {
        ChannelId::DiffuseRed => ChannelId::AlbedoRed,
        ChannelId::DiffuseGreen => ChannelId::AlbedoGreen,
        ChannelId::DiffuseBlue => ChannelId::AlbedoBlue,
        _ => return None,
    };
    if let Some(value) = material.value(albedo) {
        return Some(MappingSource::Value(value));
    }
    file_binding(albedo, input, reader, false)
}

/// Smoothness and roughness substitute for one another, inverted.
fn inverse_fallback(
    channel: ChannelId,
    input: &EncodingDef,
    material: &MaterialProperties,
    reader: &dyn InputReader,
) -> Option<MappingSource> {
    let counterpart = match channel {
        ChannelId::Smooth => ChannelId::Rough,
        ChannelId::Rough => ChannelId::Smooth,
        _ => return None,
    };
    if let Some(value) = material.value(counterpart) {
        // Literal counterparts invert within the unit domain.
        return Some(MappingSource::Value(1.0 - value));
    }
    file_binding(counterpart, input, reader, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retex_spec::TextureTag;

    use crate::color::Color;
    use crate::source::MemoryReader;

    fn reader_with(tags: &[TextureTag]) -> MemoryReader {
        let mut reader = MemoryReader::new();
        for &tag in tags {
            let buffer = TextureBuffer::new(8, 8, Color::gray(0.5));
            reader.insert_buffer(tag, &buffer).unwrap();
        }
        reader
    }

    fn resolve(
        input: &EncodingDef,
        output: &EncodingDef,
        material: &MaterialProperties,
        reader: &MemoryReader,
        generated: &GeneratedBuffers,
        create_empty: bool,
    ) -> ResolvedMappings {
        let mut cache = SourceCache::new(false);
        resolve_mappings(
            input,
            output,
            material,
            reader,
            &mut cache,
            generated,
            create_empty,
        )
        .unwrap()
    }

    #[test]
    fn material_literal_binds_as_constant() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Rough, 0.4);
        let reader = reader_with(&[TextureTag::Rough]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert_eq!(resolved.mappings.len(), 1);
        assert_eq!(resolved.mappings[0].literal_value(), Some(0.4));
    }

    #[test]
    fn file_binding_wins_over_defaults() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Height,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[TextureTag::Height]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert!(matches!(
            resolved.mappings[0].source,
            MappingSource::File { .. }
        ));
    }

    #[test]
    fn unmapped_channel_is_omitted() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Metal,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert!(resolved.mappings.is_empty());
    }

    #[test]
    fn diffuse_falls_back_to_albedo_with_occlusion_flag() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![
            ChannelDescriptor::for_channel(ChannelId::DiffuseRed, PixelChannel::Red),
            ChannelDescriptor::for_channel(ChannelId::DiffuseGreen, PixelChannel::Green),
        ]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[TextureTag::Albedo]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            true,
        );
        assert_eq!(resolved.mappings.len(), 2);
        for mapping in &resolved.mappings {
            assert!(mapping.apply_occlusion);
            match &mapping.source {
                MappingSource::File { input, .. } => {
                    assert_eq!(input.texture, TextureTag::Albedo);
                }
                other => panic!("expected file source, got {:?}", other),
            }
        }
    }

    #[test]
    fn smooth_falls_back_to_inverted_rough_file() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Smooth,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[TextureTag::Rough]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            true,
        );
        match &resolved.mappings[0].source {
            MappingSource::File { input, .. } => {
                assert_eq!(input.channel, ChannelId::Rough);
                assert!(input.invert, "polarity must flip");
            }
            other => panic!("expected file source, got {:?}", other),
        }
        assert!(!resolved.mappings[0].apply_occlusion);
    }

    #[test]
    fn rough_falls_back_to_inverted_smooth_literal() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Smooth, 0.8);
        let reader = reader_with(&[]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            true,
        );
        let v = resolved.mappings[0].literal_value().unwrap();
        assert!((v - 0.2).abs() < 1e-6);
    }

    #[test]
    fn fallbacks_require_create_empty() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::DiffuseRed,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[TextureTag::Albedo]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert!(resolved.mappings.is_empty());
    }

    #[test]
    fn normal_z_gets_its_default_literal() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::NormalZ,
            PixelChannel::Blue,
        )
        .with_values(-1.0, 1.0)]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert_eq!(resolved.mappings[0].literal_value(), Some(1.0));
    }

    #[test]
    fn generated_normal_binds_when_prepared() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::NormalX,
            PixelChannel::Red,
        )
        .with_values(-1.0, 1.0)]);
        let material = MaterialProperties::new("m");
        let reader = reader_with(&[]);

        let generated = GeneratedBuffers {
            normal: Some(Arc::new(TextureBuffer::new(4, 4, Color::rgb(0.5, 0.5, 1.0)))),
            magnitude: None,
            occlusion: None,
            frame_count: 1,
        };
        let resolved = resolve(&input, &output, &material, &reader, &generated, false);
        assert!(matches!(
            resolved.mappings[0].source,
            MappingSource::Generated(GeneratedTag::Normal)
        ));
    }

    #[test]
    fn magnitude_selector_outputs_are_skipped() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::NormalMagnitude,
            PixelChannel::Magnitude,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::NormalMagnitude, 1.0);
        let reader = reader_with(&[]);

        let resolved = resolve(
            &input,
            &output,
            &material,
            &reader,
            &GeneratedBuffers::default(),
            false,
        );
        assert!(resolved.mappings.is_empty());
    }

    #[test]
    fn frame_count_tracks_the_deepest_source() {
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![
            ChannelDescriptor::for_channel(ChannelId::AlbedoRed, PixelChannel::Red),
            ChannelDescriptor::for_channel(ChannelId::Height, PixelChannel::Red),
        ]);
        let material = MaterialProperties::new("m");

        let mut reader = MemoryReader::new();
        reader
            .insert_buffer(
                TextureTag::Albedo,
                &TextureBuffer::new(8, 32, Color::gray(0.2)),
            )
            .unwrap();
        reader
            .insert_buffer(
                TextureTag::Height,
                &TextureBuffer::new(8, 8, Color::gray(0.2)),
            )
            .unwrap();

        let mut cache = SourceCache::new(true);
        let resolved = resolve_mappings(
            &input,
            &output,
            &material,
            &reader,
            &mut cache,
            &GeneratedBuffers::default(),
            false,
        )
        .unwrap();
        assert_eq!(resolved.frame_count, 4);
    }
}
