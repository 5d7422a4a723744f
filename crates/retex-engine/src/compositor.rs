//! The texture builder: drives mapping resolution, region enumeration,
//! and the value-space codec to composite one working buffer for one
//! material tag.

use std::collections::BTreeMap;
use std::path::PathBuf;

use retex_spec::{
    ChannelId, EncodingDef, MaterialGeometry, MaterialProperties, PixelChannel,
};

use crate::buffer::{GrayscaleBuffer, TextureBuffer};
use crate::cancel::CancelToken;
use crate::codec::ChannelCodec;
use crate::color::Color;
use crate::error::BuildError;
use crate::filter::FilterKind;
use crate::mapping::{
    resolve_mappings, ChannelMapping, GeneratedBuffers, GeneratedTag, MappingSource,
    ResolvedMappings,
};
use crate::regions::{RegionEnumerator, RenderRegion};
use crate::source::{InputReader, SourceCache};

/// Buffer size used for create-empty builds when nothing else determines
/// one.
const DEFAULT_EMPTY_SIZE: u32 = 16;

/// Immutable per-build configuration. The builder holds all mutable
/// state itself; the context is shared freely between builders of one
/// material.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub reader: &'a dyn InputReader,
    pub input: &'a EncodingDef,
    pub output: &'a EncodingDef,
    pub material: &'a MaterialProperties,
    pub geometry: &'a MaterialGeometry,
}

/// Composites one working buffer. Owns the buffer exclusively for the
/// duration of one `build` call; never reused across materials.
pub struct TextureBuilder<'a> {
    ctx: BuildContext<'a>,
    cancel: CancelToken,
    target_frame: Option<u32>,
    target_part: Option<usize>,
    resolved: Option<ResolvedMappings>,
}

impl<'a> TextureBuilder<'a> {
    pub fn new(ctx: BuildContext<'a>) -> Self {
        Self {
            ctx,
            cancel: CancelToken::new(),
            target_frame: None,
            target_part: None,
            resolved: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Restrict the build to a single frame.
    pub fn with_target_frame(mut self, frame: Option<u32>) -> Self {
        self.target_frame = frame;
        self
    }

    /// Restrict the build to a single tile/part.
    pub fn with_target_part(mut self, part: Option<usize>) -> Self {
        self.target_part = part;
        self
    }

    /// Resolve channel bindings. Discards any previous resolution.
    pub fn map(
        &mut self,
        cache: &mut SourceCache,
        generated: &GeneratedBuffers,
        create_empty: bool,
    ) -> Result<(), BuildError> {
        self.resolved = Some(resolve_mappings(
            self.ctx.input,
            self.ctx.output,
            self.ctx.material,
            self.ctx.reader,
            cache,
            generated,
            create_empty,
        )?);
        Ok(())
    }

    /// Animation depth resolved by the last `map` call.
    pub fn frame_count(&self) -> u32 {
        self.resolved.as_ref().map(|r| r.frame_count).unwrap_or(1)
    }

    /// Resolved mappings, empty before `map`.
    pub fn mappings(&self) -> &[ChannelMapping] {
        self.resolved
            .as_ref()
            .map(|r| r.mappings.as_slice())
            .unwrap_or(&[])
    }

    /// Composite the working buffer. Returns `Ok(None)` when nothing
    /// resolves to an image ("no image to publish").
    pub fn build(
        &mut self,
        cache: &mut SourceCache,
        generated: &GeneratedBuffers,
        create_empty: bool,
        target_size: Option<(u32, u32)>,
    ) -> Result<Option<TextureBuffer>, BuildError> {
        if self.resolved.is_none() {
            self.map(cache, generated, create_empty)?;
        }
        self.cancel.check()?;

        let frame_count = self.frame_count();
        let Some((width, frame_height)) =
            self.frame_size(cache, generated, create_empty, target_size)?
        else {
            return Ok(None);
        };

        let dest_frames = if self.target_frame.is_some() {
            1
        } else {
            frame_count
        };
        let height = frame_height * dest_frames.max(1);

        let mappings: Vec<ChannelMapping> =
            self.resolved.as_ref().map(|r| r.mappings.clone()).unwrap_or_default();
        if mappings.is_empty() {
            return Ok(None);
        }

        // Literal-valued channels bake into the clear color instead of
        // being rasterized per pixel.
        let collapse = mappings
            .iter()
            .all(|m| m.output.color == PixelChannel::Red);
        let mut background = Color::rgba(0.0, 0.0, 0.0, 1.0);
        for mapping in &mappings {
            if let Some(value) = mapping.literal_value() {
                let codec = ChannelCodec::new(&mapping.output);
                let byte = codec.encode(value);
                background.set_channel(mapping.output.color, byte as f32 / 255.0);
            }
        }
        if collapse {
            background.g = background.r;
            background.b = background.r;
        }

        let mut buffer = TextureBuffer::new(width, height, background);

        self.paint_files(cache, &mappings, frame_count, &mut buffer, collapse)?;
        self.paint_generated(generated, &mappings, frame_count, &mut buffer, collapse)?;
        self.apply_occlusion(generated, &mappings, &mut buffer)?;

        Ok(Some(buffer))
    }

    /// Determine the single-frame buffer size, by precedence: explicit
    /// request, multi-part bounds, configured size with first available
    /// aspect, largest source bounds with scale, generated buffers,
    /// create-empty default.
    fn frame_size(
        &self,
        cache: &mut SourceCache,
        generated: &GeneratedBuffers,
        create_empty: bool,
        target_size: Option<(u32, u32)>,
    ) -> Result<Option<(u32, u32)>, BuildError> {
        if let Some((w, h)) = target_size {
            return Ok(Some((w.max(1), h.max(1))));
        }

        let geometry = self.ctx.geometry;
        if let Some(part) = self.target_part {
            if let Some(rect) = geometry.parts.get(part) {
                if !rect.is_empty() {
                    return Ok(Some((rect.width, rect.height)));
                }
            }
            return Ok(None);
        }
        if let Some(bounds) = geometry.part_bounds() {
            return Ok(Some((bounds.width, bounds.height)));
        }

        let source_frames = self.source_frame_sizes(cache)?;
        let generated_frame = generated
            .normal
            .as_ref()
            .map(|n| (n.width, (n.height / generated.frames()).max(1)))
            .or_else(|| {
                generated
                    .occlusion
                    .as_ref()
                    .map(|o| (o.width, (o.height / generated.frames()).max(1)))
            });

        if let Some(size) = self.ctx.material.texture_size {
            let aspect = source_frames
                .first()
                .copied()
                .or(generated_frame)
                .map(|(w, h)| h as f32 / w as f32)
                .unwrap_or(1.0);
            let width = size.max(1);
            let height = ((width as f32 * aspect).round() as u32).max(1);
            return Ok(Some((width, height)));
        }

        if let Some(&(w, h)) = source_frames
            .iter()
            .max_by_key(|(w, h)| (*w as u64) * (*h as u64))
        {
            let scale = self.ctx.material.texture_scale;
            let width = ((w as f32 * scale).round() as u32).max(1);
            let height = ((h as f32 * scale).round() as u32).max(1);
            return Ok(Some((width, height)));
        }

        if let Some(frame) = generated_frame {
            return Ok(Some(frame));
        }

        if create_empty {
            return Ok(Some((DEFAULT_EMPTY_SIZE, DEFAULT_EMPTY_SIZE)));
        }
        Ok(None)
    }

    /// Single-frame dimensions of every resolved file source, in mapping
    /// order.
    fn source_frame_sizes(&self, cache: &mut SourceCache) -> Result<Vec<(u32, u32)>, BuildError> {
        let mut sizes = Vec::new();
        let mut seen: Vec<&PathBuf> = Vec::new();
        for mapping in self.mappings() {
            if let MappingSource::File { path, .. } = &mapping.source {
                if seen.contains(&path) {
                    continue;
                }
                seen.push(path);
                let meta = cache.metadata(self.ctx.reader, path)?;
                sizes.push((meta.width, meta.frame_height()));
            }
        }
        Ok(sizes)
    }

    /// Paint every file-bound mapping, decoding each source exactly once.
    fn paint_files(
        &self,
        cache: &mut SourceCache,
        mappings: &[ChannelMapping],
        frame_count: u32,
        buffer: &mut TextureBuffer,
        collapse: bool,
    ) -> Result<(), BuildError> {
        let mut by_file: BTreeMap<PathBuf, Vec<&ChannelMapping>> = BTreeMap::new();
        for mapping in mappings {
            if let MappingSource::File { path, .. } = &mapping.source {
                by_file.entry(path.clone()).or_default().push(mapping);
            }
        }

        for (path, group) in by_file {
            self.cancel.check()?;
            let source_frames = cache.metadata(self.ctx.reader, &path)?.frame_count;
            let image = cache.image(self.ctx.reader, &path)?;

            let enumerator = self.enumerator(source_frames, frame_count);
            for mapping in group {
                let MappingSource::File { input, .. } = &mapping.source else {
                    continue;
                };
                let (shift, scale) = mapping.intensity;
                let in_codec = ChannelCodec::new(input).with_intensity(shift, scale);
                let out_codec = ChannelCodec::new(&mapping.output);

                for frame in enumerator.dest_frames() {
                    for tile in 0..enumerator.tile_count() {
                        let region = enumerator.render_region(frame, tile);
                        if region.is_empty() {
                            continue;
                        }
                        overlay_channel(
                            buffer,
                            &image,
                            &region,
                            mapping.sampler,
                            input.color,
                            &in_codec,
                            mapping.output.color,
                            &out_codec,
                            collapse,
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Paint mappings bound to generated buffers.
    fn paint_generated(
        &self,
        generated: &GeneratedBuffers,
        mappings: &[ChannelMapping],
        frame_count: u32,
        buffer: &mut TextureBuffer,
        collapse: bool,
    ) -> Result<(), BuildError> {
        let enumerator = self.enumerator(generated.frames(), frame_count);

        for mapping in mappings {
            let MappingSource::Generated(tag) = &mapping.source else {
                continue;
            };
            self.cancel.check()?;
            let out_codec = ChannelCodec::new(&mapping.output);

            for frame in enumerator.dest_frames() {
                for tile in 0..enumerator.tile_count() {
                    let region = enumerator.render_region(frame, tile);
                    if region.is_empty() {
                        continue;
                    }
                    match tag {
                        GeneratedTag::Normal => {
                            let Some(normal) = generated.normal.as_deref() else {
                                continue;
                            };
                            let component = match mapping.output.channel {
                                ChannelId::NormalX => PixelChannel::Red,
                                ChannelId::NormalY => PixelChannel::Green,
                                _ => PixelChannel::Blue,
                            };
                            overlay_vector_component(
                                buffer,
                                normal,
                                &region,
                                mapping.sampler,
                                component,
                                mapping.output.color,
                                &out_codec,
                                collapse,
                            );
                        }
                        GeneratedTag::Magnitude => {
                            let Some(gray) = generated.magnitude.as_deref() else {
                                continue;
                            };
                            overlay_scalar(
                                buffer,
                                gray,
                                &region,
                                mapping.output.color,
                                &out_codec,
                                false,
                                collapse,
                            );
                        }
                        GeneratedTag::Occlusion => {
                            let Some(gray) = generated.occlusion.as_deref() else {
                                continue;
                            };
                            // The buffer stores the lit amount; the
                            // channel's physical value is the occlusion
                            // amount.
                            overlay_scalar(
                                buffer,
                                gray,
                                &region,
                                mapping.output.color,
                                &out_codec,
                                true,
                                collapse,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Second pass: multiply flagged channels by the occlusion buffer,
    /// optionally sparing emissive pixels.
    fn apply_occlusion(
        &self,
        generated: &GeneratedBuffers,
        mappings: &[ChannelMapping],
        buffer: &mut TextureBuffer,
    ) -> Result<(), BuildError> {
        let Some(occlusion) = generated.occlusion.as_deref() else {
            return Ok(());
        };
        if !mappings.iter().any(|m| m.apply_occlusion) {
            return Ok(());
        }
        self.cancel.check()?;

        let settings = &self.ctx.material.occlusion;
        let strength = settings.strength.clamp(0.0, 1.0);

        // Emissive exemption reads the already-painted emissive channel.
        let emissive = if settings.exclude_emissive {
            mappings
                .iter()
                .find(|m| m.output.channel == ChannelId::Emissive)
                .map(|m| {
                    let mut desc = m.output.clone();
                    desc.value = None;
                    (desc.color, ChannelCodec::new(&desc))
                })
        } else {
            None
        };

        for mapping in mappings.iter().filter(|m| m.apply_occlusion) {
            let mut desc = mapping.output.clone();
            desc.value = None;
            let codec = ChannelCodec::new(&desc);

            for y in 0..buffer.height {
                for x in 0..buffer.width {
                    let raw = buffer.channel_byte(x, y, desc.color);
                    let Some(value) = codec.decode(raw) else {
                        continue;
                    };

                    let fx =
                        (x as f32 + 0.5) / buffer.width as f32 * occlusion.width as f32 - 0.5;
                    let fy =
                        (y as f32 + 0.5) / buffer.height as f32 * occlusion.height as f32 - 0.5;
                    let lit = occlusion.sample_wrapped(fx, fy).clamp(0.0, 1.0);
                    let mut factor = 1.0 - strength * (1.0 - lit);

                    if let Some((channel, codec)) = &emissive {
                        let glow = codec
                            .decode(buffer.channel_byte(x, y, *channel))
                            .unwrap_or(0.0)
                            .clamp(0.0, 1.0);
                        factor += (1.0 - factor) * glow;
                    }

                    buffer.set_channel_byte(x, y, desc.color, codec.encode(value * factor));
                }
            }
        }
        Ok(())
    }

    fn enumerator(&self, source_frames: u32, dest_frames: u32) -> RegionEnumerator<'a> {
        RegionEnumerator::new(self.ctx.geometry, source_frames, dest_frames)
            .with_target_frame(self.target_frame)
            .with_target_part(self.target_part)
    }
}

/// Copy one sampled, codec-transformed channel into the destination
/// rectangle. Pixels whose raw byte falls outside the input range are
/// skipped, leaving the background value.
#[allow(clippy::too_many_arguments)]
fn overlay_channel(
    buffer: &mut TextureBuffer,
    image: &TextureBuffer,
    region: &RenderRegion,
    sampler: FilterKind,
    in_color: PixelChannel,
    in_codec: &ChannelCodec,
    out_color: PixelChannel,
    out_codec: &ChannelCodec,
    collapse: bool,
) {
    let rect = region.dest.to_pixels(buffer.width, buffer.height);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let u = region.source.left
                + region.source.width() * ((dx as f32 + 0.5) / rect.width as f32);
            let v = region.source.top
                + region.source.height() * ((dy as f32 + 0.5) / rect.height as f32);
            let sampled = sampler.sample(image, u, v);
            let raw = (sampled.channel(in_color).clamp(0.0, 1.0) * 255.0).round() as u8;
            let Some(value) = in_codec.decode(raw) else {
                continue;
            };
            write_channel_byte(
                buffer,
                rect.x + dx,
                rect.y + dy,
                out_color,
                out_codec.encode(value),
                collapse,
            );
        }
    }
}

/// Overlay one component of the generated normal buffer (stored encoded
/// in 0..1, decoded to a signed vector component before re-encoding).
#[allow(clippy::too_many_arguments)]
fn overlay_vector_component(
    buffer: &mut TextureBuffer,
    normal: &TextureBuffer,
    region: &RenderRegion,
    sampler: FilterKind,
    component: PixelChannel,
    out_color: PixelChannel,
    out_codec: &ChannelCodec,
    collapse: bool,
) {
    let rect = region.dest.to_pixels(buffer.width, buffer.height);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let u = region.source.left
                + region.source.width() * ((dx as f32 + 0.5) / rect.width as f32);
            let v = region.source.top
                + region.source.height() * ((dy as f32 + 0.5) / rect.height as f32);
            let sampled = sampler.sample(normal, u, v);
            let value = sampled.channel(component) * 2.0 - 1.0;
            write_channel_byte(
                buffer,
                rect.x + dx,
                rect.y + dy,
                out_color,
                out_codec.encode(value),
                collapse,
            );
        }
    }
}

/// Overlay a scalar generated buffer (magnitude, occlusion).
/// `complement` encodes `1 - sample` instead of the sample.
fn overlay_scalar(
    buffer: &mut TextureBuffer,
    gray: &GrayscaleBuffer,
    region: &RenderRegion,
    out_color: PixelChannel,
    out_codec: &ChannelCodec,
    complement: bool,
    collapse: bool,
) {
    let rect = region.dest.to_pixels(buffer.width, buffer.height);
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    for dy in 0..rect.height {
        for dx in 0..rect.width {
            let u = region.source.left
                + region.source.width() * ((dx as f32 + 0.5) / rect.width as f32);
            let v = region.source.top
                + region.source.height() * ((dy as f32 + 0.5) / rect.height as f32);
            let fx = u * gray.width as f32 - 0.5;
            let fy = v * gray.height as f32 - 0.5;
            let mut value = gray.sample_wrapped(fx, fy).clamp(0.0, 1.0);
            if complement {
                value = 1.0 - value;
            }
            write_channel_byte(
                buffer,
                rect.x + dx,
                rect.y + dy,
                out_color,
                out_codec.encode(value),
                collapse,
            );
        }
    }
}

#[inline]
fn write_channel_byte(
    buffer: &mut TextureBuffer,
    x: u32,
    y: u32,
    color: PixelChannel,
    byte: u8,
    collapse: bool,
) {
    buffer.set_channel_byte(x, y, color, byte);
    if collapse && color == PixelChannel::Red {
        buffer.set_channel_byte(x, y, PixelChannel::Green, byte);
        buffer.set_channel_byte(x, y, PixelChannel::Blue, byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retex_spec::{ChannelDescriptor, EncodingDef, MaterialGeometry, MaterialProperties};

    use crate::source::MemoryReader;

    fn build_simple(
        reader: &MemoryReader,
        input: &EncodingDef,
        output: &EncodingDef,
        material: &MaterialProperties,
        geometry: &MaterialGeometry,
        create_empty: bool,
    ) -> Option<TextureBuffer> {
        let ctx = BuildContext {
            reader,
            input,
            output,
            material,
            geometry,
        };
        let mut cache = SourceCache::new(geometry.animated);
        let mut builder = TextureBuilder::new(ctx);
        builder
            .build(&mut cache, &GeneratedBuffers::default(), create_empty, None)
            .unwrap()
    }

    #[test]
    fn no_resolvable_channels_yields_no_image() {
        let reader = MemoryReader::new();
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Metal,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m");
        let geometry = MaterialGeometry::plain();
        assert!(build_simple(&reader, &input, &output, &material, &geometry, false).is_none());
    }

    #[test]
    fn literal_only_build_uses_default_empty_size() {
        let reader = MemoryReader::new();
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Rough, 1.0);
        let geometry = MaterialGeometry::plain();
        let image =
            build_simple(&reader, &input, &output, &material, &geometry, true).unwrap();
        assert_eq!(image.width, DEFAULT_EMPTY_SIZE);
        assert_eq!(image.height, DEFAULT_EMPTY_SIZE);
        assert_eq!(image.channel_byte(3, 3, PixelChannel::Red), 255);
    }

    #[test]
    fn grayscale_collapse_broadcasts_red() {
        let reader = MemoryReader::new();
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Rough, 0.5);
        let geometry = MaterialGeometry::plain();
        let image =
            build_simple(&reader, &input, &output, &material, &geometry, true).unwrap();
        let pixel = image.get(0, 0);
        assert_eq!(pixel.r, pixel.g);
        assert_eq!(pixel.r, pixel.b);
    }

    #[test]
    fn cancelled_token_aborts_the_build() {
        let reader = MemoryReader::new();
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Rough, 0.5);
        let geometry = MaterialGeometry::plain();
        let ctx = BuildContext {
            reader: &reader,
            input: &input,
            output: &output,
            material: &material,
            geometry: &geometry,
        };
        let token = CancelToken::new();
        token.cancel();
        let mut builder = TextureBuilder::new(ctx).with_cancel(token);
        let mut cache = SourceCache::new(false);
        let err = builder
            .build(&mut cache, &GeneratedBuffers::default(), true, None)
            .unwrap_err();
        assert!(matches!(err, BuildError::Cancelled));
    }

    #[test]
    fn explicit_target_size_wins() {
        let reader = MemoryReader::new();
        let input = EncodingDef::raw();
        let output = EncodingDef::new(vec![ChannelDescriptor::for_channel(
            ChannelId::Rough,
            PixelChannel::Red,
        )]);
        let material = MaterialProperties::new("m").with_value(ChannelId::Rough, 0.5);
        let geometry = MaterialGeometry::plain();
        let ctx = BuildContext {
            reader: &reader,
            input: &input,
            output: &output,
            material: &material,
            geometry: &geometry,
        };
        let mut cache = SourceCache::new(false);
        let mut builder = TextureBuilder::new(ctx);
        let image = builder
            .build(
                &mut cache,
                &GeneratedBuffers::default(),
                true,
                Some((32, 8)),
            )
            .unwrap()
            .unwrap();
        assert_eq!((image.width, image.height), (32, 8));
    }
}
