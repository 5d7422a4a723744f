//! Per-material facade: builds and caches one output buffer per texture
//! tag, sharing the source cache and generated normal/magnitude/
//! occlusion buffers across tags of one material session.

use std::collections::HashMap;
use std::sync::Arc;

use retex_spec::validation::{validate_encoding, validate_geometry};
use retex_spec::{
    ChannelDescriptor, ChannelId, EncodingDef, MaterialGeometry, MaterialProperties,
    PixelChannel, TextureTag,
};

use crate::buffer::{GrayscaleBuffer, TextureBuffer};
use crate::cancel::CancelToken;
use crate::codec::ChannelCodec;
use crate::compositor::{BuildContext, TextureBuilder};
use crate::error::BuildError;
use crate::mapping::GeneratedBuffers;
use crate::normal::{self, NormalGenerator};
use crate::occlusion::OcclusionGenerator;
use crate::source::{InputReader, SourceCache};

/// Height field shared by the normal and occlusion generators.
#[derive(Clone)]
struct HeightField {
    buffer: Arc<GrayscaleBuffer>,
    frame_count: u32,
    /// Working-buffer resolution over source resolution.
    resolution_scale: f32,
}

/// Builds every output tag of one material. Owns the per-session source
/// cache; not shared across materials or threads.
pub struct TextureGraph<'a> {
    reader: &'a dyn InputReader,
    input: &'a EncodingDef,
    output: &'a EncodingDef,
    material: &'a MaterialProperties,
    geometry: &'a MaterialGeometry,
    cancel: CancelToken,
    cache: SourceCache,
    generated: GeneratedBuffers,
    generated_ready: bool,
    height: Option<HeightField>,
    height_tried: bool,
    outputs: HashMap<TextureTag, Option<Arc<TextureBuffer>>>,
    frame_count: u32,
}

impl<'a> TextureGraph<'a> {
    /// Validate the configuration and open a material session.
    pub fn new(
        reader: &'a dyn InputReader,
        input: &'a EncodingDef,
        output: &'a EncodingDef,
        material: &'a MaterialProperties,
        geometry: &'a MaterialGeometry,
    ) -> Result<Self, BuildError> {
        validate_encoding(input)?;
        validate_encoding(output)?;
        validate_geometry(geometry)?;
        Ok(Self {
            reader,
            input,
            output,
            material,
            geometry,
            cancel: CancelToken::new(),
            cache: SourceCache::new(geometry.animated),
            generated: GeneratedBuffers::default(),
            generated_ready: false,
            height: None,
            height_tried: false,
            outputs: HashMap::new(),
            frame_count: 1,
        })
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Maximum animation depth seen across built tags.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Build (or fetch the cached) output buffer for one texture tag.
    /// `Ok(None)` means the material publishes no image for this tag.
    pub fn build_tag(
        &mut self,
        tag: TextureTag,
        create_empty: bool,
    ) -> Result<Option<Arc<TextureBuffer>>, BuildError> {
        if let Some(cached) = self.outputs.get(&tag) {
            return Ok(cached.clone());
        }
        self.prepare_generated(create_empty)?;

        let tag_output = self.tag_encoding(tag);
        if tag_output.is_empty() {
            self.outputs.insert(tag, None);
            return Ok(None);
        }

        let ctx = BuildContext {
            reader: self.reader,
            input: self.input,
            output: &tag_output,
            material: self.material,
            geometry: self.geometry,
        };
        let mut builder = TextureBuilder::new(ctx).with_cancel(self.cancel.clone());
        builder.map(&mut self.cache, &self.generated, create_empty)?;
        self.frame_count = self.frame_count.max(builder.frame_count());

        let image = builder
            .build(&mut self.cache, &self.generated, create_empty, None)?
            .map(Arc::new);
        self.outputs.insert(tag, image.clone());
        Ok(image)
    }

    /// Output channels stored in one texture tag. A second magnitude
    /// channel for the same tag is dropped, first wins.
    fn tag_encoding(&self, tag: TextureTag) -> EncodingDef {
        let mut channels = Vec::new();
        let mut seen_magnitude = false;
        for desc in &self.output.channels {
            if desc.texture != tag {
                continue;
            }
            if desc.color == PixelChannel::Magnitude {
                if seen_magnitude {
                    continue;
                }
                seen_magnitude = true;
            }
            channels.push(desc.clone());
        }
        EncodingDef::new(channels)
    }

    /// True when the input encoding backs the channel with an actual
    /// file on the search path.
    fn has_input_file(&self, channel: ChannelId) -> bool {
        self.input
            .find(channel)
            .filter(|d| d.color.is_color() && d.value.is_none())
            .map(|d| !self.reader.enumerate(d.texture).is_empty())
            .unwrap_or(false)
    }

    /// Prepare the generated buffers the output encoding will bind to.
    fn prepare_generated(&mut self, create_empty: bool) -> Result<(), BuildError> {
        if self.generated_ready {
            return Ok(());
        }

        let needs_normal = self.output.channels.iter().any(|d| {
            d.channel.is_normal_component() || d.channel == ChannelId::NormalMagnitude
        });
        if needs_normal {
            if self.has_input_file(ChannelId::NormalX) && self.has_input_file(ChannelId::NormalY)
            {
                self.compose_normal(create_empty)?;
            } else if self.material.normal.auto_generate {
                self.derive_normal()?;
            }
        }

        let needs_occlusion = create_empty
            && self.output.channels.iter().any(|d| {
                matches!(
                    d.channel,
                    ChannelId::Occlusion
                        | ChannelId::DiffuseRed
                        | ChannelId::DiffuseGreen
                        | ChannelId::DiffuseBlue
                )
            });
        if needs_occlusion {
            self.prepare_occlusion()?;
        }

        self.generated_ready = true;
        Ok(())
    }

    /// Recompose the normal buffer from explicit X/Y (and optional Z)
    /// sources, then extract any embedded magnitude channel.
    fn compose_normal(&mut self, create_empty: bool) -> Result<(), BuildError> {
        let compose_output = EncodingDef::new(vec![
            ChannelDescriptor::new(ChannelId::NormalX, TextureTag::Normal, PixelChannel::Red)
                .with_values(-1.0, 1.0),
            ChannelDescriptor::new(ChannelId::NormalY, TextureTag::Normal, PixelChannel::Green)
                .with_values(-1.0, 1.0),
            ChannelDescriptor::new(ChannelId::NormalZ, TextureTag::Normal, PixelChannel::Blue)
                .with_values(-1.0, 1.0),
        ]);

        let ctx = BuildContext {
            reader: self.reader,
            input: self.input,
            output: &compose_output,
            material: self.material,
            geometry: self.geometry,
        };
        let none = GeneratedBuffers::default();
        let mut builder = TextureBuilder::new(ctx).with_cancel(self.cancel.clone());
        builder.map(&mut self.cache, &none, create_empty)?;
        let frames = builder.frame_count();
        let Some(mut composed) = builder.build(&mut self.cache, &none, create_empty, None)?
        else {
            return Ok(());
        };

        normal::restore_z(&mut composed);
        if let Some(filter) = &self.material.filter {
            normal::apply_filter(&mut composed, filter);
        }
        self.generated.normal = Some(Arc::new(composed));
        self.generated.frame_count = self.generated.frame_count.max(frames);

        // An embedded magnitude channel is read back through its codec
        // into its own scalar buffer.
        if let Some(desc) = self.input.find(ChannelId::NormalMagnitude) {
            if desc.color.is_color() && desc.value.is_none() {
                if let Some(path) = self.reader.enumerate(desc.texture).into_iter().next() {
                    self.cancel.check()?;
                    let image = self.cache.image(self.reader, &path)?;
                    let codec = ChannelCodec::new(desc);
                    let mut gray = GrayscaleBuffer::new(image.width, image.height, 1.0);
                    for y in 0..image.height {
                        for x in 0..image.width {
                            let raw = image.channel_byte(x, y, desc.color);
                            if let Some(value) = codec.decode(raw) {
                                gray.set(x, y, value);
                            }
                        }
                    }
                    self.generated.magnitude = Some(Arc::new(gray));
                }
            }
        }
        Ok(())
    }

    /// Derive the normal buffer from the height field.
    fn derive_normal(&mut self) -> Result<(), BuildError> {
        let Some(field) = self.load_height()? else {
            // No height source: the material simply has no normal
            // output.
            return Ok(());
        };
        let generator = NormalGenerator::from_settings(&self.material.normal)
            .with_resolution_scale(field.resolution_scale);
        let mut buffer = generator.generate(&field.buffer);
        if let Some(filter) = &self.material.filter {
            normal::apply_filter(&mut buffer, filter);
        }
        self.generated.normal = Some(Arc::new(buffer));
        self.generated.frame_count = self.generated.frame_count.max(field.frame_count);
        Ok(())
    }

    /// Resolve the occlusion buffer: a real occlusion source wins,
    /// otherwise the height field is ray-marched. Buffers store the lit
    /// amount, 1.0 = fully lit.
    fn prepare_occlusion(&mut self) -> Result<(), BuildError> {
        if let Some(desc) = self.input.find(ChannelId::Occlusion) {
            if desc.color.is_color() && desc.value.is_none() {
                if let Some(path) = self.reader.enumerate(desc.texture).into_iter().next() {
                    self.cancel.check()?;
                    let image = self.cache.image(self.reader, &path)?;
                    let frames = self.cache.metadata(self.reader, &path)?.frame_count;
                    let (shift, scale) = self.material.intensity(ChannelId::Occlusion);
                    let codec = ChannelCodec::new(desc).with_intensity(shift, scale);
                    let mut gray = GrayscaleBuffer::new(image.width, image.height, 1.0);
                    for y in 0..image.height {
                        for x in 0..image.width {
                            let raw = image.channel_byte(x, y, desc.color);
                            if let Some(value) = codec.decode(raw) {
                                gray.set(x, y, 1.0 - value.clamp(0.0, 1.0));
                            }
                        }
                    }
                    self.generated.occlusion = Some(Arc::new(gray));
                    self.generated.frame_count = self.generated.frame_count.max(frames);
                    return Ok(());
                }
            }
        }

        let Some(field) = self.load_height()? else {
            return Ok(());
        };
        let generator = OcclusionGenerator::from_settings(&self.material.occlusion)
            .with_resolution_scale(field.resolution_scale);
        self.generated.occlusion = Some(Arc::new(generator.generate(&field.buffer)));
        self.generated.frame_count = self.generated.frame_count.max(field.frame_count);
        Ok(())
    }

    /// Load and decode the height field once, preferring an explicit
    /// bump source over height.
    fn load_height(&mut self) -> Result<Option<HeightField>, BuildError> {
        if self.height_tried {
            return Ok(self.height.clone());
        }
        self.height_tried = true;

        let mut candidates: Vec<&ChannelDescriptor> =
            self.input.candidates(ChannelId::Height).collect();
        candidates.sort_by_key(|d| (d.texture != TextureTag::Bump) as u8);

        for desc in candidates {
            if !desc.color.is_color() || desc.value.is_some() {
                continue;
            }
            let Some(path) = self.reader.enumerate(desc.texture).into_iter().next() else {
                continue;
            };
            self.cancel.check()?;
            let image = self.cache.image(self.reader, &path)?;
            let frames = self.cache.metadata(self.reader, &path)?.frame_count;

            let (shift, scale) = self.material.intensity(ChannelId::Height);
            let codec = ChannelCodec::new(desc).with_intensity(shift, scale);
            let mut gray = GrayscaleBuffer::new(image.width, image.height, 0.0);
            for y in 0..image.height {
                for x in 0..image.width {
                    let raw = image.channel_byte(x, y, desc.color);
                    if let Some(value) = codec.decode(raw) {
                        gray.set(x, y, value);
                    }
                }
            }

            let mut resolution_scale = 1.0;
            if let Some(size) = self.material.texture_size {
                if size != image.width && image.width > 0 {
                    resolution_scale = size as f32 / image.width as f32;
                    let width = size.max(1);
                    let height =
                        ((image.height as f32 * resolution_scale).round() as u32).max(1);
                    gray = gray.resized(width, height);
                }
            }

            self.height = Some(HeightField {
                buffer: Arc::new(gray),
                frame_count: frames,
                resolution_scale,
            });
            break;
        }
        Ok(self.height.clone())
    }
}
