//! ReTex Texture Re-encoding Engine
//!
//! This crate reinterprets one pixel-encoding scheme into another: it
//! takes channel descriptors for an input and an output encoding
//! (defined in `retex-spec`), resolves where every output channel's
//! value comes from (a source file channel, a literal, a generated
//! buffer, or a cross-channel fallback), and composites the result into
//! a single working buffer, handling animation frames, connected-texture
//! tile grids, and multi-part atlases. Channels with no direct source
//! can be synthesized: tangent-space normals are derived from height
//! fields and ambient occlusion is ray-marched from them.
//!
//! # Example
//!
//! ```no_run
//! use retex_engine::graph::TextureGraph;
//! use retex_engine::source::DirReader;
//! use retex_spec::{EncodingDef, MaterialGeometry, MaterialProperties, TextureTag};
//!
//! let reader = DirReader::new("textures/stone");
//! let input = EncodingDef::default_pbr();
//! let output = EncodingDef::labpbr_13();
//! let material = MaterialProperties::new("stone");
//! let geometry = MaterialGeometry::plain();
//!
//! let mut graph =
//!     TextureGraph::new(&reader, &input, &output, &material, &geometry).unwrap();
//! if let Some(normal) = graph.build_tag(TextureTag::Normal, true).unwrap() {
//!     println!("{}x{}", normal.width, normal.height);
//! }
//! ```
//!
//! # Determinism
//!
//! Builds are bit-reproducible: the codec rounds half away from zero,
//! the only randomness (normal filter noise) is PCG32-seeded, and PNG
//! output uses fixed compression settings. The `png` module exposes
//! BLAKE3 hashes of encoded output for verification.

pub mod buffer;
pub mod cancel;
pub mod codec;
pub mod color;
pub mod compositor;
pub mod error;
pub mod filter;
pub mod graph;
pub mod mapping;
pub mod normal;
pub mod occlusion;
pub mod png;
pub mod regions;
pub mod rng;
pub mod source;

// Re-export main types for convenience
pub use buffer::{GrayscaleBuffer, TextureBuffer};
pub use cancel::CancelToken;
pub use codec::ChannelCodec;
pub use color::Color;
pub use compositor::{BuildContext, TextureBuilder};
pub use error::BuildError;
pub use filter::FilterKind;
pub use graph::TextureGraph;
pub use mapping::{ChannelMapping, GeneratedBuffers, GeneratedTag, MappingSource};
pub use normal::NormalGenerator;
pub use occlusion::OcclusionGenerator;
pub use png::{PngConfig, PngError};
pub use regions::{PixelRect, RegionEnumerator, RenderRegion, UVRegion};
pub use rng::DeterministicRng;
pub use source::{DirReader, InputReader, MemoryReader, SourceCache, TextureSource};
