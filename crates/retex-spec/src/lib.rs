//! ReTex Canonical Encoding Types
//!
//! This crate provides the declarative types consumed by the ReTex
//! engine: channel descriptors, encoding definitions, material
//! properties, and geometry metadata, plus validation for all of them.
//! The types (de)serialize as JSON; parsing configuration files is a
//! caller concern, the engine only ever sees these structures.
//!
//! # Overview
//!
//! A *channel descriptor* states how one semantic material property
//! (height, normal-x, roughness, ...) is stored in one pixel channel of
//! one texture file: its value domain, valid byte range, cyclic shift,
//! power curve, and polarity. An *encoding* is an ordered list of
//! descriptors covering a whole texture set. The engine re-encodes
//! materials from one encoding into another.
//!
//! # Example
//!
//! ```
//! use retex_spec::{ChannelDescriptor, ChannelId, EncodingDef, PixelChannel};
//! use retex_spec::validation::validate_encoding;
//!
//! let encoding = EncodingDef::new(vec![
//!     ChannelDescriptor::for_channel(ChannelId::Height, PixelChannel::Red),
//!     ChannelDescriptor::for_channel(ChannelId::Rough, PixelChannel::Green)
//!         .with_power(2.0),
//! ]);
//! assert!(validate_encoding(&encoding).is_ok());
//! ```

pub mod channel;
pub mod encoding;
pub mod error;
pub mod geometry;
pub mod material;
pub mod validation;

pub use channel::{ChannelDescriptor, ChannelId, PixelChannel, SamplerKind, TextureTag};
pub use encoding::EncodingDef;
pub use error::{BackendError, SpecError};
pub use geometry::{CtmLayout, CtmMethod, MaterialGeometry, PartBounds, PartRegion};
pub use material::{
    MaterialProperties, NormalFilterSettings, NormalMethod, NormalSettings, OcclusionSettings,
};
