//! Error types shared across the engine.

use thiserror::Error;

/// Common trait for engine error types.
///
/// Provides stable error codes and a category so batch drivers can report
/// failures uniformly without depending on the concrete error enum.
pub trait BackendError: std::error::Error {
    /// Stable error code, e.g. "SPEC_001" or "REMAP_003".
    fn code(&self) -> &'static str;

    /// Human-readable message.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Category for grouping, e.g. "spec" or "remap".
    fn category(&self) -> &'static str;
}

/// Configuration-inconsistency errors raised by validation. These are
/// fatal for the material being built and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("encoding declares no channels")]
    EmptyEncoding,

    #[error("channel {channel}: byte range {min}..{max} is reversed")]
    ReversedByteRange { channel: String, min: u8, max: u8 },

    #[error("channel {channel}: value range {min}..{max} is reversed")]
    ReversedValueRange { channel: String, min: f32, max: f32 },

    #[error("channel {channel}: power {power} must be positive and finite")]
    InvalidPower { channel: String, power: f32 },

    #[error("channel {channel}: literal {value} is outside {min}..{max}")]
    LiteralOutOfRange {
        channel: String,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("connected-texture layout has an undefined tile grid")]
    CtmGridUndefined,

    #[error("part '{name}' has zero area")]
    DegeneratePart { name: String },
}

impl BackendError for SpecError {
    fn code(&self) -> &'static str {
        match self {
            SpecError::EmptyEncoding => "SPEC_001",
            SpecError::ReversedByteRange { .. } => "SPEC_002",
            SpecError::ReversedValueRange { .. } => "SPEC_003",
            SpecError::InvalidPower { .. } => "SPEC_004",
            SpecError::LiteralOutOfRange { .. } => "SPEC_005",
            SpecError::CtmGridUndefined => "SPEC_006",
            SpecError::DegeneratePart { .. } => "SPEC_007",
        }
    }

    fn category(&self) -> &'static str {
        "spec"
    }
}
