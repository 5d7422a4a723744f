//! Validation for encodings, descriptors, and geometry.
//!
//! Validation runs once per material before build; the engine assumes
//! validated inputs and never re-checks these invariants in the hot path.

use crate::channel::ChannelDescriptor;
use crate::encoding::EncodingDef;
use crate::error::SpecError;
use crate::geometry::MaterialGeometry;

/// Validate a single channel descriptor.
pub fn validate_descriptor(desc: &ChannelDescriptor) -> Result<(), SpecError> {
    let channel = desc.channel.as_str().to_string();

    if desc.range_min > desc.range_max {
        return Err(SpecError::ReversedByteRange {
            channel,
            min: desc.range_min,
            max: desc.range_max,
        });
    }
    if desc.min_value > desc.max_value {
        return Err(SpecError::ReversedValueRange {
            channel,
            min: desc.min_value,
            max: desc.max_value,
        });
    }
    if !(desc.power.is_finite() && desc.power > 0.0) {
        return Err(SpecError::InvalidPower {
            channel,
            power: desc.power,
        });
    }
    if let Some(value) = desc.value {
        if value < desc.min_value || value > desc.max_value {
            return Err(SpecError::LiteralOutOfRange {
                channel,
                value,
                min: desc.min_value,
                max: desc.max_value,
            });
        }
    }
    Ok(())
}

/// Validate an encoding: must declare at least one channel, every
/// descriptor must be internally consistent.
pub fn validate_encoding(encoding: &EncodingDef) -> Result<(), SpecError> {
    if encoding.is_empty() {
        return Err(SpecError::EmptyEncoding);
    }
    for desc in &encoding.channels {
        validate_descriptor(desc)?;
    }
    Ok(())
}

/// Validate material geometry: CTM grids must be non-zero, declared parts
/// must have area.
pub fn validate_geometry(geometry: &MaterialGeometry) -> Result<(), SpecError> {
    if let Some(ctm) = &geometry.ctm {
        let (x, y) = ctm.grid();
        if x == 0 || y == 0 {
            return Err(SpecError::CtmGridUndefined);
        }
    }
    for part in &geometry.parts {
        if part.is_empty() {
            return Err(SpecError::DegeneratePart {
                name: part.name.clone(),
            });
        }
    }
    Ok(())
}
