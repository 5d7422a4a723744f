//! Value-space codec: the bidirectional transform between a raw pixel
//! byte and a normalized physical value.
//!
//! `decode` can report "no applicable value" (`None`) when a raw byte
//! falls outside the descriptor's declared range; callers treat that as
//! an absent channel for the pixel, never as an error. `encode` never
//! fails; out-of-range inputs clamp.

use retex_spec::ChannelDescriptor;

/// Resolved per-channel codec. Built once per mapping from a descriptor
/// plus the material-level intensity adjustment, then used per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCodec {
    min_value: f32,
    max_value: f32,
    range_min: u8,
    range_max: u8,
    shift: i32,
    power: f32,
    invert: bool,
    literal: Option<f32>,
    value_shift: f32,
    value_scale: f32,
}

impl ChannelCodec {
    /// Build a codec from a descriptor with identity intensity.
    pub fn new(desc: &ChannelDescriptor) -> Self {
        Self {
            min_value: desc.min_value,
            max_value: desc.max_value,
            range_min: desc.range_min,
            range_max: desc.range_max,
            shift: desc.shift,
            power: desc.power,
            invert: desc.invert,
            literal: desc.value,
            value_shift: 0.0,
            value_scale: 1.0,
        }
    }

    /// Attach a material-level value-space shift and scale.
    pub fn with_intensity(mut self, shift: f32, scale: f32) -> Self {
        self.value_shift = shift;
        self.value_scale = if scale == 0.0 { 1.0 } else { scale };
        self
    }

    /// Width of the valid byte range.
    fn byte_span(&self) -> i32 {
        self.range_max as i32 - self.range_min as i32 + 1
    }

    /// Rotate a raw byte within `[range_min, range_max]`.
    fn rotate(&self, raw: u8, amount: i32) -> u8 {
        let offset = (raw as i32 - self.range_min as i32 + amount).rem_euclid(self.byte_span());
        (self.range_min as i32 + offset) as u8
    }

    /// Decode a raw pixel byte into a physical value.
    ///
    /// Returns the literal unconditionally when one is attached. Returns
    /// `None` when the byte lies outside the declared range.
    pub fn decode(&self, raw: u8) -> Option<f32> {
        if let Some(literal) = self.literal {
            return Some(literal);
        }
        if raw < self.range_min || raw > self.range_max {
            return None;
        }

        let raw = self.rotate(raw, -self.shift);

        let byte_delta = (self.range_max - self.range_min) as f32;
        let mut t = if byte_delta > 0.0 {
            (raw - self.range_min) as f32 / byte_delta
        } else {
            0.0
        };

        if self.invert {
            t = 1.0 - t;
        }
        if self.power != 1.0 {
            // The curve operates on the normalized fraction so that
            // signed value domains stay well-defined.
            t = t.powf(1.0 / self.power);
        }

        let value = self.min_value + t * (self.max_value - self.min_value);
        let value = (value + self.value_shift) * self.value_scale;
        Some(value.clamp(self.min_value, self.max_value))
    }

    /// Encode a physical value into a pixel byte. Never fails.
    pub fn encode(&self, value: f32) -> u8 {
        let value = value / self.value_scale - self.value_shift;

        let value_delta = self.max_value - self.min_value;
        let mut t = if value_delta != 0.0 {
            ((value - self.min_value) / value_delta).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if self.power != 1.0 {
            t = t.powf(self.power);
        }
        if self.invert {
            t = 1.0 - t;
        }

        let byte_delta = (self.range_max - self.range_min) as f32;
        let raw_f = self.range_min as f32 + t * byte_delta;
        let raw_f = raw_f.clamp(self.range_min as f32, self.range_max as f32);
        // Round half away from zero; the domain is non-negative here.
        let raw = (raw_f + 0.5).floor() as u8;

        self.rotate(raw, self.shift)
    }

    /// Encode the descriptor's literal, or the given fallback.
    pub fn encode_literal_or(&self, fallback: f32) -> u8 {
        self.encode(self.literal.unwrap_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retex_spec::{ChannelDescriptor, ChannelId, PixelChannel};

    fn desc() -> ChannelDescriptor {
        ChannelDescriptor::for_channel(ChannelId::Height, PixelChannel::Red)
    }

    #[test]
    fn round_trip_identity_descriptor() {
        let codec = ChannelCodec::new(&desc());
        for b in 0..=255u8 {
            let value = codec.decode(b).unwrap();
            assert_eq!(codec.encode(value), b, "byte {}", b);
        }
    }

    #[test]
    fn round_trip_with_shift_invert_and_subrange() {
        let codec = ChannelCodec::new(&desc().with_range(10, 200).with_shift(17).inverted());
        for b in 10..=200u8 {
            let value = codec.decode(b).unwrap();
            assert_eq!(codec.encode(value), b, "byte {}", b);
        }
    }

    #[test]
    fn round_trip_with_power_is_within_one_unit() {
        let codec = ChannelCodec::new(&desc().with_power(2.2));
        for b in 0..=255u8 {
            let value = codec.decode(b).unwrap();
            let back = codec.encode(value);
            assert!(
                (back as i32 - b as i32).abs() <= 1,
                "byte {} came back as {}",
                b,
                back
            );
        }
    }

    #[test]
    fn out_of_range_bytes_decode_to_none() {
        let codec = ChannelCodec::new(&desc().with_range(16, 240));
        assert_eq!(codec.decode(15), None);
        assert_eq!(codec.decode(241), None);
        assert!(codec.decode(16).is_some());
        assert!(codec.decode(240).is_some());
    }

    #[test]
    fn literal_decodes_unconditionally() {
        let codec = ChannelCodec::new(&desc().with_range(100, 200).with_value(0.25));
        assert_eq!(codec.decode(0), Some(0.25));
        assert_eq!(codec.decode(255), Some(0.25));
    }

    #[test]
    fn inversion_is_an_involution() {
        let inverted = ChannelCodec::new(&desc().inverted());
        let plain = ChannelCodec::new(&desc());
        for b in 0..=255u8 {
            let v = inverted.decode(b).unwrap();
            // Inverting the decoded value recovers the plain decode.
            let flipped = 1.0 - v;
            let direct = plain.decode(b).unwrap();
            assert!((flipped - direct).abs() < 1e-5, "byte {}", b);
        }
    }

    #[test]
    fn signed_value_domain_maps_center_to_midpoint() {
        let codec = ChannelCodec::new(&desc().with_values(-1.0, 1.0));
        let v = codec.decode(128).unwrap();
        assert!(v.abs() < 0.01, "128 decoded to {}", v);
        assert_eq!(codec.encode(0.0), 128);
        assert_eq!(codec.encode(-1.0), 0);
        assert_eq!(codec.encode(1.0), 255);
    }

    #[test]
    fn intensity_shift_and_scale_apply_on_decode() {
        let codec = ChannelCodec::new(&desc()).with_intensity(0.1, 0.5);
        // raw 255 -> 1.0 -> (1.0 + 0.1) * 0.5 = 0.55
        let v = codec.decode(255).unwrap();
        assert!((v - 0.55).abs() < 1e-5);
        // encode undoes the adjustment
        assert_eq!(codec.encode(0.55), 255);
    }

    #[test]
    fn encode_clamps_out_of_domain_values() {
        let codec = ChannelCodec::new(&desc());
        assert_eq!(codec.encode(2.0), 255);
        assert_eq!(codec.encode(-1.0), 0);
    }

    #[test]
    fn degenerate_byte_range_round_trips() {
        let codec = ChannelCodec::new(&desc().with_range(77, 77));
        let v = codec.decode(77).unwrap();
        assert_eq!(codec.encode(v), 77);
        assert_eq!(codec.decode(76), None);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let codec = ChannelCodec::new(&desc());
        // 0.5 in value space is exactly 127.5 raw; rounds away from zero
        // to 128.
        assert_eq!(codec.encode(0.5), 128);
    }
}
