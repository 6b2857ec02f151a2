//! Packed 80-bit extended precision values.
//!
//! The acquisition software stores each channel as the raw in-memory image
//! of an x87 `long double`: ten bytes, little endian.
//!
//! ```text
//!  byte  0 ..................... 7   8 ........ 9
//!       | mantissa (64 bits, explicit |s| exponent  |
//!       |  integer bit at bit 63)     | |(15, 16383)|
//! ```
//!
//! Rust has no native 80-bit float, so decoding goes through the
//! [`ExtendedDecoder`] trait and its capability check.

use crate::error::{DecodeError, SpextractError};

/// Bytes per packed channel value.
pub const SLOT_SIZE: usize = 10;

const EXPONENT_BITS: u32 = 15;
const FRACTION_BITS: u32 = 63;
const EXPONENT_BIAS: i32 = 16383;
const EXPONENT_MAX: u16 = 0x7fff;
const INTEGER_BIT: u64 = 1 << 63;

const F64_EXPONENT_BIAS: i32 = 1023;
const F64_FRACTION_BITS: u32 = 52;
const F64_FRACTION_MASK: u64 = (1 << F64_FRACTION_BITS) - 1;

// ---------------------------------------------------------------------------
// Decoder trait
// ---------------------------------------------------------------------------

/// Narrows packed extended precision slots into `f64`.
pub trait ExtendedDecoder: Send + Sync {
    /// Exponent width of the representation this decoder handles.
    fn exponent_bits(&self) -> u32;

    /// Explicit fraction bits (excluding the integer bit).
    fn fraction_bits(&self) -> u32;

    /// Decode one slot.
    fn decode_slot(&self, slot: &[u8; SLOT_SIZE]) -> f64;

    /// Verify this decoder handles genuine 80-bit extended precision.
    ///
    /// Must pass before any row is processed.
    fn check_capability(&self) -> Result<(), SpextractError> {
        if self.exponent_bits() != EXPONENT_BITS || self.fraction_bits() != FRACTION_BITS {
            return Err(SpextractError::Capability(format!(
                "need {EXPONENT_BITS} exponent and {FRACTION_BITS} fraction bits, decoder has {} and {}",
                self.exponent_bits(),
                self.fraction_bits()
            )));
        }
        for (slot, expected) in KNOWN_ANSWERS {
            let got = self.decode_slot(slot);
            if got.to_bits() != expected.to_bits() {
                return Err(SpextractError::Capability(format!(
                    "self-test decoded {got:e}, expected {expected:e}"
                )));
            }
        }
        Ok(())
    }

    /// Decode `channels` values from a packed spectrum.
    ///
    /// The buffer must hold a whole number of `channels`-sized blocks; only
    /// the first block is read.
    fn decode(&self, bytes: &[u8], channels: i64) -> Result<Vec<f64>, DecodeError> {
        if channels <= 0 {
            return Err(DecodeError::ChannelCount(channels));
        }
        let channels = usize::try_from(channels).map_err(|_| DecodeError::ChannelCount(channels))?;
        let len = bytes.len();
        if len % SLOT_SIZE != 0 {
            return Err(DecodeError::Misaligned { len, slot: SLOT_SIZE });
        }
        let needed = channels
            .checked_mul(SLOT_SIZE)
            .ok_or(DecodeError::ChannelCount(channels as i64))?;
        if len < needed {
            return Err(DecodeError::Truncated { len, channels, needed });
        }
        if len % needed != 0 {
            return Err(DecodeError::ChannelMismatch { len, channels });
        }

        Ok(bytes[..needed]
            .chunks_exact(SLOT_SIZE)
            .map(|chunk| {
                let mut slot = [0u8; SLOT_SIZE];
                slot.copy_from_slice(chunk);
                self.decode_slot(&slot)
            })
            .collect())
    }
}

// 1.0, -2.5, 1/3, smallest subnormal, overflow.
const KNOWN_ANSWERS: &[(&[u8; SLOT_SIZE], f64)] = &[
    (&[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f], 1.0),
    (&[0, 0, 0, 0, 0, 0, 0, 0xa0, 0x00, 0xc0], -2.5),
    (
        &[0xab, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xfd, 0x3f],
        0.333_333_333_333_333_3,
    ),
    (&[0, 0, 0, 0, 0, 0, 0, 0x80, 0xcd, 0x3b], 4.9406564584124654e-324),
    (&[0, 0, 0, 0, 0, 0, 0, 0x80, 0x00, 0x44], f64::INFINITY),
];

// ---------------------------------------------------------------------------
// Software decoder
// ---------------------------------------------------------------------------

/// Bit-manipulation decoder; works on any host.
///
/// Rounds to nearest, ties to even, the way an x87 `fstp` to a double does
/// under the default control word.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareDecoder;

impl ExtendedDecoder for SoftwareDecoder {
    fn exponent_bits(&self) -> u32 {
        EXPONENT_BITS
    }

    fn fraction_bits(&self) -> u32 {
        FRACTION_BITS
    }

    fn decode_slot(&self, slot: &[u8; SLOT_SIZE]) -> f64 {
        let mut mantissa_bytes = [0u8; 8];
        mantissa_bytes.copy_from_slice(&slot[..8]);
        let mantissa = u64::from_le_bytes(mantissa_bytes);
        let sign_exponent = u16::from_le_bytes([slot[8], slot[9]]);
        extended_to_f64(sign_exponent, mantissa)
    }
}

fn extended_to_f64(sign_exponent: u16, mantissa: u64) -> f64 {
    let negative = sign_exponent & 0x8000 != 0;
    let sign = if negative { 1u64 << 63 } else { 0 };
    let exponent = sign_exponent & EXPONENT_MAX;

    if exponent == EXPONENT_MAX {
        // Infinity only with the integer bit set and an empty fraction.
        if mantissa == INTEGER_BIT {
            return f64::from_bits(sign | f64::INFINITY.to_bits());
        }
        return f64::from_bits(sign | f64::NAN.to_bits());
    }
    if mantissa == 0 {
        return f64::from_bits(sign);
    }
    if exponent != 0 && mantissa & INTEGER_BIT == 0 {
        // Unnormal: rejected by the FPU as an invalid operand.
        return f64::NAN;
    }

    // Normalise so the leading one sits at bit 63; `unbiased` is the power
    // of two of that bit.
    let shift = mantissa.leading_zeros();
    let normalized = mantissa << shift;
    let biased = if exponent == 0 { 1 } else { exponent as i32 };
    let unbiased = biased - EXPONENT_BIAS - shift as i32;

    if unbiased > F64_EXPONENT_BIAS {
        return f64::from_bits(sign | f64::INFINITY.to_bits());
    }

    let min_normal = 1 - F64_EXPONENT_BIAS;
    if unbiased >= min_normal {
        let drop = 63 - F64_FRACTION_BITS;
        let mut significand = round_shift(normalized as u128, drop);
        let mut e = unbiased;
        if significand >> (F64_FRACTION_BITS + 1) != 0 {
            significand >>= 1;
            e += 1;
            if e > F64_EXPONENT_BIAS {
                return f64::from_bits(sign | f64::INFINITY.to_bits());
            }
        }
        let biased_out = (e + F64_EXPONENT_BIAS) as u64;
        return f64::from_bits(sign | biased_out << F64_FRACTION_BITS | (significand & F64_FRACTION_MASK));
    }

    // Subnormal result. Anything shifted out by 65 or more bits is below
    // half the smallest subnormal.
    let drop = (63 - F64_FRACTION_BITS) as i32 + (min_normal - unbiased);
    if drop >= 65 {
        return f64::from_bits(sign);
    }
    // A carry into bit 52 yields the smallest normal, which the bit layout
    // already encodes correctly.
    let significand = round_shift(normalized as u128, drop as u32);
    f64::from_bits(sign | significand)
}

/// Shift right by `drop` bits, rounding to nearest with ties to even.
fn round_shift(value: u128, drop: u32) -> u64 {
    let kept = value >> drop;
    let remainder = value & ((1u128 << drop) - 1);
    let half = 1u128 << (drop - 1);
    let round_up = remainder > half || (remainder == half && kept & 1 == 1);
    (kept + round_up as u128) as u64
}

// ---------------------------------------------------------------------------
// Encoding (exact, f64 fits in 80 bits)
// ---------------------------------------------------------------------------

/// Pack an `f64` into its exact 80-bit extended image.
pub fn encode_extended(value: f64) -> [u8; SLOT_SIZE] {
    let bits = value.to_bits();
    let sign: u16 = if bits >> 63 == 1 { 0x8000 } else { 0 };
    let exponent = ((bits >> F64_FRACTION_BITS) & 0x7ff) as i32;
    let fraction = bits & F64_FRACTION_MASK;

    let (sign_exponent, mantissa) = if exponent == 0x7ff {
        let payload = if fraction == 0 { 0 } else { (fraction << 11) | (1 << 62) };
        (sign | EXPONENT_MAX, INTEGER_BIT | payload)
    } else if exponent == 0 && fraction == 0 {
        (sign, 0)
    } else if exponent == 0 {
        let shift = fraction.leading_zeros();
        let unbiased = 1 - F64_EXPONENT_BIAS - (shift as i32 - 11);
        (sign | (unbiased + EXPONENT_BIAS) as u16, fraction << shift)
    } else {
        let unbiased = exponent - F64_EXPONENT_BIAS;
        (
            sign | (unbiased + EXPONENT_BIAS) as u16,
            INTEGER_BIT | (fraction << 11),
        )
    };

    let mut slot = [0u8; SLOT_SIZE];
    slot[..8].copy_from_slice(&mantissa.to_le_bytes());
    slot[8..].copy_from_slice(&sign_exponent.to_le_bytes());
    slot
}

/// Pack a whole spectrum, channel by channel.
pub fn encode_spectrum(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| encode_extended(*v)).collect()
}
