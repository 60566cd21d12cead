//! Proof-of-work arithmetic
//!
//! Compact target codec, PoW threshold check, the difficulty retarget
//! algorithm and per-block work. All values are unsigned 256-bit integers.

use primitive_types::{U256, U512};

use crate::types::Hash256Digest;

/// Headers per difficulty period
pub const RETARGET_PERIOD: u32 = 2016;

/// Two weeks, in seconds
pub const TARGET_TIMESPAN: u64 = 14 * 24 * 60 * 60;

const MIN_TIMESPAN: i64 = (TARGET_TIMESPAN / 4) as i64;
const MAX_TIMESPAN: i64 = (TARGET_TIMESPAN * 4) as i64;

// ============================================================================
// Compact encoding
// ============================================================================

/// Decode compact "bits" into a full target.
///
/// Negative or overflowing encodings decode to zero, which only the
/// all-zero hash can meet.
pub fn target_from_bits(bits: u32) -> U256 {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;

    if mantissa == 0 {
        return U256::zero();
    }
    if bits & 0x0080_0000 != 0 {
        return U256::zero();
    }
    if exponent > 34 || (mantissa > 0xff && exponent > 33) || (mantissa > 0xffff && exponent > 32)
    {
        return U256::zero();
    }

    if exponent <= 3 {
        U256::from(mantissa >> (8 * (3 - exponent)))
    } else {
        U256::from(mantissa) << (8 * (exponent - 3))
    }
}

/// Encode a target as compact "bits", rounding the mantissa down
pub fn bits_from_target(target: U256) -> u32 {
    let mut size = ((target.bits() + 7) / 8) as u32;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (target >> (8 * (size - 3))).low_u32()
    };

    // keep the sign bit clear
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | (size << 24)
}

/// Round a target down to the precision compact encoding keeps
pub fn truncate_target(target: U256) -> U256 {
    target_from_bits(bits_from_target(target))
}

// ============================================================================
// Threshold and retarget
// ============================================================================

/// True when the digest, read as a little-endian integer, is at or below
/// the target encoded by `bits`
pub fn hash_meets_target(digest: &Hash256Digest, bits: u32) -> bool {
    digest.to_u256() <= target_from_bits(bits)
}

/// Clamp the elapsed time of a period to [T/4, 4T]
pub fn clamp_timespan(first_timestamp: u32, last_timestamp: u32) -> u64 {
    let elapsed = i64::from(last_timestamp) - i64::from(first_timestamp);
    elapsed.clamp(MIN_TIMESPAN, MAX_TIMESPAN) as u64
}

/// Expected target for the period following `[first, last]`.
///
/// `old_target * clamp(last - first) / TARGET_TIMESPAN`, never easier
/// than `pow_limit`.
pub fn retarget_target(
    old_target: U256,
    first_timestamp: u32,
    last_timestamp: u32,
    pow_limit: U256,
) -> U256 {
    let timespan = clamp_timespan(first_timestamp, last_timestamp);
    let scaled = old_target.full_mul(U256::from(timespan)) / U512::from(TARGET_TIMESPAN);

    match U256::try_from(scaled) {
        Ok(target) if target <= pow_limit => target,
        _ => pow_limit,
    }
}

// ============================================================================
// Work
// ============================================================================

/// Expected hashes to meet `target`: 2^256 / (target + 1)
pub fn work_from_target(target: U256) -> U256 {
    if target.is_zero() {
        return U256::MAX;
    }
    match target.checked_add(U256::one()) {
        Some(divisor) => (!target / divisor) + U256::one(),
        None => U256::one(),
    }
}

/// Work represented by a header with the given compact bits
pub fn work_from_bits(bits: u32) -> U256 {
    work_from_target(target_from_bits(bits))
}
