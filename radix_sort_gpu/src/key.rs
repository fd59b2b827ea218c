//! Mapping between `f32` bit patterns and unsigned keys whose integer order
//! matches the IEEE-754 total order of the floats.
//!
//! Non-negative floats get their sign bit set so they land above every
//! negative float. Negative floats get all of their bits flipped, which both
//! clears the sign bit and reverses the order of their magnitudes.
//!
//! ```text
//! -inf   1_11111111_000...0 -> 0_00000000_111...1   flip all the bits
//! -1.0   1_01111111_000...0 -> 0_10000000_111...1   flip all the bits
//! -0.0   1_00000000_000...0 -> 0_11111111_111...1   flip all the bits
//! +0.0   0_00000000_000...0 -> 1_00000000_000...0   flip the sign bit
//! +1.0   0_01111111_000...0 -> 1_01111111_000...0   flip the sign bit
//! +inf   0_11111111_000...0 -> 1_11111111_000...0   flip the sign bit
//! ```
//!
//! NaNs go through the same mapping, so a NaN with a clear sign bit sorts
//! after `+inf` and a NaN with a set sign bit sorts before `-inf`.

/// The width of a sortable key.
pub const KEY_BITS: u32 = 32;

/// The number of key bits consumed by one pass. Must divide evenly into a
/// `u32` shift and be small enough that `RADIX` fits in a block.
pub const RADIX_BITS: u32 = 4;

/// The number of distinct digit values.
pub const RADIX: usize = 1 << RADIX_BITS;

/// The number of passes needed to consume every key bit.
pub const PASS_COUNT: u32 = (KEY_BITS + RADIX_BITS - 1) / RADIX_BITS;

/// A digit value no key can have. Used for padding threads past the end of
/// the input.
pub const NO_DIGIT: u32 = RADIX as u32;

const SIGN_BIT: u32 = 1 << (KEY_BITS - 1);
const DIGIT_MASK: u32 = (RADIX as u32) - 1;

/// Maps the bit pattern of a float to its sortable key.
#[inline(always)]
pub fn to_sortable_key(bits: u32) -> u32 {
    if bits & SIGN_BIT == 0 {
        bits | SIGN_BIT
    } else {
        !bits
    }
}

/// Inverse of [`to_sortable_key`].
#[inline(always)]
pub fn from_sortable_key(key: u32) -> u32 {
    if key & SIGN_BIT != 0 {
        key & !SIGN_BIT
    } else {
        !key
    }
}

/// The bit offset of the digit examined by the given pass.
#[inline(always)]
pub fn pass_shift(pass: u32) -> u32 {
    pass * RADIX_BITS
}

/// Extracts the digit starting at bit `shift`.
#[inline(always)]
pub fn digit(key: u32, shift: u32) -> u32 {
    (key >> shift) & DIGIT_MASK
}
