//! Bit-level storage for encoded posting lists.
//!
//! - [`builder::BitVectorBuilder`] accumulates bits (LSB first within 64-bit words)
//!   while a sequence region is being written.
//! - [`bit_vector::BitVector`] is the frozen, immutable form that enumerators borrow.
//! - [`cursor::BitCursor`] reads variable-width fields with explicit bounds checks.
//! - [`codes`] holds the universal integer codes (gamma, delta) used by region headers.
//! - [`collection::BitVectorCollection`] concatenates many regions into one bit vector.

#[cfg(not(target_endian = "little"))]
compile_error!("pvb-bits views bit vector words as bytes and requires a little-endian target");

pub mod align;
pub mod bit_vector;
pub mod broadword;
pub mod builder;
pub mod codes;
pub mod collection;
pub mod cursor;

pub use bit_vector::BitVector;
pub use builder::BitVectorBuilder;
pub use cursor::BitCursor;

/// Every sequence region and every partition payload starts on a multiple of this
/// many bits, so that byte-oriented block codecs can address the payload directly.
pub const REGION_ALIGNMENT: u64 = 8;
