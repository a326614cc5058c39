//! Block codecs for runs of posting gaps.
//!
//! Every codec turns a run of `u32` values into bytes and back, and exposes an
//! O(1) bit-cost estimate used by the partition planner. Runs shorter than a
//! codec's [`BlockCodec::FALLBACK_THRESHOLD`] are written with the
//! [`InterpolativeBlock`] coder instead, which has no fixed block overhead.
//!
//! Decoding never relies on a stored length: the caller supplies the number of
//! values, and each decoder reports how many input bytes it consumed.

use std::{fmt, str::FromStr};

use pvb_common::{Error, Result};

pub mod interpolative;
pub mod stream_vbyte;
pub mod tight_vbyte;
pub mod varint_g8iu;
pub mod varint_gb;
pub mod vbyte;

pub use interpolative::InterpolativeBlock;
pub use stream_vbyte::StreamVByteBlock;
pub use tight_vbyte::TightVByte;
pub use varint_g8iu::VarIntG8iuBlock;
pub use varint_gb::VarIntGbBlock;
pub use vbyte::VByteBlock;

/// Number of values per block for every block-based codec.
pub const DEFAULT_BLOCK_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockCodecKind {
    VByte = 1,
    VarIntGb = 2,
    VarIntG8iu = 3,
    StreamVByte = 4,
    Interpolative = 5,
}

impl BlockCodecKind {
    pub const ALL: [BlockCodecKind; 5] = [
        BlockCodecKind::VByte,
        BlockCodecKind::VarIntGb,
        BlockCodecKind::VarIntG8iu,
        BlockCodecKind::StreamVByte,
        BlockCodecKind::Interpolative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlockCodecKind::VByte => "vbyte",
            BlockCodecKind::VarIntGb => "varintgb",
            BlockCodecKind::VarIntG8iu => "varintg8iu",
            BlockCodecKind::StreamVByte => "streamvbyte",
            BlockCodecKind::Interpolative => "interpolative",
        }
    }
}

impl fmt::Display for BlockCodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockCodecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BlockCodecKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_arg("block_codec", format!("unknown codec '{s}'")))
    }
}

/// A block codec. Implementations are zero-sized strategy types; the sequence
/// formats are generic over them.
pub trait BlockCodec: Send + Sync + 'static {
    const KIND: BlockCodecKind;

    /// Number of values encoded together by the block sequence.
    const BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE;

    /// Runs with fewer values than this are encoded by [`InterpolativeBlock`].
    const FALLBACK_THRESHOLD: usize;

    /// Estimated bits to encode `value` when the smallest value that may follow the
    /// previous one is `base` (so `value - base` is what is actually stored).
    fn posting_cost(value: u64, base: u64) -> u64;

    /// Encodes a full-size run.
    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()>;

    /// Decodes `out.len()` values, returning the number of bytes consumed.
    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize>;

    /// Encodes `values`, falling back to the interpolative coder for short runs.
    /// `sum_hint`, when given, must equal the sum of `values`; the decoder then has
    /// to be given the same hint.
    fn encode(values: &[u32], sum_hint: Option<u32>, out: &mut Vec<u8>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        if values.len() < Self::FALLBACK_THRESHOLD {
            InterpolativeBlock::encode_with_sum(values, sum_hint, out)
        } else {
            Self::encode_block(values, out)
        }
    }

    /// Decodes `out.len()` values previously written by [`encode`](Self::encode).
    fn decode(input: &[u8], out: &mut [u32], sum_hint: Option<u32>) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if out.len() < Self::FALLBACK_THRESHOLD {
            InterpolativeBlock::decode_with_sum(input, out, sum_hint)
        } else {
            Self::decode_block(input, out)
        }
    }
}

/// Number of `group_bits`-bit groups needed to hold `x`; zero still takes one group.
#[inline]
pub(crate) fn group_count(x: u64, group_bits: u32) -> u64 {
    let bits = 64 - x.leading_zeros() as u64;
    bits.div_ceil(group_bits as u64).max(1)
}

/// Bounds-checked read of one input byte.
#[inline]
pub(crate) fn byte_at(input: &[u8], pos: usize, codec: BlockCodecKind) -> Result<u8> {
    match input.get(pos) {
        Some(&b) => Ok(b),
        None => Err(Error::region_too_short(
            codec.name(),
            (pos as u64 + 1) * 8,
            input.len() as u64 * 8,
        )),
    }
}

/// Bounds-checked little-endian read of `len <= 4` bytes.
#[inline]
pub(crate) fn read_le(input: &[u8], pos: usize, len: usize, codec: BlockCodecKind) -> Result<u32> {
    let Some(bytes) = input.get(pos..pos + len) else {
        return Err(Error::region_too_short(
            codec.name(),
            (pos + len) as u64 * 8,
            input.len() as u64 * 8,
        ));
    };
    Ok(bytes
        .iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32))
}
