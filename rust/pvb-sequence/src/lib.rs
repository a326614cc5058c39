//! Succinct monotone sequences for posting lists.
//!
//! A sequence of strictly increasing integers below a *universe* is written once
//! into a [`BitVectorBuilder`] and read back through an enumerator borrowing the
//! frozen [`BitVector`]. Every format in this crate implements [`SequenceFormat`],
//! and every enumerator implements [`SequenceEnumerator`]; formats nest freely, so a
//! partitioned layout can carry any other format as its partition payload.
//!
//! # Formats
//!
//! - [`elias_fano::CompactEliasFano`]: Elias-Fano with sampled skip pointers. Used
//!   for partition sizes and partition upper bounds.
//! - [`upper_bounds::UncompressedUpperBounds`]: raw 32-bit values, an alternative
//!   upper-bounds table for the uniform layout.
//! - [`block_sequence::BlockSequence`]: d-gaps coded in blocks by a
//!   [`BlockCodec`](pvb_codecs::BlockCodec).
//! - [`indexed_sequence::IndexedSequence`]: picks the cheapest of an implicit
//!   all-ones run, a bitmap, or a block sequence. This is the partition payload of
//!   the variable layout.
//! - [`partitioned::PartitionedSequence`]: variable-size partitions chosen by the
//!   [`optimal_partition`] planner.
//! - [`partitioned::UniformPartitionedSequence`]: fixed-size partitions.
//! - [`positive_sequence::PositiveSequence`]: positive integers (term frequencies)
//!   stored as their prefix sums.
//!
//! # Enumerators
//!
//! Enumerators start at position 0. Every operation returns `(position, value)`;
//! position `size()` is past-the-end and reports the universe as its value.
//! `next_geq(x)` returns the first element `>= x` of the whole sequence, so it is
//! only cheap when called with non-decreasing arguments.
//!
//! Enumerator constructors validate headers and tables and return
//! `RegionTooShort` / `InvalidFormat` errors. Traversal calls are infallible: a
//! block payload found corrupt while traversing panics.

use pvb_bits::{BitVector, BitVectorBuilder};
use pvb_common::{Error, Result};

pub mod block_sequence;
pub mod config;
pub mod elias_fano;
pub mod indexed_sequence;
pub mod optimal_partition;
pub mod partitioned;
pub mod positive_sequence;
pub mod upper_bounds;

pub use block_sequence::BlockSequence;
pub use config::{BuildConfig, GlobalParameters};
pub use elias_fano::CompactEliasFano;
pub use indexed_sequence::IndexedSequence;
pub use partitioned::{PartitionedSequence, UniformPartitionedSequence};
pub use positive_sequence::PositiveSequence;
pub use upper_bounds::{UncompressedUpperBounds, UpperBounds};

/// Cursor over an encoded sequence.
pub trait SequenceEnumerator {
    /// Number of elements.
    fn size(&self) -> u64;

    /// Moves to `position <= size()`.
    fn move_to(&mut self, position: u64) -> (u64, u64);

    /// Moves to the first element `>= lower_bound`, or past-the-end.
    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64);

    /// Moves one element forward. The current position must be below `size()`.
    fn next(&mut self) -> (u64, u64);

    fn position(&self) -> u64;

    /// Value of the element before the current position, zero at position 0.
    fn prev_value(&self) -> u64;
}

/// An encoding of a strictly increasing sequence below a universe.
pub trait SequenceFormat {
    type Enumerator<'a>: SequenceEnumerator;

    /// Appends the encoding of `values` to `bvb`.
    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
        config: &BuildConfig,
    ) -> Result<()>;

    /// Opens the encoding of `n` values written at bit `offset` of `bits`.
    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<Self::Enumerator<'a>>;
}

/// Largest universe whose values all fit a 32-bit posting.
pub const MAX_UNIVERSE: u64 = u32::MAX as u64 + 1;

/// Rejects universes holding values beyond the 32-bit posting width.
pub fn check_universe(universe: u64) -> Result<()> {
    if universe > MAX_UNIVERSE {
        return Err(Error::codec_overflow("u32 posting", universe));
    }
    Ok(())
}

/// Checks that `values` is non-empty, strictly increasing and below `universe`,
/// and that `universe` fits the posting width.
pub fn check_monotone(values: &[u64], universe: u64) -> Result<()> {
    if values.is_empty() {
        return Err(Error::invalid_arg("values", "sequence is empty"));
    }
    check_universe(universe)?;
    if let Some(i) = values.windows(2).position(|w| w[0] >= w[1]) {
        return Err(Error::invalid_arg(
            "values",
            format!(
                "not strictly increasing at position {}: {} then {}",
                i + 1,
                values[i],
                values[i + 1]
            ),
        ));
    }
    let last = values[values.len() - 1];
    if last >= universe {
        return Err(Error::invalid_arg(
            "universe",
            format!("value {last} is not below the universe {universe}"),
        ));
    }
    Ok(())
}

/// Panics with a traversal-time decoding error.
#[cold]
#[inline(never)]
pub(crate) fn corrupt_region(err: Error) -> ! {
    panic!("corrupt sequence region: {err}")
}
