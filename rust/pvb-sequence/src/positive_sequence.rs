//! Positive integers (term frequencies) stored through their prefix sums.
//!
//! `f_0, f_1, ..` becomes the strictly increasing `s_i = f_0 + .. + f_i`, written
//! with the nested format `S`. Because every `f_i >= 1`, the stored d-gaps are
//! exactly `f_i - 1`.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder};
use pvb_common::{Error, Result};

use crate::{BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat};

pub struct PositiveSequence<S>(PhantomData<S>);

impl<S: SequenceFormat> PositiveSequence<S> {
    /// Writes `values`, all of which must be positive. `universe` bounds the total
    /// sum from above (exclusive).
    pub fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
        config: &BuildConfig,
    ) -> Result<()> {
        let mut sums = Vec::with_capacity(values.len());
        let mut sum = 0u64;
        for (i, &v) in values.iter().enumerate() {
            if v == 0 {
                return Err(Error::invalid_arg(
                    "values",
                    format!("value at position {i} is zero"),
                ));
            }
            sum += v;
            sums.push(sum);
        }
        S::write(bvb, &sums, universe, params, config)
    }

    pub fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<PositiveEnumerator<S::Enumerator<'a>>> {
        Ok(PositiveEnumerator {
            inner: S::enumerator(bits, offset, universe, n, params)?,
        })
    }
}

/// Yields the original values by differencing consecutive prefix sums.
pub struct PositiveEnumerator<E> {
    inner: E,
}

impl<E: SequenceEnumerator> PositiveEnumerator<E> {
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// Moves to `position < size()` and returns the value there.
    pub fn move_to(&mut self, position: u64) -> u64 {
        debug_assert!(position < self.inner.size());
        let (_, sum) = self.inner.move_to(position);
        sum - self.inner.prev_value()
    }

    /// Moves to the next position, which must be below `size()`.
    pub fn next(&mut self) -> u64 {
        let (_, sum) = self.inner.next();
        sum - self.inner.prev_value()
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }
}
