//! Partition upper-bound tables.
//!
//! The partitioned layouts store `[first value, ub_0, .., ub_{k-1}]` and need to
//! know where the table ends to find the byte-offset table that follows it.

use pvb_bits::{BitVector, BitVectorBuilder, align::align_up_u64};
use pvb_common::{Error, Result, verify_arg};

use crate::{BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat};

/// A [`SequenceFormat`] whose region size is known without reading it.
pub trait UpperBounds: SequenceFormat {
    /// Bit position right after a region of `n` values written at `offset`.
    fn region_end(offset: u64, universe: u64, n: u64, params: &GlobalParameters) -> u64;
}

/// Plain 32-bit values starting on a byte boundary. Larger than Elias-Fano, but
/// every access is a single read.
pub struct UncompressedUpperBounds;

const VALUE_BITS: u32 = 32;

impl SequenceFormat for UncompressedUpperBounds {
    type Enumerator<'a> = UncompressedEnumerator<'a>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        _params: &GlobalParameters,
        _config: &BuildConfig,
    ) -> Result<()> {
        verify_arg!(values, !values.is_empty());
        if values.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::invalid_arg("values", "sequence is not sorted"));
        }
        let last = values[values.len() - 1];
        verify_arg!(universe, last < universe);
        if last > u32::MAX as u64 {
            return Err(Error::codec_overflow("uncompressed upper bounds", last));
        }
        bvb.pad_to(8);
        for &v in values {
            bvb.append_bits(v, VALUE_BITS);
        }
        Ok(())
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        _params: &GlobalParameters,
    ) -> Result<UncompressedEnumerator<'a>> {
        let start = align_up_u64(offset, 8);
        bits.check_range("uncompressed upper bounds", start, n * VALUE_BITS as u64)?;
        let mut e = UncompressedEnumerator {
            bits,
            start,
            n,
            universe,
            position: n,
            value: universe,
        };
        if n > 0 {
            e.position = 0;
            e.value = e.get(0);
        }
        Ok(e)
    }
}

impl UpperBounds for UncompressedUpperBounds {
    fn region_end(offset: u64, _universe: u64, n: u64, _params: &GlobalParameters) -> u64 {
        align_up_u64(offset, 8) + n * VALUE_BITS as u64
    }
}

pub struct UncompressedEnumerator<'a> {
    bits: &'a BitVector,
    start: u64,
    n: u64,
    universe: u64,
    position: u64,
    value: u64,
}

impl UncompressedEnumerator<'_> {
    #[inline]
    fn get(&self, i: u64) -> u64 {
        self.bits.get_bits(self.start + i * VALUE_BITS as u64, VALUE_BITS)
    }
}

impl SequenceEnumerator for UncompressedEnumerator<'_> {
    fn size(&self) -> u64 {
        self.n
    }

    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.n);
        self.position = position;
        self.value = if position < self.n { self.get(position) } else { self.universe };
        (self.position, self.value)
    }

    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        let (mut lo, mut hi) = if self.position < self.n && lower_bound > self.value {
            (self.position + 1, self.n)
        } else {
            (0, self.n)
        };
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get(mid) < lower_bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        self.move_to(lo)
    }

    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.n);
        self.move_to(self.position + 1)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 { 0 } else { self.get(self.position - 1) }
    }
}

#[cfg(test)]
mod tests {
    use pvb_bits::BitVectorBuilder;

    use crate::{
        BuildConfig, GlobalParameters, SequenceFormat,
        test_util::{check_enumerator, random_values},
    };

    use super::{UncompressedUpperBounds, UpperBounds};

    #[test]
    fn test_aligned_table() {
        let params = GlobalParameters::default();
        let mut rng = fastrand::Rng::with_seed(3);
        let (values, universe) = random_values(&mut rng, 500, 100_000);
        let mut bvb = BitVectorBuilder::new();
        bvb.append_bits(1, 5);
        UncompressedUpperBounds::write(&mut bvb, &values, universe, &params, &BuildConfig::default())
            .unwrap();
        assert_eq!(bvb.len(), UncompressedUpperBounds::region_end(5, universe, 500, &params));
        let bits = bvb.build();
        let mut e = UncompressedUpperBounds::enumerator(&bits, 5, universe, 500, &params).unwrap();
        check_enumerator(&mut e, &values, universe);
    }

    #[test]
    fn test_rejects_wide_values() {
        let mut bvb = BitVectorBuilder::new();
        let values = [1u64, 1 << 33];
        let result = UncompressedUpperBounds::write(
            &mut bvb,
            &values,
            1 << 34,
            &GlobalParameters::default(),
            &BuildConfig::default(),
        );
        assert!(result.is_err());
    }
}
