//! Elias-Fano coding of a non-decreasing sequence with sampled skip pointers.
//!
//! Each value is split into `l` low bits, stored verbatim, and a high part stored
//! in unary: element `i` sets bit `(v_i >> l) + i` of the high-bits array. Two
//! pointer tables speed up random access:
//!
//! - `pointers1[k - 1]` is the high-bits position of element `k << ef_log_sampling1`;
//! - `pointers0[k - 1]` is the high-bits position where bucket `k << ef_log_sampling0`
//!   starts, that is where the first element with a high part at least that large
//!   lives.
//!
//! Region layout: `[pointers0][pointers1][high bits][low bits]`. Its size follows
//! from `(universe, n, params)` alone, so no length is stored.

use pvb_bits::{
    BitVector, BitVectorBuilder,
    broadword::{ceil_log2, low_mask, msb},
};
use pvb_common::{Error, Result, verify_arg};

use crate::{
    BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat, UpperBounds,
    corrupt_region,
};

/// Forward distance below which `move_to` and `next_geq` scan instead of
/// consulting the pointer tables.
const LINEAR_SCAN_THRESHOLD: u64 = 16;

pub struct CompactEliasFano;

impl CompactEliasFano {
    /// Encoded size in bits.
    pub fn bitsize(universe: u64, n: u64, params: &GlobalParameters) -> u64 {
        Offsets::new(0, universe, n, params).end
    }
}

impl SequenceFormat for CompactEliasFano {
    type Enumerator<'a> = EliasFanoEnumerator<'a>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        params: &GlobalParameters,
        _config: &BuildConfig,
    ) -> Result<()> {
        verify_arg!(values, !values.is_empty());
        if values.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::invalid_arg("values", "sequence is not sorted"));
        }
        verify_arg!(universe, values[values.len() - 1] < universe);

        let n = values.len() as u64;
        let of = Offsets::new(bvb.len(), universe, n, params);
        bvb.append_zeros(of.end - of.start);

        let mut next_bucket = 1u64;
        for (i, &v) in values.iter().enumerate() {
            let i = i as u64;
            let high = v >> of.lower_bits;
            bvb.set_bits(
                of.lower_bits_offset + i * of.lower_bits as u64,
                v & low_mask(of.lower_bits),
                of.lower_bits,
            );
            let high_pos = high + i;
            bvb.set_bit(of.higher_bits_offset + high_pos);

            if i > 0 && i & low_mask(of.log_sampling1) == 0 {
                let k = i >> of.log_sampling1;
                bvb.set_bits(of.pointer1_pos(k), high_pos, of.pointer_size);
            }
            while next_bucket <= of.pointers0 && next_bucket << of.log_sampling0 <= high {
                let bucket = next_bucket << of.log_sampling0;
                bvb.set_bits(of.pointer0_pos(next_bucket), bucket + i, of.pointer_size);
                next_bucket += 1;
            }
        }
        while next_bucket <= of.pointers0 {
            let bucket = next_bucket << of.log_sampling0;
            bvb.set_bits(of.pointer0_pos(next_bucket), bucket + n, of.pointer_size);
            next_bucket += 1;
        }
        Ok(())
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<EliasFanoEnumerator<'a>> {
        EliasFanoEnumerator::new(bits, offset, universe, n, params)
    }
}

impl UpperBounds for CompactEliasFano {
    fn region_end(offset: u64, universe: u64, n: u64, params: &GlobalParameters) -> u64 {
        Offsets::new(offset, universe, n, params).end
    }
}

#[derive(Debug, Clone, Copy)]
struct Offsets {
    start: u64,
    universe: u64,
    n: u64,
    log_sampling0: u32,
    log_sampling1: u32,
    lower_bits: u32,
    higher_bits_length: u64,
    pointer_size: u32,
    pointers0: u64,
    pointers1: u64,
    pointers0_offset: u64,
    pointers1_offset: u64,
    higher_bits_offset: u64,
    lower_bits_offset: u64,
    end: u64,
}

impl Offsets {
    fn new(start: u64, universe: u64, n: u64, params: &GlobalParameters) -> Offsets {
        let log_sampling0 = params.ef_log_sampling0 as u32;
        let log_sampling1 = params.ef_log_sampling1 as u32;
        let lower_bits = if n > 0 && universe > n { msb(universe / n) } else { 0 };
        let buckets = universe >> lower_bits;
        let higher_bits_length = n + buckets + 1;
        let pointer_size = ceil_log2(higher_bits_length);
        let pointers0 = buckets >> log_sampling0;
        let pointers1 = n.saturating_sub(1) >> log_sampling1;

        let pointers0_offset = start;
        let pointers1_offset = pointers0_offset + pointers0 * pointer_size as u64;
        let higher_bits_offset = pointers1_offset + pointers1 * pointer_size as u64;
        let lower_bits_offset = higher_bits_offset + higher_bits_length;
        let end = lower_bits_offset + n * lower_bits as u64;
        Offsets {
            start,
            universe,
            n,
            log_sampling0,
            log_sampling1,
            lower_bits,
            higher_bits_length,
            pointer_size,
            pointers0,
            pointers1,
            pointers0_offset,
            pointers1_offset,
            higher_bits_offset,
            lower_bits_offset,
            end,
        }
    }

    #[inline]
    fn pointer0_pos(&self, k: u64) -> u64 {
        debug_assert!(k >= 1 && k <= self.pointers0);
        self.pointers0_offset + (k - 1) * self.pointer_size as u64
    }

    #[inline]
    fn pointer1_pos(&self, k: u64) -> u64 {
        debug_assert!(k >= 1 && k <= self.pointers1);
        self.pointers1_offset + (k - 1) * self.pointer_size as u64
    }
}

pub struct EliasFanoEnumerator<'a> {
    bits: &'a BitVector,
    of: Offsets,
    position: u64,
    value: u64,
    /// Absolute position of the current element's high bit; one past the
    /// high-bits array when past-the-end.
    high_pos: u64,
}

impl<'a> EliasFanoEnumerator<'a> {
    fn new(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<EliasFanoEnumerator<'a>> {
        let of = Offsets::new(offset, universe, n, params);
        bits.check_range("elias-fano", of.start, of.end - of.start)?;
        let mut e = EliasFanoEnumerator {
            bits,
            of,
            position: n,
            value: universe,
            high_pos: of.higher_bits_offset + of.higher_bits_length,
        };
        if n > 0 {
            let first = bits
                .next_one(of.higher_bits_offset)
                .filter(|&pos| pos < of.lower_bits_offset)
                .ok_or_else(|| Error::invalid_format("elias-fano", "empty high bits"))?;
            e.position = 0;
            e.high_pos = first;
            e.value = e.read(0, first);
        }
        Ok(e)
    }

    #[inline]
    fn read(&self, position: u64, high_pos: u64) -> u64 {
        let high = high_pos - self.of.higher_bits_offset - position;
        let low = self.bits.get_bits(
            self.of.lower_bits_offset + position * self.of.lower_bits as u64,
            self.of.lower_bits,
        );
        (high << self.of.lower_bits) | low
    }

    #[inline]
    fn set(&mut self, position: u64, high_pos: u64) -> (u64, u64) {
        self.position = position;
        self.high_pos = high_pos;
        self.value = self.read(position, high_pos);
        (position, self.value)
    }

    fn set_end(&mut self) -> (u64, u64) {
        self.position = self.of.n;
        self.value = self.of.universe;
        self.high_pos = self.of.higher_bits_offset + self.of.higher_bits_length;
        (self.position, self.value)
    }

    fn pointer(&self, pos: u64) -> u64 {
        self.bits.get_bits(pos, self.of.pointer_size)
    }

    #[cold]
    fn slow_move(&self, position: u64) -> u64 {
        let k = position >> self.of.log_sampling1;
        let (start, rank) = if k == 0 {
            (self.of.higher_bits_offset, 0)
        } else {
            let ptr = self.pointer(self.of.pointer1_pos(k));
            (self.of.higher_bits_offset + ptr, k << self.of.log_sampling1)
        };
        self.bits
            .select_one_from(start, position - rank)
            .unwrap_or_else(|| corrupt_region(missing("high bit")))
    }

    #[cold]
    fn slow_next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        let bucket = lower_bound >> self.of.lower_bits;
        let k = (bucket >> self.of.log_sampling0).min(self.of.pointers0);
        let mut pos = if k == 0 {
            self.of.higher_bits_offset
        } else {
            self.of.higher_bits_offset + self.pointer(self.of.pointer0_pos(k))
        };
        let to_skip = bucket - (k << self.of.log_sampling0);
        if to_skip > 0 {
            pos = self
                .bits
                .select_zero_from(pos, to_skip - 1)
                .unwrap_or_else(|| corrupt_region(missing("bucket boundary")))
                + 1;
        }
        let mut position = pos - self.of.higher_bits_offset - bucket;
        loop {
            if position >= self.of.n {
                return self.set_end();
            }
            let high_pos = self
                .bits
                .next_one(pos)
                .unwrap_or_else(|| corrupt_region(missing("high bit")));
            if self.read(position, high_pos) >= lower_bound {
                return self.set(position, high_pos);
            }
            position += 1;
            pos = high_pos + 1;
        }
    }
}

impl SequenceEnumerator for EliasFanoEnumerator<'_> {
    fn size(&self) -> u64 {
        self.of.n
    }

    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.of.n);
        if position == self.position {
            return (self.position, self.value);
        }
        if position >= self.of.n {
            return self.set_end();
        }
        let skip = position.wrapping_sub(self.position);
        let high_pos = if position > self.position && skip <= LINEAR_SCAN_THRESHOLD {
            self.bits
                .select_one_from(self.high_pos + 1, skip - 1)
                .unwrap_or_else(|| corrupt_region(missing("high bit")))
        } else {
            self.slow_move(position)
        };
        self.set(position, high_pos)
    }

    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        if lower_bound >= self.of.universe {
            return self.set_end();
        }
        if self.position < self.of.n && lower_bound > self.value {
            let bucket_diff = (lower_bound >> self.of.lower_bits) - (self.value >> self.of.lower_bits);
            if bucket_diff <= LINEAR_SCAN_THRESHOLD {
                while self.position < self.of.n && self.value < lower_bound {
                    self.next();
                }
                return (self.position, self.value);
            }
        }
        self.slow_next_geq(lower_bound)
    }

    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.of.n);
        let position = self.position + 1;
        if position >= self.of.n {
            return self.set_end();
        }
        let high_pos = self
            .bits
            .next_one(self.high_pos + 1)
            .unwrap_or_else(|| corrupt_region(missing("high bit")));
        self.set(position, high_pos)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            return 0;
        }
        let high_pos = self
            .bits
            .prev_one(self.high_pos)
            .unwrap_or_else(|| corrupt_region(missing("high bit")));
        self.read(self.position - 1, high_pos)
    }
}

#[cold]
fn missing(what: &str) -> Error {
    Error::invalid_format("elias-fano", format!("missing {what}"))
}
