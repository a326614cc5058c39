//! Partition payload that picks the cheapest of three encodings:
//!
//! - all ones: when `n == universe` the values are `0..n` and nothing is stored;
//! - bitmap: one bit per universe slot;
//! - blocks: a [`BlockSequence`] of d-gaps.
//!
//! Apart from the all-ones case, the region starts on a byte boundary with a one
//! byte tag naming the encoding.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder, align::align_up_u64};
use pvb_codecs::BlockCodec;
use pvb_common::{Error, Result};

use crate::{
    BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat,
    block_sequence::{BlockSequence, BlockSequenceEnumerator},
    corrupt_region,
};

const TAG_BITMAP: u64 = 1;
const TAG_BLOCKS: u64 = 2;

pub struct IndexedSequence<C>(PhantomData<C>);

impl<C: BlockCodec> IndexedSequence<C> {
    /// Estimated size in bits of `n` values in `universe` whose codec cost, summed
    /// over [`BlockCodec::posting_cost`], is `codec_cost`.
    #[inline]
    pub fn bitsize(codec_cost: u64, universe: u64, n: u64) -> u64 {
        if universe == n {
            return 0;
        }
        8 + align_up_u64(universe, 8).min(align_up_u64(codec_cost, 8))
    }
}

impl<C: BlockCodec> SequenceFormat for IndexedSequence<C> {
    type Enumerator<'a> = IndexedEnumerator<'a, C>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        _params: &GlobalParameters,
        _config: &BuildConfig,
    ) -> Result<()> {
        crate::check_monotone(values, universe)?;
        bvb.pad_to(8);
        let n = values.len() as u64;
        if n == universe {
            return Ok(());
        }
        let mut payload = Vec::new();
        BlockSequence::<C>::encode_payload(values, &mut payload)?;
        if universe.div_ceil(8) <= payload.len() as u64 {
            bvb.append_bits(TAG_BITMAP, 8);
            let start = bvb.len();
            bvb.append_zeros(universe);
            for &v in values {
                bvb.set_bit(start + v);
            }
            bvb.pad_to(8);
        } else {
            bvb.append_bits(TAG_BLOCKS, 8);
            bvb.append_bytes(&payload);
        }
        Ok(())
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        params: &GlobalParameters,
    ) -> Result<IndexedEnumerator<'a, C>> {
        if n == universe {
            return Ok(IndexedEnumerator::AllOnes(AllOnesEnumerator { n, position: 0 }));
        }
        let start = align_up_u64(offset, 8);
        bits.check_range("indexed sequence tag", start, 8)?;
        match bits.get_bits(start, 8) {
            TAG_BITMAP => Ok(IndexedEnumerator::Bitmap(BitmapEnumerator::new(
                bits,
                start + 8,
                universe,
                n,
            )?)),
            TAG_BLOCKS => Ok(IndexedEnumerator::Blocks(BlockSequence::<C>::enumerator(
                bits,
                start + 8,
                universe,
                n,
                params,
            )?)),
            tag => Err(Error::invalid_format(
                "indexed sequence tag",
                format!("unknown encoding {tag}"),
            )),
        }
    }
}

pub enum IndexedEnumerator<'a, C> {
    AllOnes(AllOnesEnumerator),
    Bitmap(BitmapEnumerator<'a>),
    Blocks(BlockSequenceEnumerator<'a, C>),
}

impl<C: BlockCodec> SequenceEnumerator for IndexedEnumerator<'_, C> {
    fn size(&self) -> u64 {
        match self {
            IndexedEnumerator::AllOnes(e) => e.size(),
            IndexedEnumerator::Bitmap(e) => e.size(),
            IndexedEnumerator::Blocks(e) => e.size(),
        }
    }

    #[inline]
    fn move_to(&mut self, position: u64) -> (u64, u64) {
        match self {
            IndexedEnumerator::AllOnes(e) => e.move_to(position),
            IndexedEnumerator::Bitmap(e) => e.move_to(position),
            IndexedEnumerator::Blocks(e) => e.move_to(position),
        }
    }

    #[inline]
    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        match self {
            IndexedEnumerator::AllOnes(e) => e.next_geq(lower_bound),
            IndexedEnumerator::Bitmap(e) => e.next_geq(lower_bound),
            IndexedEnumerator::Blocks(e) => e.next_geq(lower_bound),
        }
    }

    #[inline]
    fn next(&mut self) -> (u64, u64) {
        match self {
            IndexedEnumerator::AllOnes(e) => e.next(),
            IndexedEnumerator::Bitmap(e) => e.next(),
            IndexedEnumerator::Blocks(e) => e.next(),
        }
    }

    fn position(&self) -> u64 {
        match self {
            IndexedEnumerator::AllOnes(e) => e.position(),
            IndexedEnumerator::Bitmap(e) => e.position(),
            IndexedEnumerator::Blocks(e) => e.position(),
        }
    }

    fn prev_value(&self) -> u64 {
        match self {
            IndexedEnumerator::AllOnes(e) => e.prev_value(),
            IndexedEnumerator::Bitmap(e) => e.prev_value(),
            IndexedEnumerator::Blocks(e) => e.prev_value(),
        }
    }
}

/// The values `0..n`; the universe equals `n`.
pub struct AllOnesEnumerator {
    n: u64,
    position: u64,
}

impl SequenceEnumerator for AllOnesEnumerator {
    fn size(&self) -> u64 {
        self.n
    }

    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.n);
        self.position = position;
        (position, position)
    }

    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        self.move_to(lower_bound.min(self.n))
    }

    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.n);
        self.move_to(self.position + 1)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        self.position.saturating_sub(1)
    }
}

pub struct BitmapEnumerator<'a> {
    bits: &'a BitVector,
    start: u64,
    universe: u64,
    n: u64,
    position: u64,
    value: u64,
    /// Absolute position of the current bit, `start + universe` past-the-end.
    bit_pos: u64,
}

impl<'a> BitmapEnumerator<'a> {
    fn new(bits: &'a BitVector, start: u64, universe: u64, n: u64) -> Result<BitmapEnumerator<'a>> {
        bits.check_range("bitmap", start, universe)?;
        let first = bits
            .next_one(start)
            .filter(|&pos| pos < start + universe)
            .ok_or_else(|| Error::invalid_format("bitmap", "no bit set"))?;
        Ok(BitmapEnumerator {
            bits,
            start,
            universe,
            n,
            position: 0,
            value: first - start,
            bit_pos: first,
        })
    }

    fn set_end(&mut self) -> (u64, u64) {
        self.position = self.n;
        self.value = self.universe;
        self.bit_pos = self.start + self.universe;
        (self.position, self.value)
    }

    #[inline]
    fn set(&mut self, position: u64, bit_pos: u64) -> (u64, u64) {
        self.position = position;
        self.bit_pos = bit_pos;
        self.value = bit_pos - self.start;
        (position, self.value)
    }
}

impl SequenceEnumerator for BitmapEnumerator<'_> {
    fn size(&self) -> u64 {
        self.n
    }

    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.n);
        if position == self.n {
            return self.set_end();
        }
        let found = if position > self.position && self.position < self.n {
            self.bits
                .select_one_from(self.bit_pos + 1, position - self.position - 1)
        } else {
            self.bits.select_one_from(self.start, position)
        };
        match found {
            Some(bit_pos) => self.set(position, bit_pos),
            None => corrupt_region(Error::invalid_format("bitmap", "fewer bits set than elements")),
        }
    }

    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        if lower_bound >= self.universe {
            return self.set_end();
        }
        let end = self.start + self.universe;
        let Some(hit) = self.bits.next_one(self.start + lower_bound).filter(|&pos| pos < end) else {
            return self.set_end();
        };
        let position = if self.position < self.n && hit >= self.bit_pos {
            self.position + self.bits.count_ones(self.bit_pos, hit)
        } else {
            self.bits.count_ones(self.start, hit)
        };
        self.set(position, hit)
    }

    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.n);
        if self.position + 1 == self.n {
            return self.set_end();
        }
        match self.bits.next_one(self.bit_pos + 1) {
            Some(bit_pos) => self.set(self.position + 1, bit_pos),
            None => corrupt_region(Error::invalid_format("bitmap", "fewer bits set than elements")),
        }
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            return 0;
        }
        match self.bits.prev_one(self.bit_pos) {
            Some(bit_pos) => bit_pos - self.start,
            None => corrupt_region(Error::invalid_format("bitmap", "fewer bits set than elements")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pvb_bits::BitVectorBuilder;
    use pvb_codecs::{BlockCodec, VByteBlock};

    use crate::{
        BuildConfig, GlobalParameters, SequenceFormat,
        test_util::{check_enumerator, random_values},
    };

    use super::{IndexedEnumerator, IndexedSequence};

    fn build(values: &[u64], universe: u64) -> pvb_bits::BitVector {
        let mut bvb = BitVectorBuilder::new();
        bvb.append_bits(1, 1);
        IndexedSequence::<VByteBlock>::write(
            &mut bvb,
            values,
            universe,
            &GlobalParameters::default(),
            &BuildConfig::default(),
        )
        .unwrap();
        bvb.build()
    }

    #[test]
    fn test_picks_encoding() {
        let params = GlobalParameters::default();
        let cases: [(Vec<u64>, u64, &str); 3] = [
            ((0..50).collect(), 50, "all ones"),
            ((0..400).filter(|v| v % 3 != 0).collect(), 400, "bitmap"),
            ((0..40).map(|v| v * 1000).collect(), 40_000, "blocks"),
        ];
        for (values, universe, expected) in cases {
            let bits = build(&values, universe);
            let n = values.len() as u64;
            let mut e = IndexedSequence::<VByteBlock>::enumerator(&bits, 1, universe, n, &params).unwrap();
            let kind = match &e {
                IndexedEnumerator::AllOnes(_) => "all ones",
                IndexedEnumerator::Bitmap(_) => "bitmap",
                IndexedEnumerator::Blocks(_) => "blocks",
            };
            assert_eq!(kind, expected);
            check_enumerator(&mut e, &values, universe);
        }
    }

    #[test]
    fn test_random_payloads() {
        let params = GlobalParameters::default();
        let mut rng = fastrand::Rng::with_seed(21);
        for (n, max_gap) in [(1, 1), (1, 100), (129, 2), (600, 30)] {
            let (values, _) = random_values(&mut rng, n, max_gap);
            let universe = values[values.len() - 1] + 1;
            let bits = build(&values, universe);
            let mut e =
                IndexedSequence::<VByteBlock>::enumerator(&bits, 1, universe, n as u64, &params).unwrap();
            check_enumerator(&mut e, &values, universe);
        }
    }

    #[test]
    fn test_bitsize() {
        assert_eq!(IndexedSequence::<VByteBlock>::bitsize(1000, 77, 77), 0);
        assert_eq!(IndexedSequence::<VByteBlock>::bitsize(1000, 100, 60), 8 + 104);
        let cost = VByteBlock::posting_cost(500, 0) * 3;
        assert_eq!(IndexedSequence::<VByteBlock>::bitsize(cost, 1 << 20, 3), 8 + 48);
    }

    #[test]
    fn test_unknown_tag() {
        let mut bvb = BitVectorBuilder::new();
        bvb.append_bits(7, 8);
        bvb.append_bits(0, 64);
        let bits = bvb.build();
        let params = GlobalParameters::default();
        assert!(IndexedSequence::<VByteBlock>::enumerator(&bits, 0, 100, 3, &params).is_err());
    }
}
