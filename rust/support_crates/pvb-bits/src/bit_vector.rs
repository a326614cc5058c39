//! Immutable bit vector with word-level rank/select style scans.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pvb_common::{Error, Result};

use crate::{
    BitCursor,
    broadword::{low_mask, select_in_word},
};

/// Frozen bit buffer produced by [`BitVectorBuilder::build`](crate::BitVectorBuilder::build).
///
/// Sequence enumerators borrow a `BitVector` for their whole lifetime; all reads go
/// through the methods below and never outlive the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    len: u64,
}

impl BitVector {
    pub(crate) fn from_parts(words: Vec<u64>, len: u64) -> BitVector {
        debug_assert_eq!(words.len() as u64, len.div_ceil(64));
        BitVector { words, len }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// The underlying storage viewed as bytes; bit `i` lives in byte `i / 8`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Bytes starting at bit position `pos`, which must be byte aligned, up to the
    /// last byte that holds bits of the vector.
    pub fn bytes_from(&self, pos: u64) -> &[u8] {
        debug_assert_eq!(pos % 8, 0);
        let end = self.len.div_ceil(8) as usize;
        let start = ((pos / 8) as usize).min(end);
        &self.as_bytes()[start..end]
    }

    pub fn cursor(&self, pos: u64) -> BitCursor<'_> {
        BitCursor::new(self, pos)
    }

    /// Fails with `RegionTooShort` unless `[pos, pos + bits)` lies within the vector.
    pub fn check_range(&self, element: &str, pos: u64, bits: u64) -> Result<()> {
        match pos.checked_add(bits) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::region_too_short(
                element,
                pos.saturating_add(bits),
                self.len,
            )),
        }
    }

    #[inline]
    pub fn get(&self, pos: u64) -> bool {
        debug_assert!(pos < self.len);
        (self.words[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
    }

    /// Reads `len <= 64` bits starting at `pos`.
    #[inline]
    pub fn get_bits(&self, pos: u64, len: u32) -> u64 {
        debug_assert!(pos + len as u64 <= self.len);
        if len == 0 {
            return 0;
        }
        let w = (pos / 64) as usize;
        let offset = (pos % 64) as u32;
        let lo = self.words[w] >> offset;
        if offset + len <= 64 {
            lo & low_mask(len)
        } else {
            (lo | (self.words[w + 1] << (64 - offset))) & low_mask(len)
        }
    }

    /// Position of the first set bit at or after `pos`.
    pub fn next_one(&self, pos: u64) -> Option<u64> {
        if pos >= self.len {
            return None;
        }
        let mut w = (pos / 64) as usize;
        let mut word = self.words[w] & (u64::MAX << (pos % 64));
        loop {
            if word != 0 {
                let found = w as u64 * 64 + word.trailing_zeros() as u64;
                return (found < self.len).then_some(found);
            }
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            word = self.words[w];
        }
    }

    /// Position of the last set bit strictly before `pos`.
    pub fn prev_one(&self, pos: u64) -> Option<u64> {
        let end = pos.min(self.len);
        if end == 0 {
            return None;
        }
        let last = end - 1;
        let mut w = (last / 64) as usize;
        let mut word = self.words[w] & low_mask((last % 64) as u32 + 1);
        loop {
            if word != 0 {
                return Some(w as u64 * 64 + 63 - word.leading_zeros() as u64);
            }
            if w == 0 {
                return None;
            }
            w -= 1;
            word = self.words[w];
        }
    }

    /// Position of the `k`-th (zero based) set bit at or after `pos`.
    pub fn select_one_from(&self, pos: u64, mut k: u64) -> Option<u64> {
        if pos >= self.len {
            return None;
        }
        let mut w = (pos / 64) as usize;
        let mut word = self.words[w] & (u64::MAX << (pos % 64));
        loop {
            let ones = word.count_ones() as u64;
            if k < ones {
                let found = w as u64 * 64 + select_in_word(word, k as u32) as u64;
                return (found < self.len).then_some(found);
            }
            k -= ones;
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            word = self.words[w];
        }
    }

    /// Position of the `k`-th (zero based) unset bit at or after `pos`.
    pub fn select_zero_from(&self, pos: u64, mut k: u64) -> Option<u64> {
        if pos >= self.len {
            return None;
        }
        let mut w = (pos / 64) as usize;
        let mut word = !self.words[w] & (u64::MAX << (pos % 64));
        loop {
            let zeros = word.count_ones() as u64;
            if k < zeros {
                let found = w as u64 * 64 + select_in_word(word, k as u32) as u64;
                return (found < self.len).then_some(found);
            }
            k -= zeros;
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            word = !self.words[w];
        }
    }

    /// Number of set bits in `[start, end)`.
    pub fn count_ones(&self, start: u64, end: u64) -> u64 {
        debug_assert!(start <= end && end <= self.len);
        if start == end {
            return 0;
        }
        let first = (start / 64) as usize;
        let last = ((end - 1) / 64) as usize;
        let head = u64::MAX << (start % 64);
        let tail = low_mask(((end - 1) % 64) as u32 + 1);
        if first == last {
            return (self.words[first] & head & tail).count_ones() as u64;
        }
        let mut count = (self.words[first] & head).count_ones() as u64;
        count += self.words[first + 1..last]
            .iter()
            .map(|w| w.count_ones() as u64)
            .sum::<u64>();
        count + (self.words[last] & tail).count_ones() as u64
    }

    /// Hints the CPU to pull the cache line holding bit `pos`.
    #[inline]
    pub fn prefetch(&self, pos: u64) {
        let w = (pos / 64) as usize;
        if let Some(word) = self.words.get(w) {
            let ptr = word as *const u64;
            #[cfg(target_arch = "x86_64")]
            unsafe {
                std::arch::x86_64::_mm_prefetch(ptr as *const i8, std::arch::x86_64::_MM_HINT_T0);
            }
            #[cfg(not(target_arch = "x86_64"))]
            {
                let _ = ptr;
            }
        }
    }

    /// Writes the bit length followed by the little-endian words.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_u64::<LittleEndian>(self.len)
            .map_err(|e| Error::io("bit vector length", e))?;
        for &word in &self.words {
            writer
                .write_u64::<LittleEndian>(word)
                .map_err(|e| Error::io("bit vector words", e))?;
        }
        Ok(())
    }

    /// Reads a bit vector previously written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(mut reader: R) -> Result<BitVector> {
        let len = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::io("bit vector length", e))?;
        let count = len.div_ceil(64) as usize;
        let mut words = vec![0u64; count];
        reader
            .read_u64_into::<LittleEndian>(&mut words)
            .map_err(|e| Error::io("bit vector words", e))?;
        if let Some(&last) = words.last() {
            let tail = (len % 64) as u32;
            if tail != 0 && last >> tail != 0 {
                return Err(Error::invalid_format(
                    "bit vector",
                    "bits set past the declared length",
                ));
            }
        }
        Ok(BitVector { words, len })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.words.len() * 8);
        out.extend_from_slice(&self.len.to_le_bytes());
        out.extend_from_slice(self.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<BitVector> {
        Self::read_from(bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::BitVectorBuilder;

    use super::BitVector;

    fn sparse(positions: &[u64], len: u64) -> BitVector {
        let mut b = BitVectorBuilder::new();
        b.append_zeros(len);
        for &p in positions {
            b.set_bit(p);
        }
        b.build()
    }

    #[test]
    fn test_scans() {
        let ones = [3u64, 64, 65, 190, 255];
        let bv = sparse(&ones, 300);
        assert_eq!(bv.next_one(0), Some(3));
        assert_eq!(bv.next_one(4), Some(64));
        assert_eq!(bv.next_one(66), Some(190));
        assert_eq!(bv.next_one(256), None);
        assert_eq!(bv.prev_one(64), Some(3));
        assert_eq!(bv.prev_one(65), Some(64));
        assert_eq!(bv.prev_one(300), Some(255));
        assert_eq!(bv.prev_one(3), None);
        assert_eq!(bv.select_one_from(0, 2), Some(65));
        assert_eq!(bv.select_one_from(64, 3), Some(255));
        assert_eq!(bv.select_one_from(64, 4), None);
        assert_eq!(bv.count_ones(0, 300), 5);
        assert_eq!(bv.count_ones(4, 65), 1);
        assert_eq!(bv.count_ones(64, 66), 2);
        assert_eq!(bv.select_zero_from(0, 3), Some(4));
        assert_eq!(bv.select_zero_from(63, 1), Some(66));
        assert_eq!(bv.select_zero_from(299, 0), Some(299));
        assert_eq!(bv.select_zero_from(299, 1), None);
    }

    #[test]
    fn test_random_select_matches_scan() {
        let mut rng = fastrand::Rng::with_seed(42);
        let len = 5000;
        let mut ones = (0..len).filter(|_| rng.u8(..) < 20).collect::<Vec<u64>>();
        ones.dedup();
        let bv = sparse(&ones, len);
        for _ in 0..200 {
            let start = rng.u64(0..len);
            let expected = ones.iter().copied().filter(|&p| p >= start).collect::<Vec<_>>();
            let k = rng.usize(0..expected.len().max(1));
            assert_eq!(bv.select_one_from(start, k as u64), expected.get(k).copied());
            assert_eq!(bv.next_one(start), expected.first().copied());
        }
    }

    #[test]
    fn test_persistence() {
        let mut b = BitVectorBuilder::new();
        for i in 0..100u64 {
            b.append_bits(i % 7, 3);
        }
        let bv = b.build();
        let bytes = bv.to_bytes();
        let restored = BitVector::from_bytes(&bytes).unwrap();
        assert_eq!(restored, bv);

        assert!(BitVector::from_bytes(&bytes[..bytes.len() - 3]).is_err());
        assert!(bv.check_range("probe", 290, 10).is_ok());
        assert!(bv.check_range("probe", 291, 10).is_err());
    }
}
