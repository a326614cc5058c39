//! Append-only bit accumulator used while writing sequence regions.

use crate::{BitVector, align::padding_u64, broadword::low_mask};

/// Growable bit buffer. Bits are stored LSB first inside little-endian `u64` words;
/// bits past `len` are always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitVectorBuilder {
    words: Vec<u64>,
    len: u64,
}

impl BitVectorBuilder {
    pub fn new() -> BitVectorBuilder {
        BitVectorBuilder::default()
    }

    pub fn with_capacity(bits: u64) -> BitVectorBuilder {
        BitVectorBuilder {
            words: Vec::with_capacity(bits.div_ceil(64) as usize),
            len: 0,
        }
    }

    /// Number of bits written so far.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, bit: bool) {
        self.append_bits(bit as u64, 1);
    }

    /// Appends the `len` low bits of `bits`, `len <= 64`.
    #[inline]
    pub fn append_bits(&mut self, bits: u64, len: u32) {
        debug_assert!(len <= 64);
        debug_assert!(len == 64 || bits >> len == 0, "{bits} does not fit {len} bits");
        if len == 0 {
            return;
        }
        let offset = (self.len % 64) as u32;
        if offset == 0 {
            self.words.push(bits);
        } else {
            let last = self.words.len() - 1;
            self.words[last] |= bits << offset;
            if len > 64 - offset {
                self.words.push(bits >> (64 - offset));
            }
        }
        self.len += len as u64;
    }

    /// Appends `count` zero bits.
    pub fn append_zeros(&mut self, count: u64) {
        self.len += count;
        self.words.resize(self.len.div_ceil(64) as usize, 0);
    }

    /// Appends whole bytes, first byte first.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        if self.len % 64 == 0 {
            let mut chunks = bytes.chunks_exact(8);
            for chunk in &mut chunks {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                self.words.push(u64::from_le_bytes(word));
                self.len += 64;
            }
            for &b in chunks.remainder() {
                self.append_bits(b as u64, 8);
            }
        } else {
            for &b in bytes {
                self.append_bits(b as u64, 8);
            }
        }
    }

    /// Appends the content of another builder.
    pub fn append(&mut self, other: &BitVectorBuilder) {
        if self.len % 64 == 0 {
            self.words.extend_from_slice(&other.words);
            self.len += other.len;
            return;
        }
        let full = (other.len / 64) as usize;
        for &word in &other.words[..full] {
            self.append_bits(word, 64);
        }
        let tail = (other.len % 64) as u32;
        if tail != 0 {
            self.append_bits(other.words[full], tail);
        }
    }

    /// Overwrites `len` bits at `pos`; the range must already have been written.
    pub fn set_bits(&mut self, pos: u64, bits: u64, len: u32) {
        debug_assert!(pos + len as u64 <= self.len);
        debug_assert!(len == 64 || bits >> len == 0);
        if len == 0 {
            return;
        }
        let mask = low_mask(len);
        let w = (pos / 64) as usize;
        let offset = (pos % 64) as u32;
        self.words[w] = (self.words[w] & !(mask << offset)) | (bits << offset);
        if offset + len > 64 {
            let shift = 64 - offset;
            self.words[w + 1] = (self.words[w + 1] & !(mask >> shift)) | (bits >> shift);
        }
    }

    #[inline]
    pub fn set_bit(&mut self, pos: u64) {
        debug_assert!(pos < self.len);
        self.words[(pos / 64) as usize] |= 1u64 << (pos % 64);
    }

    /// Zero-pads the builder up to the next multiple of `alignment` bits.
    pub fn pad_to(&mut self, alignment: u64) {
        let pad = padding_u64(self.len, alignment);
        self.append_zeros(pad);
    }

    pub fn build(self) -> BitVector {
        BitVector::from_parts(self.words, self.len)
    }
}
