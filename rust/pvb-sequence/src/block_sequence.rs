//! Strictly increasing values stored as d-gaps in independently coded blocks.
//!
//! For values `v_0 < v_1 < ...` the stored gaps are `v_0` and `v_i - v_{i-1} - 1`.
//! Every `C::BLOCK_SIZE` gaps form one block; the last block may be shorter and then
//! usually goes through the codec's interpolative fallback. The region starts on a
//! byte boundary and holds nothing but the concatenated block payloads.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder, align::align_up_u64};
use pvb_codecs::BlockCodec;
use pvb_common::{Error, Result};

use crate::{BuildConfig, GlobalParameters, SequenceEnumerator, SequenceFormat, corrupt_region};

pub struct BlockSequence<C>(PhantomData<C>);

impl<C: BlockCodec> BlockSequence<C> {
    /// Encodes the block payloads of `values` into `out`.
    pub fn encode_payload(values: &[u64], out: &mut Vec<u8>) -> Result<()> {
        let mut gaps = Vec::with_capacity(C::BLOCK_SIZE.min(values.len()));
        let mut prev: Option<u64> = None;
        for chunk in values.chunks(C::BLOCK_SIZE) {
            gaps.clear();
            for &v in chunk {
                let gap = match prev {
                    Some(p) => v - p - 1,
                    None => v,
                };
                gaps.push(u32::try_from(gap).map_err(|_| Error::codec_overflow(C::KIND.name(), gap))?);
                prev = Some(v);
            }
            C::encode(&gaps, None, out)?;
        }
        Ok(())
    }

    /// Decodes all `n` values of the region at `offset`, reporting corruption as an
    /// error.
    pub fn decode(bits: &BitVector, offset: u64, n: u64, out: &mut Vec<u64>) -> Result<()> {
        let data = bits.bytes_from(align_up_u64(offset, 8));
        let mut buffer = vec![0u32; C::BLOCK_SIZE.min(n as usize)];
        let mut pos = 0;
        let mut prev: Option<u64> = None;
        let mut remaining = n as usize;
        while remaining > 0 {
            let len = remaining.min(C::BLOCK_SIZE);
            pos += C::decode(&data[pos..], &mut buffer[..len], None)?;
            for &gap in &buffer[..len] {
                let v = match prev {
                    Some(p) => p + gap as u64 + 1,
                    None => gap as u64,
                };
                out.push(v);
                prev = Some(v);
            }
            remaining -= len;
        }
        Ok(())
    }
}

impl<C: BlockCodec> SequenceFormat for BlockSequence<C> {
    type Enumerator<'a> = BlockSequenceEnumerator<'a, C>;

    fn write(
        bvb: &mut BitVectorBuilder,
        values: &[u64],
        universe: u64,
        _params: &GlobalParameters,
        _config: &BuildConfig,
    ) -> Result<()> {
        crate::check_monotone(values, universe)?;
        let mut out = Vec::new();
        Self::encode_payload(values, &mut out)?;
        bvb.pad_to(8);
        bvb.append_bytes(&out);
        Ok(())
    }

    fn enumerator<'a>(
        bits: &'a BitVector,
        offset: u64,
        universe: u64,
        n: u64,
        _params: &GlobalParameters,
    ) -> Result<BlockSequenceEnumerator<'a, C>> {
        BlockSequenceEnumerator::new(bits.bytes_from(align_up_u64(offset, 8)), universe, n)
    }
}

/// Walks the blocks front to back, keeping one decoded block. Moving backwards
/// restarts from the first block.
pub struct BlockSequenceEnumerator<'a, C> {
    data: &'a [u8],
    n: u64,
    universe: u64,
    /// Decoded values of the current block.
    buffer: Vec<u32>,
    block_len: usize,
    /// Index of the decoded block plus one; zero before the first decode.
    blocks_decoded: u64,
    next_block_offset: usize,
    /// Last value of the block before the current one.
    prev_block_last: Option<u64>,
    pos_in_block: usize,
    position: u64,
    value: u64,
    _codec: PhantomData<C>,
}

impl<'a, C: BlockCodec> BlockSequenceEnumerator<'a, C> {
    fn new(data: &'a [u8], universe: u64, n: u64) -> Result<BlockSequenceEnumerator<'a, C>> {
        let mut e = BlockSequenceEnumerator {
            data,
            n,
            universe,
            buffer: vec![0; C::BLOCK_SIZE.min(n as usize)],
            block_len: 0,
            blocks_decoded: 0,
            next_block_offset: 0,
            prev_block_last: None,
            pos_in_block: 0,
            position: n,
            value: universe,
            _codec: PhantomData,
        };
        if n > 0 {
            e.try_decode_next_block()?;
            e.position = 0;
            e.value = e.buffer[0] as u64;
        }
        Ok(e)
    }

    fn try_decode_next_block(&mut self) -> Result<()> {
        let block_start = self.blocks_decoded * C::BLOCK_SIZE as u64;
        debug_assert!(block_start < self.n);
        let len = (self.n - block_start).min(C::BLOCK_SIZE as u64) as usize;
        let prev_last = (self.blocks_decoded > 0).then(|| self.buffer_last());

        let input = &self.data[self.next_block_offset.min(self.data.len())..];
        let consumed = C::decode(input, &mut self.buffer[..len], None)?;
        let mut prev = prev_last;
        for slot in self.buffer[..len].iter_mut() {
            let v = match prev {
                Some(p) => p + *slot as u64 + 1,
                None => *slot as u64,
            };
            *slot = v as u32;
            prev = Some(v);
        }

        self.prev_block_last = prev_last;
        self.block_len = len;
        self.blocks_decoded += 1;
        self.next_block_offset += consumed;
        self.pos_in_block = 0;
        Ok(())
    }

    #[inline]
    fn buffer_last(&self) -> u64 {
        self.buffer[self.block_len - 1] as u64
    }

    #[inline]
    fn decode_next_block(&mut self) {
        if let Err(e) = self.try_decode_next_block() {
            corrupt_region(e);
        }
    }

    fn restart(&mut self) {
        self.blocks_decoded = 0;
        self.next_block_offset = 0;
        self.prev_block_last = None;
        self.decode_next_block();
    }

    fn block_start(&self) -> u64 {
        (self.blocks_decoded - 1) * C::BLOCK_SIZE as u64
    }

    fn set_end(&mut self) -> (u64, u64) {
        self.position = self.n;
        self.value = self.universe;
        (self.position, self.value)
    }

    #[inline]
    fn set_in_block(&mut self, pos_in_block: usize) -> (u64, u64) {
        self.pos_in_block = pos_in_block;
        self.position = self.block_start() + pos_in_block as u64;
        self.value = self.buffer[pos_in_block] as u64;
        (self.position, self.value)
    }
}

impl<C: BlockCodec> SequenceEnumerator for BlockSequenceEnumerator<'_, C> {
    fn size(&self) -> u64 {
        self.n
    }

    fn move_to(&mut self, position: u64) -> (u64, u64) {
        debug_assert!(position <= self.n);
        if position == self.n {
            // park on the last element first so that prev_value stays meaningful
            if self.n > 0 && self.position != self.n {
                self.move_to(self.n - 1);
            }
            return self.set_end();
        }
        let block = position / C::BLOCK_SIZE as u64;
        if block + 1 < self.blocks_decoded {
            self.restart();
        }
        while self.blocks_decoded < block + 1 {
            self.decode_next_block();
        }
        self.set_in_block((position % C::BLOCK_SIZE as u64) as usize)
    }

    fn next_geq(&mut self, lower_bound: u64) -> (u64, u64) {
        if self.n == 0 {
            return self.set_end();
        }
        if self.position > 0 && self.prev_value() >= lower_bound {
            self.restart();
            self.set_in_block(0);
        }
        if self.position == self.n {
            return self.set_end();
        }
        loop {
            if self.buffer_last() >= lower_bound {
                let start = self.pos_in_block;
                let idx = start
                    + self.buffer[start..self.block_len].partition_point(|&v| (v as u64) < lower_bound);
                return self.set_in_block(idx);
            }
            if self.block_start() + self.block_len as u64 >= self.n {
                return self.set_end();
            }
            self.decode_next_block();
        }
    }

    fn next(&mut self) -> (u64, u64) {
        debug_assert!(self.position < self.n);
        if self.position + 1 == self.n {
            return self.set_end();
        }
        if self.pos_in_block + 1 == self.block_len {
            self.decode_next_block();
            return self.set_in_block(0);
        }
        self.set_in_block(self.pos_in_block + 1)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn prev_value(&self) -> u64 {
        if self.position == 0 {
            0
        } else if self.position == self.n {
            self.buffer_last()
        } else if self.pos_in_block > 0 {
            self.buffer[self.pos_in_block - 1] as u64
        } else {
            self.prev_block_last.unwrap_or(0)
        }
    }
}
