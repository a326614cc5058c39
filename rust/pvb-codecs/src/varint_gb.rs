//! Group varint: each group of four values is led by a descriptor byte holding the
//! byte length minus one of every value in two bits, followed by the values in
//! little-endian order. The trailing group may be partial.

use pvb_common::Result;

use crate::{BlockCodec, BlockCodecKind, byte_at, group_count, read_le};

pub struct VarIntGbBlock;

impl BlockCodec for VarIntGbBlock {
    const KIND: BlockCodecKind = BlockCodecKind::VarIntGb;
    const FALLBACK_THRESHOLD: usize = 128;

    #[inline]
    fn posting_cost(value: u64, base: u64) -> u64 {
        debug_assert!(value >= base);
        8 * group_count(value - base, 8) + 2
    }

    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        for group in values.chunks(4) {
            let desc_pos = out.len();
            out.push(0);
            let mut desc = 0u8;
            for (j, &v) in group.iter().enumerate() {
                let len = group_count(v as u64, 8) as usize;
                desc |= ((len - 1) as u8) << (2 * j);
                out.extend_from_slice(&v.to_le_bytes()[..len]);
            }
            out[desc_pos] = desc;
        }
        Ok(())
    }

    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize> {
        let mut pos = 0;
        for group in out.chunks_mut(4) {
            let desc = byte_at(input, pos, Self::KIND)?;
            pos += 1;
            for (j, slot) in group.iter_mut().enumerate() {
                let len = ((desc >> (2 * j)) & 3) as usize + 1;
                *slot = read_le(input, pos, len, Self::KIND)?;
                pos += len;
            }
        }
        Ok(pos)
    }
}
