//! Classic variable-byte code: 7 payload bits per byte, low group first, with the
//! high bit set while more bytes follow.

use pvb_common::{Error, Result};

use crate::{BlockCodec, BlockCodecKind, byte_at, group_count};

pub struct VByteBlock;

impl BlockCodec for VByteBlock {
    const KIND: BlockCodecKind = BlockCodecKind::VByte;
    const FALLBACK_THRESHOLD: usize = 0;

    #[inline]
    fn posting_cost(value: u64, base: u64) -> u64 {
        debug_assert!(value >= base);
        8 * group_count(value - base, 7)
    }

    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        for &v in values {
            let mut v = v;
            while v >= 0x80 {
                out.push((v as u8 & 0x7f) | 0x80);
                v >>= 7;
            }
            out.push(v as u8);
        }
        Ok(())
    }

    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize> {
        let mut pos = 0;
        for slot in out.iter_mut() {
            let mut value = 0u64;
            let mut shift = 0;
            loop {
                let b = byte_at(input, pos, Self::KIND)?;
                pos += 1;
                value |= ((b & 0x7f) as u64) << shift;
                if b & 0x80 == 0 {
                    break;
                }
                shift += 7;
                if shift > 28 {
                    return Err(Error::invalid_format(Self::KIND.name(), "value longer than five bytes"));
                }
            }
            *slot = u32::try_from(value)
                .map_err(|_| Error::invalid_format(Self::KIND.name(), "value exceeds 32 bits"))?;
        }
        Ok(pos)
    }
}
