//! Stream VByte: every 2-bit length code of the run comes first, packed four per
//! byte, followed by the little-endian value bytes. Keeping control and data apart
//! lets the decoder find every value length without touching the data stream.

use pvb_common::{Error, Result};

use crate::{BlockCodec, BlockCodecKind, group_count, read_le};

pub struct StreamVByteBlock;

impl BlockCodec for StreamVByteBlock {
    const KIND: BlockCodecKind = BlockCodecKind::StreamVByte;
    const FALLBACK_THRESHOLD: usize = 128;

    #[inline]
    fn posting_cost(value: u64, base: u64) -> u64 {
        debug_assert!(value >= base);
        8 * group_count(value - base, 8) + 2
    }

    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        let control_start = out.len();
        out.resize(control_start + values.len().div_ceil(4), 0);
        for (i, &v) in values.iter().enumerate() {
            let len = group_count(v as u64, 8) as usize;
            out[control_start + i / 4] |= ((len - 1) as u8) << (2 * (i % 4));
            out.extend_from_slice(&v.to_le_bytes()[..len]);
        }
        Ok(())
    }

    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize> {
        let control_len = out.len().div_ceil(4);
        let Some(control) = input.get(..control_len) else {
            return Err(Error::region_too_short(
                Self::KIND.name(),
                control_len as u64 * 8,
                input.len() as u64 * 8,
            ));
        };
        let mut pos = control_len;
        for (i, slot) in out.iter_mut().enumerate() {
            let len = ((control[i / 4] >> (2 * (i % 4))) & 3) as usize + 1;
            *slot = read_le(input, pos, len, Self::KIND)?;
            pos += len;
        }
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use crate::BlockCodec;

    use super::StreamVByteBlock;

    #[test]
    fn test_control_stream_first() {
        let values = [3u32, 1 << 8, 1 << 16, 1 << 24, 0];
        let mut out = Vec::new();
        StreamVByteBlock::encode_block(&values, &mut out).unwrap();
        assert_eq!(&out[..2], &[0b11_10_01_00, 0]);
        assert_eq!(out[2], 3);
        assert_eq!(out.len(), 2 + 1 + 2 + 3 + 4 + 1);

        let mut decoded = [0u32; 5];
        assert_eq!(StreamVByteBlock::decode_block(&out, &mut decoded).unwrap(), out.len());
        assert_eq!(decoded, values);
        assert!(StreamVByteBlock::decode_block(&out[..1], &mut decoded).is_err());
    }
}
