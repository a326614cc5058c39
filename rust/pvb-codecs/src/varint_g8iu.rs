//! Group of eight data bytes with a unary descriptor (G8IU). Each group is one
//! descriptor byte followed by eight data bytes holding whole values only; bit `i`
//! of the descriptor is set when data byte `i` ends a value. Bytes a value would
//! not fit into are left as padding and the value starts the next group.

use pvb_common::{Error, Result};

use crate::{BlockCodec, BlockCodecKind, group_count};

const GROUP_DATA_BYTES: usize = 8;

pub struct VarIntG8iuBlock;

impl BlockCodec for VarIntG8iuBlock {
    const KIND: BlockCodecKind = BlockCodecKind::VarIntG8iu;
    const FALLBACK_THRESHOLD: usize = 8;

    #[inline]
    fn posting_cost(value: u64, base: u64) -> u64 {
        debug_assert!(value >= base);
        9 * group_count(value - base, 8)
    }

    fn encode_block(values: &[u32], out: &mut Vec<u8>) -> Result<()> {
        let mut desc = 0u8;
        let mut data = [0u8; GROUP_DATA_BYTES];
        let mut used = 0;
        for &v in values {
            let len = group_count(v as u64, 8) as usize;
            if used + len > GROUP_DATA_BYTES {
                flush_group(out, &mut desc, &mut data, &mut used);
            }
            data[used..used + len].copy_from_slice(&v.to_le_bytes()[..len]);
            desc |= 1 << (used + len - 1);
            used += len;
        }
        if used > 0 {
            flush_group(out, &mut desc, &mut data, &mut used);
        }
        Ok(())
    }

    fn decode_block(input: &[u8], out: &mut [u32]) -> Result<usize> {
        let mut pos = 0;
        let mut decoded = 0;
        while decoded < out.len() {
            let Some(group) = input.get(pos..pos + 1 + GROUP_DATA_BYTES) else {
                return Err(Error::region_too_short(
                    Self::KIND.name(),
                    (pos + 1 + GROUP_DATA_BYTES) as u64 * 8,
                    input.len() as u64 * 8,
                ));
            };
            let mut desc = group[0];
            let data = &group[1..];
            if desc == 0 {
                return Err(Error::invalid_format(Self::KIND.name(), "empty group descriptor"));
            }
            let mut start = 0;
            while desc != 0 && decoded < out.len() {
                let end = desc.trailing_zeros() as usize;
                let len = end + 1 - start;
                if len > 4 {
                    return Err(Error::invalid_format(Self::KIND.name(), "value longer than four bytes"));
                }
                out[decoded] = data[start..=end]
                    .iter()
                    .rev()
                    .fold(0u32, |acc, &b| (acc << 8) | b as u32);
                decoded += 1;
                start = end + 1;
                desc &= desc - 1;
            }
            pos += 1 + GROUP_DATA_BYTES;
        }
        Ok(pos)
    }
}

fn flush_group(out: &mut Vec<u8>, desc: &mut u8, data: &mut [u8; GROUP_DATA_BYTES], used: &mut usize) {
    out.push(*desc);
    out.extend_from_slice(data);
    *desc = 0;
    *data = [0; GROUP_DATA_BYTES];
    *used = 0;
}

#[cfg(test)]
mod tests {
    use crate::BlockCodec;

    use super::VarIntG8iuBlock;

    #[test]
    fn test_values_never_straddle_groups() {
        // 3 + 3 bytes fill six slots; the next 3-byte value starts a new group
        let values = [0x010203u32, 0x040506, 0x070809, 1, 2, 3, 4, 5];
        let mut out = Vec::new();
        VarIntG8iuBlock::encode_block(&values, &mut out).unwrap();
        assert_eq!(out.len(), 18);
        assert_eq!(out[0], 0b0010_0100);
        assert_eq!(out[9], 0b1111_1100);

        let mut decoded = [0u32; 8];
        assert_eq!(VarIntG8iuBlock::decode_block(&out, &mut decoded).unwrap(), 18);
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_corrupt_descriptor() {
        let mut decoded = [0u32; 8];
        assert!(VarIntG8iuBlock::decode_block(&[0u8; 9], &mut decoded).is_err());
        assert!(VarIntG8iuBlock::decode_block(&[0xff; 5], &mut decoded).is_err());
    }
}
