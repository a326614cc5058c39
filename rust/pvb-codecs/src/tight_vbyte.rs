//! Variable-byte code with 7 payload bits per byte, low group first. The high bit
//! marks the *last* byte of a value.

use pvb_common::{Error, Result};

use crate::{BlockCodecKind, byte_at, group_count};

pub struct TightVByte;

impl TightVByte {
    #[inline]
    pub fn encoded_len(value: u32) -> usize {
        group_count(value as u64, 7) as usize
    }

    pub fn encode_one(mut value: u32, out: &mut Vec<u8>) {
        while value >= 0x80 {
            out.push((value & 0x7f) as u8);
            value >>= 7;
        }
        out.push(value as u8 | 0x80);
    }

    /// Decodes one value at `*pos` and advances `pos` past it.
    pub fn decode_one(input: &[u8], pos: &mut usize) -> Result<u32> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let b = byte_at(input, *pos, BlockCodecKind::Interpolative)?;
            *pos += 1;
            value |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 != 0 {
                break;
            }
            shift += 7;
            if shift > 28 {
                return Err(Error::invalid_format(
                    "tight vbyte",
                    "value longer than five bytes",
                ));
            }
        }
        u32::try_from(value)
            .map_err(|_| Error::invalid_format("tight vbyte", "value exceeds 32 bits"))
    }

    pub fn encode(values: &[u32], out: &mut Vec<u8>) {
        for &v in values {
            Self::encode_one(v, out);
        }
    }

    pub fn decode(input: &[u8], out: &mut [u32]) -> Result<usize> {
        let mut pos = 0;
        for slot in out.iter_mut() {
            *slot = Self::decode_one(input, &mut pos)?;
        }
        Ok(pos)
    }
}
