//! Universal integer codes for region headers.
//!
//! `gamma(x)` stores `x + 1` as a unary length prefix followed by its low bits,
//! `delta(x)` stores the length itself in gamma. Both are LSB first, matching the
//! builder's bit order.

use pvb_common::{Error, Result};

use crate::{BitCursor, BitVectorBuilder, broadword::msb};

pub fn write_gamma(bvb: &mut BitVectorBuilder, n: u64) {
    debug_assert!(n < u64::MAX);
    let nn = n + 1;
    let l = msb(nn);
    let hb = 1u64 << l;
    bvb.append_bits(hb, l + 1);
    bvb.append_bits(nn ^ hb, l);
}

pub fn write_gamma_nonzero(bvb: &mut BitVectorBuilder, n: u64) {
    debug_assert!(n > 0);
    write_gamma(bvb, n - 1);
}

pub fn write_delta(bvb: &mut BitVectorBuilder, n: u64) {
    debug_assert!(n < u64::MAX);
    let nn = n + 1;
    let l = msb(nn);
    let hb = 1u64 << l;
    write_gamma(bvb, l as u64);
    bvb.append_bits(nn ^ hb, l);
}

pub fn read_gamma(cursor: &mut BitCursor) -> Result<u64> {
    let l = cursor.skip_zeros()?;
    if l > 63 {
        return Err(Error::invalid_format("gamma code", "length prefix exceeds 63"));
    }
    Ok((cursor.take(l)? | (1u64 << l)) - 1)
}

pub fn read_gamma_nonzero(cursor: &mut BitCursor) -> Result<u64> {
    Ok(read_gamma(cursor)? + 1)
}

pub fn read_delta(cursor: &mut BitCursor) -> Result<u64> {
    let l = read_gamma(cursor)?;
    if l > 63 {
        return Err(Error::invalid_format("delta code", "length prefix exceeds 63"));
    }
    let l = l as u32;
    Ok((cursor.take(l)? | (1u64 << l)) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        let values = [0u64, 1, 2, 3, 7, 8, 1000, 1 << 31, (1 << 40) + 17];
        let mut b = BitVectorBuilder::new();
        for &v in &values {
            write_gamma(&mut b, v);
            write_delta(&mut b, v);
            write_gamma_nonzero(&mut b, v + 1);
        }
        let bv = b.build();
        let mut cursor = bv.cursor(0);
        for &v in &values {
            assert_eq!(read_gamma(&mut cursor).unwrap(), v);
            assert_eq!(read_delta(&mut cursor).unwrap(), v);
            assert_eq!(read_gamma_nonzero(&mut cursor).unwrap(), v + 1);
        }
        assert_eq!(cursor.position(), bv.len());
    }

    #[test]
    fn test_code_lengths() {
        let mut b = BitVectorBuilder::new();
        write_gamma(&mut b, 0);
        assert_eq!(b.len(), 1);
        write_gamma_nonzero(&mut b, 2);
        assert_eq!(b.len(), 4);
        write_delta(&mut b, 0);
        assert_eq!(b.len(), 5);
    }

    #[test]
    fn test_truncated_gamma() {
        let mut b = BitVectorBuilder::new();
        write_gamma(&mut b, 1000);
        let full = b.build();
        let mut truncated = BitVectorBuilder::new();
        truncated.append_bits(full.get_bits(0, 12), 12);
        let bv = truncated.build();
        assert!(read_gamma(&mut bv.cursor(0)).is_err());
    }
}
