use pvb_common::{Error, Result};

use crate::BitVector;

/// Forward reader over a [`BitVector`] with bounds-checked field reads.
///
/// Region headers are decoded through a cursor so that a truncated or foreign
/// region surfaces as `RegionTooShort` instead of a misread.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    bits: &'a BitVector,
    pos: u64,
}

impl<'a> BitCursor<'a> {
    pub fn new(bits: &'a BitVector, pos: u64) -> BitCursor<'a> {
        BitCursor { bits, pos }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn bits(&self) -> &'a BitVector {
        self.bits
    }

    /// Reads the next `len <= 64` bits.
    #[inline]
    pub fn take(&mut self, len: u32) -> Result<u64> {
        self.bits.check_range("bit field", self.pos, len as u64)?;
        let value = self.bits.get_bits(self.pos, len);
        self.pos += len as u64;
        Ok(value)
    }

    /// Consumes a run of zeros and the terminating one; returns the run length.
    pub fn skip_zeros(&mut self) -> Result<u32> {
        match self.bits.next_one(self.pos) {
            Some(one) => {
                let zeros = one - self.pos;
                self.pos = one + 1;
                Ok(zeros as u32)
            }
            None => Err(Error::region_too_short(
                "unary code",
                self.bits.len() + 1,
                self.bits.len(),
            )),
        }
    }

    pub fn skip(&mut self, bits: u64) -> Result<()> {
        self.bits.check_range("skipped bits", self.pos, bits)?;
        self.pos += bits;
        Ok(())
    }

    /// Moves forward to the next multiple of `alignment` bits.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        let pad = crate::align::padding_u64(self.pos, alignment);
        self.skip(pad)
    }
}

#[cfg(test)]
mod tests {
    use pvb_common::ErrorKind;

    use crate::BitVectorBuilder;

    #[test]
    fn test_cursor_bounds() {
        let mut b = BitVectorBuilder::new();
        b.append_bits(0b0100, 4);
        b.append_bits(0x5a, 8);
        let bv = b.build();

        let mut cursor = bv.cursor(0);
        assert_eq!(cursor.skip_zeros().unwrap(), 2);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.take(1).unwrap(), 0);
        assert_eq!(cursor.take(8).unwrap(), 0x5a);
        let err = cursor.take(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::RegionTooShort { .. }));

        let mut cursor = bv.cursor(4);
        assert!(cursor.align(8).is_ok());
        assert_eq!(cursor.position(), 8);
        assert!(cursor.align(16).is_err());
    }
}
