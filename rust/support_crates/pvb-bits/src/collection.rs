//! Many independently written regions stored back to back in one bit vector.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pvb_common::{Error, Result};

use crate::{BitVector, BitVectorBuilder, REGION_ALIGNMENT};

#[derive(Debug, Default)]
pub struct BitVectorCollectionBuilder {
    bits: BitVectorBuilder,
    endpoints: Vec<u64>,
}

impl BitVectorCollectionBuilder {
    pub fn new() -> BitVectorCollectionBuilder {
        BitVectorCollectionBuilder::default()
    }

    /// Appends one region. Regions must be padded to [`REGION_ALIGNMENT`].
    pub fn append(&mut self, region: &BitVectorBuilder) {
        debug_assert_eq!(region.len() % REGION_ALIGNMENT, 0);
        self.bits.append(region);
        self.endpoints.push(self.bits.len());
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn build(self) -> BitVectorCollection {
        BitVectorCollection {
            bits: self.bits.build(),
            endpoints: self.endpoints,
        }
    }
}

/// Frozen collection; region `i` spans `[offset(i), end(i))` of [`bits`](Self::bits).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitVectorCollection {
    bits: BitVector,
    endpoints: Vec<u64>,
}

impl BitVectorCollection {
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    pub fn offset(&self, i: usize) -> u64 {
        if i == 0 { 0 } else { self.endpoints[i - 1] }
    }

    pub fn end(&self, i: usize) -> u64 {
        self.endpoints[i]
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_u64::<LittleEndian>(self.endpoints.len() as u64)
            .map_err(|e| Error::io("collection size", e))?;
        for &end in &self.endpoints {
            writer
                .write_u64::<LittleEndian>(end)
                .map_err(|e| Error::io("collection endpoints", e))?;
        }
        self.bits.write_to(writer)
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<BitVectorCollection> {
        let count = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::io("collection size", e))?;
        let mut endpoints = vec![0u64; count as usize];
        reader
            .read_u64_into::<LittleEndian>(&mut endpoints)
            .map_err(|e| Error::io("collection endpoints", e))?;
        let bits = BitVector::read_from(reader)?;
        let mut prev = 0;
        for &end in &endpoints {
            if end < prev || end > bits.len() {
                return Err(Error::invalid_format(
                    "collection endpoints",
                    format!("endpoint {end} outside [{prev}, {}]", bits.len()),
                ));
            }
            prev = end;
        }
        Ok(BitVectorCollection { bits, endpoints })
    }
}

#[cfg(test)]
mod tests {
    use crate::BitVectorBuilder;

    use super::{BitVectorCollection, BitVectorCollectionBuilder};

    #[test]
    fn test_collection_round_trip() {
        let mut builder = BitVectorCollectionBuilder::new();
        for i in 0..10u64 {
            let mut region = BitVectorBuilder::new();
            region.append_bits(i, 5);
            region.pad_to(8);
            region.append_bits(i * 3, 16);
            builder.append(&region);
        }
        let collection = builder.build();
        assert_eq!(collection.len(), 10);
        for i in 0..10usize {
            let offset = collection.offset(i);
            assert_eq!(offset, i as u64 * 24);
            assert_eq!(collection.bits().get_bits(offset, 5), i as u64);
            assert_eq!(collection.bits().get_bits(offset + 8, 16), i as u64 * 3);
        }

        let mut bytes = Vec::new();
        collection.write_to(&mut bytes).unwrap();
        let restored = BitVectorCollection::read_from(bytes.as_slice()).unwrap();
        assert_eq!(restored, collection);
    }
}
