//! Docid and frequency sequences of every term, stored in two bit vector
//! collections.
//!
//! The docs region of a term starts with `gamma(occurrences)` and, when
//! `occurrences > 1`, the list length in `ceil_log2(occurrences + 1)` bits; a single
//! occurrence implies a single posting. The frequencies region is the
//! [`PositiveSequence`] of the frequencies with universe `occurrences + 1`.

use std::{
    io::{Read, Write},
    marker::PhantomData,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pvb_bits::{
    BitVectorBuilder, REGION_ALIGNMENT,
    broadword::ceil_log2,
    codes::{read_gamma_nonzero, write_gamma_nonzero},
    collection::{BitVectorCollection, BitVectorCollectionBuilder},
};
use pvb_common::{Error, Result, verify_arg};
use pvb_sequence::{
    BuildConfig, GlobalParameters, PositiveSequence, SequenceEnumerator, SequenceFormat,
    check_universe, positive_sequence::PositiveEnumerator,
};
use pvb_workflow::eager_pool;

pub struct FreqIndexBuilder<D, F> {
    params: GlobalParameters,
    num_docs: u64,
    docs: BitVectorCollectionBuilder,
    freqs: BitVectorCollectionBuilder,
    postings: u64,
    _formats: PhantomData<fn() -> (D, F)>,
}

impl<D: SequenceFormat, F: SequenceFormat> FreqIndexBuilder<D, F> {
    /// Starts an index over documents `0..num_docs`.
    pub fn new(num_docs: u64, params: GlobalParameters) -> FreqIndexBuilder<D, F> {
        FreqIndexBuilder {
            params,
            num_docs,
            docs: BitVectorCollectionBuilder::new(),
            freqs: BitVectorCollectionBuilder::new(),
            postings: 0,
            _formats: PhantomData,
        }
    }

    /// Appends the next term. `occurrences` is the sum of `freqs`.
    ///
    /// Docids and frequencies are encoded concurrently when the configuration
    /// allows more than one worker thread.
    pub fn add_posting_list(
        &mut self,
        n: u64,
        docs: &[u64],
        freqs: &[u64],
        occurrences: u64,
        config: &BuildConfig,
    ) -> Result<()> {
        if n == 0 {
            return Err(Error::invalid_arg("n", "posting list must be non-empty"));
        }
        verify_arg!(docs, docs.len() as u64 == n);
        verify_arg!(freqs, freqs.len() as u64 == n);
        if occurrences < n {
            return Err(Error::invalid_arg(
                "occurrences",
                format!("{occurrences} occurrences for {n} postings"),
            ));
        }
        check_universe(self.num_docs)?;
        check_universe(occurrences + 1)?;

        let params = self.params;
        let num_docs = self.num_docs;
        let encode_docs = || -> Result<BitVectorBuilder> {
            let mut bits = BitVectorBuilder::new();
            write_gamma_nonzero(&mut bits, occurrences);
            if occurrences > 1 {
                bits.append_bits(n, ceil_log2(occurrences + 1));
            }
            D::write(&mut bits, docs, num_docs, &params, config)?;
            bits.pad_to(REGION_ALIGNMENT);
            Ok(bits)
        };
        let encode_freqs = || -> Result<BitVectorBuilder> {
            let mut bits = BitVectorBuilder::new();
            PositiveSequence::<F>::write(&mut bits, freqs, occurrences + 1, &params, config)?;
            bits.pad_to(REGION_ALIGNMENT);
            Ok(bits)
        };
        let (docs_bits, freqs_bits) = if config.worker_threads > 1 {
            eager_pool::join(encode_docs, encode_freqs)
        } else {
            (encode_docs(), encode_freqs())
        };

        self.docs.append(&docs_bits?);
        self.freqs.append(&freqs_bits?);
        self.postings += n;
        Ok(())
    }

    /// Number of terms added so far.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn postings(&self) -> u64 {
        self.postings
    }

    pub fn build(self) -> FreqIndex<D, F> {
        FreqIndex {
            params: self.params,
            num_docs: self.num_docs,
            docs: self.docs.build(),
            freqs: self.freqs.build(),
            _formats: PhantomData,
        }
    }
}

pub struct FreqIndex<D, F> {
    params: GlobalParameters,
    num_docs: u64,
    docs: BitVectorCollection,
    freqs: BitVectorCollection,
    _formats: PhantomData<fn() -> (D, F)>,
}

impl<D: SequenceFormat, F: SequenceFormat> FreqIndex<D, F> {
    /// Number of terms.
    pub fn size(&self) -> usize {
        self.docs.len()
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn params(&self) -> &GlobalParameters {
        &self.params
    }

    /// Total size of the docs regions in bits.
    pub fn docs_bits(&self) -> u64 {
        self.docs.bits().len()
    }

    /// Total size of the frequency regions in bits.
    pub fn freqs_bits(&self) -> u64 {
        self.freqs.bits().len()
    }

    /// Opens the posting list of `term`, positioned on its first posting.
    pub fn get(&self, term: usize) -> Result<DocumentEnumerator<'_, D, F>> {
        if term >= self.size() {
            return Err(Error::invalid_arg(
                "term",
                format!("term {term} out of range for {} terms", self.size()),
            ));
        }
        let mut cursor = self.docs.bits().cursor(self.docs.offset(term));
        let occurrences = read_gamma_nonzero(&mut cursor)?;
        let n = if occurrences > 1 {
            cursor.take(ceil_log2(occurrences + 1))?
        } else {
            1
        };
        if n == 0 || n > occurrences {
            return Err(Error::invalid_format(
                "posting list header",
                format!("{n} postings with {occurrences} occurrences"),
            ));
        }
        let docs = D::enumerator(
            self.docs.bits(),
            cursor.position(),
            self.num_docs,
            n,
            &self.params,
        )?;
        let freqs = PositiveSequence::<F>::enumerator(
            self.freqs.bits(),
            self.freqs.offset(term),
            occurrences + 1,
            n,
            &self.params,
        )?;
        Ok(DocumentEnumerator::new(docs, freqs, occurrences))
    }

    /// Writes the parameters and both collections, little endian.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_u64::<LittleEndian>(self.num_docs)
            .map_err(|e| Error::io("index header", e))?;
        for field in [
            self.params.log_partition_size,
            self.params.ef_log_sampling0,
            self.params.ef_log_sampling1,
        ] {
            writer
                .write_u8(field)
                .map_err(|e| Error::io("index parameters", e))?;
        }
        self.docs.write_to(&mut writer)?;
        self.freqs.write_to(&mut writer)
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<FreqIndex<D, F>> {
        let num_docs = reader
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::io("index header", e))?;
        let mut fields = [0u8; 3];
        reader
            .read_exact(&mut fields)
            .map_err(|e| Error::io("index parameters", e))?;
        let params = GlobalParameters::default()
            .with_log_partition_size(fields[0])
            .with_ef_log_sampling(fields[1], fields[2]);
        params
            .validate()
            .map_err(|e| Error::invalid_format("index parameters", e.to_string()))?;
        let docs = BitVectorCollection::read_from(&mut reader)?;
        let freqs = BitVectorCollection::read_from(&mut reader)?;
        if docs.len() != freqs.len() {
            return Err(Error::invalid_format(
                "index",
                format!("{} docs regions, {} frequency regions", docs.len(), freqs.len()),
            ));
        }
        Ok(FreqIndex {
            params,
            num_docs,
            docs,
            freqs,
            _formats: PhantomData,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

/// Cursor over one posting list. Frequencies are only decoded when asked for.
pub struct DocumentEnumerator<'a, D: SequenceFormat + 'a, F: SequenceFormat + 'a> {
    docs: D::Enumerator<'a>,
    freqs: PositiveEnumerator<F::Enumerator<'a>>,
    occurrences: u64,
    position: u64,
    docid: u64,
}

impl<'a, D: SequenceFormat, F: SequenceFormat> DocumentEnumerator<'a, D, F> {
    fn new(
        docs: D::Enumerator<'a>,
        freqs: PositiveEnumerator<F::Enumerator<'a>>,
        occurrences: u64,
    ) -> DocumentEnumerator<'a, D, F> {
        let mut e = DocumentEnumerator {
            docs,
            freqs,
            occurrences,
            position: 0,
            docid: 0,
        };
        e.reset();
        e
    }

    /// Back to the first posting.
    pub fn reset(&mut self) {
        self.move_to(0);
    }

    #[inline]
    pub fn next(&mut self) {
        let (position, docid) = self.docs.next();
        self.position = position;
        self.docid = docid;
    }

    /// Moves to the first docid `>= lower_bound`; past the end the docid is the
    /// number of documents.
    #[inline]
    pub fn next_geq(&mut self, lower_bound: u64) {
        let (position, docid) = self.docs.next_geq(lower_bound);
        self.position = position;
        self.docid = docid;
    }

    #[inline]
    pub fn move_to(&mut self, position: u64) {
        let (position, docid) = self.docs.move_to(position);
        self.position = position;
        self.docid = docid;
    }

    #[inline]
    pub fn docid(&self) -> u64 {
        self.docid
    }

    /// Frequency of the current posting.
    #[inline]
    pub fn freq(&mut self) -> u64 {
        debug_assert!(self.position < self.size());
        self.freqs.move_to(self.position)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn size(&self) -> u64 {
        self.docs.size()
    }

    /// Sum of the frequencies of the list.
    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }
}
