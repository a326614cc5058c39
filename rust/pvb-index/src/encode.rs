//! Standalone encoding of many sequences through the construction queue.
//!
//! Each list becomes a record `end (64 bits) | universe (32) | n (32) | payload`,
//! where `end` is the bit position right after the record. Payloads are planned
//! and written in parallel and committed in input order, so the output does not
//! depend on the number of worker threads.

use std::marker::PhantomData;

use pvb_bits::{BitVector, BitVectorBuilder};
use pvb_codecs::BlockCodec;
use pvb_common::{Error, Result, verify_data};
use pvb_sequence::{
    BuildConfig, GlobalParameters, PartitionedSequence, PositiveSequence, SequenceEnumerator,
    SequenceFormat,
};
use pvb_workflow::semiasync_queue::{Job, SemiAsyncQueue};

const HEADER_BITS: u64 = 64 + 32 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Strictly increasing docids; the universe is the last docid plus one.
    Docs,
    /// Positive frequencies, stored as prefix sums; the universe is their sum
    /// plus one.
    Freqs,
}

/// Location and shape of one encoded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRecord {
    /// Bit offset of the payload.
    pub offset: u64,
    pub universe: u64,
    pub n: u64,
}

#[derive(Debug, Default)]
struct EncodeTarget {
    bits: BitVectorBuilder,
    lists: u64,
    postings: u64,
}

pub struct EncodedLists {
    kind: ListKind,
    params: GlobalParameters,
    bits: BitVector,
    lists: u64,
    postings: u64,
}

impl EncodedLists {
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    pub fn num_lists(&self) -> u64 {
        self.lists
    }

    pub fn num_postings(&self) -> u64 {
        self.postings
    }

    pub fn bits_per_posting(&self) -> f64 {
        self.bits.len() as f64 / self.postings.max(1) as f64
    }

    /// Walks the record headers.
    pub fn records(&self) -> Result<Vec<ListRecord>> {
        let mut records = Vec::with_capacity(self.lists as usize);
        let mut pos = 0;
        while pos < self.bits.len() {
            self.bits.check_range("list record header", pos, HEADER_BITS)?;
            let end = self.bits.get_bits(pos, 64);
            verify_data!(record_end, end >= pos + HEADER_BITS && end <= self.bits.len());
            records.push(ListRecord {
                offset: pos + HEADER_BITS,
                universe: self.bits.get_bits(pos + 64, 32),
                n: self.bits.get_bits(pos + 96, 32),
            });
            pos = end;
        }
        Ok(records)
    }

    /// Decodes one list written with block codec `C`.
    pub fn decode<C: BlockCodec>(&self, record: &ListRecord) -> Result<Vec<u64>> {
        let n = record.n;
        let mut out = Vec::with_capacity(n as usize);
        match self.kind {
            ListKind::Docs => {
                let mut e = PartitionedSequence::<C>::enumerator(
                    &self.bits,
                    record.offset,
                    record.universe,
                    n,
                    &self.params,
                )?;
                out.push(e.move_to(0).1);
                for _ in 1..n {
                    out.push(e.next().1);
                }
            }
            ListKind::Freqs => {
                let mut e = PositiveSequence::<PartitionedSequence<C>>::enumerator(
                    &self.bits,
                    record.offset,
                    record.universe,
                    n,
                    &self.params,
                )?;
                out.push(e.move_to(0));
                for _ in 1..n {
                    out.push(e.next());
                }
            }
        }
        Ok(out)
    }
}

struct SequenceAdder<C> {
    kind: ListKind,
    values: Vec<u64>,
    universe: u64,
    params: GlobalParameters,
    config: BuildConfig,
    encoded: BitVectorBuilder,
    _codec: PhantomData<fn() -> C>,
}

impl<C: BlockCodec> Job<EncodeTarget> for SequenceAdder<C> {
    fn prepare(&mut self) -> Result<()> {
        match self.kind {
            ListKind::Docs => PartitionedSequence::<C>::write(
                &mut self.encoded,
                &self.values,
                self.universe,
                &self.params,
                &self.config,
            ),
            ListKind::Freqs => PositiveSequence::<PartitionedSequence<C>>::write(
                &mut self.encoded,
                &self.values,
                self.universe,
                &self.params,
                &self.config,
            ),
        }
    }

    fn commit(self: Box<Self>, target: &mut EncodeTarget) -> Result<()> {
        let end = target.bits.len() + HEADER_BITS + self.encoded.len();
        target.bits.append_bits(end, 64);
        target.bits.append_bits(self.universe, 32);
        target.bits.append_bits(self.values.len() as u64, 32);
        target.bits.append(&self.encoded);
        target.lists += 1;
        target.postings += self.values.len() as u64;
        Ok(())
    }
}

/// Encodes every list of `lists` with [`PartitionedSequence<C>`].
///
/// Jobs are batched by their length against `config.work_per_thread`;
/// `config.worker_threads == 0` encodes everything on the calling thread.
pub fn encode_lists<C, I>(
    lists: I,
    kind: ListKind,
    params: &GlobalParameters,
    config: &BuildConfig,
) -> Result<EncodedLists>
where
    C: BlockCodec + 'static,
    I: IntoIterator<Item = Vec<u32>>,
{
    params.validate()?;
    config.validate()?;
    let mut queue = SemiAsyncQueue::new(
        EncodeTarget::default(),
        config.work_per_thread,
        config.worker_threads,
    );
    for (i, list) in lists.into_iter().enumerate() {
        if list.is_empty() {
            return Err(Error::invalid_arg("lists", format!("list {i} is empty")));
        }
        let values = list.into_iter().map(u64::from).collect::<Vec<_>>();
        let universe = match kind {
            ListKind::Docs => values[values.len() - 1] + 1,
            ListKind::Freqs => values.iter().sum::<u64>() + 1,
        };
        if universe > u32::MAX as u64 {
            return Err(Error::codec_overflow(C::KIND.name(), universe));
        }
        let n = values.len() as u64;
        let job = SequenceAdder::<C> {
            kind,
            values,
            universe,
            params: *params,
            config: config.clone(),
            encoded: BitVectorBuilder::new(),
            _codec: PhantomData,
        };
        queue.add_job(Box::new(job), n)?;
    }
    let target = queue.complete()?;
    let encoded = EncodedLists {
        kind,
        params: *params,
        bits: target.bits.build(),
        lists: target.lists,
        postings: target.postings,
    };
    log::info!(
        "encoded {} lists, {} integers, {:.3} bits per integer",
        encoded.lists,
        encoded.postings,
        encoded.bits_per_posting()
    );
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use pvb_codecs::{VByteBlock, VarIntGbBlock};
    use pvb_sequence::{BuildConfig, GlobalParameters};

    use super::{ListKind, encode_lists};

    fn lists(seed: u64) -> Vec<Vec<u32>> {
        let mut rng = fastrand::Rng::with_seed(seed);
        (0..40)
            .map(|i| {
                let len = if i % 10 == 0 { 2000 } else { rng.usize(1..200) };
                let mut cur = rng.u32(0..100);
                (0..len)
                    .map(|_| {
                        let v = cur;
                        cur += rng.u32(1..=50);
                        v
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_docs_round_trip() {
        let input = lists(3);
        let config = BuildConfig::default().with_worker_threads(0);
        let params = GlobalParameters::default();
        let encoded =
            encode_lists::<VByteBlock, _>(input.clone(), ListKind::Docs, &params, &config).unwrap();
        assert_eq!(encoded.num_lists(), 40);
        let records = encoded.records().unwrap();
        assert_eq!(records.len(), 40);
        for (record, list) in records.iter().zip(&input) {
            assert_eq!(record.universe, *list.last().unwrap() as u64 + 1);
            let decoded = encoded.decode::<VByteBlock>(record).unwrap();
            assert!(decoded.iter().copied().eq(list.iter().map(|&v| v as u64)));
        }
    }

    #[test]
    fn test_thread_count_does_not_change_output() {
        let freqs = lists(4)
            .into_iter()
            .map(|l| l.into_iter().map(|v| v % 7 + 1).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let params = GlobalParameters::default();
        let inline = BuildConfig::default().with_worker_threads(0);
        let threaded = BuildConfig::default()
            .with_worker_threads(3)
            .with_work_per_thread(500);
        let a = encode_lists::<VarIntGbBlock, _>(freqs.clone(), ListKind::Freqs, &params, &inline)
            .unwrap();
        let b = encode_lists::<VarIntGbBlock, _>(freqs.clone(), ListKind::Freqs, &params, &threaded)
            .unwrap();
        assert_eq!(a.bits(), b.bits());
        assert_eq!(a.num_postings(), b.num_postings());

        let records = b.records().unwrap();
        let decoded = b.decode::<VarIntGbBlock>(&records[7]).unwrap();
        assert!(decoded.iter().copied().eq(freqs[7].iter().map(|&v| v as u64)));
    }

    #[test]
    fn test_rejects_empty_list() {
        let config = BuildConfig::default().with_worker_threads(0);
        let result = encode_lists::<VByteBlock, _>(
            vec![vec![1, 2], vec![]],
            ListKind::Docs,
            &GlobalParameters::default(),
            &config,
        );
        assert!(result.is_err());
    }
}
