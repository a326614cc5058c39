//! Building a [`FreqIndex`] from a raw collection.

use std::borrow::Borrow;

use pvb_common::Result;
use pvb_sequence::{BuildConfig, GlobalParameters, SequenceFormat};

use crate::{FreqIndex, FreqIndexBuilder, PostingList};

/// Size summary of a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub terms: usize,
    pub postings: u64,
    pub docs_bits: u64,
    pub freqs_bits: u64,
}

impl IndexStats {
    pub fn docs_bits_per_posting(&self) -> f64 {
        self.docs_bits as f64 / self.postings.max(1) as f64
    }

    pub fn freqs_bits_per_posting(&self) -> f64 {
        self.freqs_bits as f64 / self.postings.max(1) as f64
    }
}

/// Adds every list of `lists`, in order, to a new index over `num_docs` documents.
pub fn create_index<D, F, I>(
    num_docs: u64,
    lists: I,
    params: &GlobalParameters,
    config: &BuildConfig,
) -> Result<(FreqIndex<D, F>, IndexStats)>
where
    D: SequenceFormat,
    F: SequenceFormat,
    I: IntoIterator,
    I::Item: Borrow<PostingList>,
{
    params.validate()?;
    config.validate()?;
    log::info!(
        "building index over {num_docs} documents, F = {}, {} worker threads",
        config.fix_cost,
        config.worker_threads
    );

    let mut builder = FreqIndexBuilder::<D, F>::new(num_docs, *params);
    let mut docs = Vec::new();
    let mut freqs = Vec::new();
    for list in lists {
        let list = list.borrow();
        list.validate(num_docs)?;
        docs.clear();
        docs.extend(list.docs.iter().map(|&d| d as u64));
        freqs.clear();
        freqs.extend(list.freqs.iter().map(|&f| f as u64));
        builder.add_posting_list(
            list.len() as u64,
            &docs,
            &freqs,
            list.occurrences(),
            config,
        )?;
        if builder.len() % 1_000_000 == 0 {
            log::debug!("{} lists, {} postings added", builder.len(), builder.postings());
        }
    }

    let postings = builder.postings();
    let index = builder.build();
    let stats = IndexStats {
        terms: index.size(),
        postings,
        docs_bits: index.docs_bits(),
        freqs_bits: index.freqs_bits(),
    };
    log::info!(
        "index built: {} terms, {} postings, {:.3} bits per docid, {:.3} bits per frequency",
        stats.terms,
        stats.postings,
        stats.docs_bits_per_posting(),
        stats.freqs_bits_per_posting()
    );
    Ok((index, stats))
}
