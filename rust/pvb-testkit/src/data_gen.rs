//! Synthetic posting-list collections.
//!
//! Every generator is driven by a seeded [`fastrand::Rng`], so a given
//! [`CollectionSpec`] always yields the same collection.

use std::collections::BTreeSet;

use pvb_index::PostingList;

/// Shape of a generated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub num_docs: u64,
    pub num_terms: usize,
    /// Shortest posting list, at least one posting.
    pub min_len: usize,
    /// Longest posting list, at most `num_docs` postings.
    pub max_len: usize,
    pub max_freq: u32,
    pub seed: u64,
}

impl Default for CollectionSpec {
    fn default() -> Self {
        CollectionSpec {
            num_docs: 100_000,
            num_terms: 64,
            min_len: 1,
            max_len: 5_000,
            max_freq: 100,
            seed: 42,
        }
    }
}

impl CollectionSpec {
    pub fn with_num_docs(mut self, num_docs: u64) -> Self {
        self.num_docs = num_docs;
        self
    }

    pub fn with_num_terms(mut self, num_terms: usize) -> Self {
        self.num_terms = num_terms;
        self
    }

    pub fn with_lengths(mut self, min_len: usize, max_len: usize) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Generates `spec.num_terms` posting lists. About half of them spread their
/// docids uniformly over the collection, the rest come in dense runs separated
/// by long jumps.
pub fn generate_collection(spec: &CollectionSpec) -> anyhow::Result<Vec<PostingList>> {
    anyhow::ensure!(spec.num_docs > 0, "empty document collection");
    anyhow::ensure!(
        spec.num_docs <= u32::MAX as u64 + 1,
        "{} documents do not fit 32-bit docids",
        spec.num_docs
    );
    anyhow::ensure!(
        spec.min_len >= 1 && spec.min_len <= spec.max_len,
        "invalid list lengths {}..={}",
        spec.min_len,
        spec.max_len
    );
    anyhow::ensure!(
        spec.max_len as u64 <= spec.num_docs,
        "lists of {} postings over {} documents",
        spec.max_len,
        spec.num_docs
    );
    anyhow::ensure!(spec.max_freq >= 1, "max_freq must be positive");

    let mut rng = fastrand::Rng::with_seed(spec.seed);
    let lists = (0..spec.num_terms)
        .map(|_| {
            let len = rng.usize(spec.min_len..=spec.max_len);
            let docs = if rng.bool() {
                uniform_docs(&mut rng, len, spec.num_docs)
            } else {
                clustered_docs(&mut rng, len, spec.num_docs)
            };
            let freqs = freqs(&mut rng, len, spec.max_freq);
            PostingList::new(docs, freqs)
        })
        .collect();
    Ok(lists)
}

/// `len` distinct docids drawn uniformly from `0..num_docs`, sorted.
pub fn uniform_docs(rng: &mut fastrand::Rng, len: usize, num_docs: u64) -> Vec<u32> {
    assert!(len as u64 <= num_docs);
    if len as u64 * 2 > num_docs {
        // selection sampling: keep each docid with probability needed / left
        let mut docs = Vec::with_capacity(len);
        let mut needed = len as u64;
        for doc in 0..num_docs {
            if needed == 0 {
                break;
            }
            if rng.u64(0..num_docs - doc) < needed {
                docs.push(doc as u32);
                needed -= 1;
            }
        }
        docs
    } else {
        let mut docs = BTreeSet::new();
        while docs.len() < len {
            docs.insert(rng.u64(0..num_docs) as u32);
        }
        docs.into_iter().collect()
    }
}

/// `len` sorted docids below `num_docs`, grouped in runs of small gaps.
pub fn clustered_docs(rng: &mut fastrand::Rng, len: usize, num_docs: u64) -> Vec<u32> {
    assert!(len as u64 <= num_docs);
    // total extra distance available on top of the minimal gap of one
    let mut slack = num_docs - len as u64;
    let mut docs = Vec::with_capacity(len);
    let mut run_left = 0usize;
    let mut next = 0u64;
    for _ in 0..len {
        let extra = if run_left == 0 {
            run_left = rng.usize(1..=256);
            rng.u64(0..=slack / 4)
        } else {
            run_left -= 1;
            rng.u64(0..=slack.min(3))
        };
        slack -= extra;
        next += extra;
        docs.push(next as u32);
        next += 1;
    }
    docs
}

/// Term frequencies: mostly small, with an occasional large one.
pub fn freqs(rng: &mut fastrand::Rng, len: usize, max_freq: u32) -> Vec<u32> {
    (0..len)
        .map(|_| {
            if rng.u8(..) < 16 {
                rng.u32(1..=max_freq)
            } else {
                rng.u32(1..=max_freq.min(3))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CollectionSpec, clustered_docs, generate_collection, uniform_docs};

    #[test]
    fn test_docs_stay_in_range() {
        let mut rng = fastrand::Rng::with_seed(9);
        for (len, num_docs) in [(1usize, 1u64), (10, 10), (600, 1000), (50, 1_000_000)] {
            for docs in [
                uniform_docs(&mut rng, len, num_docs),
                clustered_docs(&mut rng, len, num_docs),
            ] {
                assert_eq!(docs.len(), len);
                assert!(docs.windows(2).all(|w| w[0] < w[1]));
                assert!((*docs.last().unwrap() as u64) < num_docs);
            }
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let spec = CollectionSpec::default().with_num_terms(8).with_seed(5);
        let a = generate_collection(&spec).unwrap();
        let b = generate_collection(&spec).unwrap();
        assert_eq!(a, b);
        for list in &a {
            list.validate(spec.num_docs).unwrap();
        }
    }

    #[test]
    fn test_rejects_impossible_spec() {
        let spec = CollectionSpec::default()
            .with_num_docs(10)
            .with_lengths(1, 11);
        assert!(generate_collection(&spec).is_err());
    }
}
