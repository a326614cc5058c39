//! Inverted index over partitioned sequences.
//!
//! A [`FreqIndex`] stores, for every term, the sorted document ids of its posting
//! list and the matching term frequencies. The docids use a sequence format `D`,
//! the frequencies are stored as [`PositiveSequence<F>`](pvb_sequence::PositiveSequence)
//! prefix sums. Lists are added through a [`FreqIndexBuilder`] and read back as
//! [`DocumentEnumerator`]s.
//!
//! [`create::create_index`] builds an index from a collection of
//! [`PostingList`]s, [`verify::verify_collection`] checks it against its source,
//! and [`encode::encode_lists`] encodes standalone sequences through the parallel
//! construction queue.

use pvb_codecs::VByteBlock;
use pvb_sequence::{IndexedSequence, PartitionedSequence, UniformPartitionedSequence};

pub mod create;
pub mod encode;
pub mod freq_index;
pub mod posting_list;
pub mod verify;

pub use create::{IndexStats, create_index};
pub use freq_index::{DocumentEnumerator, FreqIndex, FreqIndexBuilder};
pub use posting_list::PostingList;
pub use verify::verify_collection;

/// Variable partitions planned for block codec `C`, for docids and frequencies.
pub type OptIndex<C> = FreqIndex<PartitionedSequence<C>, PartitionedSequence<C>>;

/// Partitioned VByte index.
pub type OptVbIndex = OptIndex<VByteBlock>;

pub type UniformVbSequence = UniformPartitionedSequence<IndexedSequence<VByteBlock>>;

/// Fixed partitions of `1 << log_partition_size` postings.
pub type UniformVbIndex = FreqIndex<UniformVbSequence, UniformVbSequence>;
