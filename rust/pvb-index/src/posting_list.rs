use pvb_common::{Error, Result};

/// One term of a raw collection: sorted docids and their frequencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    pub docs: Vec<u32>,
    pub freqs: Vec<u32>,
}

impl PostingList {
    pub fn new(docs: Vec<u32>, freqs: Vec<u32>) -> PostingList {
        PostingList { docs, freqs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Sum of the frequencies.
    pub fn occurrences(&self) -> u64 {
        self.freqs.iter().map(|&f| f as u64).sum()
    }

    /// Checks that the list is non-empty, that docids are strictly increasing and
    /// below `num_docs`, and that every frequency is positive.
    pub fn validate(&self, num_docs: u64) -> Result<()> {
        if self.docs.is_empty() {
            return Err(Error::invalid_arg("docs", "posting list is empty"));
        }
        if self.docs.len() != self.freqs.len() {
            return Err(Error::invalid_arg(
                "freqs",
                format!("{} docids but {} frequencies", self.docs.len(), self.freqs.len()),
            ));
        }
        if let Some(i) = self.docs.windows(2).position(|w| w[0] >= w[1]) {
            return Err(Error::invalid_arg(
                "docs",
                format!("not strictly increasing at position {}", i + 1),
            ));
        }
        let last = self.docs[self.docs.len() - 1] as u64;
        if last >= num_docs {
            return Err(Error::invalid_arg(
                "docs",
                format!("docid {last} is not below {num_docs}"),
            ));
        }
        if let Some(i) = self.freqs.iter().position(|&f| f == 0) {
            return Err(Error::invalid_arg("freqs", format!("zero frequency at position {i}")));
        }
        Ok(())
    }
}
