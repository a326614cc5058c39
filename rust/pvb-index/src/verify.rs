use std::borrow::Borrow;

use pvb_common::{Error, Result};
use pvb_sequence::SequenceFormat;

use crate::{FreqIndex, PostingList};

/// Compares every posting of `index` against the collection it was built from.
///
/// Fails with `VerificationMismatch` on the first differing length, docid or
/// frequency, or when the number of terms differs.
pub fn verify_collection<D, F, I>(index: &FreqIndex<D, F>, lists: I) -> Result<()>
where
    D: SequenceFormat,
    F: SequenceFormat,
    I: IntoIterator,
    I::Item: Borrow<PostingList>,
{
    let mut term = 0usize;
    for list in lists {
        let list = list.borrow();
        if term >= index.size() {
            return Err(Error::verification_mismatch(
                term,
                0,
                "term count",
                term as u64 + 1,
                index.size() as u64,
            ));
        }
        let mut e = index.get(term)?;
        if e.size() != list.len() as u64 {
            return Err(Error::verification_mismatch(
                term,
                0,
                "size",
                list.len() as u64,
                e.size(),
            ));
        }
        for (i, (&doc, &freq)) in list.docs.iter().zip(&list.freqs).enumerate() {
            if i > 0 {
                e.next();
            }
            if e.docid() != doc as u64 {
                return Err(Error::verification_mismatch(
                    term,
                    i as u64,
                    "docid",
                    doc as u64,
                    e.docid(),
                ));
            }
            let actual = e.freq();
            if actual != freq as u64 {
                return Err(Error::verification_mismatch(
                    term,
                    i as u64,
                    "freq",
                    freq as u64,
                    actual,
                ));
            }
        }
        term += 1;
        if term % 1_000_000 == 0 {
            log::debug!("{term} lists checked");
        }
    }
    if term != index.size() {
        return Err(Error::verification_mismatch(
            term,
            0,
            "term count",
            term as u64,
            index.size() as u64,
        ));
    }
    log::info!("{term} lists checked, index matches its source");
    Ok(())
}
