//! Index persistence through temporary files.

use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};

use pvb_index::FreqIndex;
use pvb_sequence::SequenceFormat;

/// Writes `index` to a new temporary file, positioned at its start.
pub fn write_index_file<D, F>(index: &FreqIndex<D, F>) -> anyhow::Result<tempfile::NamedTempFile>
where
    D: SequenceFormat,
    F: SequenceFormat,
{
    let mut file = tempfile::NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        index.write_to(&mut writer)?;
        writer.flush()?;
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

/// Saves `index` to a temporary file and loads it back.
pub fn reload_index<D, F>(index: &FreqIndex<D, F>) -> anyhow::Result<FreqIndex<D, F>>
where
    D: SequenceFormat,
    F: SequenceFormat,
{
    let file = write_index_file(index)?;
    let reloaded = FreqIndex::read_from(BufReader::new(file.reopen()?))?;
    Ok(reloaded)
}
