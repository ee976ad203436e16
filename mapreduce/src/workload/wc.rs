//! Word count.

use client::formats::{RecordRead, RecordWrite, KV};
use std::collections::BTreeMap;
use utilities::result::{DfsError, Result};

/// Counts whitespace-separated tokens in the record values and emits one
/// `(word, count)` record per distinct word.
pub fn map(reader: Option<&mut dyn RecordRead>, writer: &mut dyn RecordWrite) -> Result<()> {
    let reader = reader.ok_or_else(|| DfsError::protocol("word count needs an input file"))?;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    while let Some(record) = reader.read()? {
        for token in record.value.split_whitespace() {
            *counts.entry(token.to_owned()).or_insert(0) += 1;
        }
    }
    for (word, count) in counts {
        writer.write(&KV::new(word, count.to_string()))?;
    }
    Ok(())
}

/// Sums the per-map counts per word.
pub fn reduce(reader: &mut dyn RecordRead, writer: &mut dyn RecordWrite) -> Result<()> {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    while let Some(record) = reader.read()? {
        let count: u64 = record
            .value
            .parse()
            .map_err(|e| DfsError::protocol(format!("bad count {:?}: {e}", record.value)))?;
        *totals.entry(record.key).or_insert(0) += count;
    }
    for (word, total) in totals {
        writer.write(&KV::new(word, total.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::formats::{KvReader, KvWriter, LineWriter};
    use std::collections::HashMap;

    #[test]
    fn word_count_end_to_end() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("words.txt");
        let mut writer = LineWriter::create(&input)?;
        for line in ["a b a", "b c", "a"] {
            writer.write(&KV::new("", line))?;
        }
        writer.flush()?;

        // two maps over the same input, as two chunks of it would run
        let mut shuffle = Vec::new();
        for part in 0..2u32 {
            let out = dir.path().join(format!("map-{part}.kv"));
            let mut reader = client::formats::LineReader::open(&input)?;
            let mut out_writer = KvWriter::create(&out)?;
            map(Some(&mut reader), &mut out_writer)?;
            out_writer.flush()?;
            shuffle.push(std::fs::read_to_string(&out)?);
        }
        let concatenated = dir.path().join("shuffle.kv");
        std::fs::write(&concatenated, shuffle.concat())?;

        let result = dir.path().join("reduce.kv");
        let mut reduce_reader = KvReader::open(&concatenated)?;
        let mut reduce_writer = KvWriter::create(&result)?;
        reduce(&mut reduce_reader, &mut reduce_writer)?;
        reduce_writer.flush()?;

        let mut totals = HashMap::new();
        let mut result_reader = KvReader::open(&result)?;
        while let Some(record) = result_reader.read()? {
            totals.insert(record.key, record.value);
        }
        // every count doubled: the same input went through two maps
        assert_eq!(totals["a"], "6");
        assert_eq!(totals["b"], "4");
        assert_eq!(totals["c"], "2");
        Ok(())
    }

    #[test]
    fn map_without_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.kv");
        let mut writer = KvWriter::create(&out).unwrap();
        assert!(map(None, &mut writer).is_err());
    }
}
