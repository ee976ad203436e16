use crate::formats::{self, RecordRead, KV};
use std::path::{Path, PathBuf};
use utilities::result::{DfsError, Result};
use wire::chunk::split_hdfs_name;
use wire::job::RecordKind;

const TMP_TAG: &str = "-writechunk";

/// Splits a local file into record-aligned chunk files.
///
/// Each produced chunk holds whole records only and at most `chunk_size`
/// bytes, except that it always holds at least one record. A record that
/// would cross the boundary opens the next chunk instead; a record
/// strictly larger than `chunk_size` aborts the split.
pub struct ChunkSplitter {
    reader: Box<dyn RecordRead + Send>,
    kind: RecordKind,
    chunk_size: u64,
    stem: String,
    extension: String,
    tmp_dir: PathBuf,
    pending: Option<(KV, u64)>,
    next_chunk: u32,
    exhausted: bool,
}

impl ChunkSplitter {
    pub fn open(
        kind: RecordKind,
        local_path: &Path,
        chunk_size: u64,
        tmp_dir: &Path,
    ) -> Result<Self> {
        let file_name = local_path
            .to_str()
            .ok_or_else(|| DfsError::Io(format!("invalid path {local_path:?}")))?;
        let (stem, extension) = split_hdfs_name(file_name);
        Ok(Self {
            reader: formats::open_reader(kind, local_path)?,
            kind,
            chunk_size,
            stem,
            extension,
            tmp_dir: tmp_dir.to_owned(),
            pending: None,
            next_chunk: 0,
            exhausted: false,
        })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn read_record(&mut self) -> Result<Option<(KV, u64)>> {
        let before = self.reader.index();
        Ok(self
            .reader
            .read()?
            .map(|record| (record, self.reader.index() - before)))
    }

    /// Writes the next chunk to a temp file and returns its number and
    /// path, or `None` once the input is drained. The caller removes the
    /// temp file after shipping it.
    pub fn next_chunk(&mut self) -> Result<Option<(u32, PathBuf)>> {
        let first = match self.pending.take() {
            Some(held) => Some(held),
            None if self.exhausted => None,
            None => self.read_record()?,
        };
        let Some((first, first_len)) = first else {
            return Ok(None);
        };
        if first_len > self.chunk_size {
            return Err(DfsError::RecordTooLarge {
                record_bytes: first_len,
                chunk_size: self.chunk_size,
            });
        }
        let chunk_number = self.next_chunk;
        let path = self.tmp_dir.join(format!(
            "{}{TMP_TAG}{}{}",
            self.stem, chunk_number, self.extension
        ));
        let mut writer = formats::create_writer(self.kind, &path)?;
        writer.write(&first)?;
        let mut written = first_len;
        loop {
            match self.read_record()? {
                None => {
                    self.exhausted = true;
                    break;
                }
                Some((record, len)) => {
                    if written + len > self.chunk_size {
                        // the boundary record belongs to the next chunk
                        self.pending = Some((record, len));
                        break;
                    }
                    writer.write(&record)?;
                    written += len;
                }
            }
        }
        writer.flush()?;
        self.next_chunk += 1;
        Ok(Some((chunk_number, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn split(content: &str, chunk_size: u64) -> Result<Vec<String>> {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, content).unwrap();
        let mut splitter = ChunkSplitter::open(RecordKind::Line, &input, chunk_size, dir.path())?;
        let mut chunks = Vec::new();
        while let Some((number, path)) = splitter.next_chunk()? {
            assert_eq!(number as usize, chunks.len());
            chunks.push(fs::read_to_string(&path).unwrap());
            fs::remove_file(&path).unwrap();
        }
        Ok(chunks)
    }

    #[test]
    fn file_of_exactly_one_chunk_size_gives_one_chunk() {
        // two 6-byte lines, 12 bytes in total
        let chunks = split("hello\nworld\n", 12).unwrap();
        assert_eq!(chunks, vec!["hello\nworld\n"]);
    }

    #[test]
    fn one_byte_over_gives_a_second_chunk_with_one_record() {
        let chunks = split("hello\nworld\n", 11).unwrap();
        assert_eq!(chunks, vec!["hello\n", "world\n"]);
    }

    #[test]
    fn ten_byte_lines_with_sixteen_byte_chunks_give_three_chunks() {
        let line = "abcdefghi\n";
        let chunks = split(&line.repeat(3), 16).unwrap();
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(chunk, line);
        }
    }

    #[test]
    fn concatenated_chunks_equal_the_input() {
        let content = "one\ntwo\nthree\nfour\nfive\n";
        let chunks = split(content, 9).unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), content);
        // every chunk holds at least one whole record
        for chunk in &chunks {
            assert!(chunk.ends_with('\n'));
        }
    }

    #[test]
    fn oversized_record_aborts_the_split() {
        let result = split("this line is far too long for the chunk\n", 8);
        assert!(matches!(
            result,
            Err(DfsError::RecordTooLarge { chunk_size: 8, .. })
        ));
    }

    #[test]
    fn record_of_exactly_chunk_size_is_admitted() {
        let chunks = split("abcdefg\n", 8).unwrap();
        assert_eq!(chunks, vec!["abcdefg\n"]);
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        let chunks = split("", 8).unwrap();
        assert!(chunks.is_empty());
    }
}
