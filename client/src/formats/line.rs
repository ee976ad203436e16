use super::{RecordRead, RecordWrite, KV};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use utilities::result::Result;

/// Plain text, one record per line. The key of a record is its
/// one-based line number.
pub struct LineReader {
    reader: BufReader<File>,
    consumed: u64,
    line_number: u64,
}

impl LineReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            consumed: 0,
            line_number: 0,
        })
    }
}

impl RecordRead for LineReader {
    fn read(&mut self) -> Result<Option<KV>> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }
        self.consumed += bytes as u64;
        self.line_number += 1;
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(KV {
            key: self.line_number.to_string(),
            value: line,
        }))
    }

    fn index(&self) -> u64 {
        self.consumed
    }
}

pub struct LineWriter {
    writer: BufWriter<File>,
}

impl LineWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl RecordWrite for LineWriter {
    fn write(&mut self, record: &KV) -> Result<()> {
        self.writer.write_all(record.value.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_records_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("lines.txt");
        let mut writer = LineWriter::create(&path)?;
        writer.write(&KV::new("", "first line"))?;
        writer.write(&KV::new("", "second"))?;
        writer.flush()?;

        let mut reader = LineReader::open(&path)?;
        assert_eq!(reader.read()?, Some(KV::new("1", "first line")));
        assert_eq!(reader.index(), 11);
        assert_eq!(reader.read()?, Some(KV::new("2", "second")));
        assert_eq!(reader.index(), 18);
        assert_eq!(reader.read()?, None);
        Ok(())
    }
}
