use super::{RecordRead, RecordWrite, KV};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use utilities::result::{DfsError, Result};

/// Key-value records, one per line, tab separated.
pub struct KvReader {
    reader: BufReader<File>,
    consumed: u64,
}

impl KvReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            consumed: 0,
        })
    }
}

impl RecordRead for KvReader {
    fn read(&mut self) -> Result<Option<KV>> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }
        self.consumed += bytes as u64;
        if line.ends_with('\n') {
            line.pop();
        }
        let (key, value) = line
            .split_once('\t')
            .ok_or_else(|| DfsError::protocol(format!("kv record without a separator: {line:?}")))?;
        Ok(Some(KV::new(key, value)))
    }

    fn index(&self) -> u64 {
        self.consumed
    }
}

pub struct KvWriter {
    writer: BufWriter<File>,
}

impl KvWriter {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl RecordWrite for KvWriter {
    fn write(&mut self, record: &KV) -> Result<()> {
        self.writer.write_all(record.key.as_bytes())?;
        self.writer.write_all(b"\t")?;
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
    fn kv_records_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("counts.kv");
        let mut writer = KvWriter::create(&path)?;
        writer.write(&KV::new("alpha", "3"))?;
        writer.write(&KV::new("beta", "1"))?;
        writer.flush()?;

        let mut reader = KvReader::open(&path)?;
        assert_eq!(reader.read()?, Some(KV::new("alpha", "3")));
        assert_eq!(reader.read()?, Some(KV::new("beta", "1")));
        assert_eq!(reader.read()?, None);
        assert_eq!(reader.index(), 15);
        Ok(())
    }

    #[test]
    fn malformed_kv_line_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.kv");
        std::fs::write(&path, "no separator here\n")?;
        let mut reader = KvReader::open(&path)?;
        assert!(reader.read().is_err());
        Ok(())
    }
}
