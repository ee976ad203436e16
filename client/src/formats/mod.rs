//! Record-stream adapters over local files.
//!
//! A chunk boundary never falls mid-record, so everything that slices or
//! rebuilds files speaks in records: `read` yields the next whole record
//! and `index` the number of bytes consumed so far. The traits are
//! object-safe and synchronous; map and reduce bodies run them on
//! blocking tasks.

mod kv;
mod line;

pub use kv::{KvReader, KvWriter};
pub use line::{LineReader, LineWriter};

use std::path::Path;
use utilities::result::Result;
use wire::job::RecordKind;

/// One record. Line files carry the line number as key; kv files carry
/// both halves explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KV {
    pub key: String,
    pub value: String,
}

impl KV {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub trait RecordRead {
    /// Next record, or `None` at end of file.
    fn read(&mut self) -> Result<Option<KV>>;
    /// Bytes consumed from the underlying file so far.
    fn index(&self) -> u64;
}

pub trait RecordWrite {
    fn write(&mut self, record: &KV) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

pub fn open_reader(kind: RecordKind, path: &Path) -> Result<Box<dyn RecordRead + Send>> {
    Ok(match kind {
        RecordKind::Line => Box::new(LineReader::open(path)?),
        RecordKind::Kv => Box::new(KvReader::open(path)?),
    })
}

pub fn create_writer(kind: RecordKind, path: &Path) -> Result<Box<dyn RecordWrite + Send>> {
    Ok(match kind {
        RecordKind::Line => Box::new(LineWriter::create(path)?),
        RecordKind::Kv => Box::new(KvWriter::create(path)?),
    })
}
