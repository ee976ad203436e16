use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub type Result<T> = std::result::Result<T, DfsError>;

/// Error taxonomy shared by every service. The enum is serializable so a
/// server can hand a failure back inside an RPC response and the caller
/// sees the same variant it would have seen locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DfsError {
    /// No live data node is registered, placement cannot proceed.
    NoDataNodes,
    /// No live daemon is registered, dispatch cannot proceed.
    NoDaemons,
    /// The catalog has no entry for the file.
    UnknownFile(String),
    /// The file exists but has not been declared complete.
    Incomplete(String),
    /// A chunk of the file has no replica on any live data node.
    NoLiveReplica { file_name: String, chunk_number: u32 },
    /// A single record is strictly larger than the chunk size.
    RecordTooLarge { record_bytes: u64, chunk_size: u64 },
    /// A read received a non-contiguous set of chunks.
    MissingChunks(String),
    /// No live daemon runs on the host holding a required chunk.
    LocalityUnsatisfied { host: String },
    /// The job manager has no job under this id.
    UnknownJob(u64),
    /// Socket or RPC level failure.
    TransportError(String),
    /// The metadata snapshot on disk could not be parsed.
    SnapshotCorrupt(String),
    /// A peer sent bytes that do not decode as the expected message.
    Protocol(String),
    /// Local file system failure.
    Io(String),
}

impl DfsError {
    pub fn transport(err: impl Display) -> Self {
        Self::TransportError(err.to_string())
    }
    pub fn protocol(err: impl Display) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl Display for DfsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataNodes => write!(f, "no data node server available"),
            Self::NoDaemons => write!(f, "no daemon available"),
            Self::UnknownFile(name) => write!(f, "file {name} unknown to the name service"),
            Self::Incomplete(name) => write!(f, "file {name} has missing chunk information"),
            Self::NoLiveReplica {
                file_name,
                chunk_number,
            } => write!(
                f,
                "no live replica for chunk {chunk_number} of file {file_name}"
            ),
            Self::RecordTooLarge {
                record_bytes,
                chunk_size,
            } => write!(
                f,
                "record of {record_bytes} bytes exceeds the chunk size {chunk_size}"
            ),
            Self::MissingChunks(name) => {
                write!(f, "at least one chunk of file {name} was not received")
            }
            Self::LocalityUnsatisfied { host } => {
                write!(f, "no live daemon on host {host}")
            }
            Self::UnknownJob(id) => write!(f, "job {id} unknown to the job manager"),
            Self::TransportError(msg) => write!(f, "transport error: {msg}"),
            Self::SnapshotCorrupt(msg) => write!(f, "metadata snapshot is corrupt: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for DfsError {}

impl From<std::io::Error> for DfsError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for DfsError {
    fn from(value: serde_json::Error) -> Self {
        Self::Protocol(value.to_string())
    }
}

impl From<std::string::FromUtf8Error> for DfsError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Protocol(value.to_string())
    }
}
