//! Control messages understood by the name service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NameNodeRequest {
    /// Ask for placement of one new chunk; answers with up to
    /// `replication_factor` distinct live data node addresses.
    WriteChunk { replication_factor: u32 },
    /// Ask for one live replica holder per chunk of the file, in chunk
    /// order.
    ReadFile { file_name: String },
    /// Ask for the distinct live holders of any chunk of the file.
    DeleteFile { file_name: String },
    /// A data node reports that it now holds a chunk.
    ChunkWritten {
        file_name: String,
        file_size: u32,
        chunk_size: u64,
        replication_factor: u32,
        chunk_number: u32,
        server: String,
    },
    /// The writer declares the file complete.
    AllChunksWritten { file_name: String },
    /// A data node reports that it dropped a chunk replica.
    ChunkDeleted {
        file_name: String,
        chunk_number: u32,
        server: String,
    },
    /// Data node liveness heartbeat, idempotent.
    RegisterDataNode { addr: String },
    /// Daemon liveness heartbeat, idempotent.
    RegisterDaemon { addr: String },
    AvailableDaemons,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NameNodeResponse {
    Servers(Vec<String>),
    Daemons(Vec<String>),
    Ack,
}
