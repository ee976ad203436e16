use std::path::Path;
use tokio::io::{copy, AsyncReadExt, AsyncWriteExt};
use utilities::logger::{instrument, trace, tracing};
use utilities::result::{DfsError, Result};
use wire::chunk::ChunkRequest;
use wire::frame;

/// Client side of the chunk transport protocol.
#[derive(Clone, Debug, Default)]
pub struct DataNodeService {}

impl DataNodeService {
    pub fn new() -> Self {
        Self {}
    }

    /// Streams a chunk file to a data node, naming the remaining replica
    /// holders as forwarding peers. Returns once the node has stored the
    /// bytes and reported them, which it signals by closing.
    #[instrument(skip(self, peers, chunk_path))]
    pub async fn write_chunk(
        &self,
        addr: &str,
        file_name: &str,
        extension: &str,
        chunk_number: u32,
        peers: &[String],
        chunk_path: &Path,
    ) -> Result<()> {
        let mut stream = frame::connect(addr).await?;
        ChunkRequest::Write {
            file_name: file_name.to_owned(),
            extension: extension.to_owned(),
            chunk_number,
            replication_factor: peers.len() as u32 + 1,
            peers: peers.to_vec(),
        }
        .encode(&mut stream)
        .await?;
        let mut chunk_file = tokio::fs::File::open(chunk_path).await?;
        copy(&mut chunk_file, &mut stream)
            .await
            .map_err(DfsError::transport)?;
        stream.shutdown().await.map_err(DfsError::transport)?;
        let mut sink = Vec::new();
        stream
            .read_to_end(&mut sink)
            .await
            .map_err(DfsError::transport)?;
        trace!("chunk acknowledged by close");
        Ok(())
    }

    /// Fetches one chunk into `dest`. `None` means the node closed
    /// without a payload, the missing-chunk signal.
    #[instrument(skip(self, dest))]
    pub async fn read_chunk(
        &self,
        addr: &str,
        file_name: &str,
        extension: &str,
        chunk_number: u32,
        dest: &Path,
    ) -> Result<Option<u32>> {
        let mut stream = frame::connect(addr).await?;
        ChunkRequest::Read {
            file_name: file_name.to_owned(),
            extension: extension.to_owned(),
            chunk_number,
        }
        .encode(&mut stream)
        .await?;
        match ChunkRequest::decode_opt(&mut stream).await? {
            None => Ok(None),
            Some(ChunkRequest::Read {
                chunk_number: received,
                ..
            }) => {
                let mut dest_file = tokio::fs::File::create(dest).await?;
                copy(&mut stream, &mut dest_file)
                    .await
                    .map_err(DfsError::transport)?;
                dest_file.flush().await?;
                Ok(Some(received))
            }
            Some(other) => Err(DfsError::protocol(format!(
                "unexpected header in a read reply: {other:?}"
            ))),
        }
    }

    /// Asks a data node to drop every chunk it holds of the file. No
    /// confirmation is awaited; the node's own callbacks clean the
    /// catalog.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, addr: &str, file_name: &str, extension: &str) -> Result<()> {
        let mut stream = frame::connect(addr).await?;
        ChunkRequest::Delete {
            file_name: file_name.to_owned(),
            extension: extension.to_owned(),
            chunk_number: 0,
        }
        .encode(&mut stream)
        .await?;
        stream.shutdown().await.map_err(DfsError::transport)?;
        Ok(())
    }
}
