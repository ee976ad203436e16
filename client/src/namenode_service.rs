use utilities::logger::{instrument, tracing};
use utilities::result::{DfsError, Result};
use wire::frame;
use wire::namenode::{NameNodeRequest, NameNodeResponse};

/// Client stub for the name service operations the hdfs flows use.
#[derive(Clone, Debug)]
pub struct NameNodeService {
    addr: String,
}

impl NameNodeService {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn call(&self, request: &NameNodeRequest) -> Result<NameNodeResponse> {
        let response: std::result::Result<NameNodeResponse, DfsError> =
            frame::call(&self.addr, request).await?;
        response
    }

    async fn expect_servers(&self, request: &NameNodeRequest) -> Result<Vec<String>> {
        match self.call(request).await? {
            NameNodeResponse::Servers(servers) => Ok(servers),
            other => Err(DfsError::protocol(format!(
                "expected a server list from the name service, got {other:?}"
            ))),
        }
    }

    #[instrument(skip(self))]
    pub async fn write_chunk_request(&self, replication_factor: u32) -> Result<Vec<String>> {
        self.expect_servers(&NameNodeRequest::WriteChunk { replication_factor })
            .await
    }

    #[instrument(skip(self))]
    pub async fn read_file_request(&self, file_name: &str) -> Result<Vec<String>> {
        self.expect_servers(&NameNodeRequest::ReadFile {
            file_name: file_name.to_owned(),
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_file_request(&self, file_name: &str) -> Result<Vec<String>> {
        self.expect_servers(&NameNodeRequest::DeleteFile {
            file_name: file_name.to_owned(),
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn all_chunks_written(&self, file_name: &str) -> Result<()> {
        match self
            .call(&NameNodeRequest::AllChunksWritten {
                file_name: file_name.to_owned(),
            })
            .await?
        {
            NameNodeResponse::Ack => Ok(()),
            other => Err(DfsError::protocol(format!(
                "expected an ack from the name service, got {other:?}"
            ))),
        }
    }
}
