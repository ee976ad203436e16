use std::time::Duration;
use tokio::time::sleep;
use utilities::backoff::Backoff;
use utilities::logger::{error, trace};
use utilities::result::{DfsError, Result};
use wire::frame;
use wire::namenode::{NameNodeRequest, NameNodeResponse};

/// Client stub for the name service callbacks a data node issues.
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

    async fn expect_ack(&self, request: &NameNodeRequest) -> Result<()> {
        match self.call(request).await? {
            NameNodeResponse::Ack => Ok(()),
            other => Err(DfsError::protocol(format!(
                "expected an ack from the name service, got {other:?}"
            ))),
        }
    }

    pub async fn register(&self, self_addr: &str) -> Result<()> {
        self.expect_ack(&NameNodeRequest::RegisterDataNode {
            addr: self_addr.to_owned(),
        })
        .await
    }

    pub async fn chunk_written(
        &self,
        file_name: &str,
        chunk_size: u64,
        replication_factor: u32,
        chunk_number: u32,
        server: &str,
    ) -> Result<()> {
        // the wire header carries no file size, so zero stands in until
        // the writer declares the file complete
        self.expect_ack(&NameNodeRequest::ChunkWritten {
            file_name: file_name.to_owned(),
            file_size: 0,
            chunk_size,
            replication_factor,
            chunk_number,
            server: server.to_owned(),
        })
        .await
    }

    pub async fn chunk_deleted(
        &self,
        file_name: &str,
        chunk_number: u32,
        server: &str,
    ) -> Result<()> {
        self.expect_ack(&NameNodeRequest::ChunkDeleted {
            file_name: file_name.to_owned(),
            chunk_number,
            server: server.to_owned(),
        })
        .await
    }

    /// Registers with the name service, retrying until it answers, then
    /// keeps re-registering on an interval so the node stays in the live
    /// view.
    pub fn start_heartbeat(self, self_addr: String, period: Duration) {
        tokio::spawn(async move {
            let initial = Backoff::new(5, Duration::from_millis(250));
            if let Err(e) = initial.run(|| self.register(&self_addr)).await {
                error!(error = %e, "could not reach the name service, giving up");
                std::process::exit(1);
            }
            loop {
                sleep(period).await;
                match self.register(&self_addr).await {
                    Ok(_) => trace!("heartbeat sent"),
                    Err(e) => error!(error = %e, "error while sending heartbeat"),
                }
            }
        });
    }
}
