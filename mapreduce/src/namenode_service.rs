use std::time::Duration;
use tokio::time::sleep;
use utilities::backoff::Backoff;
use utilities::logger::{error, trace};
use utilities::result::{DfsError, Result};
use wire::frame;
use wire::namenode::{NameNodeRequest, NameNodeResponse};

/// Client stub for the name service operations the job side needs:
/// daemon registration and the live-daemon view.
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

    pub async fn register_daemon(&self, self_addr: &str) -> Result<()> {
        match self
            .call(&NameNodeRequest::RegisterDaemon {
                addr: self_addr.to_owned(),
            })
            .await?
        {
            NameNodeResponse::Ack => Ok(()),
            other => Err(DfsError::protocol(format!(
                "expected an ack from the name service, got {other:?}"
            ))),
        }
    }

    pub async fn available_daemons(&self) -> Result<Vec<String>> {
        match self.call(&NameNodeRequest::AvailableDaemons).await? {
            NameNodeResponse::Daemons(daemons) => Ok(daemons),
            other => Err(DfsError::protocol(format!(
                "expected the daemon list from the name service, got {other:?}"
            ))),
        }
    }

    /// Registers this daemon, retrying until the name service answers,
    /// then keeps the registration warm on an interval.
    pub fn start_heartbeat(self, self_addr: String, period: Duration) {
        tokio::spawn(async move {
            let initial = Backoff::new(5, Duration::from_millis(250));
            if let Err(e) = initial.run(|| self.register_daemon(&self_addr)).await {
                error!(error = %e, "could not reach the name service, giving up");
                std::process::exit(1);
            }
            loop {
                sleep(period).await;
                match self.register_daemon(&self_addr).await {
                    Ok(_) => trace!("heartbeat sent"),
                    Err(e) => error!(error = %e, "error while sending heartbeat"),
                }
            }
        });
    }
}
