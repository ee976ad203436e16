use utilities::result::{DfsError, Result};
use wire::frame;
use wire::job::{DaemonRequest, DaemonResponse};

/// Client stub for dispatching map tasks to daemons.
#[derive(Clone, Debug, Default)]
pub struct DaemonService {}

impl DaemonService {
    pub fn new() -> Self {
        Self {}
    }

    /// Dispatches one map task. The daemon acknowledges before running
    /// it, so this returns as soon as the task is accepted.
    pub async fn run_map(&self, addr: &str, request: &DaemonRequest) -> Result<()> {
        let response: std::result::Result<DaemonResponse, DfsError> =
            frame::call(addr, request).await?;
        match response? {
            DaemonResponse::Ack => Ok(()),
        }
    }
}
