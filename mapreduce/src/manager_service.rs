use utilities::result::{DfsError, Result};
use wire::frame;
use wire::job::{JobManagerRequest, JobManagerResponse, RecordKind};

/// Client stub for the job manager, used by the job client and by
/// daemons reporting completions.
#[derive(Clone, Debug)]
pub struct ManagerService {
    addr: String,
}

impl ManagerService {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn call(&self, request: &JobManagerRequest) -> Result<JobManagerResponse> {
        let response: std::result::Result<JobManagerResponse, DfsError> =
            frame::call(&self.addr, request).await?;
        response
    }

    async fn expect_ack(&self, request: &JobManagerRequest) -> Result<()> {
        match self.call(request).await? {
            JobManagerResponse::Ack => Ok(()),
            other => Err(DfsError::protocol(format!(
                "expected an ack from the job manager, got {other:?}"
            ))),
        }
    }

    pub async fn add_job(
        &self,
        workload: &str,
        input_format: Option<RecordKind>,
        input_file: Option<&str>,
    ) -> Result<u64> {
        match self
            .call(&JobManagerRequest::AddJob {
                workload: workload.to_owned(),
                input_format,
                input_file: input_file.map(str::to_owned),
            })
            .await?
        {
            JobManagerResponse::JobId(job_id) => Ok(job_id),
            other => Err(DfsError::protocol(format!(
                "expected a job id from the job manager, got {other:?}"
            ))),
        }
    }

    pub async fn start_job(&self, job_id: u64) -> Result<()> {
        self.expect_ack(&JobManagerRequest::StartJob { job_id }).await
    }

    pub async fn submit_map(&self, job_id: u64, map_index: u32) -> Result<()> {
        self.expect_ack(&JobManagerRequest::SubmitMap { job_id, map_index })
            .await
    }

    pub async fn map_completed(&self, job_id: u64, map_index: u32) -> Result<()> {
        self.expect_ack(&JobManagerRequest::MapCompleted { job_id, map_index })
            .await
    }

    pub async fn completed_maps(&self, job_id: u64) -> Result<u32> {
        match self.call(&JobManagerRequest::CompletedMaps { job_id }).await? {
            JobManagerResponse::MapCount(count) => Ok(count),
            other => Err(DfsError::protocol(format!(
                "expected a map count from the job manager, got {other:?}"
            ))),
        }
    }

    pub async fn available_daemons(&self) -> Result<Vec<String>> {
        match self.call(&JobManagerRequest::AvailableDaemons).await? {
            JobManagerResponse::Daemons(daemons) => Ok(daemons),
            other => Err(DfsError::protocol(format!(
                "expected the daemon list from the job manager, got {other:?}"
            ))),
        }
    }
}
