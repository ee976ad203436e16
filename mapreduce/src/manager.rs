use crate::namenode_service::NameNodeService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use utilities::logger::{error, info, instrument, tracing, Instrument, Span};
use utilities::result::{DfsError, Result};
use wire::frame;
use wire::job::{JobManagerRequest, JobManagerResponse, RecordKind};

/// Book-keeping of one job. The manager only tallies; the job client
/// drives the maps.
#[derive(Debug)]
pub struct JobState {
    pub workload: String,
    pub input_format: Option<RecordKind>,
    pub input_file: Option<String>,
    pub started: bool,
    pub expected_maps: u32,
    pub completed_maps: u32,
}

pub struct JobManagerHandler {
    jobs: Mutex<HashMap<u64, JobState>>,
    next_job_id: AtomicU64,
    namenode: NameNodeService,
}

impl JobManagerHandler {
    pub fn new(namenode: NameNodeService) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
            namenode,
        }
    }

    #[instrument(name = "job_manager_request", skip(self))]
    pub async fn handle(&self, request: JobManagerRequest) -> Result<JobManagerResponse> {
        match request {
            JobManagerRequest::AddJob {
                workload,
                input_format,
                input_file,
            } => {
                let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
                let mut jobs = self.jobs.lock().await;
                jobs.insert(
                    job_id,
                    JobState {
                        workload,
                        input_format,
                        input_file,
                        started: false,
                        expected_maps: 0,
                        completed_maps: 0,
                    },
                );
                info!(job_id, "job registered");
                Ok(JobManagerResponse::JobId(job_id))
            }
            JobManagerRequest::StartJob { job_id } => {
                self.with_job(job_id, |job| {
                    job.started = true;
                    JobManagerResponse::Ack
                })
                .await
            }
            JobManagerRequest::SubmitMap { job_id, .. } => {
                self.with_job(job_id, |job| {
                    job.expected_maps += 1;
                    JobManagerResponse::Ack
                })
                .await
            }
            JobManagerRequest::MapCompleted { job_id, map_index } => {
                info!(job_id, map_index, "map completed");
                self.with_job(job_id, |job| {
                    job.completed_maps += 1;
                    JobManagerResponse::Ack
                })
                .await
            }
            JobManagerRequest::CompletedMaps { job_id } => {
                self.with_job(job_id, |job| JobManagerResponse::MapCount(job.completed_maps))
                    .await
            }
            JobManagerRequest::AvailableDaemons => {
                let daemons = self.namenode.available_daemons().await?;
                Ok(JobManagerResponse::Daemons(daemons))
            }
        }
    }

    async fn with_job<F>(&self, job_id: u64, apply: F) -> Result<JobManagerResponse>
    where
        F: FnOnce(&mut JobState) -> JobManagerResponse,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(&job_id).ok_or(DfsError::UnknownJob(job_id))?;
        Ok(apply(job))
    }
}

/// Long-lived control server of the job manager; one request and one
/// response per connection, like the name service.
pub struct JobManagerServer {
    listener: TcpListener,
    handler: Arc<JobManagerHandler>,
}

impl JobManagerServer {
    pub async fn bind(addr: &str, handler: JobManagerHandler) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(DfsError::transport)?;
        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(DfsError::transport)
    }

    pub async fn serve(self) -> Result<()> {
        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .map_err(DfsError::transport)?;
            let handler = self.handler.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) = handle_connection(stream, handler).await {
                        error!(error = %e, "error while handling a job manager connection");
                    }
                }
                .instrument(span),
            );
        }
    }
}

async fn handle_connection(mut stream: TcpStream, handler: Arc<JobManagerHandler>) -> Result<()> {
    let request: JobManagerRequest = frame::recv(&mut stream).await?;
    let response = handler.handle(request).await;
    frame::send(&mut stream, &response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> JobManagerHandler {
        JobManagerHandler::new(NameNodeService::new("127.0.0.1:1"))
    }

    async fn add_job(handler: &JobManagerHandler) -> u64 {
        match handler
            .handle(JobManagerRequest::AddJob {
                workload: "wc".to_owned(),
                input_format: Some(RecordKind::Line),
                input_file: Some("words.txt".to_owned()),
            })
            .await
            .unwrap()
        {
            JobManagerResponse::JobId(job_id) => job_id,
            other => panic!("expected a job id, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn job_ids_increase_monotonically() {
        let handler = handler();
        let first = add_job(&handler).await;
        let second = add_job(&handler).await;
        assert!(second > first);
    }

    #[tokio::test]
    async fn tallies_track_submissions_and_completions() {
        let handler = handler();
        let job_id = add_job(&handler).await;
        handler
            .handle(JobManagerRequest::StartJob { job_id })
            .await
            .unwrap();
        for map_index in 0..3 {
            handler
                .handle(JobManagerRequest::SubmitMap { job_id, map_index })
                .await
                .unwrap();
        }
        let mut observed = Vec::new();
        for map_index in 0..3 {
            handler
                .handle(JobManagerRequest::MapCompleted { job_id, map_index })
                .await
                .unwrap();
            match handler
                .handle(JobManagerRequest::CompletedMaps { job_id })
                .await
                .unwrap()
            {
                JobManagerResponse::MapCount(count) => observed.push(count),
                other => panic!("expected a count, got {other:?}"),
            }
        }
        // the completion tally is monotonic
        assert_eq!(observed, vec![1, 2, 3]);
        let jobs = handler.jobs.lock().await;
        let job = &jobs[&job_id];
        assert!(job.started);
        assert_eq!(job.expected_maps, 3);
        assert_eq!(job.completed_maps, 3);
    }

    #[tokio::test]
    async fn unknown_job_is_rejected() {
        let handler = handler();
        let result = handler
            .handle(JobManagerRequest::CompletedMaps { job_id: 99 })
            .await;
        assert_eq!(result, Err(DfsError::UnknownJob(99)));
    }
}
