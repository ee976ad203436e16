use crate::manager_service::ManagerService;
use crate::workload;
use client::datanode_service::DataNodeService;
use client::formats::{self, RecordRead};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use utilities::logger::{error, info, span, Instrument, Level, Span};
use utilities::result::{DfsError, Result};
use wire::chunk::split_hdfs_name;
use wire::frame;
use wire::job::{DaemonRequest, DaemonResponse, RecordKind, TaskSpec};

/// Everything a map task needs from its host: the chunk directory it
/// shares with the colocated data node, scratch space, and where to push
/// outputs and report completions.
pub struct DaemonContext {
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    pub datanode_addr: String,
    pub manager: ManagerService,
}

/// One worker host's map executor. A `RunMap` is acknowledged right
/// away; the task itself runs on its own task and reports to the job
/// manager when done.
pub struct DaemonServer {
    listener: TcpListener,
    ctx: Arc<DaemonContext>,
}

impl DaemonServer {
    pub async fn bind(addr: &str, ctx: DaemonContext) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(DfsError::transport)?;
        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
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
            let ctx = self.ctx.clone();
            let span = Span::current();
            tokio::spawn(
                async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        error!(error = %e, "error while handling a daemon connection");
                    }
                }
                .instrument(span),
            );
        }
    }
}

async fn handle_connection(mut stream: TcpStream, ctx: Arc<DaemonContext>) -> Result<()> {
    let request: DaemonRequest = frame::recv(&mut stream).await?;
    let DaemonRequest::RunMap {
        workload,
        input,
        output_file,
        job_id,
        map_index,
    } = request;
    let response: Result<DaemonResponse> = Ok(DaemonResponse::Ack);
    frame::send(&mut stream, &response).await?;
    let task_span = span!(Level::INFO, "map_task", job_id, map_index, %workload);
    tokio::spawn(
        async move {
            match execute_map(ctx, &workload, input, &output_file, job_id, map_index).await {
                Ok(_) => info!("map task finished"),
                // no completion report: the job stalls at the barrier
                // and the submitter gives up on it
                Err(e) => error!(error = %e, "map task failed"),
            }
        }
        .instrument(task_span),
    );
    Ok(())
}

async fn execute_map(
    ctx: Arc<DaemonContext>,
    workload_name: &str,
    input: Option<TaskSpec>,
    output_file: &str,
    job_id: u64,
    map_index: u32,
) -> Result<()> {
    let workload = workload::named(workload_name)?;
    let (out_stem, out_extension) = split_hdfs_name(output_file);
    let tmp_out = ctx
        .work_dir
        .join(format!("{out_stem}-map{map_index}{out_extension}"));
    let data_dir = ctx.data_dir.clone();
    let map_out = tmp_out.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut reader: Option<Box<dyn RecordRead + Send>> = match &input {
            Some(spec) => Some(formats::open_reader(
                spec.kind,
                &data_dir.join(&spec.chunk_file),
            )?),
            None => None,
        };
        let mut writer = formats::create_writer(RecordKind::Kv, &map_out)?;
        (workload.map_fn)(
            reader.as_mut().map(|r| r.as_mut() as &mut dyn RecordRead),
            writer.as_mut(),
        )?;
        writer.flush()
    })
    .await
    .map_err(|e| DfsError::Io(format!("map task aborted: {e}")))??;
    // the output becomes chunk `map_index` of the job's output file; the
    // colocated data node registers it with the catalog before the
    // completion report releases the barrier
    DataNodeService::new()
        .write_chunk(
            &ctx.datanode_addr,
            &out_stem,
            &out_extension,
            map_index,
            &[],
            &tmp_out,
        )
        .await?;
    let _ = tokio::fs::remove_file(&tmp_out).await;
    ctx.manager.map_completed(job_id, map_index).await?;
    Ok(())
}
