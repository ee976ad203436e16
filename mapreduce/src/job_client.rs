use crate::daemon_service::DaemonService;
use crate::manager_service::ManagerService;
use client::formats::{KvReader, KvWriter, RecordRead, RecordWrite};
use client::hdfs::HdfsClient;
use client::namenode_service::NameNodeService;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use utilities::logger::{info, instrument, tracing};
use utilities::result::{DfsError, Result};
use wire::chunk::{chunk_file_name, split_hdfs_name};
use wire::job::{DaemonRequest, RecordKind, TaskSpec};

use crate::workload;

const BARRIER_POLL: Duration = Duration::from_millis(200);

/// What to run: a workload name plus either an input file already stored
/// in the file store, or nothing for a generator job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub workload: String,
    pub input: Option<JobInput>,
    /// Names the output files of a generator job; ignored when an input
    /// file provides the stem.
    pub job_name: String,
}

#[derive(Debug, Clone)]
pub struct JobInput {
    pub kind: RecordKind,
    pub file_name: String,
}

/// Drives one job end to end: submission, locality-routed dispatch, the
/// completion barrier, and the local reduce over the gathered outputs.
pub struct JobClient {
    namenode: NameNodeService,
    manager: ManagerService,
    daemons: DaemonService,
    hdfs: HdfsClient,
    tmp_dir: PathBuf,
    output_dir: PathBuf,
}

impl JobClient {
    pub fn new(
        namenode_addr: impl Into<String>,
        manager_addr: impl Into<String>,
        tmp_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let namenode_addr = namenode_addr.into();
        let tmp_dir = tmp_dir.into();
        Self {
            namenode: NameNodeService::new(namenode_addr.clone()),
            manager: ManagerService::new(manager_addr),
            daemons: DaemonService::new(),
            // the job client only reads through hdfs, the chunk size is
            // irrelevant here
            hdfs: HdfsClient::new(namenode_addr, tmp_dir.clone(), 64 * 1024 * 1024),
            tmp_dir,
            output_dir: output_dir.into(),
        }
    }

    /// Runs the job and returns the path of the reduce result file.
    #[instrument(skip(self, spec), fields(workload = %spec.workload))]
    pub async fn run(&self, spec: JobSpec) -> Result<PathBuf> {
        let job_workload = workload::named(&spec.workload)?;
        let job_id = self
            .manager
            .add_job(
                &spec.workload,
                spec.input.as_ref().map(|input| input.kind),
                spec.input.as_ref().map(|input| input.file_name.as_str()),
            )
            .await?;
        self.manager.start_job(job_id).await?;
        info!(job_id, "job submitted");

        let daemons = self.manager.available_daemons().await?;
        let chunk_holders = match &spec.input {
            Some(input) => self.namenode.read_file_request(&input.file_name).await?,
            None => Vec::new(),
        };
        let nb_maps = match &spec.input {
            Some(_) => chunk_holders.len() as u32,
            None => daemons.len() as u32,
        };
        let stem = match &spec.input {
            Some(input) => split_hdfs_name(&input.file_name).0,
            None => spec.job_name.clone(),
        };
        let output_file = format!("{stem}-map.kv");

        for map_index in 0..nb_maps {
            self.manager.submit_map(job_id, map_index).await?;
            let (daemon_addr, input_spec) = match &spec.input {
                Some(input) => {
                    // a map runs only on the daemon sharing its host with
                    // the chunk holder; there is no remote fallback
                    let holder = &chunk_holders[map_index as usize];
                    let host = host_of(holder);
                    let daemon = daemons
                        .iter()
                        .find(|daemon| host_of(daemon) == host)
                        .ok_or_else(|| DfsError::LocalityUnsatisfied {
                            host: host.to_owned(),
                        })?;
                    let (in_stem, in_extension) = split_hdfs_name(&input.file_name);
                    let task = TaskSpec {
                        kind: input.kind,
                        chunk_file: chunk_file_name(&in_stem, map_index, &in_extension),
                    };
                    (daemon.clone(), Some(task))
                }
                None => (daemons[map_index as usize].clone(), None),
            };
            self.daemons
                .run_map(
                    &daemon_addr,
                    &DaemonRequest::RunMap {
                        workload: spec.workload.clone(),
                        input: input_spec,
                        output_file: output_file.clone(),
                        job_id,
                        map_index,
                    },
                )
                .await?;
            info!(job_id, map_index, %daemon_addr, "map dispatched");
        }

        // completion barrier: no reduce before every map's output chunk
        // is on record
        loop {
            let completed = self.manager.completed_maps(job_id).await?;
            if completed >= nb_maps {
                break;
            }
            sleep(BARRIER_POLL).await;
        }
        info!(job_id, nb_maps, "all maps completed");

        self.namenode.all_chunks_written(&output_file).await?;
        let shuffle = self.tmp_dir.join(format!("{stem}-shuffle.kv"));
        self.hdfs.read(&output_file, &shuffle).await?;

        let result = self.output_dir.join(format!("{stem}-reduce.kv"));
        let reduce_in = shuffle.clone();
        let reduce_out = result.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut reader = KvReader::open(&reduce_in)?;
            let mut writer = KvWriter::create(&reduce_out)?;
            (job_workload.reduce_fn)(
                &mut reader as &mut dyn RecordRead,
                &mut writer as &mut dyn RecordWrite,
            )?;
            writer.flush()
        })
        .await
        .map_err(|e| DfsError::Io(format!("reduce aborted: {e}")))??;
        let _ = tokio::fs::remove_file(&shuffle).await;
        info!(job_id, result = %result.display(), "job completed");
        Ok(result)
    }
}

fn host_of(addr: &str) -> &str {
    addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(addr)
}
