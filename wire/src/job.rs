//! Control messages for the job manager and the map daemons.

use serde::{Deserialize, Serialize};

/// Record encoding of a file, carried in task specs so every node opens
/// the right reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Line,
    Kv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobManagerRequest {
    /// Registers a job. `input_file` is `None` for generator jobs.
    AddJob {
        workload: String,
        input_format: Option<RecordKind>,
        input_file: Option<String>,
    },
    StartJob { job_id: u64 },
    /// A map task was dispatched.
    SubmitMap { job_id: u64, map_index: u32 },
    /// A daemon finished a map task.
    MapCompleted { job_id: u64, map_index: u32 },
    /// Barrier observation.
    CompletedMaps { job_id: u64 },
    AvailableDaemons,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobManagerResponse {
    JobId(u64),
    MapCount(u32),
    Daemons(Vec<String>),
    Ack,
}

/// Input of one map task: a chunk blob inside the data directory shared
/// with the colocated data node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub kind: RecordKind,
    pub chunk_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonRequest {
    /// Run one map task. The daemon acknowledges before executing; the
    /// result is reported to the job manager, not to the caller.
    RunMap {
        workload: String,
        input: Option<TaskSpec>,
        output_file: String,
        job_id: u64,
        map_index: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DaemonResponse {
    Ack,
}
