//! The job execution side of the platform: a job manager tracking task
//! tallies, daemons running map tasks next to the chunks they read, and
//! the job client driving submission, the completion barrier, and the
//! final local reduce.

pub mod daemon;
pub mod daemon_service;
pub mod job_client;
pub mod manager;
pub mod manager_service;
pub mod namenode_service;
pub mod workload;
