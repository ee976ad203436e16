use crate::snapshot::SnapshotWriter;
use crate::state::{FileData, NameNodeState};
use rand::seq::SliceRandom;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use utilities::logger::{debug, info, instrument, tracing, warn};
use utilities::result::{DfsError, Result};
use wire::namenode::{NameNodeRequest, NameNodeResponse};

/// How long a registration heartbeat keeps a node in the live view.
pub const DEFAULT_LIVENESS_TTL: Duration = Duration::from_secs(10);

pub struct NameNodeHandler {
    state: Arc<Mutex<NameNodeState>>,
    snapshot: SnapshotWriter,
    liveness_ttl: Duration,
}

impl NameNodeHandler {
    pub fn new(
        state: Arc<Mutex<NameNodeState>>,
        snapshot: SnapshotWriter,
        liveness_ttl: Duration,
    ) -> Self {
        Self {
            state,
            snapshot,
            liveness_ttl,
        }
    }

    #[instrument(name = "namenode_request", skip(self))]
    pub async fn handle(&self, request: NameNodeRequest) -> Result<NameNodeResponse> {
        match request {
            NameNodeRequest::WriteChunk { replication_factor } => {
                self.write_chunk_request(replication_factor).await
            }
            NameNodeRequest::ReadFile { file_name } => self.read_file_request(&file_name).await,
            NameNodeRequest::DeleteFile { file_name } => {
                self.delete_file_request(&file_name).await
            }
            NameNodeRequest::ChunkWritten {
                file_name,
                file_size,
                chunk_size,
                replication_factor,
                chunk_number,
                server,
            } => {
                self.chunk_written(
                    &file_name,
                    file_size,
                    chunk_size,
                    replication_factor,
                    chunk_number,
                    &server,
                )
                .await
            }
            NameNodeRequest::AllChunksWritten { file_name } => {
                self.all_chunks_written(&file_name).await
            }
            NameNodeRequest::ChunkDeleted {
                file_name,
                chunk_number,
                server,
            } => self.chunk_deleted(&file_name, chunk_number, &server).await,
            NameNodeRequest::RegisterDataNode { addr } => {
                let mut state = self.state.lock().await;
                if state.register_datanode(&addr) {
                    info!(%addr, "data node connected");
                }
                Ok(NameNodeResponse::Ack)
            }
            NameNodeRequest::RegisterDaemon { addr } => {
                let mut state = self.state.lock().await;
                if state.register_daemon(&addr) {
                    info!(%addr, "daemon connected");
                }
                Ok(NameNodeResponse::Ack)
            }
            NameNodeRequest::AvailableDaemons => {
                let state = self.state.lock().await;
                let daemons = state.live_daemons(self.liveness_ttl);
                if daemons.is_empty() {
                    return Err(DfsError::NoDaemons);
                }
                Ok(NameNodeResponse::Daemons(daemons))
            }
        }
    }

    /// Picks up to `replication_factor` distinct live data nodes,
    /// uniformly at random. Best effort: fewer live nodes than asked for
    /// is a warning, not an error.
    async fn write_chunk_request(&self, replication_factor: u32) -> Result<NameNodeResponse> {
        let state = self.state.lock().await;
        let mut live = state.live_datanodes(self.liveness_ttl);
        drop(state);
        if live.is_empty() {
            return Err(DfsError::NoDataNodes);
        }
        if live.len() < replication_factor as usize {
            warn!(
                requested = replication_factor,
                available = live.len(),
                "fewer live data nodes than the replication factor, placing what we have"
            );
        }
        live.shuffle(&mut rand::thread_rng());
        live.truncate(replication_factor as usize);
        Ok(NameNodeResponse::Servers(live))
    }

    /// One live replica holder per chunk, in chunk order.
    async fn read_file_request(&self, file_name: &str) -> Result<NameNodeResponse> {
        let state = self.state.lock().await;
        let file = state
            .metadata
            .get(file_name)
            .ok_or_else(|| DfsError::UnknownFile(file_name.to_owned()))?;
        if !file.is_complete() {
            return Err(DfsError::Incomplete(file_name.to_owned()));
        }
        let mut servers = Vec::with_capacity(file.file_size as usize);
        for chunk_number in 0..file.file_size {
            let holder = file
                .chunk_handles
                .get(&chunk_number)
                .and_then(|handles| {
                    handles
                        .iter()
                        .find(|server| state.is_live_datanode(server, self.liveness_ttl))
                })
                .ok_or(DfsError::NoLiveReplica {
                    file_name: file_name.to_owned(),
                    chunk_number,
                })?;
            servers.push(holder.clone());
        }
        Ok(NameNodeResponse::Servers(servers))
    }

    /// Distinct live holders of any chunk of the file. Holders that are
    /// not live are logged and skipped; the data nodes' own
    /// `ChunkDeleted` callbacks drive the metadata cleanup.
    async fn delete_file_request(&self, file_name: &str) -> Result<NameNodeResponse> {
        let state = self.state.lock().await;
        let file = state
            .metadata
            .get(file_name)
            .ok_or_else(|| DfsError::UnknownFile(file_name.to_owned()))?;
        let mut chunk_numbers: Vec<u32> = file.chunk_handles.keys().copied().collect();
        chunk_numbers.sort_unstable();
        let mut servers: Vec<String> = Vec::new();
        for chunk_number in chunk_numbers {
            for server in &file.chunk_handles[&chunk_number] {
                if servers.contains(server) {
                    continue;
                }
                if state.is_live_datanode(server, self.liveness_ttl) {
                    servers.push(server.clone());
                } else {
                    warn!(%server, %file_name, chunk_number, "replica holder is not live, its chunks stay behind");
                }
            }
        }
        Ok(NameNodeResponse::Servers(servers))
    }

    async fn chunk_written(
        &self,
        file_name: &str,
        file_size: u32,
        chunk_size: u64,
        replication_factor: u32,
        chunk_number: u32,
        server: &str,
    ) -> Result<NameNodeResponse> {
        let mut state = self.state.lock().await;
        let file = state
            .metadata
            .entry(file_name.to_owned())
            .or_insert_with(|| FileData::new(file_size, chunk_size, replication_factor));
        if file.chunk_size != chunk_size {
            if file.file_size != file_size || file.replication_factor != replication_factor {
                // a fresh write over an existing file: forget the old
                // placements along with the old shape
                warn!(%file_name, "catalog entry overwritten by a new write");
                file.file_size = file_size;
                file.chunk_size = chunk_size;
                file.replication_factor = replication_factor;
                file.chunk_handles.clear();
            } else {
                // a known file arriving with a new chunk size is the
                // signature of a map-output write
                file.chunk_size = chunk_size;
            }
        }
        file.add_chunk_location(chunk_number, server);
        drop(state);
        self.snapshot.request();
        Ok(NameNodeResponse::Ack)
    }

    /// Declares the file complete: its size becomes the number of chunk
    /// handles on record. An unknown name declares an empty file.
    async fn all_chunks_written(&self, file_name: &str) -> Result<NameNodeResponse> {
        let mut state = self.state.lock().await;
        match state.metadata.get_mut(file_name) {
            Some(file) => file.file_size = file.chunk_handles.len() as u32,
            None => {
                state
                    .metadata
                    .insert(file_name.to_owned(), FileData::new(0, 0, 1));
            }
        }
        debug!(catalog = ?state.metadata, "catalog after completion");
        drop(state);
        self.snapshot.request();
        Ok(NameNodeResponse::Ack)
    }

    async fn chunk_deleted(
        &self,
        file_name: &str,
        chunk_number: u32,
        server: &str,
    ) -> Result<NameNodeResponse> {
        let mut state = self.state.lock().await;
        if let Some(file) = state.metadata.get_mut(file_name) {
            if let Some(handles) = file.chunk_handles.get_mut(&chunk_number) {
                handles.remove(server);
                if handles.is_empty() {
                    file.chunk_handles.remove(&chunk_number);
                }
            }
            if file.chunk_handles.is_empty() {
                state.metadata.remove(file_name);
                info!(%file_name, "last chunk gone, file removed from the catalog");
            }
        }
        drop(state);
        self.snapshot.request();
        Ok(NameNodeResponse::Ack)
    }
}
