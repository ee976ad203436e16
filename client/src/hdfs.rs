use crate::chunker::ChunkSplitter;
use crate::datanode_service::DataNodeService;
use crate::namenode_service::NameNodeService;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::copy;
use utilities::logger::{error, info, instrument, tracing, warn};
use utilities::result::{DfsError, Result};
use wire::chunk::split_hdfs_name;
use wire::job::RecordKind;

const READ_TMP_TAG: &str = "-readchunk";

/// The hdfs client library: splits, ships, reassembles, and deletes
/// files chunk by chunk.
#[derive(Clone, Debug)]
pub struct HdfsClient {
    namenode: NameNodeService,
    datanode: DataNodeService,
    tmp_dir: PathBuf,
    chunk_size: u64,
}

impl HdfsClient {
    pub fn new(namenode_addr: impl Into<String>, tmp_dir: impl Into<PathBuf>, chunk_size: u64) -> Self {
        Self {
            namenode: NameNodeService::new(namenode_addr),
            datanode: DataNodeService::new(),
            tmp_dir: tmp_dir.into(),
            chunk_size,
        }
    }

    /// Splits `local_path` into record-aligned chunks and ships each to
    /// the data nodes the name service picks. Returns the chunk count.
    #[instrument(skip(self, local_path))]
    pub async fn write(
        &self,
        kind: RecordKind,
        local_path: &Path,
        replication_factor: u32,
    ) -> Result<u32> {
        let mut splitter =
            ChunkSplitter::open(kind, local_path, self.chunk_size, &self.tmp_dir)?;
        let stem = splitter.stem().to_owned();
        let extension = splitter.extension().to_owned();
        let full_name = format!("{stem}{extension}");
        info!(%full_name, "processing file");
        let mut chunks_written = 0u32;
        while let Some((chunk_number, chunk_path)) = splitter.next_chunk()? {
            let result = self
                .ship_chunk(&stem, &extension, chunk_number, replication_factor, &chunk_path)
                .await;
            // the temp chunk never outlives the attempt
            let _ = fs::remove_file(&chunk_path).await;
            result?;
            chunks_written += 1;
        }
        self.namenode.all_chunks_written(&full_name).await?;
        info!(%full_name, chunks_written, "write completed");
        Ok(chunks_written)
    }

    async fn ship_chunk(
        &self,
        stem: &str,
        extension: &str,
        chunk_number: u32,
        replication_factor: u32,
        chunk_path: &Path,
    ) -> Result<()> {
        let servers = self
            .namenode
            .write_chunk_request(replication_factor)
            .await?;
        let (primary, peers) = servers.split_first().ok_or(DfsError::NoDataNodes)?;
        if servers.len() < replication_factor as usize {
            warn!(
                requested = replication_factor,
                granted = servers.len(),
                "chunk placed on fewer replicas than asked for"
            );
        }
        self.datanode
            .write_chunk(primary, stem, extension, chunk_number, peers, chunk_path)
            .await?;
        info!(chunk_number, %primary, "chunk sent");
        Ok(())
    }

    /// Rebuilds an hdfs file into `dest`: one chunk per holder the name
    /// service returns, verified contiguous, concatenated in order.
    #[instrument(skip(self, dest))]
    pub async fn read(&self, hdfs_name: &str, dest: &Path) -> Result<()> {
        let holders = self.namenode.read_file_request(hdfs_name).await?;
        let (stem, extension) = split_hdfs_name(hdfs_name);
        let mut received: Vec<(u32, PathBuf)> = Vec::new();
        for (chunk_number, holder) in holders.iter().enumerate() {
            let tmp = self
                .tmp_dir
                .join(format!("{stem}{READ_TMP_TAG}{chunk_number}{extension}"));
            match self
                .datanode
                .read_chunk(holder, &stem, &extension, chunk_number as u32, &tmp)
                .await
            {
                Ok(Some(number)) => received.push((number, tmp)),
                Ok(None) => {
                    warn!(chunk_number, %holder, "holder closed without the chunk")
                }
                Err(e) => {
                    error!(chunk_number, %holder, error = %e, "chunk fetch failed");
                    Self::remove_parts(&received).await;
                    return Err(e);
                }
            }
        }
        // every index must be present exactly once before anything is
        // assembled, so a failure never leaves a partial destination
        let mut numbers: Vec<u32> = received.iter().map(|(number, _)| *number).collect();
        numbers.sort_unstable();
        let expected: Vec<u32> = (0..holders.len() as u32).collect();
        if numbers != expected {
            Self::remove_parts(&received).await;
            return Err(DfsError::MissingChunks(hdfs_name.to_owned()));
        }
        received.sort_by_key(|(number, _)| *number);
        let build = self.build_destination(&received, dest).await;
        Self::remove_parts(&received).await;
        build?;
        info!(%hdfs_name, dest = %dest.display(), chunks = received.len(), "read completed");
        Ok(())
    }

    async fn build_destination(&self, parts: &[(u32, PathBuf)], dest: &Path) -> Result<()> {
        let mut dest_file = fs::File::create(dest).await?;
        for (_, part) in parts {
            let mut part_file = fs::File::open(part).await?;
            copy(&mut part_file, &mut dest_file).await?;
        }
        dest_file.sync_all().await?;
        Ok(())
    }

    async fn remove_parts(parts: &[(u32, PathBuf)]) {
        for (_, part) in parts {
            let _ = fs::remove_file(part).await;
        }
    }

    /// Tells every holder to drop its chunks of the file. The holders'
    /// own callbacks drive the catalog cleanup.
    #[instrument(skip(self))]
    pub async fn delete(&self, hdfs_name: &str) -> Result<()> {
        let holders = self.namenode.delete_file_request(hdfs_name).await?;
        let (stem, extension) = split_hdfs_name(hdfs_name);
        let deletes = holders
            .iter()
            .map(|holder| self.datanode.delete_file(holder, &stem, &extension));
        for (holder, result) in holders.iter().zip(join_all(deletes).await) {
            if let Err(e) = result {
                error!(%holder, error = %e, "could not send the delete command");
            }
        }
        info!(%hdfs_name, holders = holders.len(), "delete command sent");
        Ok(())
    }
}
