use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::storage::Storage;
use tokio::{
    fs::{self, File},
    io::copy,
    sync::Mutex,
};
use utilities::result::Result;

/// Chunk blobs on local disk. Operations on the same blob are serialized
/// through a per-path lock; distinct blobs proceed independently.
#[derive(Clone)]
pub struct FileStorage {
    root: PathBuf,
    path_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStorage {
            root: root.into(),
            path_locks: Arc::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, chunk_id: &str) -> PathBuf {
        self.root.join(chunk_id)
    }

    async fn path_lock(&self, chunk_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.path_locks.lock().await;
        locks
            .entry(chunk_id.to_owned())
            .or_insert_with(Arc::default)
            .clone()
    }
}

impl Storage for FileStorage {
    async fn write(
        &self,
        chunk_id: String,
        chunk_stream: &mut (impl tokio::io::AsyncRead + Unpin),
    ) -> Result<u64> {
        let lock = self.path_lock(&chunk_id).await;
        let _guard = lock.lock().await;
        // rewrites of an existing chunk are legal, so no create_new here
        let mut chunk_file = File::create(self.blob_path(&chunk_id)).await?;
        let written_byte_count = copy(chunk_stream, &mut chunk_file).await?;
        chunk_file.sync_all().await?;
        Ok(written_byte_count)
    }

    async fn read(&self, chunk_id: String) -> Result<Box<dyn tokio::io::AsyncRead + Unpin + Send>> {
        let chunk_file = File::open(self.blob_path(&chunk_id)).await?;
        Ok(Box::new(chunk_file))
    }

    async fn delete(&self, chunk_id: String) -> Result<()> {
        let lock = self.path_lock(&chunk_id).await;
        let _guard = lock.lock().await;
        fs::remove_file(self.blob_path(&chunk_id)).await?;
        Ok(())
    }

    async fn available_chunks(&self) -> Result<Vec<String>> {
        let mut dir_entries = fs::read_dir(&self.root).await?;
        let mut chunk_ids = vec![];
        while let Some(chunk) = dir_entries.next_entry().await? {
            chunk_ids.push(
                chunk
                    .file_name()
                    .into_string()
                    .map_err(|_| utilities::result::DfsError::Io("invalid file name".into()))?,
            );
        }
        Ok(chunk_ids)
    }
}
