use crate::state::{FileData, NameNodeState};
use std::{collections::HashMap, path::{Path, PathBuf}, sync::Arc};
use tokio::{fs, sync::mpsc, sync::Mutex};
use utilities::logger::{error, trace, warn};
use utilities::result::{DfsError, Result};

/// Persists the catalog as one JSON file, overwriting the previous
/// snapshot. A dedicated task consumes request signals so RPC handlers
/// never block on disk; the channel holds a single pending signal, which
/// collapses a burst of requests into at most one follow-up snapshot.
pub struct SnapshotWriter {
    signal: mpsc::Sender<()>,
}

impl SnapshotWriter {
    pub fn start(state: Arc<Mutex<NameNodeState>>, path: PathBuf) -> Self {
        let (signal, mut receiver) = mpsc::channel(1);
        tokio::spawn(async move {
            while receiver.recv().await.is_some() {
                let metadata = state.lock().await.metadata.clone();
                match write_snapshot(&path, &metadata).await {
                    Ok(_) => trace!(path = %path.display(), "snapshot written"),
                    Err(e) => {
                        // the in-memory state stays authoritative, the
                        // next snapshot supersedes
                        error!(error = %e, "error while writing the metadata snapshot")
                    }
                }
            }
        });
        Self { signal }
    }

    /// Requests a snapshot of the current metadata. Never blocks; a full
    /// queue means one is already pending.
    pub fn request(&self) {
        let _ = self.signal.try_send(());
    }
}

async fn write_snapshot(path: &Path, metadata: &HashMap<String, FileData>) -> Result<()> {
    let payload = serde_json::to_vec_pretty(metadata)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    // write-then-rename so a crash mid-write never corrupts the snapshot
    let staging = path.with_extension("tmp");
    fs::write(&staging, &payload).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}

/// Loads the snapshot left by a previous run. A missing file yields an
/// empty catalog; an unreadable one is discarded with a warning.
pub async fn load_snapshot(path: &Path) -> HashMap<String, FileData> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "could not read the metadata snapshot, starting empty");
            return HashMap::new();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(metadata) => metadata,
        Err(e) => {
            let corrupt = DfsError::SnapshotCorrupt(e.to_string());
            warn!(error = %corrupt, path = %path.display(), "discarding snapshot, starting empty");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namenode-data");
        let mut state = NameNodeState::default();
        let mut file = FileData::new(1, 64, 1);
        file.add_chunk_location(0, "a:1");
        state.metadata.insert("words.txt".to_owned(), file);
        let expected = state.metadata.clone();

        let state = Arc::new(Mutex::new(state));
        let writer = SnapshotWriter::start(state, path.clone());
        writer.request();
        // the writer task owns the disk write, give it a moment
        for _ in 0..50 {
            if fs::try_exists(&path).await.unwrap() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(load_snapshot(&path).await, expected);
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namenode-data");
        fs::write(&path, b"not json at all").await.unwrap();
        assert!(load_snapshot(&path).await.is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("namenode-data");
        assert!(load_snapshot(&path).await.is_empty());
    }
}
