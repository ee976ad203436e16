use namenode::config::CONFIG;
use namenode::handler::{NameNodeHandler, DEFAULT_LIVENESS_TTL};
use namenode::server::NameNodeServer;
use namenode::snapshot::{load_snapshot, SnapshotWriter};
use namenode::state::NameNodeState;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use utilities::logger::{info, init_logger};
use utilities::result::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("NameService", &CONFIG.id);
    let snapshot_path = Path::new(&CONFIG.data_dir).join("namenode-data");
    if std::env::args().nth(1).as_deref() == Some("reset") {
        info!(path = %snapshot_path.display(), "reset requested, dropping the saved catalog");
        let _ = tokio::fs::remove_file(&snapshot_path).await;
    }
    let metadata = load_snapshot(&snapshot_path).await;
    info!(files = metadata.len(), "catalog loaded");
    let state = Arc::new(Mutex::new(NameNodeState::with_metadata(metadata)));
    let snapshot = SnapshotWriter::start(state.clone(), snapshot_path);
    let handler = NameNodeHandler::new(state, snapshot, DEFAULT_LIVENESS_TTL);
    let server = NameNodeServer::bind(&CONFIG.listen_addr, handler).await?;
    info!(addr = %CONFIG.listen_addr, "name service listening");
    server.serve().await
}
