use datanode::config::CONFIG;
use datanode::namenode_service::NameNodeService;
use datanode::service::ChunkServer;
use std::time::Duration;
use storage::file_storage::FileStorage;
use utilities::logger::{info, init_logger};
use utilities::result::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("DataNode", &CONFIG.id);
    tokio::fs::create_dir_all(&CONFIG.data_dir).await?;
    let store = FileStorage::new(CONFIG.data_dir.clone());
    let namenode = NameNodeService::new(CONFIG.namenode_addr.clone());
    namenode.clone().start_heartbeat(
        CONFIG.advertised_addr.clone(),
        Duration::from_secs(CONFIG.heartbeat_secs),
    );
    let mut server = ChunkServer::bind(&CONFIG.listen_addr, store, namenode).await?;
    server.set_advertised_addr(CONFIG.advertised_addr.clone());
    info!(addr = %CONFIG.listen_addr, "data node listening for chunk transfers");
    server.serve().await
}
