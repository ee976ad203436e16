use clap::Parser;
use mapreduce::daemon::{DaemonContext, DaemonServer};
use mapreduce::manager_service::ManagerService;
use mapreduce::namenode_service::NameNodeService;
use std::time::Duration;
use utilities::logger::{info, init_logger};
use utilities::result::Result;

#[derive(Parser, Debug)]
#[command(version, about = "map task executor colocated with a data node")]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "0.0.0.0:7200")]
    listen: String,
    /// Address other nodes reach this daemon under
    #[clap(short, long, default_value = "127.0.0.1:7200")]
    advertise: String,
    /// Name service address
    #[clap(short, long, default_value = "127.0.0.1:7000")]
    namenode: String,
    /// Job manager address
    #[clap(short, long, default_value = "127.0.0.1:7100")]
    manager: String,
    /// Chunk transport address of the colocated data node
    #[clap(short, long, default_value = "127.0.0.1:7001")]
    datanode: String,
    /// Chunk directory shared with the colocated data node
    #[clap(long, default_value = "./datanode-data")]
    data_dir: String,
    /// Scratch directory for map outputs
    #[clap(long, default_value = "./daemon-work")]
    work_dir: String,
    #[clap(long, default_value_t = 3)]
    heartbeat_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logger("Daemon", &args.advertise.replace(':', "_"));
    tokio::fs::create_dir_all(&args.work_dir).await?;
    let namenode = NameNodeService::new(args.namenode);
    namenode.start_heartbeat(
        args.advertise.clone(),
        Duration::from_secs(args.heartbeat_secs),
    );
    let ctx = DaemonContext {
        data_dir: args.data_dir.into(),
        work_dir: args.work_dir.into(),
        datanode_addr: args.datanode,
        manager: ManagerService::new(args.manager),
    };
    let server = DaemonServer::bind(&args.listen, ctx).await?;
    info!(addr = %args.listen, "daemon listening for map tasks");
    server.serve().await
}
