use clap::Parser;
use mapreduce::manager::{JobManagerHandler, JobManagerServer};
use mapreduce::namenode_service::NameNodeService;
use utilities::logger::{info, init_logger};
use utilities::result::Result;

#[derive(Parser, Debug)]
#[command(version, about = "job manager of the map-reduce executor")]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "0.0.0.0:7100")]
    listen: String,
    /// Name service address, proxied for the daemon list
    #[clap(short, long, default_value = "127.0.0.1:7000")]
    namenode: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logger("JobManager", "job_manager_0");
    let handler = JobManagerHandler::new(NameNodeService::new(args.namenode));
    let server = JobManagerServer::bind(&args.listen, handler).await?;
    info!(addr = %args.listen, "job manager listening");
    server.serve().await
}
