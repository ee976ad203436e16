use clap::{Parser, Subcommand};
use client::hdfs::HdfsClient;
use std::path::PathBuf;
use utilities::logger::init_logger;
use utilities::result::{DfsError, Result};
use wire::job::RecordKind;

#[derive(Parser, Debug)]
#[command(name = "hdfs", version, about = "chunked file store client")]
struct Args {
    #[clap(subcommand)]
    command: Commands,
    /// Name service address
    #[clap(long, default_value = "127.0.0.1:7000")]
    namenode: String,
    /// Nominal chunk byte ceiling used when writing
    #[clap(long, default_value_t = 64 * 1024 * 1024)]
    chunk_size: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a local file into chunks and store it
    Write {
        /// Record format of the file: line or kv
        format: String,
        path: PathBuf,
        #[arg(short = 'r', long, default_value_t = 1)]
        replication: u32,
    },
    /// Rebuild a stored file into a local destination
    Read { name: String, dest: PathBuf },
    /// Remove a stored file from every holder
    Delete { name: String },
}

fn record_kind(format: &str) -> Result<RecordKind> {
    match format {
        "line" => Ok(RecordKind::Line),
        "kv" => Ok(RecordKind::Kv),
        other => Err(DfsError::protocol(format!(
            "unsupported record format {other:?}, use line or kv"
        ))),
    }
}

async fn run(args: Args) -> Result<()> {
    let hdfs = HdfsClient::new(args.namenode, std::env::temp_dir(), args.chunk_size);
    match args.command {
        Commands::Write {
            format,
            path,
            replication,
        } => {
            let chunks = hdfs.write(record_kind(&format)?, &path, replication).await?;
            println!("stored {} in {chunks} chunk(s)", path.display());
        }
        Commands::Read { name, dest } => {
            hdfs.read(&name, &dest).await?;
            println!("rebuilt {name} into {}", dest.display());
        }
        Commands::Delete { name } => {
            hdfs.delete(&name).await?;
            println!("delete sent for {name}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _guard = init_logger("HdfsClient", "client_0");
    if let Err(e) = run(args).await {
        eprintln!("Error : {e}");
        std::process::exit(1);
    }
}
