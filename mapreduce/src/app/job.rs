use clap::{Parser, Subcommand};
use mapreduce::job_client::{JobClient, JobInput, JobSpec};
use utilities::logger::init_logger;
use utilities::result::{DfsError, Result};
use wire::job::RecordKind;

#[derive(Parser, Debug)]
#[command(name = "job", version, about = "submit a map-reduce job")]
struct Args {
    #[clap(subcommand)]
    command: Commands,
    /// Name service address
    #[clap(long, default_value = "127.0.0.1:7000")]
    namenode: String,
    /// Job manager address
    #[clap(long, default_value = "127.0.0.1:7100")]
    manager: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a job and wait for its reduce result
    Submit {
        /// Name of the workload to run
        #[arg(short, long)]
        workload: String,
        /// Input file already stored in the file store; omit for a
        /// generator job
        #[arg(short, long)]
        input: Option<String>,
        /// Record format of the input file: line or kv
        #[arg(short, long, default_value = "line")]
        format: String,
        /// Output name stem for a generator job
        #[arg(long, default_value = "job")]
        name: String,
    },
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
    let Commands::Submit {
        workload,
        input,
        format,
        name,
    } = args.command;
    let spec = JobSpec {
        workload,
        input: match input {
            Some(file_name) => Some(JobInput {
                kind: record_kind(&format)?,
                file_name,
            }),
            None => None,
        },
        job_name: name,
    };
    let job_client = JobClient::new(args.namenode, args.manager, std::env::temp_dir(), ".");
    let result = job_client.run(spec).await?;
    println!("reduce result written to {}", result.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _guard = init_logger("JobClient", "job_client_0");
    if let Err(e) = run(args).await {
        eprintln!("Error : {e}");
        std::process::exit(1);
    }
}
