use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// every crate logs through these re-exports
pub use tracing;
pub use tracing::*;

/// Installs the global subscriber for one service process: compact
/// human-readable lines on stdout plus a JSON file per node under
/// `LOG_DIR` (default `./logs`), filtered through `RUST_LOG` with an
/// `info` floor when the variable is unset.
///
/// The returned guard flushes the file writer on drop, so `main` holds
/// it for the life of the process.
pub fn init_logger(service_name: &str, node_id: &str) -> WorkerGuard {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_owned());
    let log_file = tracing_appender::rolling::never(
        format!("{log_dir}/{service_name}"),
        format!("{node_id}.log"),
    );
    let (file_writer, guard) = tracing_appender::non_blocking(log_file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(file_writer),
        )
        .init();
    info!(service = service_name, node = node_id, "logger ready");
    guard
}
