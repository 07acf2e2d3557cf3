use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

/// Installs the global subscriber writing to stdout through a non-blocking worker.
///
/// The returned guard flushes pending lines when dropped, so `main` must hold it
/// until shutdown. `RUST_LOG` overrides the default level.
pub fn logging_stdout() -> WorkerGuard {
    let (nonblocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let default_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let mut filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    // sqlx logs every statement at INFO
    if let Ok(quiet_queries) = "sqlx::query=warn".parse() {
        filter = filter.add_directive(quiet_queries);
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(nonblocking)
                .with_target(cfg!(debug_assertions))
                .with_file(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions)),
        )
        .with(filter)
        .init();

    guard
}
