use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "server.log";

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: compact stdout output plus a daily-rolling
/// file in `log_dir`. `RUST_LOG` refines the `info` default. Safe to call more
/// than once; later calls leave the first subscriber in place.
pub fn init(log_dir: &Path) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let file_layer = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_WRITER_GUARD.set(guard);
            Some(fmt::layer().with_ansi(false).with_target(false).with_writer(writer))
        }
        Err(err) => {
            eprintln!(
                "File logging disabled, cannot create {}: {}",
                log_dir.display(),
                err
            );
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer)
        .try_init();
}
