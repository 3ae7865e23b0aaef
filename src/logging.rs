//! Log sink for a relay run.
//!
//! Every record goes to stdout and is appended to the configured log file as
//! `2024-05-01 12:00:00,123 - INFO - message key=value`. The subscriber is
//! installed as the default for the lifetime of the returned [`LogGuard`]
//! rather than process-wide, so nothing outlives the run that created it.
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Keeps the run's subscriber installed and the file writer flushing.
///
/// Dropping it restores the previous default subscriber and flushes any
/// buffered lines to the log file.
pub struct LogGuard {
    _default: tracing::subscriber::DefaultGuard,
    _file_writer: WorkerGuard,
    path: PathBuf,
}

impl LogGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Install the stdout + file subscriber for the current thread.
///
/// Creates the log file's parent directory. `RUST_LOG` overrides the default
/// `info` level.
pub fn init(log_file: &Path) -> anyhow::Result<LogGuard> {
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    let file_name = log_file
        .file_name()
        .with_context(|| format!("log_file has no file name: {}", log_file.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (file_writer, worker_guard) = tracing_appender::non_blocking(appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(file_writer),
        );

    Ok(LogGuard {
        _default: tracing::subscriber::set_default(subscriber),
        _file_writer: worker_guard,
        path: log_file.to_path_buf(),
    })
}

/// `timestamp - LEVEL - message fields`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
