//! Logging setup
//
// File logging always goes to `<data dir>/logs/<timestamp>/interop.log`; `-v`
// adds a coloured console layer. Keep the returned guard alive for the
// program's duration or buffered file output is lost.

use anyhow::Context;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_subscriber::fmt::{
    format::{FormatEvent, FormatFields, Writer},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

pub const DEFAULT_FILTER: &str = "info,interop_vulkan=info";

pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    pub log_file: PathBuf,
}

/// Timestamped folder for this run's log file
pub fn log_file_path(logs_dir: &Path) -> PathBuf {
    let now = Local::now();
    logs_dir
        .join(format!("{}", now.format("%Y-%m-%d_%H-%M-%S")))
        .join("interop.log")
}

/// Initializes logging.
///
/// - `verbose`: If true, enables colored console output.
pub fn init(logs_dir: &Path, verbose: bool) -> anyhow::Result<LogGuard> {
    let log_file = log_file_path(logs_dir);
    if let Some(folder) = log_file.parent() {
        fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create log folder {}", folder.display()))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open {} for writing", log_file.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    use tracing_subscriber::prelude::*;
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(val) => tracing_subscriber::EnvFilter::new(val),
        Err(_) => tracing_subscriber::EnvFilter::new(DEFAULT_FILTER),
    };
    // File log: plain formatting, no ANSI/color codes
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    if verbose {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .event_format(GorgeousFormatter);
        registry.with(console_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    Ok(LogGuard {
        _guard: guard,
        log_file,
    })
}

/// Colored single-line console format
pub struct GorgeousFormatter;

impl<S, N> FormatEvent<S, N> for GorgeousFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let (level_str, level_color) = level_style(*meta.level());

        write!(writer, "\x1b[2;36m{}\x1b[0m ", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        write!(writer, "{level_color}{level_str}\x1b[0m ")?;
        write!(writer, "\x1b[2;35m[{:?}]\x1b[0m ", std::thread::current().id())?;
        write!(writer, "\x1b[4;2;33m{}\x1b[0m: ", meta.target())?;

        let mut visitor = MsgVisitor(String::new());
        event.record(&mut visitor);
        writeln!(writer, "{}", visitor.0.trim())
    }
}

fn level_style(level: tracing::Level) -> (&'static str, &'static str) {
    match level {
        tracing::Level::ERROR => ("ERROR", "\x1b[1;91m"),
        tracing::Level::WARN => ("WARN ", "\x1b[1;93m"),
        tracing::Level::INFO => ("INFO ", "\x1b[1;94m"),
        tracing::Level::DEBUG => ("DEBUG", "\x1b[1;92m"),
        tracing::Level::TRACE => ("TRACE", "\x1b[1;95m"),
    }
}

/// Collects every field of an event into one line
struct MsgVisitor(String);

impl tracing_subscriber::field::Visit for MsgVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        use std::fmt::Write;
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        let _ = if field.name() == "message" {
            write!(self.0, "{value:?}")
        } else {
            write!(self.0, "{}={value:?}", field.name())
        };
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        if field.name() != "message" {
            self.0.push_str(field.name());
            self.0.push('=');
        }
        self.0.push_str(value);
    }
}
