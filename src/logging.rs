//! Logging setup on `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set; otherwise the filter comes from the configured level.
//! Measured lab values are only ever emitted at `debug` and below.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Append to this file instead of writing to stderr.
    pub log_file: Option<PathBuf>,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            log_file: None,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// 0 → info, 1 (`-v`) → debug, 2+ (`-vv`) → trace.
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// File output never carries ANSI colors.
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.with_ansi = false;
        }
        self.log_file = path;
        self
    }
}

/// Install the global subscriber. Fails when the log file cannot be opened or a
/// subscriber is already set.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            init_with_writer(config, SharedFileWriter::new(file))
        }
        None => init_with_writer(config, io::stderr),
    }
}

fn init_with_writer<W>(config: &LogConfig, writer: W) -> io::Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer).with_current_span(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(writer).with_ansi(config.with_ansi))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(writer).with_ansi(config.with_ansi))
            .try_init(),
    };
    result.map_err(|e| io::Error::other(e.to_string()))
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)))
}

/// Our crate at `level`; everything else stays at warn.
fn filter_directive(level: Level) -> String {
    if level == Level::INFO {
        return config::default_log_filter();
    }
    format!("warn,labcheck={}", level.to_string().to_lowercase())
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl SharedFileWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<std::fs::File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_level() {
        assert_eq!(LogConfig::from_verbosity(0).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(5).level, Level::TRACE);
    }

    #[test]
    fn filter_directive_scopes_to_crate() {
        assert_eq!(filter_directive(Level::INFO), config::default_log_filter());
        assert_eq!(filter_directive(Level::DEBUG), "warn,labcheck=debug");
        assert_eq!(filter_directive(Level::TRACE), "warn,labcheck=trace");
    }

    #[test]
    fn log_file_disables_ansi() {
        let config = LogConfig::default().with_log_file(Some(PathBuf::from("labcheck.log")));
        assert!(!config.with_ansi);
        assert_eq!(config.format, LogFormat::Pretty);
        let config = LogConfig::default().with_format(LogFormat::Json).with_log_file(None);
        assert!(config.with_ansi);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn file_writer_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labcheck.log");
        std::fs::write(&path, "first\n").unwrap();

        let file = OpenOptions::new().append(true).open(&path).unwrap();
        let writer = SharedFileWriter::new(file);
        writer.make_writer().write_all(b"second\n").unwrap();
        writer.make_writer().flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
