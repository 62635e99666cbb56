//! Logging setup.
//!
//! A single `fmt` layer is installed on a `tracing_subscriber` registry,
//! filtered by an [`EnvFilter`]. When `RUST_LOG` is set it replaces the
//! configured level; the per-module `filters` of the configuration are added
//! on top either way.
//!
//! ```rust,ignore
//! use kiwicast_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::from_config(&config.logging)
//!     .directive("kiwicast_transport=trace")
//!     .try_init()?;
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig};

/// File written when `output` is `file` and no `file_path` is configured.
pub const DEFAULT_LOG_FILE: &str = "kiwicast.log";

/// Installs the global subscriber described by `config`.
///
/// Keeps the existing subscriber if one is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builds and installs the global `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: LogLevel,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    target: bool,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            directives: Vec::new(),
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            target: true,
            thread_ids: false,
            file_location: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the `logging` section of the configuration.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let directives = config
            .filters
            .iter()
            .map(|(module, level)| format!("{module}={level}"))
            .collect();

        Self {
            level: config.level,
            directives,
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `kiwicast_runtime=debug`.
    ///
    /// Directives that fail to parse are skipped.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the log file used with [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Prints the source file and line of each event.
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.file_location = enabled;
        self
    }

    /// Installs the subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let layer = self.fmt_layer(self.make_writer());
        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()
    }

    /// Installs the subscriber unless one is already set.
    pub fn init(self) {
        let _ = self.try_init();
    }

    fn env_filter(&self) -> EnvFilter {
        let level = LevelFilter::from_level(self.level.to_tracing_level());
        self.directives
            .iter()
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(
                EnvFilter::builder()
                    .with_default_directive(level.into())
                    .from_env_lossy(),
                EnvFilter::add_directive,
            )
    }

    /// JSON needs the `json-log` feature; compact is used without it.
    fn effective_format(&self) -> LogFormat {
        if self.format == LogFormat::Json && !cfg!(feature = "json-log") {
            LogFormat::Compact
        } else {
            self.format
        }
    }

    fn log_file(&self) -> (PathBuf, PathBuf) {
        let path = self.file_path.as_deref().unwrap_or(Path::new(DEFAULT_LOG_FILE));
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path.file_name().unwrap_or(OsStr::new(DEFAULT_LOG_FILE));
        (dir.to_path_buf(), PathBuf::from(name))
    }

    fn make_writer(&self) -> BoxMakeWriter {
        match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => {
                let (dir, name) = self.log_file();
                BoxMakeWriter::new(tracing_appender::rolling::never(dir, name))
            }
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(self.target)
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.effective_format() {
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            _ => layer.compact().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            file_location: true,
            ..Default::default()
        };
        config
            .filters
            .insert("kiwicast_transport".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, LogLevel::Debug);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.output, LogOutput::Stderr);
        assert!(builder.file_location);
        assert!(builder.target);
        assert_eq!(builder.directives, vec!["kiwicast_transport=trace"]);
    }

    #[test]
    fn test_json_needs_feature() {
        let builder = LoggingBuilder::new().format(LogFormat::Json);
        let expected = if cfg!(feature = "json-log") {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };
        assert_eq!(builder.effective_format(), expected);
    }

    #[test]
    fn test_log_file_location() {
        let (dir, name) = LoggingBuilder::new().log_file();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, Path::new(DEFAULT_LOG_FILE));

        let (dir, name) = LoggingBuilder::new()
            .file_path("logs/session.log")
            .log_file();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(name, Path::new("session.log"));
    }
}
