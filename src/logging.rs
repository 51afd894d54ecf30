//! Logging infrastructure for genabc.
//!
//! Provides consistent logging configuration for the supervising CLI and the
//! worker subprocesses it spawns. Workers inherit the environment, so the
//! variables below apply to both.
//!
//! # Environment Variables
//!
//! - `GENABC_LOG` - Log filter (overrides RUST_LOG)
//! - `GENABC_LOG_LEVEL` - Log level: error, warn, info, debug, trace
//! - `GENABC_LOG_FORMAT` - Output format: pretty, compact, json
//! - `GENABC_LOG_FILE` - Path to log file (in addition to stderr)
//! - `GENABC_LOG_ROTATION` - Log file rotation: hourly, daily, never
//! - `RUST_LOG` - Standard Rust log filter (fallback)
//!
//! # Example
//!
//! ```no_run
//! use genabc::logging::{LogConfig, init};
//!
//! // Initialize with default settings
//! init(LogConfig::default());
//!
//! // Or with custom configuration
//! let config = LogConfig::for_cli(1).with_env_overrides();
//! init(config);
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    #[default]
    Pretty,
    /// One line per event; what the CLI and workers use
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("invalid log format {other:?} (pretty, compact, json)")),
        }
    }
}

/// When the log file passed via `GENABC_LOG_FILE` rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "never" => Ok(Self::Never),
            other => Err(format!("invalid log rotation {other:?} (hourly, daily, never)")),
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Logging configuration.
///
/// Use the builder methods to customize, then pass to [`init`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Also log to this file, without ANSI colors
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Emit an event with timings when a span closes
    pub span_events: bool,
    /// `EnvFilter` directive; replaces `level` when set
    pub filter: Option<String>,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_line_numbers: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            file_path: None,
            rotation: LogRotation::Daily,
            span_events: false,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_line_numbers: false,
        }
    }
}

impl LogConfig {
    /// Preset for the supervising CLI.
    ///
    /// `verbose` is the `-v` count: 0 = warnings and errors, 1 = info, 2+ = debug.
    pub fn for_cli(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        };
        Self::default()
            .with_level(level)
            .with_format(LogFormat::Compact)
    }

    /// Preset for worker subprocesses.
    ///
    /// Compact, without targets, so worker lines interleave readably with the
    /// compiler's own output on the shared stderr.
    pub fn for_worker() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            show_target: false,
            ..Self::default()
        }
    }

    /// Preset for `--quiet`: errors only.
    pub fn quiet() -> Self {
        Self::for_cli(0).with_level(Level::ERROR)
    }

    /// Set the log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the log format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log file path.
    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    /// Enable span timing events.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Apply environment variable overrides.
    ///
    /// `GENABC_LOG` (or `RUST_LOG`) replaces the level with a full filter
    /// directive; otherwise `GENABC_LOG_LEVEL` replaces the level. Unparsable
    /// values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        self.filter = self.filter.or_else(|| var("GENABC_LOG")).or_else(|| var("RUST_LOG"));
        if self.filter.is_none()
            && let Some(level) = var("GENABC_LOG_LEVEL").as_deref().and_then(parse_level)
        {
            self.level = level;
        }
        if let Some(format) = var("GENABC_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            self.format = format;
        }
        if let Some(path) = var("GENABC_LOG_FILE") {
            self.file_path = Some(PathBuf::from(path));
        }
        if let Some(rotation) = var("GENABC_LOG_ROTATION").and_then(|r| r.parse().ok()) {
            self.rotation = rotation;
        }
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str().to_ascii_lowercase());
        match &self.filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| {
                eprintln!("warning: invalid log filter {:?}, using {}", filter, self.level);
                fallback()
            }),
            None => fallback(),
        }
    }
}

/// Parse a log level, accepting `warning` as an alias for `warn`.
fn parse_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

/// Build one formatting layer for `writer` according to `config`.
fn fmt_layer<S, W>(config: &LogConfig, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_span_events(span_events)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_line_number(config.show_line_numbers)
        .with_ansi(ansi)
        .with_writer(writer);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.boxed(),
    }
}

/// Initialize the global tracing subscriber.
///
/// Logs to stderr, and additionally to a rolling file when `config.file_path`
/// is set. This should be called once at program startup; subsequent calls are
/// silently ignored.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use genabc::logging::{LogConfig, init};
///
/// init(LogConfig::default().with_file(PathBuf::from("/var/log/genabc.log")));
/// ```
pub fn init(config: LogConfig) {
    let filter = config.build_filter();

    let mut layers = vec![fmt_layer(&config, std::io::stderr, true)];
    if let Some(path) = &config.file_path {
        let parent = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("genabc.log");
        let appender = RollingFileAppender::new(config.rotation.into(), parent, file_name);
        layers.push(fmt_layer(&config, appender, false));
    }

    // Already initialized is fine (tests, repeated calls)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_rotation_from_str() {
        assert_eq!(
            "hourly".parse::<LogRotation>().unwrap(),
            LogRotation::Hourly
        );
        assert_eq!("daily".parse::<LogRotation>().unwrap(), LogRotation::Daily);
        assert_eq!("never".parse::<LogRotation>().unwrap(), LogRotation::Never);
        assert!("invalid".parse::<LogRotation>().is_err());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("invalid"), None);
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_path.is_none());
        assert!(!config.span_events);
        assert!(config.show_target);
    }

    #[test]
    fn test_log_config_for_cli() {
        assert_eq!(LogConfig::for_cli(0).level, Level::WARN);
        assert_eq!(LogConfig::for_cli(1).level, Level::INFO);
        assert_eq!(LogConfig::for_cli(2).level, Level::DEBUG);
        assert_eq!(LogConfig::for_cli(7).level, Level::DEBUG);
        assert_eq!(LogConfig::for_cli(0).format, LogFormat::Compact);
        assert_eq!(LogConfig::quiet().level, Level::ERROR);
    }

    #[test]
    fn test_log_config_for_worker() {
        let config = LogConfig::for_worker();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.show_target);
        assert!(!config.span_events);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::default()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_file(PathBuf::from("/tmp/test.log"));

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/test.log")));
    }
}
