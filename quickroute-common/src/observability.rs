//! Tracing setup for binaries and integration tests that drive the
//! QuickRoute crates.
//!
//! The libraries only emit `tracing` events (`http.request.start`,
//! `tomtom.search.success`, ...). Whoever owns the process calls
//! [`init_logging`] once to route those events to a daily rolling file and,
//! optionally, to stderr. Later calls are no-ops that return the same path.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const LOG_DIR_ENV: &str = "QUICKROUTE_LOG_DIR";

struct Installed {
    path: PathBuf,
    _guard: WorkerGuard,
}

static INSTALLED: OnceLock<Installed> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Lenient parse used by config files and env overrides; unknown means text.
    pub fn from_name(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used as the log file stem and the default directory name.
    pub app_name: String,
    /// Explicit output directory; otherwise `QUICKROUTE_LOG_DIR`, then
    /// `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset, e.g. `quickroute_tomtom=debug`.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "quickroute".to_string(),
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    fn resolved_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir(&self.app_name))
    }

    /// File the appender writes to today. The appender rolls on UTC dates.
    fn todays_file(&self, dir: PathBuf) -> PathBuf {
        let stamp = Utc::now().format("%Y-%m-%d");
        dir.join(format!("{}.log.{stamp}", self.app_name))
    }
}

/// Install the global `tracing` subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(installed) = INSTALLED.get() {
        return Ok(installed.path.clone());
    }

    let dir = config.resolved_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let appender = rolling::daily(&dir, format!("{}.log", config.app_name));
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let mut sinks = vec![sink(config.format, file_writer, false)];
    if config.emit_stderr {
        sinks.push(sink(config.format, std::io::stderr, true));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    let path = config.todays_file(dir);
    let installed = INSTALLED.get_or_init(|| Installed {
        path,
        _guard: guard,
    });
    Ok(installed.path.clone())
}

fn sink<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn default_data_dir(app_name: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/share").join(app_name),
        None => PathBuf::from(app_name),
    }
}
