//! Loader for QuickRoute configuration with YAML + environment overlays.
//!
//! Nothing here runs implicitly: the address finder never reads the
//! environment on its own. Callers that prefer file-driven setup build a
//! [`QuickrouteConfigLoader`], and hand the resulting [`ProviderConfig`] to the
//! client.
//!
//! Precedence, lowest first: YAML sources in the order they were attached,
//! then `QUICKROUTE__SECTION__FIELD` environment variables. After merging,
//! every string value goes through `${VAR}` expansion (recursive, capped at
//! eight hops so cycles terminate).
//!
//! ```yaml
//! provider:
//!   api_key: "${TOMTOM_API_KEY}"
//!   base_url: "https://api.tomtom.com"   # optional
//!   timeout_ms: 1000                     # optional
//! logging:                               # optional
//!   filter: "info,quickroute_http=debug"
//!   format: json
//!   emit_stderr: true
//!   dir: "~/.local/share/quickroute"
//! ```
use config::{Config, ConfigError, Environment, File};
use quickroute_common::observability::{LogConfig, LogFormat};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_BASE_URL: &str = "https://api.tomtom.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct QuickrouteConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how to reach the geocoding provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms", deserialize_with = "lenient_u64")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub emit_stderr: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: default_format(),
            emit_stderr: false,
            dir: None,
        }
    }
}

impl LoggingConfig {
    /// Translate into the observability initializer's settings. A leading
    /// `~/` in `dir` resolves against the home directory.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self
                .dir
                .as_ref()
                .map(|d| PathBuf::from(shellexpand::tilde(&d.to_string_lossy()).as_ref())),
            emit_stderr: self.emit_stderr,
            format: LogFormat::from_name(&self.format),
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_filter() -> String {
    "info".into()
}
fn default_format() -> String {
    "text".into()
}

// Environment overrides arrive as strings; YAML numbers arrive as numbers.
fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("expected unsigned integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid integer {s:?}: {e}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected unsigned integer, got {other}"
        ))),
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Value::deserialize(d)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(serde::de::Error::custom(format!("invalid boolean {s:?}"))),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected boolean, got {other}"
        ))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct QuickrouteConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for QuickrouteConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickrouteConfigLoader {
    /// Start with `QUICKROUTE__` env overrides; attach files or snippets next.
    ///
    /// ```
    /// use quickroute_config::QuickrouteConfigLoader;
    ///
    /// let config = QuickrouteConfigLoader::new()
    ///     .with_yaml_str("provider:\n  api_key: demo")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.provider.api_key, "demo");
    /// assert_eq!(config.provider.base_url, "https://api.tomtom.com");
    /// assert_eq!(config.provider.timeout_ms, 1000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped so
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests and embedding applications to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment overrides are layered last, then `${VAR}` placeholders are
    /// expanded before materialising the typed structs.
    ///
    /// ```
    /// use quickroute_config::QuickrouteConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_TOMTOM_KEY", "injected-from-env"); }
    ///
    /// let config = QuickrouteConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// provider:
    ///   api_key: "${DOC_TOMTOM_KEY}"
    ///   timeout_ms: 2500
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.provider.api_key, "injected-from-env");
    /// assert_eq!(config.provider.timeout_ms, 2500);
    ///
    /// unsafe { std::env::remove_var("DOC_TOMTOM_KEY"); }
    /// ```
    pub fn load(self) -> Result<QuickrouteConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix("QUICKROUTE").separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
