use std::sync::OnceLock;

use quickroute_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "quickroute-tests".to_string(),
            log_dir: Some(std::env::temp_dir().join("quickroute-tests")),
            emit_stderr: true,
            format: std::env::var("QUICKROUTE_LOG_FORMAT")
                .map(|raw| LogFormat::from_name(&raw))
                .unwrap_or(LogFormat::Text),
            default_filter: "debug".to_string(),
        };

        quickroute_common::observability::init_logging(config).unwrap_or_default()
    });
}
