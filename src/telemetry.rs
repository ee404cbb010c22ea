use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Path of the JSON trace log, overridable for test runs and debugging.
pub(crate) fn trace_log_path() -> PathBuf {
    env::var("LIVECAP_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("livecap_trace.jsonl"))
}

/// Install the JSON tracing subscriber when --logs is set. Captions go to
/// stdout; diagnostics stay out of the caption stream entirely.
pub fn init_tracing(config: &AppConfig) {
    if !config.logs {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        let path = trace_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
