use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the computed filter directive.
pub const LOG_ENV: &str = "DEEPDIVER_LOG";

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Build the filter directive for the given verbosity.
///
/// Third-party transport crates stay at `warn` so CDP traffic only shows up
/// through our own `debug!` events.
pub fn filter_directive(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("{level},tungstenite=warn,tokio_tungstenite=warn,hyper=warn,reqwest=warn")
}

/// Initialize the tracing subscriber with timestamp, level, and structured fields.
///
/// `DEEPDIVER_LOG` wins when set; otherwise `debug` selects DEBUG or INFO.
/// Logs go to stderr so `get-html` and `--json` output stay clean on stdout.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(debug)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::SystemTime)
        .with_level(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Set the global verbose mode flag.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::SeqCst);
}

/// Check whether verbose mode is currently enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}
