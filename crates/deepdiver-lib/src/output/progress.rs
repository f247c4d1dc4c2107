use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner for indeterminate operations such as audio generation.
///
/// The spinner ticks on its own; callers update the message on each heartbeat.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Message shown while waiting on a long running job.
pub fn heartbeat_message(what: &str, elapsed: Duration, timeout: Duration) -> String {
    format!(
        "{} ({}s elapsed, timeout {}s)",
        what,
        elapsed.as_secs(),
        timeout.as_secs()
    )
}
