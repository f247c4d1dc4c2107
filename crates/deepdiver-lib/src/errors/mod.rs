use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::browser::BrowserError;

#[derive(Error, Debug)]
pub enum DeepDiverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Chrome DevTools endpoint not reachable at {url}")]
    CdpUnavailable { url: String },

    #[error("No element matched any of {candidates} selector(s) for {what}")]
    ElementNotFound { what: String, candidates: usize },

    #[error("Timed out waiting for {what} after {elapsed:?}")]
    Timeout { what: String, elapsed: Duration },

    #[error("Workflow stage '{stage}' failed: {reason}")]
    Workflow {
        stage: String,
        reason: String,
        diagnostic: Option<PathBuf>,
    },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Content error: {0}")]
    Content(String),

    #[error("Command error: {0}")]
    Command(String),

    #[error("{0}")]
    Application(String),
}

pub type Result<T> = std::result::Result<T, DeepDiverError>;

/// Logs a fatal error and exits the process with code 1.
///
/// Intended for unrecoverable errors during initialization.
pub fn handle_fatal(err: DeepDiverError) -> ! {
    tracing::error!("Fatal error: {}", err);
    std::process::exit(1)
}

/// Maps a `DeepDiverError` to user-friendly CLI output with actionable suggestions.
///
/// Uses `crate::output::error()` for the main error message and
/// `crate::output::info()` for hints.
pub fn handle_command_error(err: &DeepDiverError) {
    use crate::output;

    match err {
        DeepDiverError::CdpUnavailable { url } => {
            output::error(&format!("Chrome is not reachable at {}", url));
            output::info("Run `deepdiver init` to launch Chrome with remote debugging,");
            output::info("or start it yourself: google-chrome --remote-debugging-port=9222");
        }
        DeepDiverError::Browser(e) => {
            output::error(&format!("Browser error: {}", e));
            output::info("Check that Chrome is still running and the NotebookLM tab is open.");
        }
        DeepDiverError::Workflow {
            stage,
            reason,
            diagnostic,
        } => {
            output::error(&format!("Stage '{}' failed: {}", stage, reason));
            if let Some(path) = diagnostic {
                output::info(&format!("Diagnostics saved to {}", path.display()));
            }
        }
        DeepDiverError::ElementNotFound { what, .. } => {
            output::error(&format!("Could not find {} on the page", what));
            output::info("The NotebookLM UI may have changed or you may not be signed in.");
        }
        DeepDiverError::Timeout { what, elapsed } => {
            output::error(&format!(
                "Timed out waiting for {} ({}s)",
                what,
                elapsed.as_secs()
            ));
        }
        DeepDiverError::Http(e) => {
            output::error(&format!("Network error: {}", e));
            output::info("Check your internet connection.");
        }
        DeepDiverError::Io(e) => {
            output::error(&format!("File error: {}", e));
        }
        DeepDiverError::Config(msg) => {
            output::error(&format!("Configuration error: {}", msg));
            output::info("Run `deepdiver config` to see the effective configuration.");
        }
        DeepDiverError::Session(msg) => {
            output::error(&format!("Session error: {}", msg));
            output::info("Run `deepdiver session start` to begin a new session.");
        }
        DeepDiverError::Command(msg) => {
            output::error(&format!("Error: {}", msg));
        }
        _ => {
            output::error(&format!("{}", err));
        }
    }
}
