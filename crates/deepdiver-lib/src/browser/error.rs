use std::time::Duration;

use thiserror::Error;

/// Errors raised by the CDP transport and page driver.
#[derive(Debug, Clone, Error)]
pub enum BrowserError {
    /// Failed to establish a WebSocket connection to Chrome DevTools.
    #[error("failed to connect to Chrome DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A CDP command timed out waiting for a response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization problems or unexpected message shapes.
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    #[error("JavaScript exception: {message}")]
    JsException { message: String },

    /// The locator string itself is malformed; nothing was sent to the page.
    #[error("invalid selector '{locator}': {reason}")]
    InvalidSelector { locator: String, reason: String },

    #[error("page load timed out after {duration:?}")]
    PageLoadTimeout { duration: Duration },

    /// The element is gone, detached, or has no box to click.
    #[error("element not interactable: {reason}")]
    ElementNotInteractable { reason: String },

    #[error("download failed: {reason}")]
    DownloadFailed { reason: String },

    #[error("no page target available at {url}")]
    NoPageTarget { url: String },
}
