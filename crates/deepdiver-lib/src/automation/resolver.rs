//! Ordered-candidate element resolution.
//!
//! Candidates are probed strictly in list order. Each one gets its own bounded
//! wait; the first element that shows up wins and later candidates are never
//! queried. Running out of candidates is a value, not an error, so callers
//! decide between a fallback path and aborting.

use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{BrowserError, ElementHandle, ElementState, Page};

/// How often a single candidate is re-queried while its wait runs.
pub const DEFAULT_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Wait granted to each candidate. Zero means a single probe.
    pub per_candidate: Duration,
    pub poll_interval: Duration,
    pub state: ElementState,
}

impl ResolveOptions {
    pub fn visible(per_candidate: Duration) -> Self {
        Self {
            per_candidate,
            poll_interval: DEFAULT_POLL,
            state: ElementState::Visible,
        }
    }

    /// Presence in the DOM is enough (hidden file inputs).
    pub fn attached(per_candidate: Duration) -> Self {
        Self {
            per_candidate,
            poll_interval: DEFAULT_POLL,
            state: ElementState::Attached,
        }
    }

    /// One immediate probe per candidate, no waiting.
    pub fn instant() -> Self {
        Self::visible(Duration::ZERO)
    }

    /// Upper bound on the time a full miss takes.
    pub fn total_bound(&self, candidates: usize) -> Duration {
        self.per_candidate * candidates as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        /// Position of the winning candidate in the list.
        index: usize,
        locator: String,
        element: ElementHandle,
    },
    NotFound {
        tried: usize,
        elapsed: Duration,
    },
}

impl Resolution {
    pub fn element(&self) -> Option<&ElementHandle> {
        match self {
            Resolution::Found { element, .. } => Some(element),
            Resolution::NotFound { .. } => None,
        }
    }

    pub fn into_element(self) -> Option<ElementHandle> {
        match self {
            Resolution::Found { element, .. } => Some(element),
            Resolution::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Probe `candidates` in order and return the first match.
///
/// A candidate whose query throws in the page (bad selector syntax) is
/// skipped. Transient CDP errors are retried until the candidate's wait
/// expires. Transport failures end resolution with an error.
pub async fn resolve(
    page: &dyn Page,
    candidates: &[&str],
    opts: ResolveOptions,
) -> Result<Resolution, BrowserError> {
    let started = Instant::now();

    for (index, locator) in candidates.iter().enumerate() {
        let deadline = Instant::now() + opts.per_candidate;
        loop {
            match page.query(locator, opts.state).await {
                Ok(Some(element)) => {
                    tracing::debug!(locator, index, "selector matched");
                    return Ok(Resolution::Found {
                        index,
                        locator: locator.to_string(),
                        element,
                    });
                }
                Ok(None) => {}
                Err(BrowserError::JsException { message })
                | Err(BrowserError::InvalidSelector { reason: message, .. }) => {
                    tracing::warn!(locator, error = %message, "selector query threw, skipping");
                    break;
                }
                Err(BrowserError::CdpError { message, .. }) => {
                    tracing::debug!(locator, error = %message, "transient query error");
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(opts.poll_interval.min(deadline - now)).await;
        }
        tracing::trace!(locator, "selector did not match");
    }

    Ok(Resolution::NotFound {
        tried: candidates.len(),
        elapsed: started.elapsed(),
    })
}
