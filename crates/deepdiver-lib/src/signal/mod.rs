use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::errors::{DeepDiverError, Result};

/// Intercepts SIGINT (Ctrl+C) and SIGTERM and turns them into a cancelled token.
///
/// Spawn `listen()` as a background task, then race long running commands
/// against the token with [`run_until_cancelled`].
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for SIGINT or SIGTERM, then cancels the token.
    pub async fn listen(&self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, aborting...");
            }
            _ = Self::sigterm() => {
                tracing::info!("Received SIGTERM, aborting...");
            }
        }
        self.token.cancel();
    }

    #[cfg(unix)]
    async fn sigterm() {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    async fn sigterm() {
        std::future::pending::<()>().await;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `fut` to completion unless `token` is cancelled first.
///
/// There is no cooperative cancellation inside a workflow; an interrupt drops
/// the in-flight future and leaves the remote page wherever it was.
pub async fn run_until_cancelled<F, T>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(DeepDiverError::Application("Interrupted".to_string())),
        res = fut => res,
    }
}
