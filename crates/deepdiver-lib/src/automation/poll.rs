//! Fixed-interval polling with heartbeats and a hard timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::Result;

/// Default spacing between progress heartbeats.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
    pub heartbeat: Duration,
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Ready { value: T, elapsed: Duration },
    TimedOut { elapsed: Duration },
}

/// Run `probe` every `interval` until it yields a value or `timeout` passes.
///
/// The probe runs once immediately and once more at the deadline, so a
/// timeout is reported at the deadline and never before it. `on_heartbeat`
/// receives the elapsed time whenever `heartbeat` has passed since the last
/// beat. Probe errors end the poll.
pub async fn poll_until<T, F, Fut, H>(
    mut probe: F,
    opts: PollOptions,
    mut on_heartbeat: H,
) -> Result<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    H: FnMut(Duration),
{
    let started = Instant::now();
    let mut last_beat = started;
    let interval = opts.interval.max(Duration::from_millis(1));

    loop {
        if let Some(value) = probe().await? {
            return Ok(PollOutcome::Ready {
                value,
                elapsed: started.elapsed(),
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= opts.timeout {
            return Ok(PollOutcome::TimedOut { elapsed });
        }

        if last_beat.elapsed() >= opts.heartbeat {
            on_heartbeat(elapsed);
            last_beat = Instant::now();
        }

        tokio::time::sleep(interval.min(opts.timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeepDiverError;

    #[tokio::test(start_paused = true)]
    async fn test_ready_at_simulated_time() {
        let started = Instant::now();
        let ready_at = Duration::from_secs(95);
        let opts = PollOptions::new(Duration::from_secs(600), Duration::from_secs(10));

        let outcome = poll_until(
            || async move {
                Ok((started.elapsed() >= ready_at).then_some("artifact"))
            },
            opts,
            |_| {},
        )
        .await
        .unwrap();

        match outcome {
            PollOutcome::Ready { value, elapsed } => {
                assert_eq!(value, "artifact");
                assert!(elapsed >= ready_at);
                assert!(elapsed <= ready_at + opts.interval);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let opts = PollOptions::new(Duration::from_secs(120), Duration::from_secs(7));

        let outcome: PollOutcome<()> = poll_until(|| async { Ok(None) }, opts, |_| {})
            .await
            .unwrap();

        match outcome {
            PollOutcome::TimedOut { elapsed } => {
                assert!(elapsed >= opts.timeout, "timed out early: {:?}", elapsed);
                assert!(elapsed < opts.timeout + Duration::from_secs(1));
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_roughly_every_thirty_seconds() {
        let opts = PollOptions::new(Duration::from_secs(100), Duration::from_secs(10));
        let mut beats = Vec::new();

        let _: PollOutcome<()> = poll_until(|| async { Ok(None) }, opts, |e| beats.push(e.as_secs()))
            .await
            .unwrap();

        assert_eq!(beats, vec![30, 60, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_has_zero_elapsed() {
        let opts = PollOptions::new(Duration::from_secs(10), Duration::from_secs(1));
        let outcome = poll_until(|| async { Ok(Some(1u8)) }, opts, |_| {}).await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::Ready {
                value: 1,
                elapsed: Duration::ZERO
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_stops_polling() {
        let opts = PollOptions::new(Duration::from_secs(10), Duration::from_secs(1));
        let mut calls = 0;
        let res: Result<PollOutcome<()>> = poll_until(
            || {
                calls += 1;
                async { Err(DeepDiverError::Application("probe broke".into())) }
            },
            opts,
            |_| {},
        )
        .await;
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }
}
