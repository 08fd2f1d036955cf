//! A cancellable one-shot retry timer.

use std::time::Duration;

use tokio::time::{self, Instant};

/// A single pending reconnect, or nothing.
///
/// Unlike a free-running `tokio::spawn(sleep)`, the timer is owned by
/// the supervisor and only fires while it is being awaited, so
/// [`cancel`](Self::cancel) is deterministic: once cancelled, a stale
/// retry can never fire.
#[derive(Debug, Default)]
pub struct RetryTimer {
    /// When the retry is due, and which attempt it is.
    pending: Option<(Instant, u32)>,
}

impl RetryTimer {
    /// Creates a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `attempt` to fire after `delay`, replacing any pending one.
    pub fn arm(&mut self, delay: Duration, attempt: u32) {
        self.pending = Some((Instant::now() + delay, attempt));
    }

    /// Drops the pending retry, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Whether a retry is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the pending retry and returns its attempt number.
    ///
    /// When nothing is armed this future pends forever; inside
    /// `tokio::select!` the other branches keep running. The timer is
    /// disarmed once it fires.
    ///
    /// Cancel-safe: if the future is dropped before the deadline the
    /// retry stays armed.
    pub async fn wait(&mut self) -> u32 {
        let Some((deadline, attempt)) = self.pending else {
            return std::future::pending::<u32>().await;
        };
        time::sleep_until(deadline).await;
        self.pending = None;
        attempt
    }
}
