//! The reconnect state machine.

use std::fmt;
use std::time::Duration;

use crate::{RetryTimer, SupervisorError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry budget and spacing.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// How many consecutive connection endings are tolerated. Reaching
    /// this count gives up. 0 means "never retry".
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of the game-session connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Never connected.
    Disconnected,
    /// A connect attempt is running or a retry is scheduled.
    Connecting,
    /// A session is up.
    Connected,
    /// The retry budget ran out. Only `connect()` leaves this state.
    GaveUp,
    /// The operator left. Only `connect()` leaves this state.
    ManuallyDisconnected,
}

impl SupervisorState {
    /// `true` while a session is up or being established.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::GaveUp => "gave up",
            Self::ManuallyDisconnected => "manually disconnected",
        };
        f.write_str(name)
    }
}

/// What the supervisor decided after a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// A retry was scheduled.
    RetryScheduled { attempt: u32, delay: Duration },
    /// The budget is exhausted. The caller performs the full reset.
    GaveUp,
    /// The ending was not for an active connection (already left, already
    /// gave up). Nothing changed.
    Ignored,
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Finite-state controller for the game-session connection.
///
/// One per process. Owns the retry count and the [`RetryTimer`].
pub struct ReconnectSupervisor {
    state: SupervisorState,
    attempts: u32,
    config: ReconnectConfig,
    timer: RetryTimer,
}

impl ReconnectSupervisor {
    /// Creates a supervisor in `Disconnected`.
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            state: SupervisorState::Disconnected,
            attempts: 0,
            config,
            timer: RetryTimer::new(),
        }
    }

    /// Operator `connect`: starts a fresh retry budget.
    ///
    /// On `Ok` the caller should start a connect attempt immediately.
    ///
    /// # Errors
    /// [`SupervisorError::AlreadyConnected`] / [`AlreadyConnecting`]
    /// when a session is up or being established.
    ///
    /// [`AlreadyConnecting`]: SupervisorError::AlreadyConnecting
    pub fn connect(&mut self) -> Result<(), SupervisorError> {
        match self.state {
            SupervisorState::Connected => Err(SupervisorError::AlreadyConnected),
            SupervisorState::Connecting => {
                Err(SupervisorError::AlreadyConnecting)
            }
            SupervisorState::Disconnected
            | SupervisorState::GaveUp
            | SupervisorState::ManuallyDisconnected => {
                self.attempts = 0;
                self.timer.cancel();
                self.state = SupervisorState::Connecting;
                tracing::info!("connecting to realm");
                Ok(())
            }
        }
    }

    /// A connect attempt succeeded. A new session gets a fresh budget.
    ///
    /// Returns `false` if the supervisor was not expecting a connection
    /// (the operator left meanwhile); the caller should then close it.
    pub fn on_connected(&mut self) -> bool {
        if self.state != SupervisorState::Connecting {
            tracing::debug!(state = %self.state, "late connection discarded");
            return false;
        }
        self.state = SupervisorState::Connected;
        self.attempts = 0;
        self.timer.cancel();
        tracing::info!("connected to realm");
        true
    }

    /// The connection ended (peer closed, error, protocol failure) or a
    /// connect attempt failed.
    pub fn on_ended(&mut self, detail: &str) -> EndOutcome {
        if !self.state.is_active() {
            tracing::debug!(state = %self.state, %detail, "ending ignored");
            return EndOutcome::Ignored;
        }

        self.attempts = (self.attempts + 1).min(self.config.max_attempts);
        if self.attempts < self.config.max_attempts {
            let delay = self.config.interval;
            self.timer.arm(delay, self.attempts);
            self.state = SupervisorState::Connecting;
            tracing::warn!(
                attempt = self.attempts,
                max = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                %detail,
                "realm connection ended, retry scheduled"
            );
            EndOutcome::RetryScheduled {
                attempt: self.attempts,
                delay,
            }
        } else {
            self.timer.cancel();
            self.state = SupervisorState::GaveUp;
            tracing::warn!(
                attempts = self.attempts,
                %detail,
                "maximum reconnect attempts reached, giving up"
            );
            EndOutcome::GaveUp
        }
    }

    /// Operator `leave`: stops everything, including a scheduled retry.
    ///
    /// On `Ok` the caller tears down the connection and clears relay state.
    ///
    /// # Errors
    /// [`SupervisorError::NotConnected`] outside `Connecting`/`Connected`.
    pub fn leave(&mut self) -> Result<(), SupervisorError> {
        if !self.state.is_active() {
            return Err(SupervisorError::NotConnected(self.state));
        }
        self.timer.cancel();
        self.attempts = self.config.max_attempts;
        self.state = SupervisorState::ManuallyDisconnected;
        tracing::info!("left realm on operator request");
        Ok(())
    }

    /// Waits for the scheduled retry; see [`RetryTimer::wait`].
    pub async fn wait_for_retry(&mut self) -> u32 {
        self.timer.wait().await
    }

    /// Current state.
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Consecutive endings since the last fresh budget.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether a retry is scheduled.
    pub fn is_retry_pending(&self) -> bool {
        self.timer.is_armed()
    }

    /// The configured budget.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(max_attempts: u32) -> ReconnectSupervisor {
        ReconnectSupervisor::new(ReconnectConfig {
            max_attempts,
            interval: Duration::from_millis(100),
        })
    }

    fn connected(max_attempts: u32) -> ReconnectSupervisor {
        let mut s = supervisor(max_attempts);
        s.connect().unwrap();
        assert!(s.on_connected());
        s
    }

    // =====================================================================
    // connect()
    // =====================================================================

    #[test]
    fn test_connect_from_disconnected_moves_to_connecting() {
        let mut s = supervisor(3);

        s.connect().expect("should be allowed");

        assert_eq!(s.state(), SupervisorState::Connecting);
        assert_eq!(s.attempts(), 0);
    }

    #[test]
    fn test_connect_while_connected_is_rejected() {
        let mut s = connected(3);

        assert_eq!(s.connect(), Err(SupervisorError::AlreadyConnected));
        assert_eq!(s.state(), SupervisorState::Connected);
    }

    #[test]
    fn test_connect_while_connecting_is_rejected() {
        let mut s = supervisor(3);
        s.connect().unwrap();

        assert_eq!(s.connect(), Err(SupervisorError::AlreadyConnecting));
    }

    #[test]
    fn test_connect_after_give_up_resets_attempts() {
        let mut s = connected(1);
        assert_eq!(s.on_ended("closed"), EndOutcome::GaveUp);

        s.connect().expect("give-up is recoverable by connect");

        assert_eq!(s.attempts(), 0);
        assert_eq!(s.state(), SupervisorState::Connecting);
    }

    #[test]
    fn test_connect_after_leave_is_allowed() {
        let mut s = connected(3);
        s.leave().unwrap();

        s.connect().expect("should reconnect");

        assert_eq!(s.attempts(), 0);
    }

    // =====================================================================
    // on_connected()
    // =====================================================================

    #[test]
    fn test_on_connected_resets_attempts() {
        let mut s = connected(5);
        s.on_ended("closed");
        s.on_ended("closed");
        assert_eq!(s.attempts(), 2);

        assert!(s.on_connected());

        assert_eq!(s.attempts(), 0);
        assert_eq!(s.state(), SupervisorState::Connected);
        assert!(!s.is_retry_pending());
    }

    #[test]
    fn test_on_connected_after_leave_is_discarded() {
        let mut s = supervisor(3);
        s.connect().unwrap();
        s.leave().unwrap();

        assert!(!s.on_connected());
        assert_eq!(s.state(), SupervisorState::ManuallyDisconnected);
    }

    // =====================================================================
    // on_ended()
    // =====================================================================

    #[test]
    fn test_on_ended_schedules_fixed_interval_retry() {
        let mut s = connected(3);

        let first = s.on_ended("closed");
        let second = s.on_ended("closed");

        assert_eq!(
            first,
            EndOutcome::RetryScheduled {
                attempt: 1,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(
            second,
            EndOutcome::RetryScheduled {
                attempt: 2,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(s.state(), SupervisorState::Connecting);
        assert!(s.is_retry_pending());
    }

    #[test]
    fn test_on_ended_three_times_gives_up_with_budget_three() {
        let mut s = connected(3);

        s.on_ended("closed");
        s.on_ended("closed");
        let third = s.on_ended("closed");

        assert_eq!(third, EndOutcome::GaveUp);
        assert_eq!(s.state(), SupervisorState::GaveUp);
        assert_eq!(s.attempts(), 3);
        assert!(!s.is_retry_pending());
    }

    #[test]
    fn test_on_ended_after_give_up_schedules_nothing() {
        let mut s = connected(3);
        for _ in 0..3 {
            s.on_ended("closed");
        }

        assert_eq!(s.on_ended("closed"), EndOutcome::Ignored);
        assert!(!s.is_retry_pending());
        assert_eq!(s.attempts(), 3, "attempts never exceed the budget");
    }

    #[test]
    fn test_on_ended_with_zero_budget_gives_up_immediately() {
        let mut s = connected(0);

        assert_eq!(s.on_ended("closed"), EndOutcome::GaveUp);
        assert_eq!(s.attempts(), 0);
    }

    #[test]
    fn test_on_ended_with_budget_one_gives_up_without_retry() {
        let mut s = connected(1);

        assert_eq!(s.on_ended("closed"), EndOutcome::GaveUp);
        assert_eq!(s.state(), SupervisorState::GaveUp);
        assert_eq!(s.attempts(), 1);
        assert!(!s.is_retry_pending());
    }

    #[test]
    fn test_on_ended_retries_one_less_than_budget() {
        let mut s = connected(2);

        assert!(matches!(
            s.on_ended("closed"),
            EndOutcome::RetryScheduled { attempt: 1, .. }
        ));
        assert_eq!(s.on_ended("closed"), EndOutcome::GaveUp);
    }

    #[test]
    fn test_on_ended_before_any_connect_is_ignored() {
        let mut s = supervisor(3);

        assert_eq!(s.on_ended("stale"), EndOutcome::Ignored);
        assert_eq!(s.state(), SupervisorState::Disconnected);
    }

    // =====================================================================
    // leave()
    // =====================================================================

    #[test]
    fn test_leave_cancels_pending_retry() {
        let mut s = connected(3);
        s.on_ended("closed");
        assert!(s.is_retry_pending());

        s.leave().expect("should leave while reconnecting");

        assert!(!s.is_retry_pending());
        assert_eq!(s.state(), SupervisorState::ManuallyDisconnected);
        assert_eq!(s.attempts(), 3);
    }

    #[test]
    fn test_leave_then_ended_is_ignored() {
        let mut s = connected(3);
        s.leave().unwrap();

        assert_eq!(s.on_ended("closed by us"), EndOutcome::Ignored);
        assert!(!s.is_retry_pending());
    }

    #[test]
    fn test_leave_when_not_connected_is_rejected() {
        let mut s = supervisor(3);

        assert_eq!(
            s.leave(),
            Err(SupervisorError::NotConnected(SupervisorState::Disconnected))
        );
    }
}
