//! Integration tests for retry scheduling.
//!
//! Uses `tokio::time::pause()` so timers resolve deterministically when
//! the clock is advanced, with no real sleeping.

use std::time::Duration;

use realmrelay_reconnect::{
    EndOutcome, ReconnectConfig, ReconnectSupervisor, RetryTimer,
    SupervisorState,
};

// =========================================================================
// Helpers
// =========================================================================

fn supervisor(max_attempts: u32, interval_ms: u64) -> ReconnectSupervisor {
    ReconnectSupervisor::new(ReconnectConfig {
        max_attempts,
        interval: Duration::from_millis(interval_ms),
    })
}

// =========================================================================
// RetryTimer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_fires_after_delay() {
    let mut timer = RetryTimer::new();
    timer.arm(Duration::from_secs(5), 1);

    let start = tokio::time::Instant::now();
    let attempt = timer.wait().await;

    assert_eq!(attempt, 1);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(!timer.is_armed(), "timer disarms after firing");
}

#[tokio::test(start_paused = true)]
async fn test_timer_does_not_fire_early() {
    let mut timer = RetryTimer::new();
    timer.arm(Duration::from_secs(5), 1);

    let early =
        tokio::time::timeout(Duration::from_millis(4_999), timer.wait()).await;

    assert!(early.is_err(), "should still be waiting");
    assert!(timer.is_armed(), "dropping the wait keeps the retry armed");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let mut timer = RetryTimer::new();
    timer.arm(Duration::from_millis(10), 1);
    timer.cancel();

    let result =
        tokio::time::timeout(Duration::from_secs(3600), timer.wait()).await;

    assert!(result.is_err(), "a cancelled timer must pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_never_armed_timer_pends_forever() {
    let mut timer = RetryTimer::new();

    let result =
        tokio::time::timeout(Duration::from_secs(3600), timer.wait()).await;

    assert!(result.is_err());
    assert!(!timer.is_armed());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_retry() {
    let mut timer = RetryTimer::new();
    timer.arm(Duration::from_secs(1), 1);
    timer.arm(Duration::from_secs(2), 2);

    let start = tokio::time::Instant::now();
    let attempt = timer.wait().await;

    assert_eq!(attempt, 2);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(3));
}

// =========================================================================
// Supervisor + timer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_supervisor_retry_fires_with_attempt_number() {
    let mut s = supervisor(3, 5_000);
    s.connect().unwrap();
    s.on_connected();

    let outcome = s.on_ended("peer closed");
    assert!(matches!(outcome, EndOutcome::RetryScheduled { attempt: 1, .. }));

    let attempt = s.wait_for_retry().await;

    assert_eq!(attempt, 1);
    assert_eq!(s.state(), SupervisorState::Connecting);
    assert!(!s.is_retry_pending());
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_leave_prevents_scheduled_retry() {
    let mut s = supervisor(3, 5_000);
    s.connect().unwrap();
    s.on_connected();
    s.on_ended("peer closed");

    s.leave().unwrap();

    let result =
        tokio::time::timeout(Duration::from_secs(60), s.wait_for_retry()).await;
    assert!(result.is_err(), "no retry after leave");
    assert_eq!(s.state(), SupervisorState::ManuallyDisconnected);
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_failed_retries_until_give_up() {
    // Connected, then every retry fails: 1st and 2nd endings retry, the
    // 3rd exhausts a budget of 3.
    let mut s = supervisor(3, 1_000);
    s.connect().unwrap();
    s.on_connected();

    assert!(matches!(s.on_ended("closed"), EndOutcome::RetryScheduled { .. }));
    s.wait_for_retry().await;
    assert!(matches!(
        s.on_ended("connect failed"),
        EndOutcome::RetryScheduled { .. }
    ));
    s.wait_for_retry().await;
    assert_eq!(s.on_ended("connect failed"), EndOutcome::GaveUp);

    let result =
        tokio::time::timeout(Duration::from_secs(60), s.wait_for_retry()).await;
    assert!(result.is_err(), "gave up: nothing scheduled");
}
