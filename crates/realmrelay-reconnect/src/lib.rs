//! Reconnect supervision for the game-session connection.
//!
//! Owns the retry budget, the fixed retry interval, and the terminal
//! give-up behavior. The supervisor never touches the network itself; it
//! tells the engine what to do and hands it a [`RetryTimer`] to wait on.
//!
//! # State machine
//!
//! ```text
//! Disconnected / GaveUp / ManuallyDisconnected
//!        │ connect()  (attempts = 0)
//!        ▼
//!   Connecting ──on_connected()──→ Connected
//!        ▲                             │
//!        │ on_ended(), attempts < max  │
//!        └─────────(retry timer)───────┘
//!                                      │ on_ended(), attempts == max
//!                                      ▼
//!                                   GaveUp
//!
//! leave() from Connecting/Connected → ManuallyDisconnected
//! ```
//!
//! Retries use a fixed delay, never exponential backoff.
//!
//! # Integration
//!
//! The timer is designed to sit inside the engine's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* connect / leave */ }
//!         attempt = supervisor.wait_for_retry() => {
//!             spawn_connect_attempt(attempt);
//!         }
//!     }
//! }
//! ```

mod error;
mod supervisor;
mod timer;

pub use error::SupervisorError;
pub use supervisor::{
    EndOutcome, ReconnectConfig, ReconnectSupervisor, SupervisorState,
};
pub use timer::RetryTimer;
