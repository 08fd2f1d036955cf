//! Participant state for RealmRelay.
//!
//! This crate owns everything the relay remembers about the people in
//! the realm:
//!
//! 1. **Presence**: who is in the session right now
//!    ([`PresenceRegistry`]), with duplicate-join absorption and
//!    rapid-rejoin detection
//! 2. **Abuse suppression**: which participants have already been
//!    reported for a repeating abuse signal ([`SpamGuard`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)  ← decides what each event means
//!     ↕
//! Session state (this crate)  ← remembers who is here
//!     ↕
//! Protocol (below)  ← ParticipantId, Device
//! ```
//!
//! Nothing here is thread-safe by itself. The engine owns one instance
//! of each on its single processing task.

mod registry;
mod session;
mod spam;

pub use registry::{JoinOutcome, PresenceRegistry};
pub use session::{ParticipantSession, PresenceConfig};
pub use spam::SpamGuard;
