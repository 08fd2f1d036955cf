//! Event routing and moderation policy for RealmRelay.
//!
//! The router is the one place where the two sides of the relay meet:
//! game-session events come in and become chat notifications, chat
//! gateway messages come in and become game commands. It is pure
//! bookkeeping. It never touches the network; every handler returns a
//! list of [`Effect`]s and the engine performs them.
//!
//! # Key types
//!
//! - [`RelayRouter`]: owns presence and spam state for one connection
//!   generation and turns events into effects
//! - [`ModerationLists`]: allow-list, banned devices, block list
//! - [`Verdict`]: outcome of a policy check
//! - [`Effect`]: something the engine must do on the router's behalf
//! - [`RouterConfig`]: chat markers, announcement toggles, device table

mod config;
mod effect;
mod error;
mod policy;
mod router;

pub use config::RouterConfig;
pub use effect::{Effect, HistoryEvent, HistoryRecord};
pub use error::RouterError;
pub use policy::{ModerationList, ModerationLists, Verdict};
pub use router::RelayRouter;
