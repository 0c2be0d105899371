//! Session state for the online broadcaster.
//!
//! A session tracks a single broadcast attempt through
//! idle -> pending -> success | error, with a retry path from error back to
//! idle.

pub mod broadcast;

pub use broadcast::{BroadcastSession, BroadcastStateError, BroadcastTicket};
