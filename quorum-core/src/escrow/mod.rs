//! `escrow` holds artifacts whose completion condition is not satisfied yet
//!
//! Each entry is keyed by an identifier prefix and a sequence number. An entry
//! is either waiting for a threshold of member signatures or waiting for the key
//! event that anchors it. Completion markers are durable and never removed.
pub mod tracker;
pub mod types;

pub use tracker::Tracker;
pub use types::{EscrowEntry, EscrowError, EscrowKey, EscrowRepoBuilder, Material};
