//! `prople-quorum-store` provides the durable collaborators of a quorum agent
//!
//! Every repository contract of `prople-quorum-core` is implemented here over a
//! single `redb` database file. [`Storage`] bundles them as the
//! [`Components`](prople_quorum_core::confirm::Components) of the confirmation
//! loop and [`Keeper`] holds the passcode sealed signing keys.
//!
//! The agent configuration, a TOML file with `[database]` and `[agent]` tables,
//! is parsed by [`config::Parser`].
pub mod common;
pub mod config;
pub mod db;
pub mod keeper;
pub mod outbox;
pub mod repositories;
pub mod storage;

pub use config::Config;
pub use keeper::{EndRole, Keeper};
pub use outbox::Outbox;
pub use storage::Storage;
