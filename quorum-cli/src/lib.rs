//! `prople-quorum-cli` is the operator interface of a quorum agent
//!
//! It wires the durable collaborators of `prople-quorum-store` into the
//! confirmation loop of `prople-quorum-core` and asks every decision on the
//! terminal.
pub mod commands;
pub mod types;
pub mod utils;
