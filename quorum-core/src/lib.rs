//! `prople-quorum-core` is the protocol layer used by `quorum` agents to coordinate
//! events of identifiers that are jointly controlled by multiple members
//!
//! An identifier controlled by a group of members (a *group identifier*) can only move
//! forward when a threshold of its members sign the same event. Each member runs its own
//! agent, so a proposal is broadcast, approved locally by each operator, countersigned
//! and finally committed once the threshold is satisfied.
//!
//! The crate is split into these modules:
//!
//! - `codec`, canonical event serialization, version strings, self-addressing identifiers,
//!   thresholds and indexed signatures
//! - `credential`, verifiable credential envelope, schema validation and registry events
//! - `escrow`, completion tracker of partially signed or anchored artifacts
//! - `group`, identities, group coordinator and the polling waiter
//! - `relay`, peer message relay and the `exn` exchange messages
//! - `notification`, pending notifications and their typed proposals
//! - `confirm`, the notification driven confirmation loop
//!
//! Every persistent state and every outer capability (signing keys, transport, schema
//! resolution, operator decisions) is injected through a trait, and the concrete
//! implementations live in `prople-quorum-store` and `prople-quorum-cli`
pub mod codec;
pub mod confirm;
pub mod credential;
pub mod escrow;
pub mod group;
pub mod notification;
pub mod relay;
