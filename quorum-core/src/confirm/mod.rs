//! `confirm` is the notification driven confirmation loop
//!
//! [`Inbound`] turns received group messages into notices. [`Confirmer`] scans
//! the notices, asks the operator through a [`DecisionProvider`] and drives every
//! approved proposal until it is committed. All collaborators come from one
//! [`Components`] bundle. [`Proposer`] is the initiating side of a group
//! inception.
mod context;
mod handlers;

pub mod confirmer;
pub mod inbound;
pub mod proposer;
pub mod summary;
pub mod types;

pub use confirmer::Confirmer;
pub use inbound::{notice_attrs, Inbound};
pub use proposer::Proposer;
pub use summary::{MemberRow, MemberTable, Summary};
pub use types::{
    Components, ConfirmError, Contact, ContactDirectory, DecisionProvider, Outcome, ScanReport,
};

#[cfg(test)]
mod testing;
