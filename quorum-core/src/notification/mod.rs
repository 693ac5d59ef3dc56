//! `notification` holds the pending notices announcing group proposals
//!
//! A notice only carries attributes. [`Proposal::parse`] turns them into a typed
//! proposal the confirmation loop can dispatch on.
pub mod proposal;
pub mod types;

pub use proposal::{
    ExchangeRef, InceptionProposal, InteractionProposal, Proposal, RotationProposal,
};
pub use types::{Notice, NoticeID, NotificationError, NotificationRepoBuilder};
