//! `group` coordinates events of identifiers controlled by several members
//!
//! [`Habery`] applies the membership and key state rules over an injected
//! identity store, [`Counselor`] moves a proposal from local signature to commit
//! and [`Waiter`] is the caller side polling policy with timeout and cancellation.
pub mod counselor;
pub mod habery;
pub mod types;
pub mod waiter;

pub use counselor::Counselor;
pub use habery::Habery;
pub use types::{GroupError, GroupHab, GroupInits, Hab, HaberyBuilder, KeyState, ProposalState};
pub use waiter::{cancellation, CancelHandle, Cancellation, WaitOutcome, WaitPolicy, Waiter};
