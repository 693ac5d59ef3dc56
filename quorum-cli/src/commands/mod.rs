pub mod aid;
pub mod contact;
pub mod handler;
pub mod message;
pub mod multisig;
pub mod notice;
pub mod outbox;
pub mod registry;

pub use handler::{ContextHandler, GlobalArgs};
