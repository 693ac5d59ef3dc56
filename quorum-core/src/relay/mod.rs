//! `relay` moves signed messages between agents
//!
//! [`Poster`] is an at least once outbound queue with per message completion,
//! [`exchanging`] builds the `exn` peer messages and [`Exchanger`] stores them and
//! tracks their group endorsements.
pub mod exchanger;
pub mod exchanging;
pub mod poster;
pub mod types;

pub use exchanger::Exchanger;
pub use poster::Poster;
pub use types::{
    ExchangeRepoBuilder, Postage, PostageRepoBuilder, RelayError, TransportBuilder,
    TOPIC_CREDENTIAL, TOPIC_MULTISIG,
};
