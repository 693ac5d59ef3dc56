//! Durable implementations of the repository contracts of `prople-quorum-core`
mod contact;
mod escrow;
mod exchange;
mod notice;
mod postage;
mod registry;
mod schema;

pub use contact::ContactRepository;
pub use escrow::EscrowRepository;
pub use exchange::ExchangeRepository;
pub use notice::NoticeRepository;
pub use postage::PostageRepository;
pub use registry::RegistryRepository;
pub use schema::SchemaRepository;
