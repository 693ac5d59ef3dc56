//! `codec` provides the canonical event format shared by every other module
//!
//! An event is an ordered field map carrying a version string that describes its
//! protocol, version, serialization kind and exact byte size. Events are content
//! addressed through a Blake3 based self-addressing identifier (SAID).
pub mod eventing;
pub mod said;
pub mod serder;
pub mod signing;
pub mod tholder;
pub mod types;
pub mod version;

pub use said::{compute_said, digest, saidify, verify_said};
pub use serder::Serder;
pub use signing::{messagize, parse_message, Attachment, Pathed, Siger, Verfer};
pub use tholder::Tholder;
pub use types::{CodecError, Ked, Kind, Version};
