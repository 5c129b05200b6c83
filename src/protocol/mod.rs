//! Wire-level types: broker topics, inbound events, and API payloads

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::*;
