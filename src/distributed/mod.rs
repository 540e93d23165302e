//! Participant group and message passing
//!
//! A run is a fixed group of participants with ids `0..P`; participant 0 is
//! the coordinator. Participants only talk through a [`Transport`], which moves
//! tagged `f64` payloads point to point.
//!
//! # Modules
//!
//! - `group`: participant identity and group discovery
//! - `protocol`: wire messages and framing
//! - `transport`: the `Transport` trait and the tag-matching mailbox
//! - `local`: in-process transport (single process, tests)
//! - `tcp`: TCP transport (one process per participant)
//! - `aggregation`: partial-result gather/reduce and the shutdown barrier

pub mod aggregation;
pub mod group;
pub mod local;
pub mod protocol;
pub mod tcp;
pub mod transport;

// Re-export key types
pub use aggregation::{Aggregate, AggregationMode, PartialResult};
pub use group::{GroupEnvironment, ParticipantContext, ParticipantId, Role, COORDINATOR};
pub use local::LocalTransport;
pub use protocol::{Message, Tag, PARTIAL_RESULT_TAG, PROTOCOL_VERSION};
pub use tcp::TcpTransport;
pub use transport::{Envelope, Transport};
