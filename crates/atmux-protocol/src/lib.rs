#![warn(missing_docs)]

//! atmux-protocol: wire-level protocol logic, free of I/O.
//!
//! Everything here operates on already-framed lines or in-memory buffers,
//! which keeps it unit-testable without a transport:
//! - AT command literals
//! - scanf-style response field extraction
//! - unsolicited result code (URC) classification
//! - inbound packet queue shared across connection identifiers
//! - registration and TCP/IP stack status codes
//! - network time banner decoding

/// AT command line builders.
pub mod command;
/// Network time banner parsing.
pub mod network_time;
/// Inbound packets and the shared packet queue.
pub mod packet;
/// scanf-style pattern scanner for response lines.
pub mod pattern;
/// Registration and TCP/IP stack status codes.
pub mod status;
/// Unsolicited result code classification.
pub mod urc;

pub use command::Protocol;
pub use network_time::NetworkTime;
pub use packet::{Packet, PacketQueue};
pub use pattern::Capture;
pub use status::{RegistrationStatus, StackState};
pub use urc::Urc;
