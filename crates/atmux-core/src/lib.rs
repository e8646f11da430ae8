#![warn(missing_docs)]

//! atmux-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core utilities shared across all
//! layers of the AT protocol engine:
//! - Configuration and timeout budgets
//! - Error handling
//! - Protocol constants
//! - Transport and power-control traits
//! - Time abstraction
//!
//! Protocol-specific logic lives in specialized crates:
//! - `atmux-protocol`: command literals, pattern scanner, URC set, packet queue
//! - `atmux-engine`: the command/response engine over a serial transport
//! - `atmux-modem`: the connection state machine and socket session layer

/// Protocol constants shared across layers.
pub mod constants {
    /// Maximum number of characters a response line may carry.
    ///
    /// Lines longer than this are returned as-is at the reader; the modem's
    /// documented responses all fit comfortably below this bound.
    pub const MAX_LINE_LENGTH: usize = 511;

    /// Number of logical connection identifiers multiplexed over the
    /// command channel. Valid ids are `0..=MAX_SOCKET_ID`.
    pub const SOCKET_COUNT: usize = 6;

    /// The highest valid connection identifier.
    pub const MAX_SOCKET_ID: u8 = 5;

    /// Maximum payload bytes per send transmission. Larger payloads are
    /// chunked into consecutive send handshakes.
    pub const SEND_CHUNK_SIZE: usize = 1024;
}

/// Configuration options and per-operation-class timeout budgets.
pub mod config;
/// Error types and results.
pub mod error;
/// Time abstraction for deadlines and inter-attempt delays.
pub mod time;
/// Transport and power-control traits for pluggable I/O.
pub mod transport;
