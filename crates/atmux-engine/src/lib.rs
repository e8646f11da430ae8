#![warn(missing_docs)]

//! atmux-engine: the command/response engine over a serial transport.
//!
//! This crate owns the byte-to-line boundary and the multiplexing rules of
//! the command channel:
//! - [`LineReader`] assembles printable response lines and raw payload reads
//!   from a polled byte stream.
//! - [`CommandEngine`] transmits commands, waits for responses, filters
//!   unsolicited notices out of response waits, and reassembles inbound
//!   payloads into the shared packet queue.
//!
//! Consumers receive asynchronous notices as [`ModemEvent`]s over a channel
//! and queued payloads through `take_packet`.

mod engine;
mod events;
mod reader;

pub use engine::CommandEngine;
pub use events::ModemEvent;
pub use reader::LineReader;
