use std::io;

use thiserror::Error;

/// Failure causes surfaced by the engine and the modem driver.
///
/// The variants keep distinct causes apart so callers can tell a dead modem
/// from a mismatched response or a peer-initiated close. Callers that only
/// care about success can collapse everything with `.is_ok()`.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No matching line arrived before the deadline. Covers an unreachable
    /// network, a hung modem, and wire corruption indistinguishably.
    #[error("timed out waiting for a response")]
    Timeout,

    /// A line was read but did not match the expected pattern or prefix.
    #[error("response mismatch: expected `{expected}`, received `{received}`")]
    Mismatch {
        /// The prefix or pattern the caller was waiting for.
        expected: String,
        /// The line actually read from the modem.
        received: String,
    },

    /// A data-available notice declared more bytes than the transport
    /// delivered within the raw-read deadline. The partial payload is
    /// discarded, never queued.
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Bytes declared by the notice.
        expected: usize,
        /// Bytes actually delivered.
        received: usize,
    },

    /// A connection identifier outside the supported range was used.
    #[error("connection id {0} outside supported range")]
    RangeViolation(u8),

    /// Every connection identifier is already in use.
    #[error("no free connection id")]
    NoFreeSocket,

    /// The peer closed the connection and no data remains queued for it.
    #[error("connection {0} closed by peer")]
    Closed(u8),

    /// The underlying transport failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience result type bound to [`ErrorKind`].
pub type Result<T> = std::result::Result<T, ErrorKind>;
