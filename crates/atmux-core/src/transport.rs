//! Transport abstraction for pluggable I/O.

use std::io;

/// Byte-oriented serial link to the modem.
///
/// This trait allows various transports (UART driver, TCP bridge, scripted
/// mock) to be plugged into the engine without coupling to a concrete
/// implementation. Reads are non-blocking: the engine polls `readable` and
/// yields to the clock between polls.
pub trait SerialPort {
    /// Returns true when at least one byte is buffered for reading.
    fn readable(&self) -> bool;

    /// Reads a single byte if one is available.
    fn read_byte(&mut self) -> Option<u8>;

    /// Writes bytes to the link, returning the count written.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// Reset and power-key lines of the modem.
///
/// These are bare binary outputs with no feedback path; liveness after a
/// pulse must always be confirmed by a protocol probe, never by pin state.
pub trait PowerPins {
    /// Drives the reset line high or low.
    fn set_reset(&mut self, level: bool);

    /// Drives the power key high or low.
    fn set_power(&mut self, level: bool);
}
