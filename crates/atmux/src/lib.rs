#![warn(missing_docs)]

//! atmux: protocol engine and driver for multiplexing cellular modems.
//!
//! The modem speaks a line-oriented command protocol over a single serial
//! link, mixing synchronous responses, unsolicited notices, and raw binary
//! payloads on the same stream. This crate re-exports the full stack:
//!
//! - [`core`]: configuration, errors, transport and clock traits
//! - [`protocol`]: command literals, response scanning, notice
//!   classification, and the inbound packet queue
//! - [`engine`]: the command/response engine over a serial transport
//! - [`modem`]: the bring-up state machine and socket session layer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use atmux::prelude::*;
//! # struct Uart;
//! # impl SerialPort for Uart {
//! #     fn readable(&self) -> bool { false }
//! #     fn read_byte(&mut self) -> Option<u8> { None }
//! #     fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> { Ok(bytes.len()) }
//! # }
//! # struct Pins;
//! # impl PowerPins for Pins {
//! #     fn set_reset(&mut self, _level: bool) {}
//! #     fn set_power(&mut self, _level: bool) {}
//! # }
//!
//! # fn main() -> atmux::core::error::Result<()> {
//! let mut modem = Modem::new(Uart, Pins, Config::default(), Arc::new(SystemClock));
//! modem.power_up()?;
//! modem.connect("internet", "", "")?;
//!
//! let id = modem.open_session()?;
//! modem.open(id, Protocol::Tcp, "93.184.216.34", 80)?;
//! modem.send(id, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")?;
//!
//! let mut buffer = [0u8; 1024];
//! let n = modem.recv_default(id, &mut buffer)?;
//! println!("{}", String::from_utf8_lossy(&buffer[..n]));
//! modem.close(id)?;
//! # Ok(())
//! # }
//! ```

pub use atmux_core as core;
pub use atmux_engine as engine;
pub use atmux_modem as modem;
pub use atmux_protocol as protocol;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use atmux_core::config::Config;
    pub use atmux_core::error::{ErrorKind, Result};
    pub use atmux_core::time::{Clock, SystemClock};
    pub use atmux_core::transport::{PowerPins, SerialPort};
    pub use atmux_engine::{CommandEngine, ModemEvent};
    pub use atmux_modem::{BatteryStatus, LinkState, Modem, SessionTable, SocketSession};
    pub use atmux_protocol::{NetworkTime, Protocol, RegistrationStatus, StackState, Urc};
}
