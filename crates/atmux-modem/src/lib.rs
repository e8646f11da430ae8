#![warn(missing_docs)]

//! atmux-modem: the connection state machine and socket session layer.
//!
//! [`Modem`] drives a cellular modem through reset, network registration,
//! GPRS attach, and context configuration, then multiplexes logical socket
//! sessions over the single command channel. All blocking behavior is
//! budgeted by [`atmux_core::config::Config`] and paced by a pluggable
//! clock, so the whole driver runs against scripted transports in tests.

mod link_state;
mod modem;
mod session;

pub use link_state::LinkState;
pub use modem::{BatteryStatus, Modem};
pub use session::{SessionTable, SocketSession};
