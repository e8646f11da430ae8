//! Events surfaced to consumers for asynchronous modem activity.

use atmux_protocol::Urc;

/// Asynchronous notification delivered over the engine's event channel.
///
/// Every unsolicited notice the engine consumes during a response wait or a
/// flush is translated into one of these, so no asynchronous activity is
/// silently lost to the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemEvent {
    /// A reassembled inbound payload was appended to the packet queue.
    PacketQueued {
        /// Connection identifier the payload belongs to.
        id: u8,
        /// Payload length in bytes.
        len: usize,
    },
    /// The SIM finished initializing (`SMS Ready`).
    SimReady,
    /// Voice call service is available (`Call Ready`).
    CallReady,
    /// The SIM PIN state reported ready (`+CPIN: READY`).
    PinReady,
    /// The network reported a time banner, payload verbatim.
    NetworkTime(String),
    /// The network deactivated the data context.
    PdpDeactivated,
    /// The modem confirmed an orderly power down.
    PowerDown,
}

impl ModemEvent {
    /// Maps a consumed notice to its event, when one is surfaced.
    ///
    /// `Receive` notices are handled by reassembly and reported as
    /// [`ModemEvent::PacketQueued`] only after a successful raw read, so they
    /// have no direct mapping here. Malformed notices are dropped as noise.
    pub(crate) fn from_urc(urc: Urc) -> Option<Self> {
        match urc {
            Urc::Receive { .. } | Urc::MalformedReceive => None,
            Urc::SimReady => Some(ModemEvent::SimReady),
            Urc::CallReady => Some(ModemEvent::CallReady),
            Urc::PinReady => Some(ModemEvent::PinReady),
            Urc::NetworkTime(text) => Some(ModemEvent::NetworkTime(text)),
            Urc::PdpDeactivated => Some(ModemEvent::PdpDeactivated),
            Urc::PowerDown => Some(ModemEvent::PowerDown),
        }
    }
}
