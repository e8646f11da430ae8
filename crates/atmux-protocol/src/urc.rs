//! Unsolicited result code classification.
//!
//! The modem may emit asynchronous notification lines at any time, mixed
//! into command responses. The engine routes every freshly read line through
//! [`classify`]; a recognized line is consumed internally and never shown to
//! the caller waiting for a response.

use crate::pattern;

/// A recognized unsolicited result code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Urc {
    /// Inbound data notice: `+RECEIVE: <id>, <len>`. The declared number of
    /// raw bytes follows on the wire, outside line framing.
    Receive {
        /// Connection identifier the data belongs to.
        id: u8,
        /// Declared payload length in bytes.
        len: usize,
    },
    /// A `+RECEIVE:` notice whose id or length failed to parse. Consumed as
    /// protocol noise; no raw read follows.
    MalformedReceive,
    /// `SMS Ready` boot banner.
    SimReady,
    /// `Call Ready` boot banner.
    CallReady,
    /// `+CPIN: READY` SIM status banner.
    PinReady,
    /// Network time banner (`+QNITZ: ...` or `+QNTP: ...`), payload verbatim.
    NetworkTime(String),
    /// `+PDP DEACT`: the network deactivated the data context.
    PdpDeactivated,
    /// `NORMAL POWER DOWN`: the modem confirmed an orderly shutdown.
    PowerDown,
}

/// Classifies a line, returning `Some` when it is an unsolicited notice the
/// engine must consume, or `None` when it is a genuine response line to hand
/// back to the caller.
pub fn classify(line: &str) -> Option<Urc> {
    if line.starts_with("+RECEIVE:") {
        let fields = pattern::scan(line, "+RECEIVE: %d, %d");
        let parsed = match (fields.first(), fields.get(1)) {
            (Some(id), Some(len)) => {
                let id = id.as_int().and_then(|v| u8::try_from(v).ok());
                let len = len.as_int().and_then(|v| usize::try_from(v).ok());
                id.zip(len)
            }
            _ => None,
        };
        return Some(match parsed {
            Some((id, len)) => Urc::Receive { id, len },
            None => Urc::MalformedReceive,
        });
    }
    if line.starts_with("SMS Ready") {
        return Some(Urc::SimReady);
    }
    if line.starts_with("Call Ready") {
        return Some(Urc::CallReady);
    }
    if line.starts_with("+CPIN: READY") {
        return Some(Urc::PinReady);
    }
    if line.starts_with("+QNITZ:") || line.starts_with("+QNTP:") {
        return Some(Urc::NetworkTime(line.to_owned()));
    }
    if line.starts_with("+PDP DEACT") {
        return Some(Urc::PdpDeactivated);
    }
    if line.starts_with("NORMAL POWER DOWN") {
        return Some(Urc::PowerDown);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_notice() {
        assert_eq!(
            classify("+RECEIVE: 2, 1024"),
            Some(Urc::Receive { id: 2, len: 1024 })
        );
    }

    #[test]
    fn test_malformed_receive_is_consumed() {
        assert_eq!(classify("+RECEIVE: garbage"), Some(Urc::MalformedReceive));
        assert_eq!(classify("+RECEIVE:"), Some(Urc::MalformedReceive));
        // A negative id cannot name a connection.
        assert_eq!(classify("+RECEIVE: -1, 64"), Some(Urc::MalformedReceive));
    }

    #[test]
    fn test_boot_banners() {
        assert_eq!(classify("SMS Ready"), Some(Urc::SimReady));
        assert_eq!(classify("Call Ready"), Some(Urc::CallReady));
        assert_eq!(classify("+CPIN: READY"), Some(Urc::PinReady));
    }

    #[test]
    fn test_network_banners() {
        assert!(matches!(
            classify("+QNITZ: \"17/02/09,10:30:00+04,0\""),
            Some(Urc::NetworkTime(_))
        ));
        assert_eq!(classify("+PDP DEACT"), Some(Urc::PdpDeactivated));
        assert_eq!(classify("NORMAL POWER DOWN"), Some(Urc::PowerDown));
    }

    #[test]
    fn test_response_lines_pass_through() {
        assert_eq!(classify("OK"), None);
        assert_eq!(classify("ERROR"), None);
        assert_eq!(classify("+CREG: 0,1"), None);
        assert_eq!(classify("2, CONNECT OK"), None);
    }
}
