//! Registration and TCP/IP stack status codes.

/// Network registration status from `+CREG: <n>,<status>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Not registered, not searching.
    NotRegistered,
    /// Registered to the home network.
    Home,
    /// Not registered, searching for an operator.
    Searching,
    /// Registration denied by the network.
    Denied,
    /// Status unknown.
    Unknown,
    /// Registered, roaming.
    Roaming,
}

impl RegistrationStatus {
    /// Maps the numeric status field to a known code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RegistrationStatus::NotRegistered),
            1 => Some(RegistrationStatus::Home),
            2 => Some(RegistrationStatus::Searching),
            3 => Some(RegistrationStatus::Denied),
            4 => Some(RegistrationStatus::Unknown),
            5 => Some(RegistrationStatus::Roaming),
            _ => None,
        }
    }

    /// Returns true for the two codes that count as registered.
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationStatus::Home | RegistrationStatus::Roaming)
    }
}

/// Modem-reported TCP/IP stack state from the `STATE: <text>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    /// `IP INITIAL`: stack idle, nothing configured yet.
    Initial,
    /// `IP START`: task started.
    Start,
    /// `IP CONFIG`: context being configured.
    Config,
    /// `IP IND`: context activation indicated.
    Ind,
    /// `IP GPRSACT`: context activated.
    GprsAct,
    /// `IP STATUS`: local IP obtained, ready for a session.
    Status,
    /// `TCP CONNECTING` / `UDP CONNECTING`: session being established.
    Connecting,
    /// `CONNECT OK`: a session is established.
    ConnectOk,
    /// `IP CLOSING`: session shutting down.
    Closing,
    /// `IP CLOSE`: previous session closed.
    Close,
}

impl StackState {
    /// Parses the text following `STATE: `.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "IP INITIAL" => Some(StackState::Initial),
            "IP START" => Some(StackState::Start),
            "IP CONFIG" => Some(StackState::Config),
            "IP IND" => Some(StackState::Ind),
            "IP GPRSACT" => Some(StackState::GprsAct),
            "IP STATUS" => Some(StackState::Status),
            "TCP CONNECTING" | "UDP CONNECTING" => Some(StackState::Connecting),
            "CONNECT OK" => Some(StackState::ConnectOk),
            "IP CLOSING" => Some(StackState::Closing),
            "IP CLOSE" => Some(StackState::Close),
            _ => None,
        }
    }

    /// Returns true for the states in which a new session may be opened:
    /// the stack is idle, ready, or has a cleanly closed previous session.
    pub fn is_safe_to_open(&self) -> bool {
        matches!(self, StackState::Initial | StackState::Status | StackState::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_codes() {
        assert!(RegistrationStatus::from_code(1).unwrap().is_registered());
        assert!(RegistrationStatus::from_code(5).unwrap().is_registered());
        for code in [0, 2, 3, 4] {
            assert!(!RegistrationStatus::from_code(code).unwrap().is_registered());
        }
        assert_eq!(RegistrationStatus::from_code(9), None);
    }

    #[test]
    fn test_stack_state_parse() {
        assert_eq!(StackState::parse("IP INITIAL"), Some(StackState::Initial));
        assert_eq!(StackState::parse("IP STATUS"), Some(StackState::Status));
        assert_eq!(StackState::parse("TCP CONNECTING"), Some(StackState::Connecting));
        assert_eq!(StackState::parse("UDP CONNECTING"), Some(StackState::Connecting));
        assert_eq!(StackState::parse(" IP CLOSE "), Some(StackState::Close));
        assert_eq!(StackState::parse("NONSENSE"), None);
    }

    #[test]
    fn test_safe_to_open_whitelist() {
        assert!(StackState::Initial.is_safe_to_open());
        assert!(StackState::Status.is_safe_to_open());
        assert!(StackState::Close.is_safe_to_open());
        assert!(!StackState::Connecting.is_safe_to_open());
        assert!(!StackState::ConnectOk.is_safe_to_open());
        assert!(!StackState::Closing.is_safe_to_open());
    }
}
