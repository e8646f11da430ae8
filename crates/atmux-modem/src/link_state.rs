//! Link bring-up state.

/// Progress of the modem link from power-off to an active session.
///
/// Transitions only move forward through the bring-up sequence or fall to
/// `Failed`; closing the last session drops back from `SessionActive` to
/// `Attached` rather than re-running bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Power key low, modem off.
    #[default]
    Unpowered,
    /// Reset pulse issued, liveness not yet confirmed.
    Resetting,
    /// A probe was answered; echo and notices not yet configured.
    ModemAlive,
    /// Echo off, notices and verbose errors enabled.
    Configured,
    /// Registered to the network, not yet attached.
    NetworkRegistered,
    /// GPRS attached with an activated context.
    Attached,
    /// At least one socket session is open.
    SessionActive,
    /// Bring-up exhausted its retry budget.
    Failed,
}

impl LinkState {
    /// Returns true once a probe has been answered and bring-up has not
    /// failed since.
    pub fn is_alive(&self) -> bool {
        !matches!(
            self,
            LinkState::Unpowered | LinkState::Resetting | LinkState::Failed
        )
    }

    /// Returns true when registered to the network.
    pub fn is_registered(&self) -> bool {
        matches!(
            self,
            LinkState::NetworkRegistered | LinkState::Attached | LinkState::SessionActive
        )
    }

    /// Returns true when the data context is up.
    pub fn is_attached(&self) -> bool {
        matches!(self, LinkState::Attached | LinkState::SessionActive)
    }

    /// Returns true when bring-up gave up.
    pub fn is_failed(&self) -> bool {
        matches!(self, LinkState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unpowered() {
        assert_eq!(LinkState::default(), LinkState::Unpowered);
        assert!(!LinkState::default().is_alive());
    }

    #[test]
    fn test_predicates_follow_sequence() {
        assert!(LinkState::Configured.is_alive());
        assert!(!LinkState::Configured.is_registered());
        assert!(LinkState::NetworkRegistered.is_registered());
        assert!(!LinkState::NetworkRegistered.is_attached());
        assert!(LinkState::Attached.is_attached());
        assert!(LinkState::SessionActive.is_attached());
        assert!(LinkState::Failed.is_failed());
        assert!(!LinkState::Failed.is_alive());
    }
}
