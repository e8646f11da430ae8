//! Socket session bookkeeping.

use atmux_core::constants::{MAX_SOCKET_ID, SOCKET_COUNT};
use atmux_core::error::{ErrorKind, Result};
use atmux_protocol::Protocol;

/// Rejects connection identifiers outside the supported range.
pub fn validate_id(id: u8) -> Result<()> {
    if id > MAX_SOCKET_ID {
        Err(ErrorKind::RangeViolation(id))
    } else {
        Ok(())
    }
}

/// One logical connection multiplexed over the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSession {
    id: u8,
    protocol: Protocol,
    peer_addr: String,
    peer_port: u16,
}

impl SocketSession {
    /// Returns the connection identifier.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns the transport protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the peer address the session was opened to.
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Returns the peer port.
    pub fn peer_port(&self) -> u16 {
        self.peer_port
    }
}

/// Tracks which connection identifiers are in use and which peers have
/// announced a close.
///
/// Peer-close marks live outside the slots: a close announcement can arrive
/// for an id the local side already released, and must still short-circuit
/// later reads for that id until the id is reused.
#[derive(Debug, Default)]
pub struct SessionTable {
    slots: [Option<SocketSession>; SOCKET_COUNT],
    reserved: [bool; SOCKET_COUNT],
    peer_closed: [bool; SOCKET_COUNT],
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns the lowest free connection identifier.
    ///
    /// A reserved id is skipped by later allocations until it is opened or
    /// released, so callers can hold several ids before opening any.
    pub fn allocate(&mut self) -> Result<u8> {
        let index = (0..SOCKET_COUNT)
            .find(|&index| self.slots[index].is_none() && !self.reserved[index])
            .ok_or(ErrorKind::NoFreeSocket)?;
        self.reserved[index] = true;
        Ok(index as u8)
    }

    /// Records an established session on `id`, consuming any reservation
    /// and clearing any stale peer-close mark from a previous use of the
    /// id.
    pub fn open(&mut self, id: u8, protocol: Protocol, peer_addr: &str, peer_port: u16) {
        let index = usize::from(id);
        self.reserved[index] = false;
        self.peer_closed[index] = false;
        self.slots[index] = Some(SocketSession {
            id,
            protocol,
            peer_addr: peer_addr.to_owned(),
            peer_port,
        });
    }

    /// Returns the session on `id`, if one is open.
    pub fn get(&self, id: u8) -> Option<&SocketSession> {
        self.slots.get(usize::from(id)).and_then(Option::as_ref)
    }

    /// Releases `id`, dropping its reservation and returning the session
    /// that occupied it.
    pub fn release(&mut self, id: u8) -> Option<SocketSession> {
        let index = usize::from(id);
        if let Some(flag) = self.reserved.get_mut(index) {
            *flag = false;
        }
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Returns true while any session is open.
    pub fn any_open(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Records a peer-initiated close announcement for `id`.
    pub fn mark_peer_closed(&mut self, id: u8) {
        if let Some(flag) = self.peer_closed.get_mut(usize::from(id)) {
            *flag = true;
        }
    }

    /// Returns true when the peer has announced a close on `id`.
    pub fn is_peer_closed(&self, id: u8) -> bool {
        self.peer_closed
            .get(usize::from(id))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_range() {
        assert!(validate_id(0).is_ok());
        assert!(validate_id(MAX_SOCKET_ID).is_ok());
        assert!(matches!(
            validate_id(MAX_SOCKET_ID + 1),
            Err(ErrorKind::RangeViolation(_))
        ));
    }

    #[test]
    fn test_allocate_lowest_free_id() {
        let mut table = SessionTable::new();
        assert_eq!(table.allocate().unwrap(), 0);
        table.open(0, Protocol::Tcp, "10.0.0.1", 80);
        assert_eq!(table.allocate().unwrap(), 1);
        table.open(1, Protocol::Udp, "10.0.0.2", 53);
        table.release(0);
        assert_eq!(table.allocate().unwrap(), 0);
    }

    #[test]
    fn test_allocate_reserves_before_open() {
        let mut table = SessionTable::new();
        // Consecutive allocations hand out distinct ids.
        assert_eq!(table.allocate().unwrap(), 0);
        assert_eq!(table.allocate().unwrap(), 1);
        // Releasing a reservation makes the id available again.
        table.release(0);
        assert_eq!(table.allocate().unwrap(), 0);
        assert_eq!(table.allocate().unwrap(), 2);
    }

    #[test]
    fn test_reservations_count_toward_exhaustion() {
        let mut table = SessionTable::new();
        for id in 0..SOCKET_COUNT as u8 {
            assert_eq!(table.allocate().unwrap(), id);
        }
        assert!(matches!(table.allocate(), Err(ErrorKind::NoFreeSocket)));
    }

    #[test]
    fn test_allocate_exhaustion() {
        let mut table = SessionTable::new();
        for id in 0..SOCKET_COUNT as u8 {
            table.open(id, Protocol::Tcp, "10.0.0.1", 80);
        }
        assert!(matches!(table.allocate(), Err(ErrorKind::NoFreeSocket)));
    }

    #[test]
    fn test_peer_close_mark_survives_release() {
        let mut table = SessionTable::new();
        table.open(3, Protocol::Tcp, "10.0.0.1", 80);
        table.mark_peer_closed(3);
        table.release(3);
        assert!(table.is_peer_closed(3));
        // Reusing the id clears the stale mark.
        table.open(3, Protocol::Tcp, "10.0.0.9", 80);
        assert!(!table.is_peer_closed(3));
    }

    #[test]
    fn test_any_open_tracks_slots() {
        let mut table = SessionTable::new();
        assert!(!table.any_open());
        table.open(2, Protocol::Tcp, "10.0.0.1", 80);
        assert!(table.any_open());
        table.release(2);
        assert!(!table.any_open());
    }
}
