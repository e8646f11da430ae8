//! Inbound packets and the shared packet queue.
//!
//! Reassembled payloads from all connection identifiers land in a single
//! ordered queue. A consumer scanning for its id skips packets belonging to
//! other ids without disturbing their relative order, and a read smaller
//! than the packet performs a partial dequeue: the node stays in place with
//! its payload left-shifted to the remaining suffix.

use std::collections::VecDeque;

/// One reassembled inbound payload for a connection identifier.
///
/// The payload length always matches the length declared by the notice that
/// created it, and is never zero once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Creates a packet for the given connection identifier.
    pub fn new(id: u8, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Returns the connection identifier this packet belongs to.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// FIFO of inbound packets shared across all connection identifiers.
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
}

impl PacketQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self { packets: VecDeque::new() }
    }

    /// Returns the number of queued packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Returns true when no packets are queued.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Appends a packet in arrival order. Empty packets are dropped at
    /// reassembly and must not reach the queue.
    pub fn push(&mut self, packet: Packet) {
        debug_assert!(!packet.is_empty());
        self.packets.push_back(packet);
    }

    /// Returns true when a packet for `id` is queued.
    pub fn has_packet(&self, id: u8) -> bool {
        self.packets.iter().any(|p| p.id == id)
    }

    /// Dequeues up to `max` bytes from the oldest packet for `id`.
    ///
    /// A packet no longer than `max` is removed whole; a longer one yields
    /// its first `max` bytes and survives in the same queue position with
    /// the remaining suffix. Packets for other ids are skipped, their order
    /// untouched.
    pub fn take(&mut self, id: u8, max: usize) -> Option<Vec<u8>> {
        if max == 0 {
            return None;
        }
        let index = self.packets.iter().position(|p| p.id == id)?;
        if self.packets[index].len() <= max {
            self.packets.remove(index).map(|p| p.payload)
        } else {
            let head: Vec<u8> = self.packets[index].payload.drain(..max).collect();
            Some(head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_dequeue_removes_node() {
        let mut queue = PacketQueue::new();
        queue.push(Packet::new(1, vec![1, 2, 3]));

        assert_eq!(queue.take(1, 8), Some(vec![1, 2, 3]));
        assert!(queue.is_empty());
        assert_eq!(queue.take(1, 8), None);
    }

    #[test]
    fn test_partial_dequeue_keeps_suffix_in_place() {
        let mut queue = PacketQueue::new();
        queue.push(Packet::new(0, vec![10, 11, 12, 13, 14]));

        assert_eq!(queue.take(0, 2), Some(vec![10, 11]));
        assert_eq!(queue.len(), 1);
        // The surviving node holds exactly the remaining suffix.
        assert_eq!(queue.take(0, 8), Some(vec![12, 13, 14]));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ids_interleave_without_reordering() {
        let mut queue = PacketQueue::new();
        queue.push(Packet::new(1, vec![1]));
        queue.push(Packet::new(2, vec![2]));
        queue.push(Packet::new(1, vec![3]));

        // Two reads for id 1 skip the id-2 packet without removing it.
        assert_eq!(queue.take(1, 64), Some(vec![1]));
        assert_eq!(queue.take(1, 64), Some(vec![3]));
        // The id-2 packet is still retrievable afterward.
        assert_eq!(queue.take(2, 64), Some(vec![2]));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_partial_dequeue_preserves_queue_position() {
        let mut queue = PacketQueue::new();
        queue.push(Packet::new(1, vec![1, 2, 3, 4]));
        queue.push(Packet::new(1, vec![9]));

        // Partial read leaves the first node ahead of the second.
        assert_eq!(queue.take(1, 2), Some(vec![1, 2]));
        assert_eq!(queue.take(1, 2), Some(vec![3, 4]));
        assert_eq!(queue.take(1, 2), Some(vec![9]));
    }

    #[test]
    fn test_has_packet_per_id() {
        let mut queue = PacketQueue::new();
        assert!(!queue.has_packet(0));
        queue.push(Packet::new(0, vec![1]));
        assert!(queue.has_packet(0));
        assert!(!queue.has_packet(1));
    }

    #[test]
    fn test_zero_byte_request_takes_nothing() {
        let mut queue = PacketQueue::new();
        queue.push(Packet::new(0, vec![1, 2]));
        assert_eq!(queue.take(0, 0), None);
        assert_eq!(queue.len(), 1);
    }
}
