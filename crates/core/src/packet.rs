//! Copy-on-write packet representation.
//!
//! A [`Packet`] is a value type: a shared byte buffer plus the id of the
//! node that sent it. Cloning a packet is cheap — the clone shares the
//! buffer with the original. The buffer is privately duplicated only
//! when a mutation is requested ("detach"), so two packets derived from
//! the same origin never observe each other's writes.
//!
//! # Why copy-on-write
//!
//! A source broadcasts the same logical payload to every downstream
//! edge each tick. With N edges that would otherwise be N buffer
//! copies per tick; sharing makes the broadcast O(1) per edge while
//! keeping the "packets are independent values" contract intact.
//!
//! # Lifecycle
//!
//! Created by a source each tick (or by a relay when recoding), passed
//! by value through forward calls, read by relays and sinks, then
//! dropped. The only retained packet is the single "last received"
//! packet a pass-through relay needs to replay.

use std::rc::Rc;

/// A simulated packet: a shared, copy-on-write buffer tagged with the
/// sender's node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Id of the node that emitted this packet
    sender: String,

    /// Shared payload buffer; cloned on first write after a share
    buffer: Rc<Vec<u8>>,
}

impl Packet {
    /// Create a new packet owned by `sender`.
    pub fn new(sender: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            sender: sender.into(),
            buffer: Rc::new(data),
        }
    }

    /// Id of the node that sent this packet.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Read-only view of the payload.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Mutable view of the payload.
    ///
    /// If the buffer is shared with other packets it is detached
    /// (privately cloned) first, so the write is never visible through
    /// any other `Packet` value.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        Rc::make_mut(&mut self.buffer).as_mut_slice()
    }

    /// Return this packet re-tagged with a new sender id.
    ///
    /// The buffer stays shared; only the sender changes. Used by a
    /// pass-through relay, which re-emits the last received payload
    /// under its own id.
    pub fn retagged(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Returns `true` if `self` and `other` currently share storage.
    ///
    /// Diagnostic only — sharing is an implementation detail that any
    /// mutation may change.
    pub fn shares_buffer(&self, other: &Packet) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_buffer() {
        let p = Packet::new("source", vec![1, 2, 3]);
        let q = p.clone();

        assert!(p.shares_buffer(&q));
        assert_eq!(p.bytes(), q.bytes());
    }

    #[test]
    fn test_write_detaches() {
        let p = Packet::new("source", vec![1, 2, 3]);
        let mut q = p.clone();

        q.bytes_mut()[0] = 0xFF;

        // q sees its own write, p is untouched byte-for-byte.
        assert_eq!(q.bytes(), &[0xFF, 2, 3]);
        assert_eq!(p.bytes(), &[1, 2, 3]);
        assert!(!p.shares_buffer(&q));
    }

    #[test]
    fn test_write_without_share_keeps_buffer() {
        let mut p = Packet::new("source", vec![0; 4]);
        p.bytes_mut()[3] = 9;
        assert_eq!(p.bytes(), &[0, 0, 0, 9]);
    }

    #[test]
    fn test_retagged_keeps_payload_shared() {
        let p = Packet::new("source", vec![7, 8]);
        let q = p.clone().retagged("relay0");

        assert_eq!(q.sender(), "relay0");
        assert_eq!(p.sender(), "source");
        assert!(p.shares_buffer(&q));
    }

    #[test]
    fn test_len() {
        let p = Packet::new("s", vec![0; 10]);
        assert_eq!(p.len(), 10);
        assert!(!p.is_empty());
        assert!(Packet::new("s", vec![]).is_empty());
    }
}
