//! Relay node: absorb, classify, and re-emit.
//!
//! A relay feeds every received packet into its own decoder and
//! classifies it per sender: innovative (rank increased), linearly
//! dependent (rank unchanged), or waste (decoder already complete). On
//! its own tick it re-emits according to policy:
//!
//! - **recode on** (default): always emit a freshly recoded payload,
//!   whether or not anything arrived this round — recoding a
//!   combination of previously seen packets is legitimate and useful
//!   on lossy paths.
//! - **recode off** (pass-through): re-emit the last received packet
//!   under this relay's id, but only when a new packet arrived since
//!   the last forward. The new-packet flag is cleared after the
//!   forward, so a stale packet is replayed at most once.

use std::any::Any;

use log::debug;

use crate::coding::Decoder;
use crate::counters::SharedCounters;
use crate::node::{Node, NodeContext, NodeHandle};
use crate::packet::Packet;

/// A store-classify-and-forward node with a recode/pass-through policy.
pub struct Relay {
    id: String,
    receivers: Vec<NodeHandle>,
    decoder: Box<dyn Decoder>,
    counters: SharedCounters,
    recode_on: bool,
    last_packet: Option<Packet>,
    has_new_packet: bool,
    recode_buffer: Vec<u8>,
}

impl Relay {
    pub fn new(id: impl Into<String>, decoder: Box<dyn Decoder>, counters: SharedCounters) -> Self {
        let recode_buffer = vec![0u8; decoder.payload_size()];
        Self {
            id: id.into(),
            receivers: Vec::new(),
            decoder,
            counters,
            recode_on: true,
            last_packet: None,
            has_new_packet: false,
            recode_buffer,
        }
    }

    /// Emit freshly recoded payloads each tick (the default).
    pub fn set_recode_on(&mut self) {
        self.recode_on = true;
    }

    /// Pass the last received packet through verbatim instead.
    pub fn set_recode_off(&mut self) {
        self.recode_on = false;
    }

    /// Current policy.
    pub fn is_recode_on(&self) -> bool {
        self.recode_on
    }

    /// Decoder rank accumulated so far.
    pub fn rank(&self) -> u32 {
        self.decoder.rank()
    }
}

impl Node for Relay {
    fn id(&self) -> &str {
        &self.id
    }

    fn receive(&mut self, packet: Packet, _ctx: &mut NodeContext<'_>) {
        let sender = packet.sender().to_owned();
        let mut counters = self.counters.borrow_mut();

        if self.decoder.is_complete() {
            // A complete relay still tracks traffic so pass-through
            // mode keeps working.
            *counters.counter(&format!("relay_{}_waste_from_{}", self.id, sender)) += 1;
        } else {
            let rank_before = self.decoder.rank();
            self.decoder.decode(packet.bytes());

            if self.decoder.rank() > rank_before {
                *counters.counter(&format!("relay_{}_innovative_from_{}", self.id, sender)) += 1;
            } else {
                *counters.counter(&format!("relay_{}_linear_dept_from_{}", self.id, sender)) += 1;
            }
        }
        drop(counters);

        self.last_packet = Some(packet);
        self.has_new_packet = true;
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) {
        if self.recode_on {
            self.decoder.recode(&mut self.recode_buffer);
            let packet = Packet::new(&self.id, self.recode_buffer.clone());
            debug!("relay {} recoding at rank {}", self.id, self.decoder.rank());
            self.broadcast(&packet, ctx);
        } else if self.has_new_packet {
            let packet = self
                .last_packet
                .clone()
                .expect("has_new_packet implies a stored packet")
                .retagged(&self.id);
            debug!("relay {} passing through last packet", self.id);
            self.broadcast(&packet, ctx);
            // Without this a quiet upstream would make us replay one
            // stale packet forever; see DESIGN.md.
            self.has_new_packet = false;
        }
    }

    fn add_node(&mut self, downstream: NodeHandle) {
        self.receivers.push(downstream);
    }

    fn receivers(&self) -> &[NodeHandle] {
        &self.receivers
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
