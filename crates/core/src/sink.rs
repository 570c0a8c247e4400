//! Sink node: absorb packets and expose completion.
//!
//! A sink is purely reactive. Every received packet increments
//! `{id}_receive_from_{sender}`; packets arriving after the decoder is
//! complete are waste, everything else is decoded and classified as
//! innovative or linearly dependent exactly like a relay does.
//! [`Sink::is_complete`] is the scenario loop's sole termination
//! signal.

use std::any::Any;

use crate::coding::Decoder;
use crate::counters::SharedCounters;
use crate::node::{Node, NodeContext, NodeHandle};
use crate::packet::Packet;

/// Terminal node accumulating decoder rank until complete.
pub struct Sink {
    id: String,
    receivers: Vec<NodeHandle>,
    decoder: Box<dyn Decoder>,
    counters: SharedCounters,
}

impl Sink {
    pub fn new(id: impl Into<String>, decoder: Box<dyn Decoder>, counters: SharedCounters) -> Self {
        Self {
            id: id.into(),
            receivers: Vec::new(),
            decoder,
            counters,
        }
    }

    /// `true` once the decoder has reached full rank.
    pub fn is_complete(&self) -> bool {
        self.decoder.is_complete()
    }

    /// Decoder rank accumulated so far. Non-decreasing.
    pub fn rank(&self) -> u32 {
        self.decoder.rank()
    }
}

impl Node for Sink {
    fn id(&self) -> &str {
        &self.id
    }

    fn receive(&mut self, packet: Packet, _ctx: &mut NodeContext<'_>) {
        let sender = packet.sender();
        let mut counters = self.counters.borrow_mut();

        *counters.counter(&format!("{}_receive_from_{}", self.id, sender)) += 1;

        if self.decoder.is_complete() {
            *counters.counter(&format!("{}_waste_from_{}", self.id, sender)) += 1;
            return;
        }

        let rank_before = self.decoder.rank();
        self.decoder.decode(packet.bytes());

        if self.decoder.rank() > rank_before {
            *counters.counter(&format!("{}_innovative_from_{}", self.id, sender)) += 1;
        } else {
            *counters.counter(&format!("{}_linear_dept_from_{}", self.id, sender)) += 1;
        }
    }

    fn tick(&mut self, _ctx: &mut NodeContext<'_>) {
        // Sinks are purely reactive.
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
