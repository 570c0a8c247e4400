//! Source node: encodes and broadcasts one packet per tick.

use std::any::Any;

use log::debug;

use crate::coding::Encoder;
use crate::counters::SharedCounters;
use crate::node::{Node, NodeContext, NodeHandle};
use crate::packet::Packet;

/// Generates one encoded payload per tick and broadcasts it to every
/// downstream edge.
///
/// Each downstream copy shares the payload buffer until a receiver
/// mutates its own, so the broadcast is cheap regardless of fan-out.
pub struct Source {
    id: String,
    receivers: Vec<NodeHandle>,
    encoder: Box<dyn Encoder>,
    payload: Vec<u8>,
    counters: SharedCounters,
}

impl Source {
    pub fn new(id: impl Into<String>, encoder: Box<dyn Encoder>, counters: SharedCounters) -> Self {
        let payload = vec![0u8; encoder.payload_size()];
        Self {
            id: id.into(),
            receivers: Vec::new(),
            encoder,
            payload,
            counters,
        }
    }

    /// Switch the encoder to systematic mode. Legal mid-run; affects
    /// only subsequent ticks.
    pub fn systematic_on(&mut self) {
        self.encoder.systematic_on();
    }

    /// Switch the encoder to coded-only mode.
    pub fn systematic_off(&mut self) {
        self.encoder.systematic_off();
    }
}

impl Node for Source {
    fn id(&self) -> &str {
        &self.id
    }

    fn receive(&mut self, _packet: Packet, _ctx: &mut NodeContext<'_>) {
        panic!(
            "source '{}' has no upstream; receive() on a source is a wiring bug",
            self.id
        );
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) {
        *self
            .counters
            .borrow_mut()
            .counter(&format!("{}_sent", self.id)) += 1;

        self.encoder.encode(&mut self.payload);
        let packet = Packet::new(&self.id, self.payload.clone());

        debug!(
            "source {} broadcasting to {} edge(s)",
            self.id,
            self.receiver_count()
        );
        self.broadcast(&packet, ctx);
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
