//! Lossy channel node.
//!
//! A channel is purely reactive: it never ticks, it only reacts to
//! inbound packets. For every downstream edge it draws one independent
//! boolean from its [`RandomBool`] predicate and either drops the
//! packet (recording `{channel}_{sender}_to_{receiver}_dropped`) or
//! forwards it unchanged (recording the matching `_ok` counter). Edges
//! fail independently — a fan-out of three may deliver to two receivers
//! and drop for the third on the same packet.

use std::any::Any;

use log::trace;

use crate::counters::SharedCounters;
use crate::node::{Node, NodeContext, NodeHandle};
use crate::packet::Packet;
use crate::random::RandomBool;

/// A node that probabilistically drops packets, independently per edge.
pub struct Channel {
    id: String,
    receivers: Vec<NodeHandle>,
    drop_decision: RandomBool,
    counters: SharedCounters,
}

impl Channel {
    /// Create a channel whose per-edge drop decision is drawn from
    /// `drop_decision` (probability of dropping = the predicate's
    /// probability of `true`).
    pub fn new(id: impl Into<String>, drop_decision: RandomBool, counters: SharedCounters) -> Self {
        Self {
            id: id.into(),
            receivers: Vec::new(),
            drop_decision,
            counters,
        }
    }

    /// The configured error probability.
    pub fn error_probability(&self) -> f64 {
        self.drop_decision.probability()
    }
}

impl Node for Channel {
    fn id(&self) -> &str {
        &self.id
    }

    fn receive(&mut self, packet: Packet, ctx: &mut NodeContext<'_>) {
        // A channel with no edges silently consumes everything; there
        // are no edges to account against.
        for index in 0..self.receivers.len() {
            let receiver_id = ctx.node_id(self.receivers[index]).to_owned();

            if self.drop_decision.generate() {
                trace!(
                    "channel {} dropped packet from {} towards {}",
                    self.id,
                    packet.sender(),
                    receiver_id
                );
                *self.counters.borrow_mut().counter(&format!(
                    "{}_{}_to_{}_dropped",
                    self.id,
                    packet.sender(),
                    receiver_id
                )) += 1;
            } else {
                *self.counters.borrow_mut().counter(&format!(
                    "{}_{}_to_{}_ok",
                    self.id,
                    packet.sender(),
                    receiver_id
                )) += 1;
                self.forward(index, packet.clone(), ctx);
            }
        }
    }

    fn tick(&mut self, _ctx: &mut NodeContext<'_>) {
        // Channels are purely reactive.
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
