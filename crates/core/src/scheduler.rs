//! Tick scheduler: drives every registered node once per round.
//!
//! Nodes are invoked in registration order, one `tick()` each per
//! round; any `receive` cascades triggered by a node's forwarding
//! complete before the next node's tick (see the delivery model in
//! [`crate::node`]). The scheduler itself never terminates a run — the
//! driving loop polls the sink and stops, with
//! [`TickScheduler::run_until`] offering a tick cap as the safety
//! valve against topologies that can never complete.

use crate::error::{Error, Result};
use crate::node::{Graph, NodeHandle};

/// Invokes registered nodes' `tick` in a fixed order, once per round.
#[derive(Debug, Default)]
pub struct TickScheduler {
    order: Vec<NodeHandle>,
    ticks: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node for per-round invocation. Registration order is
    /// invocation order.
    pub fn add_node(&mut self, node: NodeHandle) {
        self.order.push(node);
    }

    /// The registered nodes in invocation order.
    pub fn registered(&self) -> &[NodeHandle] {
        &self.order
    }

    /// Total rounds driven so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one round: every registered node ticks exactly once, in
    /// registration order, each cascade draining before the next node.
    pub fn tick(&mut self, graph: &mut Graph) {
        for handle in &self.order {
            graph.dispatch_tick(*handle);
        }
        self.ticks += 1;
    }

    /// Tick until `done` holds, or fail after `max_ticks` rounds.
    ///
    /// Returns the number of rounds executed by this call. The cap is
    /// the caller's guard against non-terminating topologies (e.g.
    /// total loss on every path to the sink).
    pub fn run_until<F>(&mut self, graph: &mut Graph, mut done: F, max_ticks: u64) -> Result<u64>
    where
        F: FnMut(&Graph) -> bool,
    {
        let mut elapsed = 0;
        while !done(graph) {
            if elapsed == max_ticks {
                return Err(Error::TickLimitExceeded { limit: max_ticks });
            }
            self.tick(graph);
            elapsed += 1;
        }
        Ok(elapsed)
    }
}
