//! Simulation factory: builds nodes bound to shared infrastructure.
//!
//! One factory corresponds to one simulation instance. It owns the
//! topology [`Graph`], the [`TickScheduler`], the shared counter
//! registry, the shared seeded random stream, and the caller-supplied
//! coding factories. Every `build_*` call inserts the node into the
//! graph, registers it with the scheduler (build order is tick order),
//! and hands back a [`NodeHandle`] for wiring.

use std::cell::RefCell;
use std::rc::Rc;

use crate::channel::Channel;
use crate::coding::{DecoderFactory, EncoderFactory};
use crate::counters::{CounterRegistry, SharedCounters};
use crate::error::Result;
use crate::node::{Graph, Node, NodeHandle};
use crate::random::{shared_rng, RandomBool, SharedRng};
use crate::relay::Relay;
use crate::scheduler::TickScheduler;
use crate::sink::Sink;
use crate::source::Source;

/// Builds and owns one simulation's nodes and infrastructure.
pub struct SimulationFactory {
    graph: Graph,
    scheduler: TickScheduler,
    counters: SharedCounters,
    rng: SharedRng,
    seed: u64,
    encoders: Box<dyn EncoderFactory>,
    decoders: Box<dyn DecoderFactory>,
}

impl SimulationFactory {
    /// Create a factory seeding one shared random stream for every
    /// channel built from it.
    pub fn new(
        seed: u64,
        encoders: Box<dyn EncoderFactory>,
        decoders: Box<dyn DecoderFactory>,
    ) -> Self {
        let counters = Rc::new(RefCell::new(CounterRegistry::new()));
        Self::with_counters(seed, counters, encoders, decoders)
    }

    /// Create a factory recording into an existing registry. Sweep
    /// drivers rebuild the topology per configuration while keeping
    /// every configuration's run in one registry.
    pub fn with_counters(
        seed: u64,
        counters: SharedCounters,
        encoders: Box<dyn EncoderFactory>,
        decoders: Box<dyn DecoderFactory>,
    ) -> Self {
        Self {
            graph: Graph::new(),
            scheduler: TickScheduler::new(),
            counters,
            rng: shared_rng(seed),
            seed,
            encoders,
            decoders,
        }
    }

    /// Build a channel that drops with `error_probability` per edge.
    ///
    /// # Panics
    /// If `error_probability` is outside [0, 1].
    pub fn build_channel(&mut self, error_probability: f64, id: &str) -> NodeHandle {
        let predicate = RandomBool::new(self.rng.clone(), error_probability);
        self.register(Box::new(Channel::new(id, predicate, self.counters.clone())))
    }

    /// Build a source with a fresh encoder.
    pub fn build_source(&mut self, id: &str) -> NodeHandle {
        let encoder = self.encoders.build();
        self.register(Box::new(Source::new(id, encoder, self.counters.clone())))
    }

    /// Build a relay with a fresh decoder (recoding enabled).
    pub fn build_relay(&mut self, id: &str) -> NodeHandle {
        let decoder = self.decoders.build();
        self.register(Box::new(Relay::new(id, decoder, self.counters.clone())))
    }

    /// Build a sink with a fresh decoder.
    pub fn build_sink(&mut self, id: &str) -> NodeHandle {
        let decoder = self.decoders.build();
        self.register(Box::new(Sink::new(id, decoder, self.counters.clone())))
    }

    fn register(&mut self, node: Box<dyn Node>) -> NodeHandle {
        let handle = self.graph.insert(node);
        self.scheduler.add_node(handle);
        handle
    }

    /// Append an edge from `from` to `to`.
    pub fn connect(&mut self, from: NodeHandle, to: NodeHandle) {
        self.graph.connect(from, to);
    }

    /// The registry shared by every node built here.
    pub fn counters(&self) -> SharedCounters {
        self.counters.clone()
    }

    /// Seed of the shared random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The topology graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The tick scheduler driving this simulation.
    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Role-typed access to a built node.
    pub fn node<T: Node + 'static>(&self, handle: NodeHandle) -> &T {
        self.graph.get(handle)
    }

    /// Role-typed mutable access, e.g. to toggle a relay's recode
    /// policy or a source's systematic mode after building.
    pub fn node_mut<T: Node + 'static>(&mut self, handle: NodeHandle) -> &mut T {
        self.graph.get_mut(handle)
    }

    /// Rounds driven so far.
    pub fn ticks(&self) -> u64 {
        self.scheduler.ticks()
    }

    /// Drive one round.
    pub fn tick(&mut self) {
        self.scheduler.tick(&mut self.graph);
    }

    /// Tick until `sink` reports completion, failing after `max_ticks`
    /// rounds. Returns the number of rounds this call executed.
    pub fn run_until_complete(&mut self, sink: NodeHandle, max_ticks: u64) -> Result<u64> {
        let Self {
            graph, scheduler, ..
        } = self;
        scheduler.run_until(graph, |g| g.get::<Sink>(sink).is_complete(), max_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::carousel::CarouselFactory;

    fn factory(symbols: u32, seed: u64) -> SimulationFactory {
        SimulationFactory::new(
            seed,
            Box::new(CarouselFactory::new(symbols)),
            Box::new(CarouselFactory::new(symbols)),
        )
    }

    #[test]
    fn test_build_and_wire_minimal_topology() {
        let mut factory = factory(4, 1);
        let source = factory.build_source("source");
        let channel = factory.build_channel(0.0, "ch");
        let sink = factory.build_sink("sink");

        factory.connect(source, channel);
        factory.connect(channel, sink);

        let ticks = factory.run_until_complete(sink, 100).unwrap();
        assert_eq!(ticks, 4);
        assert!(factory.node::<Sink>(sink).is_complete());
        assert_eq!(factory.counters().borrow().count("source_sent"), 4);
    }

    #[test]
    fn test_run_until_complete_honors_cap() {
        let mut factory = factory(4, 1);
        let source = factory.build_source("source");
        let channel = factory.build_channel(1.0, "ch");
        let sink = factory.build_sink("sink");
        factory.connect(source, channel);
        factory.connect(channel, sink);

        assert!(factory.run_until_complete(sink, 50).is_err());
    }

    #[test]
    fn test_same_seed_reproduces_counters() {
        fn run(seed: u64) -> u64 {
            let mut factory = factory(8, seed);
            let source = factory.build_source("source");
            let channel = factory.build_channel(0.5, "ch");
            let sink = factory.build_sink("sink");
            factory.connect(source, channel);
            factory.connect(channel, sink);
            factory.run_until_complete(sink, 10_000).unwrap()
        }

        assert_eq!(run(77), run(77));
    }

    #[test]
    #[should_panic(expected = "outside [0, 1]")]
    fn test_invalid_error_probability_is_fatal() {
        factory(4, 0).build_channel(-0.1, "ch");
    }

    #[test]
    fn test_policy_toggles_through_factory() {
        use crate::relay::Relay;
        use crate::source::Source;

        let mut factory = factory(4, 0);
        let source = factory.build_source("source");
        let relay = factory.build_relay("relay0");

        factory.node_mut::<Source>(source).systematic_on();
        factory.node_mut::<Relay>(relay).set_recode_off();
        assert!(!factory.node::<Relay>(relay).is_recode_on());
    }
}
