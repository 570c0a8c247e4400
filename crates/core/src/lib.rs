//! relay-sim-core: discrete-event simulation of coded forwarding
//! topologies.
//!
//! This library simulates source → relays → sink topologies under
//! lossy channels to study how recoding policy and per-edge error
//! rates affect delivery and waste. It is a logical, reproducible,
//! single-process simulation: "time" is an abstract tick count and all
//! randomness flows from one seeded stream.
//!
//! # Architecture
//!
//! - `packet`: copy-on-write packet value type
//! - `counters`: run-segmented registry of typed, string-keyed metrics
//! - `random`: seeded Bernoulli drop predicate over a shared stream
//! - `coding`: encoder/decoder capability traits (the actual code is a
//!   plug-in; see the app crate's RLNC implementation)
//! - `node`: the node contract and the arena topology graph
//! - `channel` / `source` / `relay` / `sink`: the four node roles
//! - `scheduler`: registration-order tick fan-out with a run-loop cap
//! - `factory`: builds nodes bound to shared counters, RNG, and codecs
//!
//! # Design principles
//!
//! - **Deterministic**: one seeded ChaCha8 stream per simulation makes
//!   runs bit-reproducible.
//! - **Single-threaded**: a tick fully completes, cascaded deliveries
//!   included, before the next begins; no locks anywhere.
//! - **Fatal preconditions**: wiring bugs (receive on a source,
//!   probabilities outside [0,1], counter type clashes) panic instead
//!   of limping on.

pub mod channel;
pub mod coding;
pub mod counters;
pub mod error;
pub mod factory;
pub mod node;
pub mod packet;
pub mod random;
pub mod relay;
pub mod scheduler;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use channel::Channel;
pub use coding::{Decoder, DecoderFactory, Encoder, EncoderFactory};
pub use counters::{CounterRegistry, CounterValue, SharedCounters};
pub use error::{Error, Result};
pub use factory::SimulationFactory;
pub use node::{Graph, Node, NodeContext, NodeHandle};
pub use packet::Packet;
pub use random::{shared_rng, RandomBool, SharedRng};
pub use relay::Relay;
pub use scheduler::TickScheduler;
pub use sink::Sink;
pub use source::Source;
