//! The simulated topologies and the sweep driver.
//!
//! Three topology families, each recording its parameters into the
//! shared counter registry before running:
//!
//! - `single_no_relay`: source and sink joined by one lossy channel
//! - `single_relay`: a direct source→sink channel plus a two-hop
//!   detour through one relay
//! - `relay_line`: a bank of relays between one shared source-side
//!   channel and one shared sink-side channel
//!
//! Configurations within a sweep (systematic off/on, recoding off/on)
//! are segregated with `new_run`, so one JSON report carries the whole
//! comparison.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relay_sim_core::{
    CounterRegistry, Relay, Result, SharedCounters, SimulationFactory, Source,
};

use crate::config::{Config, Scenario};
use crate::rlnc::RlncFactory;

fn factory(cfg: &Config, counters: SharedCounters, seed: u64) -> SimulationFactory {
    let mut seeds = ChaCha8Rng::seed_from_u64(seed);
    let encoders = RlncFactory::new(cfg.symbols, cfg.symbol_size, seeds.gen());
    let decoders = RlncFactory::new(cfg.symbols, cfg.symbol_size, seeds.gen());
    SimulationFactory::with_counters(seed, counters, Box::new(encoders), Box::new(decoders))
}

/// Source and sink joined by one lossy channel.
fn single_no_relay(cfg: &Config, counters: SharedCounters, seed: u64) -> Result<u64> {
    info!(
        "running single_no_relay: source->sink = {}",
        cfg.error_source_sink
    );
    {
        let mut c = counters.borrow_mut();
        *c.text("test_name") = "single_no_relay".to_string();
        *c.float("error_source_to_sink") = cfg.error_source_sink;
    }

    let mut sim = factory(cfg, counters, seed);
    let channel = sim.build_channel(cfg.error_source_sink, "channel_source_sink");
    let source = sim.build_source("source");
    let sink = sim.build_sink("sink");

    sim.connect(source, channel);
    sim.connect(channel, sink);

    sim.run_until_complete(sink, cfg.max_ticks)
}

/// Direct source→sink channel plus a detour through one relay.
fn single_relay(
    cfg: &Config,
    counters: SharedCounters,
    seed: u64,
    source_systematic: bool,
) -> Result<u64> {
    info!(
        "running single_relay: relay->sink = {}, source->sink = {}, source->relay = {}, systematic = {}",
        cfg.error_relay_sink, cfg.error_source_sink, cfg.error_source_relay, source_systematic
    );
    {
        let mut c = counters.borrow_mut();
        *c.text("test_name") = "single_relay".to_string();
        *c.float("error_relay_to_sink") = cfg.error_relay_sink;
        *c.float("error_source_to_sink") = cfg.error_source_sink;
        *c.float("error_source_to_relay") = cfg.error_source_relay;
        *c.flag("source_systematic") = source_systematic;
    }

    let mut sim = factory(cfg, counters, seed);
    let channel_relay_sink = sim.build_channel(cfg.error_relay_sink, "channel_relay_sink");
    let channel_source_sink = sim.build_channel(cfg.error_source_sink, "channel_source_sink");
    let channel_source_relay = sim.build_channel(cfg.error_source_relay, "channel_source_relay");
    let source = sim.build_source("source");
    let sink = sim.build_sink("sink");
    let relay = sim.build_relay("relay");

    if source_systematic {
        sim.node_mut::<Source>(source).systematic_on();
    } else {
        sim.node_mut::<Source>(source).systematic_off();
    }

    sim.connect(source, channel_source_sink);
    sim.connect(source, channel_source_relay);
    sim.connect(channel_source_sink, sink);
    sim.connect(channel_source_relay, relay);
    sim.connect(relay, channel_relay_sink);
    sim.connect(channel_relay_sink, sink);

    sim.run_until_complete(sink, cfg.max_ticks)
}

/// A bank of relays between one shared source-side channel and one
/// shared sink-side channel.
fn relay_line(cfg: &Config, counters: SharedCounters, seed: u64, recode: bool) -> Result<u64> {
    info!(
        "running relay_line: relays->sink = {}, source->relays = {}, relays = {}, recode = {}",
        cfg.error_relay_sink, cfg.error_source_relay, cfg.relays, recode
    );
    {
        let mut c = counters.borrow_mut();
        *c.text("test_name") = "relay_line".to_string();
        *c.float("error_relays_to_sink") = cfg.error_relay_sink;
        *c.float("error_source_to_relays") = cfg.error_source_relay;
        *c.counter("number_relays") = cfg.relays as u64;
        *c.flag("relay_recode") = recode;
    }

    let mut sim = factory(cfg, counters, seed);
    let channel_source_relay = sim.build_channel(cfg.error_source_relay, "channel_source_relay");
    let channel_relay_sink = sim.build_channel(cfg.error_relay_sink, "channel_relay_sink");

    for i in 0..cfg.relays {
        let relay = sim.build_relay(&format!("relay{i}"));
        if recode {
            sim.node_mut::<Relay>(relay).set_recode_on();
        } else {
            sim.node_mut::<Relay>(relay).set_recode_off();
        }
        sim.connect(channel_source_relay, relay);
        sim.connect(relay, channel_relay_sink);
    }

    let source = sim.build_source("source");
    let sink = sim.build_sink("sink");
    sim.connect(source, channel_source_relay);
    sim.connect(channel_relay_sink, sink);

    sim.run_until_complete(sink, cfg.max_ticks)
}

/// Run the configured scenario (or all of them), one registry run per
/// configuration, and return the registry for printing and dumping.
pub fn run(cfg: &Config) -> Result<SharedCounters> {
    let counters: SharedCounters = Rc::new(RefCell::new(CounterRegistry::new()));
    let mut seeds = ChaCha8Rng::seed_from_u64(cfg.seed);

    // The registry starts with one empty run; every configuration
    // after the first opens a fresh one.
    let mut first = true;
    let mut advance = |counters: &SharedCounters| {
        if !first {
            counters.borrow_mut().new_run();
        }
        first = false;
    };

    let no_relay = matches!(cfg.scenario, Scenario::NoRelay | Scenario::All);
    let one_relay = matches!(cfg.scenario, Scenario::SingleRelay | Scenario::All);
    let line = matches!(cfg.scenario, Scenario::RelayLine | Scenario::All);

    if no_relay {
        advance(&counters);
        let ticks = single_no_relay(cfg, counters.clone(), seeds.gen())?;
        info!("sink complete after {ticks} ticks");
    }
    if one_relay {
        for systematic in [false, true] {
            advance(&counters);
            let ticks = single_relay(cfg, counters.clone(), seeds.gen(), systematic)?;
            info!("sink complete after {ticks} ticks");
        }
    }
    if line {
        for recode in [false, true] {
            advance(&counters);
            let ticks = relay_line(cfg, counters.clone(), seeds.gen(), recode)?;
            info!("sink complete after {ticks} ticks");
        }
    }

    Ok(counters)
}
