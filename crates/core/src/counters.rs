//! Run-segmented registry of dynamically keyed, typed counters.
//!
//! Experiments sweep parameters: the same topology is rebuilt and
//! re-run with different error rates or policies, and each
//! configuration's statistics must stay segregated without restarting
//! the process. The registry therefore holds an ordered sequence of
//! "runs"; [`CounterRegistry::new_run`] appends a fresh empty run and
//! all subsequent writes target it.
//!
//! # Keys and types
//!
//! Keys are strings composed from node ids (e.g.
//! `ch1_source_to_sink_dropped`). Values are a tagged union of
//! unsigned count, float, flag, and text. A key's type is fixed at
//! first use within a run; re-requesting it at a different type is a
//! programming error and panics.
//!
//! # Report artifact
//!
//! [`CounterRegistry::dump_to_file`] serializes all runs, in creation
//! order, as a JSON list of key→value maps. The format round-trips via
//! [`CounterRegistry::from_json`] for downstream analysis tooling.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One metric value. The variant is fixed by the first access to the
/// key within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CounterValue {
    /// Unsigned event count (the default for `counter()` accesses)
    Count(u64),
    /// Floating-point parameter or ratio
    Float(f64),
    /// Boolean flag
    Flag(bool),
    /// Free-form text (e.g. a scenario name)
    Text(String),
}

/// One run's counters. `BTreeMap` keeps print/dump order stable.
pub type Run = BTreeMap<String, CounterValue>;

/// Registry handle shared by every node of one simulation.
///
/// The simulation is single-threaded, so `Rc<RefCell<...>>` is the
/// whole synchronization story.
pub type SharedCounters = Rc<RefCell<CounterRegistry>>;

/// Ordered sequence of runs, each mapping metric names to typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterRegistry {
    runs: Vec<Run>,
}

impl CounterRegistry {
    /// Create a registry with a single empty run.
    pub fn new() -> Self {
        Self {
            runs: vec![Run::new()],
        }
    }

    /// Append a fresh empty run; subsequent writes target it.
    pub fn new_run(&mut self) {
        self.runs.push(Run::new());
    }

    /// Number of runs recorded so far (always at least one).
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// All runs in creation order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// The run currently receiving writes.
    pub fn current_run(&self) -> &Run {
        self.runs.last().expect("registry always has a run")
    }

    fn current_run_mut(&mut self) -> &mut Run {
        self.runs.last_mut().expect("registry always has a run")
    }

    /// Mutable reference to the named count in the current run,
    /// initialized to zero on first access.
    ///
    /// # Panics
    /// If the key already holds a non-count value in this run.
    pub fn counter(&mut self, key: &str) -> &mut u64 {
        match self
            .current_run_mut()
            .entry(key.to_string())
            .or_insert(CounterValue::Count(0))
        {
            CounterValue::Count(v) => v,
            other => panic!("counter key '{key}' already holds {other:?}, not a count"),
        }
    }

    /// Mutable reference to the named float, initialized to `0.0` on
    /// first access.
    ///
    /// # Panics
    /// If the key already holds a non-float value in this run.
    pub fn float(&mut self, key: &str) -> &mut f64 {
        match self
            .current_run_mut()
            .entry(key.to_string())
            .or_insert(CounterValue::Float(0.0))
        {
            CounterValue::Float(v) => v,
            other => panic!("counter key '{key}' already holds {other:?}, not a float"),
        }
    }

    /// Mutable reference to the named flag, initialized to `false` on
    /// first access.
    ///
    /// # Panics
    /// If the key already holds a non-flag value in this run.
    pub fn flag(&mut self, key: &str) -> &mut bool {
        match self
            .current_run_mut()
            .entry(key.to_string())
            .or_insert(CounterValue::Flag(false))
        {
            CounterValue::Flag(v) => v,
            other => panic!("counter key '{key}' already holds {other:?}, not a flag"),
        }
    }

    /// Mutable reference to the named text, initialized to `""` on
    /// first access.
    ///
    /// # Panics
    /// If the key already holds a non-text value in this run.
    pub fn text(&mut self, key: &str) -> &mut String {
        match self
            .current_run_mut()
            .entry(key.to_string())
            .or_insert_with(|| CounterValue::Text(String::new()))
        {
            CounterValue::Text(v) => v,
            other => panic!("counter key '{key}' already holds {other:?}, not text"),
        }
    }

    /// Look up a value in the current run without inserting.
    pub fn get(&self, key: &str) -> Option<&CounterValue> {
        self.current_run().get(key)
    }

    /// Convenience: the current run's count for `key`, or zero if the
    /// counter was never touched.
    pub fn count(&self, key: &str) -> u64 {
        match self.get(key) {
            Some(CounterValue::Count(v)) => *v,
            Some(other) => panic!("counter key '{key}' holds {other:?}, not a count"),
            None => 0,
        }
    }

    /// Write every run's counters whose key contains `filter` to `out`,
    /// runs in creation order. An empty filter matches every key.
    pub fn print<W: Write>(&self, out: &mut W, filter: &str) -> io::Result<()> {
        for (index, run) in self.runs.iter().enumerate() {
            writeln!(out, "run {index}:")?;
            for (key, value) in run {
                if !filter.is_empty() && !key.contains(filter) {
                    continue;
                }
                match value {
                    CounterValue::Count(v) => writeln!(out, "  {key} {v}")?,
                    CounterValue::Float(v) => writeln!(out, "  {key} {v}")?,
                    CounterValue::Flag(v) => writeln!(out, "  {key} {v}")?,
                    CounterValue::Text(v) => writeln!(out, "  {key} {v}")?,
                }
            }
        }
        Ok(())
    }

    /// Serialize all runs as a JSON list of key→value maps.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a registry back from the dump format.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the JSON dump to `path`.
    pub fn dump_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl Default for CounterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
