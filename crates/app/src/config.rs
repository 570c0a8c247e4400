//! Configuration for the relay-sim application.
//!
//! Handles parsing command-line arguments and generating sensible
//! defaults. The tool works with ZERO arguments; every resolved value
//! (including the seed) can be printed so runs are reproducible.

use std::path::PathBuf;

/// Which topology family to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Source and sink connected directly.
    NoRelay,
    /// Direct path plus one relay detour.
    SingleRelay,
    /// Direct path plus a line of relays.
    RelayLine,
    /// All of the above, in order.
    All,
}

impl Scenario {
    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "no-relay" => Ok(Self::NoRelay),
            "single-relay" => Ok(Self::SingleRelay),
            "relay-line" => Ok(Self::RelayLine),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown scenario '{other}' (expected no-relay, single-relay, relay-line, or all)"
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoRelay => "no_relay",
            Self::SingleRelay => "single_relay",
            Self::RelayLine => "relay_line",
            Self::All => "all",
        }
    }
}

/// Complete configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Simulation ===
    /// Seed for all randomness (channels and coding)
    pub seed: u64,

    /// Topology family to simulate
    pub scenario: Scenario,

    /// Relays in the line for the relay-line scenario
    pub relays: usize,

    // === Coding ===
    /// Symbols per generation
    pub symbols: u32,

    /// Bytes per symbol
    pub symbol_size: usize,

    // === Channels ===
    /// Error probability on the direct source→sink path
    pub error_source_sink: f64,

    /// Error probability on each source→relay hop
    pub error_source_relay: f64,

    /// Error probability on each relay→sink (or relay→relay) hop
    pub error_relay_sink: f64,

    // === Safety ===
    /// Abort a configuration after this many ticks
    pub max_ticks: u64,

    // === Output ===
    /// Where to dump the JSON counter report (None = no dump)
    pub dump_file: Option<PathBuf>,

    /// Only print counters whose key contains this substring
    pub filter: String,

    /// Whether to print the resolved configuration
    pub print_config: bool,

    /// Whether to print the counter summary
    pub print_counters: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If --seed is absent a time-based seed is chosen and printed, so
    /// any run can be reproduced.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut seed: Option<u64> = None;
        let mut scenario = Scenario::All;
        let mut relays: usize = 3;
        let mut symbols: u32 = 32;
        let mut symbol_size: usize = 1400;
        let mut error_source_sink: f64 = 0.5;
        let mut error_source_relay: f64 = 0.5;
        let mut error_relay_sink: f64 = 0.5;
        let mut max_ticks: u64 = 100_000;
        let mut dump_file: Option<PathBuf> = None;
        let mut filter = String::new();
        let mut print_config = false;
        let mut print_counters = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--scenario" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--scenario requires a name".to_string());
                    }
                    scenario = Scenario::parse(&args[i])?;
                }
                "--relays" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--relays requires a number".to_string());
                    }
                    relays = args[i].parse().map_err(|_| "invalid relays")?;
                    if relays == 0 {
                        return Err("--relays must be at least 1".to_string());
                    }
                }
                "--symbols" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--symbols requires a number".to_string());
                    }
                    symbols = args[i].parse().map_err(|_| "invalid symbols")?;
                    if symbols == 0 {
                        return Err("--symbols must be at least 1".to_string());
                    }
                }
                "--symbol-size" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--symbol-size requires a number".to_string());
                    }
                    symbol_size = args[i].parse().map_err(|_| "invalid symbol-size")?;
                    if symbol_size == 0 {
                        return Err("--symbol-size must be at least 1".to_string());
                    }
                }
                "--error-source-sink" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--error-source-sink requires a probability".to_string());
                    }
                    error_source_sink =
                        parse_probability(&args[i], "--error-source-sink")?;
                }
                "--error-source-relay" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--error-source-relay requires a probability".to_string());
                    }
                    error_source_relay =
                        parse_probability(&args[i], "--error-source-relay")?;
                }
                "--error-relay-sink" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--error-relay-sink requires a probability".to_string());
                    }
                    error_relay_sink = parse_probability(&args[i], "--error-relay-sink")?;
                }
                "--max-ticks" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--max-ticks requires a number".to_string());
                    }
                    max_ticks = args[i].parse().map_err(|_| "invalid max-ticks")?;
                }
                "--dump" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--dump requires a path".to_string());
                    }
                    dump_file = Some(PathBuf::from(&args[i]));
                }
                "--filter" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--filter requires a substring".to_string());
                    }
                    filter = args[i].clone();
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-counters" => {
                    print_counters = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_millis() as u64
        });

        Ok(Config {
            seed,
            scenario,
            relays,
            symbols,
            symbol_size,
            error_source_sink,
            error_source_relay,
            error_relay_sink,
            max_ticks,
            dump_file,
            filter,
            print_config,
            print_counters,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Seed: {}", self.seed);
        println!("Scenario: {}", self.scenario.name());
        println!("Relays (line): {}", self.relays);
        println!();
        println!("Symbols per generation: {}", self.symbols);
        println!("Symbol size: {} bytes", self.symbol_size);
        println!();
        println!("=== Channel error probabilities ===");
        println!("source→sink:  {:.2}", self.error_source_sink);
        println!("source→relay: {:.2}", self.error_source_relay);
        println!("relay→sink:   {:.2}", self.error_relay_sink);
        println!();
        println!("Max ticks per run: {}", self.max_ticks);
        println!();
    }
}

fn parse_probability(s: &str, flag: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|_| format!("{flag}: not a number"))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(format!("{flag}: probability must be within [0, 1]"));
    }
    Ok(p)
}

fn print_help() {
    println!("relay-sim: coded relay-topology simulator");
    println!();
    println!("USAGE:");
    println!("    relay-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --seed <N>                  Random seed for determinism (default: time-based)");
    println!("    --scenario <NAME>           no-relay | single-relay | relay-line | all (default: all)");
    println!("    --relays <N>                Relays in the relay-line scenario (default: 3)");
    println!();
    println!("    --symbols <N>               Symbols per generation (default: 32)");
    println!("    --symbol-size <BYTES>       Bytes per symbol (default: 1400)");
    println!();
    println!("    --error-source-sink <P>     Direct-path error probability (default: 0.5)");
    println!("    --error-source-relay <P>    Source→relay error probability (default: 0.5)");
    println!("    --error-relay-sink <P>      Relay→sink error probability (default: 0.5)");
    println!();
    println!("    --max-ticks <N>             Tick cap per configuration (default: 100000)");
    println!();
    println!("    --dump <PATH>               Write the JSON counter report to PATH");
    println!("    --filter <SUBSTRING>        Only print counters containing SUBSTRING");
    println!("    --print-config              Print resolved configuration");
    println!("    --no-counters               Don't print the counter summary");
    println!("    --help, -h                  Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    relay-sim                                    # All scenarios, random seed");
    println!("    relay-sim --seed 42 --scenario single-relay  # Deterministic single run");
    println!("    relay-sim --filter dropped                   # Only loss counters");
    println!("    relay-sim --dump report.json                 # Machine-readable report");
    println!();
}
