//! relay-sim: scenario runner for the relay forwarding simulator.
//!
//! Parses the configuration, runs the selected scenario sweep with the
//! binary RLNC codec, prints the counter summary, and optionally dumps
//! the JSON report.

mod config;
mod rlnc;
mod scenarios;

use std::io;

use config::Config;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("run with --help for usage");
            std::process::exit(1);
        }
    };

    if let Err(error) = run(&config) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> relay_sim_core::Result<()> {
    if config.print_config {
        config.print();
    }
    // Always announce the seed so any run can be reproduced.
    println!("seed: {}", config.seed);

    let counters = scenarios::run(config)?;

    if config.print_counters {
        counters
            .borrow()
            .print(&mut io::stdout().lock(), &config.filter)?;
    }

    if let Some(path) = &config.dump_file {
        counters.borrow().dump_to_file(path)?;
        println!("report written to {}", path.display());
    }

    Ok(())
}
