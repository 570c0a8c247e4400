//! Error types for the simulation core.
//!
//! Only genuinely recoverable failures are modeled as errors: report
//! serialization, file I/O, and a scenario exhausting its tick budget.
//! Precondition violations — calling `receive` on a source, a drop
//! probability outside [0,1], re-reading a counter key at a different
//! type — are topology-construction bugs and panic instead.

use thiserror::Error;

/// Top-level error type for all fallible operations in the core.
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O failed while writing or reading a counter report
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Counter report could not be serialized or parsed
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),

    /// The sink did not complete within the caller's tick budget.
    ///
    /// This is the safety valve for topologies that can never
    /// terminate (e.g. 100% loss on every path to the sink).
    #[error("sink incomplete after {limit} ticks")]
    TickLimitExceeded { limit: u64 },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
