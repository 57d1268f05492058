//! `statprobe-core` -- pure domain logic for the stats probe.
//!
//! Parses the six-field `/_stats` record and evaluates it against the
//! fixed thresholds. Nothing in this crate performs I/O.

pub mod error;
pub mod stats;
pub mod thresholds;

pub use error::StatsParseError;
pub use stats::{FieldParsing, StatsSample};
pub use thresholds::{evaluate, Metric, Warning};
