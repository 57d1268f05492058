//! `statprobe-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod config;
pub mod fetcher;
pub mod monitor;
pub mod shutdown;
