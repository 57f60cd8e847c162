//! # Harvest Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted fake world and recording event bus
//! - Event-by-event harness
//! - Determinism checks
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod determinism;
pub mod fixtures;
pub mod harness;
pub mod strategies;
pub mod world;

pub use bus::RecordingBus;
pub use harness::Harness;
pub use world::FakeWorld;

/// Re-export proptest for convenience.
pub use proptest;
