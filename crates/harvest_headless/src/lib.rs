//! Headless sandbox runner for harvester scenarios.
//!
//! Loads a RON [`Scenario`], simulates movement and harvest animations in a
//! [`SandboxWorld`] and drives the harvest system until every harvester is
//! idle. The outcome is a [`RunSummary`], printable as text or JSON. This
//! enables:
//!
//! - **Tuning**: Try profiles and site layouts without the full game
//! - **CI verification**: Scenario outcomes and their state hashes are stable
//!
//! # Example
//!
//! ```bash
//! # Run the built-in demo
//! cargo run -p harvest_headless -- demo
//!
//! # Run a scenario file and print JSON
//! cargo run -p harvest_headless -- run --scenario scenarios/outpost.ron --json
//! ```

pub mod runner;
pub mod sandbox;
pub mod scenario;

pub use runner::{HeadlessRunner, RunSummary, SandboxBus};
pub use sandbox::SandboxWorld;
pub use scenario::{Scenario, ScenarioError};
