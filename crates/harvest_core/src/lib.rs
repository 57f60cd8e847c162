//! # Harvest Core
//!
//! Deterministic harvester logic for an RTS: gathering from resource nodes,
//! dropping loads off at storage sites and transporting stock between sites.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! The world (entities, spatial queries, movement, the event bus) is reached
//! through the traits in [`world`], so the same logic runs inside a game, the
//! headless sandbox and the tests.
//!
//! ## Crate Structure
//!
//! - [`table`] - Per-harvester state records and their accessors
//! - [`machine`] - The gather / drop-off / transport state machine
//! - [`system`] - Runner executing transitions against the bus and movement
//! - [`orders`] - Selection-level orders and contextual actions
//! - [`config`] - RON-driven tuning and harvester profiles
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod machine;
pub mod math;
pub mod orders;
pub mod resources;
pub mod state;
pub mod system;
pub mod table;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{EntityFlags, EntityId, FactionId};
    pub use crate::config::{HarvestConfig, HarvesterProfile};
    pub use crate::error::{HarvestError, Result};
    pub use crate::events::{Continuation, Effect, EventKind, HarvestEvent};
    pub use crate::machine::{transition, Trigger};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::orders::{Click, ContextualAction, TargetMode};
    pub use crate::resources::{CarryLedger, ResourceRegistry, ResourceTypeId};
    pub use crate::state::{HarvestState, HarvesterState, QueuedCommand, TransportStrategy};
    pub use crate::system::HarvestSystem;
    pub use crate::table::HarvesterTable;
    pub use crate::world::{
        EntityView, EventBus, HarvestWorld, MovementOrders, Navigation, ResourceAccess,
        SpatialQuery, StorageAccess,
    };
}
