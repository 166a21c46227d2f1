//! # Volley Core
//!
//! Deterministic predicted-actor simulation core for a tick-based
//! multiplayer shooter.
//!
//! Networked actors (projectiles, enemies) are spawned predictively on
//! the firing peer before server confirmation, simulate kinematic motion
//! and collision identically on predicting and authoritative peers, and
//! reconcile the predicted instance with the eventual authoritative one
//! via a deterministic matching key.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! Transport, state replication and RPC dispatch belong to the external
//! networking middleware; it is consumed through the [`world`]
//! collaborator traits and the spawn-delivery calls on
//! [`simulation::Simulation`].
//!
//! ## Crate Structure
//!
//! - [`actor`] - Predicted/confirmed dual state and the actor lifecycle
//! - [`projectile`] - Kinematic projectile simulation
//! - [`prediction`] - Key-based spawn reconciliation
//! - [`simulation`] - Per-peer simulation driver
//! - [`weapon`] - Fire-rate gating and spawn request construction
//! - [`seeker`] - Chasing enemy actors and their timed spawner
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actor;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod prediction;
pub mod projectile;
pub mod seeker;
pub mod simulation;
pub mod tick;
pub mod weapon;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actor::{Advance, Dual, PredictedActor, SpawnKind};
    pub use crate::components::{EntityId, Health, HitMask, ParticipantId};
    pub use crate::error::{Result, SimError};
    pub use crate::events::TickEvents;
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::prediction::{PredictionKey, PREDICTION_TIMEOUT_TICKS};
    pub use crate::projectile::{Projectile, ProjectileConfig, ProjectileSnapshot};
    pub use crate::seeker::{Seeker, SeekerConfig, SeekerSpawner};
    pub use crate::simulation::{Authority, FireRequest, Simulation};
    pub use crate::tick::{tick_delta, TickTimer, TICK_RATE};
    pub use crate::weapon::Weapon;
    pub use crate::world::{RayHit, RayQuery, World};
}
