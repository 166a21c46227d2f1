//! Events generated during a simulation tick.
//!
//! The presentation layer consumes these to trigger effects, sounds and
//! UI updates. Nothing in this core acts on them after the tick that
//! produced them.

use crate::components::EntityId;
use crate::math::Vec3Fixed;
use crate::prediction::PredictionKey;

/// Damage dealt by an actor to a world entity this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Actor that dealt the damage.
    pub attacker: EntityId,
    /// World entity that received it.
    pub target: EntityId,
    /// Amount applied.
    pub amount: u32,
}

/// An actor transitioned to destroyed this tick.
///
/// This is the sole trigger for impact/detonation effects: it fires on
/// the exact tick the actor physically stops, on every peer, because it
/// is derived from the state transition rather than a separately-timed
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetonationEvent {
    /// Actor that detonated.
    pub entity: EntityId,
    /// Where it stopped.
    pub position: Vec3Fixed,
}

/// A predicted spawn whose authoritative counterpart never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionFailure {
    /// Key the spawn was registered under.
    pub key: PredictionKey,
    /// The locally despawned predicted instance.
    pub entity: EntityId,
}

/// Everything that happened during one call to `Simulation::tick`.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Damage applied to world entities.
    pub damage: Vec<DamageEvent>,
    /// Destroyed-flag transitions.
    pub detonations: Vec<DetonationEvent>,
    /// Actors removed this tick (expired or prediction-failed).
    pub despawned: Vec<EntityId>,
    /// Predicted spawns that timed out this tick.
    pub failed: Vec<PredictionFailure>,
}

impl TickEvents {
    /// Whether the tick produced no events at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.damage.is_empty()
            && self.detonations.is_empty()
            && self.despawned.is_empty()
            && self.failed.is_empty()
    }
}
