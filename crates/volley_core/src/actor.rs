//! Predicted-actor lifecycle contract and dual-state storage.
//!
//! A predictively-spawned entity exists in one of two flavors: the
//! speculative instance created on the firing peer before the server has
//! confirmed anything, and the authoritative instance delivered by the
//! replication substrate. Both run the same simulation code; they differ
//! only in *which copy of the mutable state* that code is allowed to
//! touch. [`Dual`] holds both copies and resolves the active one from
//! the instance's [`SpawnKind`], explicitly at every call site. There
//! is no hidden branching inside a property getter to misuse.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::events::TickEvents;
use crate::math::{Fixed, Vec3Fixed};
use crate::world::World;

/// How an instance came to exist. Fixed at spawn, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnKind {
    /// Created speculatively on the firing peer, before confirmation.
    Predicted,
    /// Created via the replicated spawn path; eventual source of truth.
    Authoritative,
}

impl SpawnKind {
    /// Whether this instance is the speculative local copy.
    #[must_use]
    pub const fn is_predicted(self) -> bool {
        matches!(self, SpawnKind::Predicted)
    }
}

/// Paired predicted/replicated slots for one piece of mutable state.
///
/// Exactly one slot is authoritative for a given instance, selected
/// solely by the instance's [`SpawnKind`]. Simulation code must go
/// through [`get`](Self::get)/[`get_mut`](Self::get_mut) and must never
/// mix reads and writes across the two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dual<T> {
    predicted: T,
    replicated: T,
}

impl<T> Dual<T> {
    /// Seed both slots with the same value.
    pub fn new(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            predicted: value.clone(),
            replicated: value,
        }
    }

    /// Seed the replicated slot from a snapshot, defaulting the other.
    pub fn from_replicated(value: T) -> Self
    where
        T: Default,
    {
        Self {
            predicted: T::default(),
            replicated: value,
        }
    }

    /// The active slot for an instance of the given kind.
    #[must_use]
    pub const fn get(&self, kind: SpawnKind) -> &T {
        match kind {
            SpawnKind::Predicted => &self.predicted,
            SpawnKind::Authoritative => &self.replicated,
        }
    }

    /// Mutable access to the active slot.
    pub fn get_mut(&mut self, kind: SpawnKind) -> &mut T {
        match kind {
            SpawnKind::Predicted => &mut self.predicted,
            SpawnKind::Authoritative => &mut self.replicated,
        }
    }

    /// The replicated slot, regardless of kind.
    ///
    /// Only for snapshot extraction on the authoritative peer; never a
    /// way for simulation code to bypass kind resolution.
    #[must_use]
    pub const fn replicated(&self) -> &T {
        &self.replicated
    }
}

/// What an actor wants the driver to do with it after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Keep simulating.
    Continue,
    /// Remove the actor from the simulation.
    Despawn,
}

/// Which trajectory the presentation layer should interpolate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationSource {
    /// Interpolate the last-confirmed trajectory.
    #[default]
    Confirmed,
    /// Interpolate the locally simulated trajectory.
    ///
    /// Required for actors that move every tick via local simulation on
    /// all peers; the confirmed trajectory lags behind their motion.
    Predicted,
}

/// Per-actor render interpolation bookkeeping.
///
/// Tracks the previous and current tick positions so the presentation
/// layer can sample a smooth position between ticks. Reset on spawn so a
/// recycled instance does not sweep across the map from its old life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterpolationState {
    /// Position at the previous tick.
    pub from: Vec3Fixed,
    /// Position at the current tick.
    pub to: Vec3Fixed,
    /// Declared interpolation data source.
    pub source: InterpolationSource,
}

impl InterpolationState {
    /// Snap both endpoints to `position` and declare predicted sourcing.
    pub fn reset(&mut self, position: Vec3Fixed) {
        self.from = position;
        self.to = position;
        self.source = InterpolationSource::Predicted;
    }

    /// Roll the window forward to a new current position.
    pub fn advance(&mut self, position: Vec3Fixed) {
        self.from = self.to;
        self.to = position;
    }

    /// Sample the render position at blend factor `alpha` in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, alpha: Fixed) -> Vec3Fixed {
        self.from.lerp(self.to, alpha)
    }
}

/// Lifecycle contract for every predictively-spawned entity.
///
/// The simulation driver calls these in a fixed order:
///
/// 1. [`init_network_state`](Self::init_network_state): exactly once,
///    on the spawning peer, *before* the instance is visible to any
///    consumer. Must set initial state deterministically from its
///    inputs, with no other side effects, so that the predicting peer
///    and the authoritative peer converge on the same result.
/// 2. [`spawned`](Self::spawned): on every peer that receives the
///    instance. Resets presentation state (instances are pooled and
///    recycled by the substrate) and declares predicted interpolation.
/// 3. [`fixed_advance`](Self::fixed_advance): once per simulation
///    tick. May be re-invoked for the same tick during rollback; it must
///    be a pure function of `(actor state, tick inputs)`.
///
/// A predicted instance whose authoritative counterpart never arrives is
/// despawned by the driver; the actor itself has no failure hook.
pub trait PredictedActor {
    /// How this instance was spawned.
    fn kind(&self) -> SpawnKind;

    /// Initialize state before the instance becomes visible.
    fn init_network_state(&mut self, now: u64, owner_velocity: Vec3Fixed);

    /// Per-peer reset when the instance appears.
    fn spawned(&mut self);

    /// Advance one simulation tick.
    fn fixed_advance(
        &mut self,
        id: EntityId,
        now: u64,
        world: &mut dyn World,
        events: &mut TickEvents,
    ) -> Advance;

    /// Current world position.
    fn position(&self) -> Vec3Fixed;

    /// Whether this actor has detonated. Monotonic.
    fn destroyed(&self) -> bool;
}
