//! Per-peer simulation driver.
//!
//! A [`Simulation`] is one peer's view of the predicted-actor world: it
//! owns the actors, the tick counter and the prediction ledger, and it
//! advances everything in a deterministic, stable order each tick. It is
//! constructed explicitly once by the embedder and passed wherever it is
//! needed; there is no global instance.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness
//! - Consistent iteration order (sorted entity IDs)
//! - Same inputs always produce same outputs
//!
//! A tick may be re-run (rollback and replay) when authoritative input
//! arrives late; advancing is a pure function of `(state, world)`, so a
//! re-run with the same inputs reproduces the same result.
//!
//! # Example
//!
//! ```
//! use volley_core::math::{Fixed, Vec3Fixed};
//! use volley_core::projectile::ProjectileConfig;
//! use volley_core::components::{EntityId, ParticipantId};
//! use volley_core::simulation::{Authority, FireRequest, Simulation};
//! use volley_core::world::{RayHit, RayQuery, World};
//!
//! struct EmptyWorld;
//!
//! impl World for EmptyWorld {
//!     fn raycast(&self, _query: &RayQuery, _tick: u64) -> Option<RayHit> {
//!         None
//!     }
//!     fn apply_damage(&mut self, _target: EntityId, _amount: u32) -> bool {
//!         false
//!     }
//! }
//!
//! let mut sim = Simulation::new(Authority::Server);
//! let result = sim.fire(FireRequest {
//!     owner: ParticipantId(1),
//!     config: ProjectileConfig::default(),
//!     position: Vec3Fixed::ZERO,
//!     facing: Vec3Fixed::new(Fixed::ONE, Fixed::ZERO, Fixed::ZERO),
//!     owner_velocity: Vec3Fixed::ZERO,
//! }).unwrap();
//!
//! let mut world = EmptyWorld;
//! sim.tick(&mut world);
//! assert!(sim.get(result.entity).is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::actor::{Advance, PredictedActor, SpawnKind};
use crate::components::{EntityId, ParticipantId};
use crate::error::{Result, SimError};
use crate::events::{DetonationEvent, PredictionFailure, TickEvents};
use crate::math::Vec3Fixed;
use crate::prediction::{PredictionKey, PredictionLedger};
use crate::projectile::{Projectile, ProjectileConfig, ProjectileSnapshot};
use crate::seeker::{Seeker, SeekerConfig};
use crate::world::World;

/// Which role this peer plays for spawned actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    /// State authority: spawns are authoritative immediately.
    Server,
    /// Input authority only: spawns are local predictions until the
    /// authoritative instance arrives.
    Client,
}

/// A simulated actor. Closed set: the simulation matches on this for
/// storage, hashing and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// Kinematic projectile.
    Projectile(Projectile),
    /// Chasing enemy.
    Seeker(Seeker),
}

impl Actor {
    /// Borrow as a projectile, if that is what this actor is.
    #[must_use]
    pub const fn as_projectile(&self) -> Option<&Projectile> {
        match self {
            Actor::Projectile(projectile) => Some(projectile),
            Actor::Seeker(_) => None,
        }
    }

    /// Borrow as a seeker, if that is what this actor is.
    #[must_use]
    pub const fn as_seeker(&self) -> Option<&Seeker> {
        match self {
            Actor::Seeker(seeker) => Some(seeker),
            Actor::Projectile(_) => None,
        }
    }
}

impl PredictedActor for Actor {
    fn kind(&self) -> SpawnKind {
        match self {
            Actor::Projectile(projectile) => projectile.kind(),
            Actor::Seeker(seeker) => seeker.kind(),
        }
    }

    fn init_network_state(&mut self, now: u64, owner_velocity: Vec3Fixed) {
        match self {
            Actor::Projectile(projectile) => projectile.init_network_state(now, owner_velocity),
            Actor::Seeker(seeker) => seeker.init_network_state(now, owner_velocity),
        }
    }

    fn spawned(&mut self) {
        match self {
            Actor::Projectile(projectile) => projectile.spawned(),
            Actor::Seeker(seeker) => seeker.spawned(),
        }
    }

    fn fixed_advance(
        &mut self,
        id: EntityId,
        now: u64,
        world: &mut dyn World,
        events: &mut TickEvents,
    ) -> Advance {
        match self {
            Actor::Projectile(projectile) => projectile.fixed_advance(id, now, world, events),
            Actor::Seeker(seeker) => seeker.fixed_advance(id, now, world, events),
        }
    }

    fn position(&self) -> Vec3Fixed {
        match self {
            Actor::Projectile(projectile) => projectile.position,
            Actor::Seeker(seeker) => seeker.position,
        }
    }

    fn destroyed(&self) -> bool {
        match self {
            Actor::Projectile(projectile) => projectile.destroyed(),
            Actor::Seeker(seeker) => seeker.destroyed(),
        }
    }
}

/// Storage for all actors owned by one simulation.
///
/// `HashMap` for O(1) lookup by ID, with deterministic iteration via
/// sorted keys when processing the tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorStorage {
    actors: HashMap<EntityId, Actor>,
    next_id: EntityId,
}

impl ActorStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actors: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert an actor and return its assigned ID.
    pub fn insert(&mut self, actor: Actor) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.actors.insert(id, actor);
        id
    }

    /// Remove an actor by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Actor> {
        self.actors.remove(&id)
    }

    /// Get an actor by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Get a mutable actor by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Number of live actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Sorted actor IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.actors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all actors (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Actor)> {
        self.actors.iter()
    }
}

/// A fire action to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireRequest {
    /// Firing participant.
    pub owner: ParticipantId,
    /// Projectile type to launch.
    pub config: ProjectileConfig,
    /// Muzzle position.
    pub position: Vec3Fixed,
    /// Launch direction (unit vector).
    pub facing: Vec3Fixed,
    /// Firer's velocity at the moment of fire.
    pub owner_velocity: Vec3Fixed,
}

/// Outcome of a fire action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireResult {
    /// The spawned instance (predicted on clients, authoritative on the
    /// server).
    pub entity: EntityId,
    /// Key the replicated spawn will carry for reconciliation.
    pub key: PredictionKey,
}

/// Outcome of an authoritative spawn arriving from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnArrival {
    /// The inserted authoritative instance.
    pub entity: EntityId,
    /// The predicted instance it replaced, if this peer predicted it.
    pub replaced: Option<EntityId>,
}

/// One peer's predicted-actor simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    authority: Authority,
    tick: u64,
    actors: ActorStorage,
    ledger: PredictionLedger,
    /// Actors whose destroyed flag has already been observed.
    ///
    /// The destroyed *transition* is what triggers effects, checked once
    /// per tick against this record; a flag that flipped between ticks
    /// (a killing blow delivered at a tick boundary) is still caught
    /// exactly once.
    destroyed_seen: BTreeSet<EntityId>,
}

impl Simulation {
    /// Create an empty simulation at tick 0.
    #[must_use]
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            tick: 0,
            actors: ActorStorage::new(),
            ledger: PredictionLedger::new(),
            destroyed_seen: BTreeSet::new(),
        }
    }

    /// This peer's spawn authority.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.authority
    }

    /// Current tick number.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Actor storage (read only).
    #[must_use]
    pub fn actors(&self) -> &ActorStorage {
        &self.actors
    }

    /// Get an actor by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Number of outstanding predicted spawns.
    #[must_use]
    pub fn pending_predictions(&self) -> usize {
        self.ledger.len()
    }

    /// Execute a fire action.
    ///
    /// The projectile's network state is initialized before insertion,
    /// so no consumer ever observes an uninitialized instance. On a
    /// client this spawns the local predicted instance and registers it
    /// for reconciliation; the authoritative instance arrives later via
    /// [`receive_authoritative_spawn`](Self::receive_authoritative_spawn).
    /// On the server the spawn is authoritative immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidState`] if this participant already
    /// has an outstanding predicted spawn this tick (duplicate key); the
    /// spawn is refused entirely, since it could never reconcile.
    pub fn fire(&mut self, request: FireRequest) -> Result<FireResult> {
        let key = PredictionKey::new(request.owner, self.tick);
        let kind = match self.authority {
            Authority::Server => SpawnKind::Authoritative,
            Authority::Client => SpawnKind::Predicted,
        };

        let mut actor = Actor::Projectile(Projectile::new(
            request.owner,
            kind,
            request.config,
            request.position,
            request.facing,
        ));
        actor.init_network_state(self.tick, request.owner_velocity);
        actor.spawned();

        let entity = self.actors.insert(actor);
        if kind.is_predicted() {
            if let Err(err) = self.ledger.register(key, entity, self.tick) {
                self.actors.remove(entity);
                return Err(err);
            }
        }

        tracing::debug!(tick = self.tick, %request.owner, entity, "spawned shot");
        Ok(FireResult { entity, key })
    }

    /// Deliver an authoritative projectile spawn from the network.
    ///
    /// The substrate serializes delivery onto tick boundaries; call this
    /// between ticks only. On the firing peer the key matches the
    /// outstanding predicted instance, which is discarded in the same
    /// step: one visible instance, no pop. On every other peer there is
    /// nothing to match and the instance is simply inserted.
    pub fn receive_authoritative_spawn(
        &mut self,
        key: PredictionKey,
        snapshot: &ProjectileSnapshot,
    ) -> SpawnArrival {
        let mut actor = Actor::Projectile(Projectile::from_snapshot(snapshot));
        // Network state was initialized on the spawning peer; arrival
        // only resets per-peer presentation state.
        actor.spawned();
        let entity = self.actors.insert(actor);

        let replaced = self.ledger.confirm(key).map(|predicted| {
            self.actors.remove(predicted);
            self.destroyed_seen.remove(&predicted);
            tracing::debug!(
                ?key,
                predicted,
                authoritative = entity,
                "predicted spawn confirmed"
            );
            predicted
        });

        SpawnArrival { entity, replaced }
    }

    /// Capture the replicated state of a projectile for handing to
    /// another peer.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EntityNotFound`] for an unknown ID and
    /// [`SimError::InvalidState`] for a non-projectile actor.
    pub fn snapshot_projectile(&self, id: EntityId) -> Result<ProjectileSnapshot> {
        let actor = self.actors.get(id).ok_or(SimError::EntityNotFound(id))?;
        actor
            .as_projectile()
            .map(Projectile::snapshot)
            .ok_or_else(|| SimError::InvalidState(format!("actor {id} is not a projectile")))
    }

    /// Spawn a seeker actor.
    ///
    /// Seekers are spawned by the state authority (timed spawners run
    /// there); replicated arrival on other peers goes through the same
    /// call with the replicated kind.
    pub fn spawn_seeker(
        &mut self,
        kind: SpawnKind,
        config: SeekerConfig,
        position: Vec3Fixed,
        target: Option<EntityId>,
    ) -> EntityId {
        let mut actor = Actor::Seeker(Seeker::new(kind, config, position, target));
        actor.init_network_state(self.tick, Vec3Fixed::ZERO);
        actor.spawned();
        self.actors.insert(actor)
    }

    /// Apply damage to a simulated actor.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EntityNotFound`] for an unknown ID and
    /// [`SimError::InvalidState`] for actors without health.
    pub fn damage_actor(&mut self, id: EntityId, amount: u32) -> Result<()> {
        let actor = self.actors.get_mut(id).ok_or(SimError::EntityNotFound(id))?;
        match actor {
            Actor::Seeker(seeker) => {
                seeker.take_damage(amount);
                Ok(())
            }
            Actor::Projectile(_) => Err(SimError::InvalidState(format!(
                "actor {id} is not damageable"
            ))),
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// Every actor is advanced once, in sorted-ID order, against the
    /// external world; expired actors despawn; predictions past their
    /// deadline fail and despawn locally. Detonations are detected here
    /// by comparing each actor's destroyed flag against the last
    /// observed value; the transition, not a callback, triggers effects.
    pub fn tick(&mut self, world: &mut dyn World) -> TickEvents {
        let mut events = TickEvents::default();
        let now = self.tick;

        for id in self.actors.sorted_ids() {
            let Some(actor) = self.actors.get_mut(id) else {
                continue;
            };

            let outcome = actor.fixed_advance(id, now, world, &mut events);
            let is_destroyed = actor.destroyed();
            let position = actor.position();

            if is_destroyed && !self.destroyed_seen.contains(&id) {
                self.destroyed_seen.insert(id);
                events.detonations.push(DetonationEvent {
                    entity: id,
                    position,
                });
            }

            if outcome == Advance::Despawn {
                self.actors.remove(id);
                self.destroyed_seen.remove(&id);
                events.despawned.push(id);
            }
        }

        for (key, entity) in self.ledger.expire(now) {
            if self.actors.remove(entity).is_some() {
                self.destroyed_seen.remove(&entity);
                events.despawned.push(entity);
            }
            tracing::warn!(
                ?key,
                entity,
                tick = now,
                "prediction failed: authoritative spawn never arrived"
            );
            events.failed.push(PredictionFailure { key, entity });
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "simulation state hash");
        }

        events
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used for desync detection. Two simulations with identical state
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.actors.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            let Some(actor) = self.actors.get(id) else {
                continue;
            };
            id.hash(&mut hasher);

            match actor {
                Actor::Projectile(projectile) => {
                    0u8.hash(&mut hasher);
                    projectile.owner.hash(&mut hasher);
                    hash_vec(&mut hasher, projectile.position);
                    let vars = projectile.vars();
                    hash_vec(&mut hasher, vars.velocity);
                    vars.destroyed.hash(&mut hasher);
                    vars.life_timer.expires_at().hash(&mut hasher);
                    vars.fade_timer.expires_at().hash(&mut hasher);
                }
                Actor::Seeker(seeker) => {
                    1u8.hash(&mut hasher);
                    hash_vec(&mut hasher, seeker.position);
                    let vars = seeker.vars();
                    hash_vec(&mut hasher, vars.velocity);
                    vars.destroyed.hash(&mut hasher);
                    seeker.health.current.hash(&mut hasher);
                    seeker.target.hash(&mut hasher);
                }
            }
        }

        hasher.finish()
    }

    /// Serialize the simulation state for rollback or desync forensics.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SimError::InvalidState(format!("Failed to deserialize simulation: {e}")))
    }
}

fn hash_vec(hasher: &mut DefaultHasher, v: Vec3Fixed) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
    v.z.to_bits().hash(hasher);
}
