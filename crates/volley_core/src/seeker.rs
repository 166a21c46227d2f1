//! Seeker actors: health-bearing enemies that chase a target.
//!
//! Seekers share the predicted-actor machinery with projectiles (dual
//! state, monotonic destruction, transition-driven effects), which keeps
//! the lifecycle contract honest about not being projectile-specific.

use serde::{Deserialize, Serialize};

use crate::actor::{Advance, Dual, InterpolationState, PredictedActor, SpawnKind};
use crate::components::{EntityId, Health};
use crate::events::TickEvents;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::tick::{tick_delta, TickTimer};
use crate::world::World;

/// Tuning for one seeker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekerConfig {
    /// Movement speed, units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Maximum health.
    pub max_health: u32,
}

impl Default for SeekerConfig {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(4),
            max_health: 30,
        }
    }
}

/// Mutable seeker state with predicted and replicated copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeekerVars {
    /// Current velocity, units per second.
    pub velocity: Vec3Fixed,
    /// True once dead. Monotonic.
    pub destroyed: bool,
}

/// A chasing enemy actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeker {
    kind: SpawnKind,
    config: SeekerConfig,
    /// Current world position.
    pub position: Vec3Fixed,
    /// Unit forward vector.
    pub facing: Vec3Fixed,
    /// Remaining health.
    pub health: Health,
    /// World entity this seeker chases, if any.
    pub target: Option<EntityId>,
    state: Dual<SeekerVars>,
    /// Render interpolation bookkeeping.
    pub interpolation: InterpolationState,
}

impl Seeker {
    /// Create an uninitialized seeker at its spawn transform.
    #[must_use]
    pub fn new(
        kind: SpawnKind,
        config: SeekerConfig,
        position: Vec3Fixed,
        target: Option<EntityId>,
    ) -> Self {
        Self {
            kind,
            config,
            position,
            facing: Vec3Fixed::UP,
            health: Health::new(config.max_health),
            target,
            state: Dual::new(SeekerVars::default()),
            interpolation: InterpolationState::default(),
        }
    }

    /// The active mutable state for this instance.
    #[must_use]
    pub const fn vars(&self) -> &SeekerVars {
        self.state.get(self.kind)
    }

    /// Apply damage; a killing blow destroys the seeker in place.
    pub fn take_damage(&mut self, amount: u32) {
        self.health.apply_damage(amount);
        if self.health.is_dead() && !self.state.get(self.kind).destroyed {
            self.state.get_mut(self.kind).destroyed = true;
        }
    }

    fn steer_toward(&mut self, target_position: Vec3Fixed) {
        let to_target = (target_position - self.position).horizontal();
        let direction = to_target.normalize();
        if direction.length_squared() > Fixed::ZERO {
            self.facing = direction;
        }
        self.state.get_mut(self.kind).velocity = direction * self.config.speed;
    }
}

impl PredictedActor for Seeker {
    fn kind(&self) -> SpawnKind {
        self.kind
    }

    fn init_network_state(&mut self, _now: u64, _owner_velocity: Vec3Fixed) {
        let vars = self.state.get_mut(self.kind);
        vars.velocity = Vec3Fixed::ZERO;
        vars.destroyed = false;
    }

    fn spawned(&mut self) {
        self.interpolation.reset(self.position);
        self.health = Health::new(self.config.max_health);
    }

    fn fixed_advance(
        &mut self,
        _id: EntityId,
        now: u64,
        world: &mut dyn World,
        _events: &mut TickEvents,
    ) -> Advance {
        if self.state.get(self.kind).destroyed {
            return Advance::Despawn;
        }

        if let Some(target) = self.target {
            match world.target_position(target, now) {
                Some(target_position) => self.steer_toward(target_position),
                // Target gone: stop and wait for a new one
                None => {
                    self.target = None;
                    self.state.get_mut(self.kind).velocity = Vec3Fixed::ZERO;
                }
            }
        }

        let velocity = self.state.get(self.kind).velocity;
        self.position = self.position + velocity * tick_delta();
        self.interpolation.advance(self.position);
        Advance::Continue
    }

    fn position(&self) -> Vec3Fixed {
        self.position
    }

    fn destroyed(&self) -> bool {
        self.state.get(self.kind).destroyed
    }
}

/// Compass ring used for deterministic spawn placement.
///
/// The prototype placed spawns on a random circle; simulation code may
/// not consume system randomness, so spawners walk this eight-point
/// ring instead. 181/256 approximates 1/sqrt(2).
fn ring_direction(index: u32) -> Vec3Fixed {
    let diag = Fixed::from_num(181) / Fixed::from_num(256);
    let dirs = [
        (Fixed::ONE, Fixed::ZERO),
        (diag, diag),
        (Fixed::ZERO, Fixed::ONE),
        (-diag, diag),
        (-Fixed::ONE, Fixed::ZERO),
        (-diag, -diag),
        (Fixed::ZERO, -Fixed::ONE),
        (diag, -diag),
    ];
    let (x, z) = dirs[(index as usize) % dirs.len()];
    Vec3Fixed::new(x, Fixed::ZERO, z)
}

/// Periodically emits seeker spawn positions on a ring.
///
/// Only the state authority runs a spawner; clients receive the spawned
/// seekers through replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekerSpawner {
    /// Seeker type to spawn.
    pub config: SeekerConfig,
    /// Seconds between spawns.
    #[serde(with = "fixed_serde")]
    pub spawn_delay: Fixed,
    /// Ring radius around the spawner origin.
    #[serde(with = "fixed_serde")]
    pub spawn_radius: Fixed,
    /// Spawner origin.
    pub origin: Vec3Fixed,
    delay_timer: TickTimer,
    running: bool,
    spawn_index: u32,
}

impl SeekerSpawner {
    /// Create a stopped spawner.
    #[must_use]
    pub fn new(config: SeekerConfig, spawn_delay: Fixed, spawn_radius: Fixed, origin: Vec3Fixed) -> Self {
        Self {
            config,
            spawn_delay,
            spawn_radius,
            origin,
            delay_timer: TickTimer::NONE,
            running: false,
            spawn_index: 0,
        }
    }

    /// Start spawning, with the first spawn one full delay from `now`.
    pub fn start(&mut self, now: u64) {
        self.delay_timer = TickTimer::from_seconds(now, self.spawn_delay);
        self.running = true;
    }

    /// Start spawning with an explicit initial delay.
    pub fn start_with_delay(&mut self, now: u64, delay: Fixed) {
        self.delay_timer = TickTimer::from_seconds(now, delay);
        self.running = true;
    }

    /// Stop spawning. Already-spawned seekers are unaffected.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance one tick; returns a spawn position when one is due.
    pub fn advance(&mut self, now: u64) -> Option<Vec3Fixed> {
        if !self.running || !self.delay_timer.expired(now) {
            return None;
        }

        let position = self.origin + ring_direction(self.spawn_index) * self.spawn_radius;
        self.spawn_index = self.spawn_index.wrapping_add(1);
        // Arm the delay until the next spawn
        self.delay_timer = TickTimer::from_seconds(now, self.spawn_delay);
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{RayHit, RayQuery};
    use std::collections::HashMap;

    struct TargetMap {
        positions: HashMap<EntityId, Vec3Fixed>,
    }

    impl World for TargetMap {
        fn raycast(&self, _query: &RayQuery, _tick: u64) -> Option<RayHit> {
            None
        }

        fn apply_damage(&mut self, _target: EntityId, _amount: u32) -> bool {
            false
        }

        fn target_position(&self, target: EntityId, _tick: u64) -> Option<Vec3Fixed> {
            self.positions.get(&target).copied()
        }
    }

    #[test]
    fn test_seeker_chases_target() {
        let mut seeker = Seeker::new(
            SpawnKind::Authoritative,
            SeekerConfig::default(),
            Vec3Fixed::ZERO,
            Some(9),
        );
        seeker.init_network_state(0, Vec3Fixed::ZERO);
        seeker.spawned();

        let mut world = TargetMap {
            positions: HashMap::from([(
                9,
                Vec3Fixed::new(Fixed::from_num(10), Fixed::ZERO, Fixed::ZERO),
            )]),
        };
        let mut events = TickEvents::default();

        let advance = seeker.fixed_advance(1, 0, &mut world, &mut events);
        assert_eq!(advance, Advance::Continue);
        assert!(seeker.position.x > Fixed::ZERO);
        assert_eq!(seeker.position.z, Fixed::ZERO);
    }

    #[test]
    fn test_seeker_stops_when_target_vanishes() {
        let mut seeker = Seeker::new(
            SpawnKind::Authoritative,
            SeekerConfig::default(),
            Vec3Fixed::ZERO,
            Some(9),
        );
        seeker.init_network_state(0, Vec3Fixed::ZERO);
        seeker.spawned();

        let mut world = TargetMap {
            positions: HashMap::new(),
        };
        let mut events = TickEvents::default();
        seeker.fixed_advance(1, 0, &mut world, &mut events);

        assert_eq!(seeker.target, None);
        assert_eq!(seeker.vars().velocity, Vec3Fixed::ZERO);
    }

    #[test]
    fn test_lethal_damage_destroys_then_despawns() {
        let mut seeker = Seeker::new(
            SpawnKind::Authoritative,
            SeekerConfig {
                speed: Fixed::from_num(4),
                max_health: 5,
            },
            Vec3Fixed::ZERO,
            None,
        );
        seeker.init_network_state(0, Vec3Fixed::ZERO);
        seeker.spawned();

        seeker.take_damage(3);
        assert!(!seeker.destroyed());

        seeker.take_damage(3);
        assert!(seeker.destroyed());

        // Monotonic: more damage doesn't resurrect or double-destroy
        seeker.take_damage(100);
        assert!(seeker.destroyed());

        let mut world = TargetMap {
            positions: HashMap::new(),
        };
        let mut events = TickEvents::default();
        let advance = seeker.fixed_advance(1, 0, &mut world, &mut events);
        assert_eq!(advance, Advance::Despawn);
    }

    #[test]
    fn test_spawner_waits_full_delay() {
        let mut spawner = SeekerSpawner::new(
            SeekerConfig::default(),
            Fixed::ONE,
            Fixed::from_num(10),
            Vec3Fixed::ZERO,
        );

        // Not started: never spawns
        assert_eq!(spawner.advance(0), None);

        spawner.start(0);
        assert_eq!(spawner.advance(0), None);
        assert_eq!(spawner.advance(59), None);

        let first = spawner.advance(60);
        assert!(first.is_some());
        // Delay re-arms after each spawn
        assert_eq!(spawner.advance(61), None);
        assert!(spawner.advance(120).is_some());
    }

    #[test]
    fn test_spawner_placement_is_deterministic() {
        let build = || {
            SeekerSpawner::new(
                SeekerConfig::default(),
                Fixed::ONE,
                Fixed::from_num(10),
                Vec3Fixed::ZERO,
            )
        };
        let mut a = build();
        let mut b = build();
        a.start(0);
        b.start(0);

        for round in 1..=8u64 {
            let now = round * 60;
            assert_eq!(a.advance(now), b.advance(now));
        }
    }

    #[test]
    fn test_spawner_ring_positions_distinct() {
        let mut spawner = SeekerSpawner::new(
            SeekerConfig::default(),
            Fixed::ONE,
            Fixed::from_num(10),
            Vec3Fixed::ZERO,
        );
        spawner.start(0);

        let mut seen = Vec::new();
        for round in 1..=8u64 {
            let pos = spawner.advance(round * 60).unwrap();
            assert!(!seen.contains(&pos));
            seen.push(pos);
        }
    }

    #[test]
    fn test_predicted_seeker_uses_predicted_slot() {
        let mut seeker = Seeker::new(
            SpawnKind::Predicted,
            SeekerConfig::default(),
            Vec3Fixed::ZERO,
            None,
        );
        seeker.init_network_state(0, Vec3Fixed::ZERO);
        seeker.take_damage(SeekerConfig::default().max_health);
        assert!(seeker.destroyed());
        // The replicated slot is untouched on a predicted instance
        assert!(!seeker.state.replicated().destroyed);
    }
}
