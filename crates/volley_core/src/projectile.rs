//! Kinematic projectile simulation.
//!
//! All motion is kinematic and advances in `fixed_advance` along with
//! collision detection. Collision uses the runtime's lag-compensated
//! queries so hit detection stays server-authoritative while players
//! still hit what they aim at. The same code runs on the predicting and
//! the authoritative peer and must produce the same trajectory on both,
//! which is why every quantity here is fixed-point and every deadline is
//! an absolute tick.

use serde::{Deserialize, Serialize};

use crate::actor::{Advance, Dual, InterpolationState, PredictedActor, SpawnKind};
use crate::components::{EntityId, HitMask, ParticipantId};
use crate::error::{Result, SimError};
use crate::events::{DamageEvent, TickEvents};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::tick::{tick_delta, TickTimer};
use crate::world::{RayQuery, World};

/// Immutable launch parameters for one projectile type.
///
/// Authored as data (see [`crate::data`]) and validated at load time;
/// the simulation assumes a valid config and performs no runtime
/// parameter checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileConfig {
    /// Damage applied on a damageable hit.
    pub damage: u32,
    /// Muzzle speed, units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Collision radius; also the minimum probe length.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Vertical acceleration, units per second² (negative is down).
    #[serde(with = "fixed_serde")]
    pub gravity: Fixed,
    /// Seconds of flight before the projectile starts fading.
    #[serde(with = "fixed_serde")]
    pub time_to_live: Fixed,
    /// Seconds of terminal fade before the instance despawns.
    #[serde(with = "fixed_serde")]
    pub time_to_fade: Fixed,
    /// Fraction of the firer's aligned velocity inherited at launch.
    #[serde(with = "fixed_serde")]
    pub owner_velocity_multiplier: Fixed,
    /// Collision layers this projectile collides with.
    pub hit_mask: HitMask,
}

impl ProjectileConfig {
    /// Validate authored parameters.
    ///
    /// Zero radius or non-positive lifetime is a data-authoring mistake,
    /// caught here so the simulation never has to branch on it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.radius <= Fixed::ZERO {
            return Err(SimError::InvalidConfig {
                field: "radius",
                message: format!("must be positive, got {}", self.radius),
            });
        }
        if self.speed <= Fixed::ZERO {
            return Err(SimError::InvalidConfig {
                field: "speed",
                message: format!("must be positive, got {}", self.speed),
            });
        }
        if self.time_to_live <= Fixed::ZERO {
            return Err(SimError::InvalidConfig {
                field: "time_to_live",
                message: format!("must be positive, got {}", self.time_to_live),
            });
        }
        if self.time_to_fade < Fixed::ZERO {
            return Err(SimError::InvalidConfig {
                field: "time_to_fade",
                message: format!("must not be negative, got {}", self.time_to_fade),
            });
        }
        if self.hit_mask == HitMask::NONE {
            return Err(SimError::InvalidConfig {
                field: "hit_mask",
                message: "must include at least one layer".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            damage: 10,
            speed: Fixed::from_num(100),
            radius: Fixed::from_num(5) / Fixed::from_num(100),
            gravity: Fixed::ZERO,
            time_to_live: Fixed::from_num(3) / Fixed::from_num(2),
            time_to_fade: Fixed::from_num(1) / Fixed::from_num(2),
            owner_velocity_multiplier: Fixed::ONE,
            hit_mask: HitMask::ALL,
        }
    }
}

/// The mutable projectile state that exists in predicted and replicated
/// copies.
///
/// Everything the trajectory depends on lives here; there is no hidden
/// accumulation outside these fields, so re-running a tick with the same
/// inputs reproduces the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectileVars {
    /// Expires when the instance should despawn entirely
    /// (`time_to_live + time_to_fade` after launch).
    pub life_timer: TickTimer,
    /// Expires when unhit flight ends and the terminal fade begins
    /// (`time_to_live` after launch). Always at or before `life_timer`.
    pub fade_timer: TickTimer,
    /// Current velocity, units per second.
    pub velocity: Vec3Fixed,
    /// True once detonated. Monotonic: never reset for the remaining
    /// lifetime of the instance.
    pub destroyed: bool,
}

/// One networked projectile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Firing participant; its own hitboxes are never hit.
    pub owner: ParticipantId,
    kind: SpawnKind,
    config: ProjectileConfig,
    /// Current world position.
    pub position: Vec3Fixed,
    /// Unit forward vector; launch direction, then flight direction.
    pub facing: Vec3Fixed,
    state: Dual<ProjectileVars>,
    /// Render interpolation bookkeeping.
    pub interpolation: InterpolationState,
}

/// The replicated state of an authoritative projectile, as handed over
/// by the spawn path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Firing participant.
    pub owner: ParticipantId,
    /// Launch parameters.
    pub config: ProjectileConfig,
    /// Position as of the snapshot tick.
    pub position: Vec3Fixed,
    /// Facing as of the snapshot tick.
    pub facing: Vec3Fixed,
    /// Replicated mutable state.
    pub vars: ProjectileVars,
}

/// How far behind the current position the collision probe starts.
///
/// Moving the origin back makes sure we can't shoot through things even
/// if the projectile starts a tick inside them.
fn probe_backstep() -> Fixed {
    Fixed::from_num(1) / Fixed::from_num(2)
}

impl Projectile {
    /// Create an uninitialized projectile at its launch transform.
    ///
    /// [`init_network_state`](PredictedActor::init_network_state) must
    /// run before the instance becomes visible to any consumer.
    #[must_use]
    pub fn new(
        owner: ParticipantId,
        kind: SpawnKind,
        config: ProjectileConfig,
        position: Vec3Fixed,
        facing: Vec3Fixed,
    ) -> Self {
        Self {
            owner,
            kind,
            config,
            position,
            facing,
            state: Dual::new(ProjectileVars::default()),
            interpolation: InterpolationState::default(),
        }
    }

    /// Rebuild the authoritative instance delivered by the replicated
    /// spawn path.
    #[must_use]
    pub fn from_snapshot(snapshot: &ProjectileSnapshot) -> Self {
        Self {
            owner: snapshot.owner,
            kind: SpawnKind::Authoritative,
            config: snapshot.config,
            position: snapshot.position,
            facing: snapshot.facing,
            state: Dual::from_replicated(snapshot.vars),
            interpolation: InterpolationState::default(),
        }
    }

    /// Capture the replicated state for handing to another peer.
    ///
    /// Only meaningful on the authoritative instance.
    #[must_use]
    pub fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            owner: self.owner,
            config: self.config,
            position: self.position,
            facing: self.facing,
            vars: *self.state.replicated(),
        }
    }

    /// Launch parameters.
    #[must_use]
    pub const fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    /// The active mutable state for this instance.
    ///
    /// This indirection is the only way simulation code touches the
    /// dual state.
    #[must_use]
    pub const fn vars(&self) -> &ProjectileVars {
        self.state.get(self.kind)
    }

    /// Mark the projectile as detonated at `point`.
    ///
    /// Silent no-op when already destroyed, so a fade-expiry and an
    /// impact racing in the same tick window cannot double-trigger. The
    /// flag transition is the sole trigger for impact effects on every
    /// peer, so the effect plays on the same tick the projectile stops
    /// rather than via a separately-timed message that could desync
    /// from the stop.
    pub fn detonate(&mut self, point: Vec3Fixed) {
        if self.state.get(self.kind).destroyed {
            return;
        }
        self.state.get_mut(self.kind).destroyed = true;
        self.position = point;
    }

    /// Simulate one tick of motion and collision.
    fn advance_motion(
        &mut self,
        id: EntityId,
        now: u64,
        world: &mut dyn World,
        events: &mut TickEvents,
    ) {
        let dt = tick_delta();
        let mut vel = self.state.get(self.kind).velocity;

        if !self.state.get(self.kind).destroyed {
            if self.state.get(self.kind).fade_timer.expired(now) {
                // Unhit flight is over; the actor is visually finishing
                // its death, not moving.
                let here = self.position;
                self.detonate(here);
            } else {
                vel.y += self.config.gravity * dt;

                let speed = vel.length();
                if speed > Fixed::ZERO {
                    let dir = vel.normalize();
                    let travel = speed * dt;
                    let probe_len = if self.config.radius > travel {
                        self.config.radius
                    } else {
                        travel
                    };
                    let query = RayQuery {
                        origin: self.position - dir * probe_backstep(),
                        direction: dir,
                        max_distance: probe_len,
                        exclude: Some(self.owner),
                        mask: self.config.hit_mask,
                    };

                    if let Some(hit) = world.raycast(&query, now) {
                        // An owner-rooted hit that slips past the query
                        // exclusion is ignored outright; under rewind we
                        // would otherwise hit our own ghost from a
                        // previous tick.
                        if hit.owner != Some(self.owner) {
                            if hit.damageable && world.apply_damage(hit.entity, self.config.damage)
                            {
                                events.damage.push(DamageEvent {
                                    attacker: id,
                                    target: hit.entity,
                                    amount: self.config.damage,
                                });
                            }
                            self.detonate(hit.point);
                        }
                    }
                }
            }
        }

        // A detonated projectile freezes rather than flying through its
        // impact point.
        let destroyed = self.state.get(self.kind).destroyed;
        if destroyed {
            vel = Vec3Fixed::ZERO;
        }
        let step = if destroyed { Fixed::ZERO } else { dt };

        self.state.get_mut(self.kind).velocity = vel;
        self.position = self.position + vel * step;

        if vel.length_squared() > Fixed::ZERO {
            self.facing = vel.normalize();
        }
        self.interpolation.advance(self.position);
    }
}

impl PredictedActor for Projectile {
    fn kind(&self) -> SpawnKind {
        self.kind
    }

    /// Initialize timers and velocity deterministically from the launch
    /// transform and the firer's velocity.
    ///
    /// The firer's velocity is inherited only to the extent it aligns
    /// with the launch direction: sidestepping doesn't bend shots, but
    /// charging forward makes them fly faster.
    fn init_network_state(&mut self, now: u64, owner_velocity: Vec3Fixed) {
        let fade_timer = TickTimer::from_seconds(now, self.config.time_to_live);
        let life_timer =
            TickTimer::from_seconds(now, self.config.time_to_live + self.config.time_to_fade);

        let fwd = self.facing.normalize().horizontal();
        let vel_dir = owner_velocity.normalize().horizontal();
        let alignment = vel_dir.dot(fwd).abs();
        let velocity = self.facing * self.config.speed
            + owner_velocity * (alignment * self.config.owner_velocity_multiplier);

        let vars = self.state.get_mut(self.kind);
        vars.fade_timer = fade_timer;
        vars.life_timer = life_timer;
        vars.destroyed = false;
        vars.velocity = velocity;
    }

    /// Reset presentation state for this (possibly recycled) instance.
    fn spawned(&mut self) {
        self.interpolation.reset(self.position);

        let vel = self.state.get(self.kind).velocity;
        if vel.length_squared() > Fixed::ZERO {
            self.facing = vel.normalize();
        }
    }

    fn fixed_advance(
        &mut self,
        id: EntityId,
        now: u64,
        world: &mut dyn World,
        events: &mut TickEvents,
    ) -> Advance {
        if self.state.get(self.kind).life_timer.expired(now) {
            return Advance::Despawn;
        }
        self.advance_motion(id, now, world, events);
        Advance::Continue
    }

    fn position(&self) -> Vec3Fixed {
        self.position
    }

    fn destroyed(&self) -> bool {
        self.state.get(self.kind).destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick::ticks_from_seconds;
    use crate::world::RayHit;

    fn epsilon() -> Fixed {
        Fixed::ONE / Fixed::from_num(10_000)
    }

    /// Empty world: no colliders, nothing damageable.
    struct NullWorld;

    impl World for NullWorld {
        fn raycast(&self, _query: &RayQuery, _tick: u64) -> Option<RayHit> {
            None
        }

        fn apply_damage(&mut self, _target: EntityId, _amount: u32) -> bool {
            false
        }
    }

    /// World with a single damageable sphere directly queryable.
    struct OneTarget {
        entity: EntityId,
        owner: Option<ParticipantId>,
        position: Vec3Fixed,
        radius: Fixed,
        damage_calls: u32,
    }

    impl World for OneTarget {
        fn raycast(&self, query: &RayQuery, _tick: u64) -> Option<RayHit> {
            // Coarse segment-vs-sphere: project center onto the ray.
            let to_center = self.position - query.origin;
            let along = to_center.dot(query.direction);
            if along < Fixed::ZERO || along > query.max_distance {
                return None;
            }
            let closest = query.origin + query.direction * along;
            if closest.distance_squared(self.position) > self.radius * self.radius {
                return None;
            }
            Some(RayHit {
                point: closest,
                entity: self.entity,
                owner: self.owner,
                damageable: true,
                distance: along,
            })
        }

        fn apply_damage(&mut self, target: EntityId, _amount: u32) -> bool {
            if target == self.entity {
                self.damage_calls += 1;
                true
            } else {
                false
            }
        }
    }

    fn forward_x() -> Vec3Fixed {
        Vec3Fixed::new(Fixed::ONE, Fixed::ZERO, Fixed::ZERO)
    }

    fn spawn_default(owner: u32, kind: SpawnKind) -> Projectile {
        let mut projectile = Projectile::new(
            ParticipantId(owner),
            kind,
            ProjectileConfig::default(),
            Vec3Fixed::ZERO,
            forward_x(),
        );
        projectile.init_network_state(0, Vec3Fixed::ZERO);
        projectile.spawned();
        projectile
    }

    #[test]
    fn test_init_velocity_is_muzzle_speed_along_facing() {
        let projectile = spawn_default(1, SpawnKind::Authoritative);
        assert_eq!(projectile.vars().velocity, forward_x() * Fixed::from_num(100));
        assert!(!projectile.vars().destroyed);
    }

    #[test]
    fn test_init_timers_fade_before_life() {
        let projectile = spawn_default(1, SpawnKind::Authoritative);
        let fade = projectile.vars().fade_timer.expires_at().unwrap();
        let life = projectile.vars().life_timer.expires_at().unwrap();
        assert!(fade <= life);
        // 1.5s and 2.0s at 60Hz
        assert_eq!(fade, 90);
        assert_eq!(life, 120);
    }

    #[test]
    fn test_init_inherits_aligned_owner_velocity() {
        let config = ProjectileConfig::default();
        let owner_forward = Vec3Fixed::new(Fixed::from_num(10), Fixed::ZERO, Fixed::ZERO);
        let owner_sideways = Vec3Fixed::new(Fixed::ZERO, Fixed::ZERO, Fixed::from_num(10));

        let mut aligned = Projectile::new(
            ParticipantId(1),
            SpawnKind::Authoritative,
            config,
            Vec3Fixed::ZERO,
            forward_x(),
        );
        aligned.init_network_state(0, owner_forward);
        // Fully aligned run speed is inherited on top of muzzle speed
        // (within fixed_sqrt precision of the alignment factor)
        let boost = aligned.vars().velocity.x - Fixed::from_num(110);
        assert!(boost.abs() < epsilon(), "got {}", aligned.vars().velocity.x);

        let mut sideways = Projectile::new(
            ParticipantId(1),
            SpawnKind::Authoritative,
            config,
            Vec3Fixed::ZERO,
            forward_x(),
        );
        sideways.init_network_state(0, owner_sideways);
        // Perpendicular movement does not bend or boost the shot
        assert_eq!(sideways.vars().velocity, forward_x() * Fixed::from_num(100));
    }

    #[test]
    fn test_predicted_instance_writes_predicted_slot_only() {
        let projectile = spawn_default(1, SpawnKind::Predicted);
        assert!(projectile.vars().life_timer.is_set());
        // The replicated slot stays untouched on a predicted instance
        assert!(!projectile.state.replicated().life_timer.is_set());
    }

    #[test]
    fn test_motion_integrates_velocity() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let mut events = TickEvents::default();
        let mut world = NullWorld;

        let advance = projectile.fixed_advance(1, 0, &mut world, &mut events);
        assert_eq!(advance, Advance::Continue);

        // 100 units/s over one 60Hz tick
        let expected = Fixed::from_num(100) * tick_delta();
        assert_eq!(projectile.position.x, expected);
        assert!(events.damage.is_empty());
    }

    #[test]
    fn test_gravity_applies_before_integration() {
        let mut config = ProjectileConfig::default();
        config.gravity = Fixed::from_num(-10);
        let mut projectile = Projectile::new(
            ParticipantId(1),
            SpawnKind::Authoritative,
            config,
            Vec3Fixed::ZERO,
            forward_x(),
        );
        projectile.init_network_state(0, Vec3Fixed::ZERO);

        let mut events = TickEvents::default();
        projectile.fixed_advance(1, 0, &mut NullWorld, &mut events);

        let dt = tick_delta();
        let expected_vy = Fixed::from_num(-10) * dt;
        assert_eq!(projectile.vars().velocity.y, expected_vy);
        // Semi-implicit Euler: this tick's position already includes the
        // new vertical velocity
        assert_eq!(projectile.position.y, expected_vy * dt);
    }

    #[test]
    fn test_hit_applies_damage_once_and_detonates() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let mut world = OneTarget {
            entity: 50,
            owner: None,
            position: Vec3Fixed::new(Fixed::from_num(1), Fixed::ZERO, Fixed::ZERO),
            radius: Fixed::from_num(1) / Fixed::from_num(2),
            damage_calls: 0,
        };

        let mut events = TickEvents::default();
        projectile.fixed_advance(1, 0, &mut world, &mut events);

        assert!(projectile.vars().destroyed);
        assert_eq!(world.damage_calls, 1);
        assert_eq!(events.damage.len(), 1);
        assert_eq!(events.damage[0].target, 50);

        // Further ticks: frozen, no more damage
        let frozen_at = projectile.position;
        for now in 1..10 {
            let mut events = TickEvents::default();
            projectile.fixed_advance(1, now, &mut world, &mut events);
            assert!(events.damage.is_empty());
            assert!(projectile.vars().destroyed);
        }
        assert_eq!(projectile.position, frozen_at);
        assert_eq!(world.damage_calls, 1);
    }

    #[test]
    fn test_owner_hit_is_ignored() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let mut world = OneTarget {
            entity: 50,
            owner: Some(ParticipantId(1)),
            position: Vec3Fixed::new(Fixed::from_num(1), Fixed::ZERO, Fixed::ZERO),
            radius: Fixed::from_num(1) / Fixed::from_num(2),
            damage_calls: 0,
        };

        let mut events = TickEvents::default();
        projectile.fixed_advance(1, 0, &mut world, &mut events);

        assert!(!projectile.vars().destroyed);
        assert_eq!(world.damage_calls, 0);
        assert!(events.damage.is_empty());
    }

    #[test]
    fn test_detonate_is_monotonic() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let point = Vec3Fixed::new(Fixed::from_num(2), Fixed::ZERO, Fixed::ZERO);
        projectile.detonate(point);
        assert!(projectile.vars().destroyed);
        assert_eq!(projectile.position, point);

        // Second call is a silent no-op and does not move the wreck
        let elsewhere = Vec3Fixed::new(Fixed::from_num(9), Fixed::ZERO, Fixed::ZERO);
        projectile.detonate(elsewhere);
        assert!(projectile.vars().destroyed);
        assert_eq!(projectile.position, point);
    }

    #[test]
    fn test_fade_expiry_detonates_without_motion() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let fade_at = projectile.vars().fade_timer.expires_at().unwrap();

        let mut world = NullWorld;
        for now in 0..fade_at {
            let mut events = TickEvents::default();
            projectile.fixed_advance(1, now, &mut world, &mut events);
        }
        assert!(!projectile.vars().destroyed);
        let flight_end = projectile.position;

        let mut events = TickEvents::default();
        let advance = projectile.fixed_advance(1, fade_at, &mut world, &mut events);
        assert_eq!(advance, Advance::Continue);
        assert!(projectile.vars().destroyed);
        assert_eq!(projectile.position, flight_end);
    }

    #[test]
    fn test_life_expiry_requests_despawn() {
        let mut projectile = spawn_default(1, SpawnKind::Authoritative);
        let life_at = projectile.vars().life_timer.expires_at().unwrap();

        let mut events = TickEvents::default();
        let advance = projectile.fixed_advance(1, life_at, &mut NullWorld, &mut events);
        assert_eq!(advance, Advance::Despawn);
    }

    #[test]
    fn test_config_validation() {
        assert!(ProjectileConfig::default().validate().is_ok());

        let mut config = ProjectileConfig::default();
        config.radius = Fixed::ZERO;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfig { field: "radius", .. })
        ));

        let mut config = ProjectileConfig::default();
        config.time_to_live = Fixed::from_num(-1);
        assert!(config.validate().is_err());

        let mut config = ProjectileConfig::default();
        config.hit_mask = HitMask::NONE;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lifetime_bounds_match_config() {
        let projectile = spawn_default(1, SpawnKind::Authoritative);
        let config = projectile.config();
        assert_eq!(
            projectile.vars().fade_timer.expires_at().unwrap(),
            ticks_from_seconds(config.time_to_live)
        );
        assert_eq!(
            projectile.vars().life_timer.expires_at().unwrap(),
            ticks_from_seconds(config.time_to_live + config.time_to_fade)
        );
    }
}
