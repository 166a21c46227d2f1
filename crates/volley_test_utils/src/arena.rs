//! Scripted collision world.
//!
//! [`Arena`] implements the external `World` collaborators with targets
//! that move on fixed linear paths. Because a target's position is a
//! pure function of the queried tick, the arena naturally provides
//! lag-compensated queries: asking about tick T returns where the
//! target *was* at T, no matter how far the script has advanced.

use volley_core::components::{EntityId, Health, HitMask, ParticipantId};
use volley_core::math::{fixed_sqrt, Fixed, Vec3Fixed};
use volley_core::tick::tick_delta;
use volley_core::world::{RayHit, RayQuery, World};

/// One scripted target.
#[derive(Debug, Clone)]
pub struct ArenaTarget {
    /// World entity id.
    pub entity: EntityId,
    /// Participant this target's hitbox is rooted under, if any.
    pub owner: Option<ParticipantId>,
    /// Position at tick 0.
    pub origin: Vec3Fixed,
    /// Linear velocity, units per second.
    pub velocity: Vec3Fixed,
    /// Hit sphere radius.
    pub radius: Fixed,
    /// Collision layers this target occupies.
    pub mask: HitMask,
    /// Health, when the target is damageable.
    pub health: Option<Health>,
}

impl ArenaTarget {
    /// A stationary, damageable, all-layers target.
    #[must_use]
    pub fn at(entity: EntityId, origin: Vec3Fixed, radius: Fixed) -> Self {
        Self {
            entity,
            owner: None,
            origin,
            velocity: Vec3Fixed::ZERO,
            radius,
            mask: HitMask::ALL,
            health: Some(Health::new(100)),
        }
    }

    /// Builder: root the hitbox under a participant.
    #[must_use]
    pub fn with_owner(mut self, owner: ParticipantId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Builder: move on a linear path.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3Fixed) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: restrict to specific collision layers.
    #[must_use]
    pub fn with_mask(mut self, mask: HitMask) -> Self {
        self.mask = mask;
        self
    }

    /// Builder: set health (or `None` for scenery that blocks but does
    /// not take damage).
    #[must_use]
    pub fn with_health(mut self, health: Option<Health>) -> Self {
        self.health = health;
        self
    }

    /// Where this target is at the given tick.
    #[must_use]
    pub fn position_at(&self, tick: u64) -> Vec3Fixed {
        let seconds = Fixed::from_num(tick as u32) * tick_delta();
        self.origin + self.velocity * seconds
    }
}

/// A recorded `apply_damage` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRecord {
    /// Target entity.
    pub target: EntityId,
    /// Amount requested.
    pub amount: u32,
}

/// Scripted world of moving spherical targets.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    targets: Vec<ArenaTarget>,
    /// Every damage application, in order.
    pub damage_log: Vec<DamageRecord>,
}

impl Arena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target to the arena.
    pub fn add_target(&mut self, target: ArenaTarget) {
        self.targets.push(target);
    }

    /// Number of damage calls a target has received.
    #[must_use]
    pub fn damage_count(&self, entity: EntityId) -> usize {
        self.damage_log
            .iter()
            .filter(|record| record.target == entity)
            .count()
    }

    /// A target's current health, if it exists and is damageable.
    #[must_use]
    pub fn target_health(&self, entity: EntityId) -> Option<Health> {
        self.targets
            .iter()
            .find(|target| target.entity == entity)
            .and_then(|target| target.health)
    }
}

impl World for Arena {
    fn raycast(&self, query: &RayQuery, tick: u64) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;

        for target in &self.targets {
            if !query.mask.intersects(target.mask) {
                continue;
            }
            if query.exclude.is_some() && query.exclude == target.owner {
                continue;
            }

            // Segment vs sphere against the target's position as of the
            // queried tick (lag compensation).
            let center = target.position_at(tick);
            let to_center = center - query.origin;
            let along = to_center.dot(query.direction);
            if along < Fixed::ZERO {
                continue;
            }

            let closest = query.origin + query.direction * along;
            let off_sq = closest.distance_squared(center);
            let radius_sq = target.radius * target.radius;
            if off_sq > radius_sq {
                continue;
            }

            // Entry point; an origin already inside the sphere hits at
            // the origin itself.
            let penetration = fixed_sqrt(radius_sq - off_sq);
            let mut distance = along - penetration;
            if distance < Fixed::ZERO {
                distance = Fixed::ZERO;
            }
            if distance > query.max_distance {
                continue;
            }
            let hit = RayHit {
                point: query.origin + query.direction * distance,
                entity: target.entity,
                owner: target.owner,
                damageable: target.health.is_some(),
                distance,
            };

            match &best {
                Some(current) if current.distance <= hit.distance => {}
                _ => best = Some(hit),
            }
        }

        best
    }

    fn apply_damage(&mut self, target: EntityId, amount: u32) -> bool {
        let Some(found) = self
            .targets
            .iter_mut()
            .find(|candidate| candidate.entity == target)
        else {
            return false;
        };
        let Some(health) = found.health.as_mut() else {
            return false;
        };

        health.apply_damage(amount);
        self.damage_log.push(DamageRecord { target, amount });
        true
    }

    fn target_position(&self, target: EntityId, tick: u64) -> Option<Vec3Fixed> {
        self.targets
            .iter()
            .find(|candidate| candidate.entity == target)
            .map(|candidate| candidate.position_at(tick))
    }
}
