//! External collaborator interface.
//!
//! The replication substrate owns the scene: hitboxes, their history for
//! lag compensation, and the damageable capability of world entities.
//! This core never reaches for a global to find it; a world is
//! explicitly constructed once by the embedder and passed by reference
//! into every tick.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, HitMask, ParticipantId};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// A swept collision probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayQuery {
    /// Cast origin.
    pub origin: Vec3Fixed,
    /// Normalized cast direction.
    pub direction: Vec3Fixed,
    /// Probe length.
    pub max_distance: Fixed,
    /// Participant whose hitboxes are excluded from the query.
    ///
    /// Keeps a projectile from hitting its own source, which matters
    /// most under rewind: a resimulated cast can otherwise land on the
    /// firer's ghost from a previous tick.
    pub exclude: Option<ParticipantId>,
    /// Collision layer filter.
    pub mask: HitMask,
}

/// Result of a collision probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayHit {
    /// World-space impact point.
    pub point: Vec3Fixed,
    /// Entity whose hitbox was struck.
    pub entity: EntityId,
    /// Participant the struck hitbox is rooted under, if any.
    pub owner: Option<ParticipantId>,
    /// Whether the struck entity exposes the damageable capability.
    pub damageable: bool,
    /// Distance from the cast origin to the impact point.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
}

/// The facilities the external runtime supplies to the simulation.
///
/// Implementations must resolve `raycast` against historical collider
/// state appropriate to `tick`: where targets *were* when the input
/// producing this tick was recorded, not where they are now. This is
/// what makes hits register correctly for lagged shooters and keeps
/// resimulated ticks identical to their first run.
pub trait World {
    /// Lag-compensated swept collision query for the given tick.
    fn raycast(&self, query: &RayQuery, tick: u64) -> Option<RayHit>;

    /// Apply damage to a world entity.
    ///
    /// Returns `false` when the entity does not exist or is not
    /// damageable. Callers never know the target's concrete type.
    fn apply_damage(&mut self, target: EntityId, amount: u32) -> bool;

    /// Position of a world entity as of the given tick.
    ///
    /// Used by steering actors. Returns `None` for unknown entities.
    fn target_position(&self, target: EntityId, tick: u64) -> Option<Vec3Fixed> {
        let _ = (target, tick);
        None
    }
}
