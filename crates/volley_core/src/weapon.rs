//! Weapon fire control.
//!
//! A weapon gates fire actions on a rate-of-fire cooldown, cycles shots
//! across its muzzle exits, and turns an approved fire action into the
//! spawn request the simulation executes. It also records the tick of
//! the last shot; the presentation layer polls the recorded value once
//! per tick and compares it against the previous one to drive muzzle
//! effects: an explicit state-transition check rather than a
//! runtime-invoked change hook, so the "fired exactly once" reading is
//! auditable.

use serde::{Deserialize, Serialize};

use crate::components::ParticipantId;
use crate::math::{fixed_serde, Fixed, Vec3Fixed};
use crate::projectile::ProjectileConfig;
use crate::simulation::FireRequest;
use crate::tick::TickTimer;

/// A muzzle exit, relative to the wielder's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuzzleExit {
    /// Offset from the wielder's position.
    pub offset: Vec3Fixed,
}

/// One weapon held by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    config: ProjectileConfig,
    /// Seconds between shots.
    #[serde(with = "fixed_serde")]
    rate_of_fire: Fixed,
    muzzles: Vec<MuzzleExit>,
    next_muzzle: usize,
    cooldown: TickTimer,
    /// Tick of the most recent shot, for effect triggering.
    fire_tick: Option<u64>,
    /// Last `fire_tick` value observed by the effect poll.
    seen_fire_tick: Option<u64>,
}

impl Weapon {
    /// Create a weapon with a single muzzle at the wielder's origin.
    #[must_use]
    pub fn new(config: ProjectileConfig, rate_of_fire: Fixed) -> Self {
        Self::with_muzzles(
            config,
            rate_of_fire,
            vec![MuzzleExit {
                offset: Vec3Fixed::ZERO,
            }],
        )
    }

    /// Create a weapon with explicit muzzle exits.
    ///
    /// Shots cycle through the exits in order, one per shot.
    ///
    /// # Panics
    ///
    /// Panics when `muzzles` is empty; a weapon with no exit point is a
    /// data-authoring mistake.
    #[must_use]
    pub fn with_muzzles(
        config: ProjectileConfig,
        rate_of_fire: Fixed,
        muzzles: Vec<MuzzleExit>,
    ) -> Self {
        assert!(!muzzles.is_empty(), "a weapon needs at least one muzzle exit");
        Self {
            config,
            rate_of_fire,
            muzzles,
            next_muzzle: 0,
            cooldown: TickTimer::NONE,
            fire_tick: None,
            seen_fire_tick: None,
        }
    }

    /// The projectile type this weapon fires.
    #[must_use]
    pub const fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    /// Whether the rate-of-fire cooldown permits firing at tick `now`.
    #[must_use]
    pub fn ready(&self, now: u64) -> bool {
        !self.cooldown.is_set() || self.cooldown.expired(now)
    }

    /// Execute a fire action at tick `now`.
    ///
    /// Cycles to the next muzzle exit, arms the cooldown, records the
    /// fire tick, and returns the spawn request for
    /// [`Simulation::fire`](crate::simulation::Simulation::fire).
    /// Returns `None` while the cooldown is still running; a held
    /// trigger between shots is normal input, not an error.
    pub fn fire(
        &mut self,
        now: u64,
        owner: ParticipantId,
        base_position: Vec3Fixed,
        facing: Vec3Fixed,
        owner_velocity: Vec3Fixed,
    ) -> Option<FireRequest> {
        if !self.ready(now) {
            return None;
        }

        let exit = self.next_exit();
        self.cooldown = TickTimer::from_seconds(now, self.rate_of_fire);
        self.fire_tick = Some(now);

        Some(FireRequest {
            owner,
            config: self.config,
            position: base_position + exit.offset,
            facing,
            owner_velocity,
        })
    }

    /// Whether a shot has been fired since the previous poll.
    ///
    /// Call once per tick from the presentation layer; a `true` result
    /// is consumed, so each shot triggers effects exactly once.
    pub fn poll_fired(&mut self) -> bool {
        if self.fire_tick != self.seen_fire_tick {
            self.seen_fire_tick = self.fire_tick;
            true
        } else {
            false
        }
    }

    fn next_exit(&mut self) -> MuzzleExit {
        let exit = self.muzzles[self.next_muzzle % self.muzzles.len()];
        self.next_muzzle = (self.next_muzzle + 1) % self.muzzles.len();
        exit
    }
}
