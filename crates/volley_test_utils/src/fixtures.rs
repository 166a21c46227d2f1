//! Test fixtures and helpers.
//!
//! Pre-built launch parameters, fire requests and arena scripts for
//! consistent testing, plus property-based strategies.

use proptest::prelude::*;

use volley_core::components::{HitMask, ParticipantId};
use volley_core::math::{Fixed, Vec3Fixed};
use volley_core::projectile::ProjectileConfig;
use volley_core::simulation::{Authority, FireRequest, Simulation};

use crate::arena::{Arena, ArenaTarget};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a ratio of integers.
///
/// Keeps test setup readable without reaching for float literals.
#[must_use]
pub fn fixed_ratio(numerator: i32, denominator: i32) -> Fixed {
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Unit vector along +X.
#[must_use]
pub fn forward_x() -> Vec3Fixed {
    Vec3Fixed::new(Fixed::ONE, Fixed::ZERO, Fixed::ZERO)
}

/// The reference projectile: `speed=100, radius=0.05, gravity=0,
/// time_to_live=1.5s, time_to_fade=0.5s`.
#[must_use]
pub fn standard_config() -> ProjectileConfig {
    ProjectileConfig::default()
}

/// A fire request from the origin along +X with the standard config.
#[must_use]
pub fn straight_shot(owner: u32) -> FireRequest {
    FireRequest {
        owner: ParticipantId(owner),
        config: standard_config(),
        position: Vec3Fixed::ZERO,
        facing: forward_x(),
        owner_velocity: Vec3Fixed::ZERO,
    }
}

/// An arena with one stationary damageable target on the +X axis.
#[must_use]
pub fn arena_with_target(entity: u64, distance: i32, radius: Fixed) -> Arena {
    let mut arena = Arena::new();
    arena.add_target(ArenaTarget::at(
        entity,
        Vec3Fixed::new(fixed(distance), Fixed::ZERO, Fixed::ZERO),
        radius,
    ));
    arena
}

/// A server simulation with one standard shot fired into an arena with
/// a target 10 units out. The shared baseline determinism scenario.
#[must_use]
pub fn standard_shot_scenario() -> (Simulation, Arena) {
    let mut sim = Simulation::new(Authority::Server);
    sim.fire(straight_shot(1)).expect("fixture fire refused");
    (sim, arena_with_target(100, 10, Fixed::ONE))
}

/// Strategy: a valid projectile config with varied but sane parameters.
pub fn arb_projectile_config() -> impl Strategy<Value = ProjectileConfig> {
    (
        1u32..=50,      // damage
        1i32..=200,     // speed
        1i32..=100,     // radius in hundredths
        -20i32..=0,     // gravity
        1i32..=4,       // time_to_live halves
        0i32..=4,       // time_to_fade halves
    )
        .prop_map(|(damage, speed, radius_hundredths, gravity, live_halves, fade_halves)| {
            ProjectileConfig {
                damage,
                speed: fixed(speed),
                radius: fixed_ratio(radius_hundredths, 100),
                gravity: fixed(gravity),
                time_to_live: fixed_ratio(live_halves, 2),
                time_to_fade: fixed_ratio(fade_halves, 2),
                owner_velocity_multiplier: Fixed::ONE,
                hit_mask: HitMask::ALL,
            }
        })
}

/// Strategy: a unit-ish launch direction that is never zero.
pub fn arb_facing() -> impl Strategy<Value = Vec3Fixed> {
    (-8i32..=8, -2i32..=2, -8i32..=8)
        .prop_filter("facing must be nonzero", |(x, y, z)| {
            *x != 0 || *y != 0 || *z != 0
        })
        .prop_map(|(x, y, z)| Vec3Fixed::new(fixed(x), fixed(y), fixed(z)).normalize())
}
