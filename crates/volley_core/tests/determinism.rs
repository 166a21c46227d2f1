//! Determinism and invariant tests.
//!
//! These pin the properties the predicted simulation depends on: two
//! executions of the same tick produce identical state, destruction is
//! monotonic, and lifetime bounds hold for arbitrary valid configs.

use proptest::prelude::*;

use volley_core::actor::{PredictedActor, SpawnKind};
use volley_core::math::{Fixed, Vec3Fixed};
use volley_core::seeker::SeekerConfig;
use volley_core::simulation::{Authority, FireRequest, Simulation};
use volley_core::tick::ticks_from_seconds;

use volley_test_utils::arena::{Arena, ArenaTarget};
use volley_test_utils::determinism::{run_parallel, run_repeated};
use volley_test_utils::fixtures::{
    arb_facing, arb_projectile_config, arena_with_target, fixed, standard_shot_scenario,
    straight_shot,
};

#[test]
fn repeated_runs_produce_identical_hashes() {
    run_repeated(8, 150, standard_shot_scenario).assert_deterministic();
}

#[test]
fn parallel_runs_produce_identical_hashes() {
    run_parallel(8, 150, standard_shot_scenario).assert_deterministic();
}

#[test]
fn mixed_actor_scenario_is_deterministic() {
    run_repeated(4, 200, || {
        let mut sim = Simulation::new(Authority::Server);
        sim.fire(straight_shot(1)).unwrap();
        sim.fire(straight_shot(2)).unwrap();
        sim.spawn_seeker(
            SpawnKind::Authoritative,
            SeekerConfig::default(),
            Vec3Fixed::new(fixed(20), Fixed::ZERO, Fixed::ZERO),
            Some(100),
        );
        (sim, arena_with_target(100, 10, Fixed::ONE))
    })
    .assert_deterministic();
}

/// Rollback purity: restoring a snapshot and replaying the same ticks
/// against the same world reproduces the exact state, including a hit
/// that lands mid-replay.
#[test]
fn rollback_replay_reproduces_a_hit() {
    let (mut sim, mut arena) = standard_shot_scenario();

    for _ in 0..3 {
        sim.tick(&mut arena);
    }
    let sim_snapshot = sim.serialize().unwrap();
    let arena_snapshot = arena.clone();

    for _ in 0..30 {
        sim.tick(&mut arena);
    }
    let hash_ahead = sim.state_hash();
    let damage_ahead = arena.damage_log.clone();

    let mut replay_sim = Simulation::deserialize(&sim_snapshot).unwrap();
    let mut replay_arena = arena_snapshot;
    for _ in 0..30 {
        replay_sim.tick(&mut replay_arena);
    }

    assert_eq!(replay_sim.state_hash(), hash_ahead);
    assert_eq!(replay_arena.damage_log, damage_ahead);
}

proptest! {
    /// Determinism over arbitrary valid configs and facings: two
    /// independent executions agree tick for tick.
    #[test]
    fn arbitrary_shot_is_deterministic(
        config in arb_projectile_config(),
        facing in arb_facing(),
        ticks in 1u64..200,
    ) {
        let run = || {
            let mut sim = Simulation::new(Authority::Server);
            sim.fire(FireRequest {
                owner: volley_core::components::ParticipantId(1),
                config,
                position: Vec3Fixed::ZERO,
                facing,
                owner_velocity: Vec3Fixed::ZERO,
            }).unwrap();
            let mut arena = arena_with_target(42, 10, Fixed::ONE);
            for _ in 0..ticks {
                sim.tick(&mut arena);
            }
            (sim.state_hash(), arena.damage_log.len())
        };

        let (hash_a, damage_a) = run();
        let (hash_b, damage_b) = run();
        prop_assert_eq!(hash_a, hash_b);
        prop_assert_eq!(damage_a, damage_b);
    }

    /// Monotonic destruction: once destroyed, an actor never reports
    /// undestroyed again for the rest of its life, and at most one
    /// detonation event is ever emitted for it.
    #[test]
    fn destruction_is_monotonic(
        config in arb_projectile_config(),
        facing in arb_facing(),
    ) {
        let mut sim = Simulation::new(Authority::Server);
        let result = sim.fire(FireRequest {
            owner: volley_core::components::ParticipantId(1),
            config,
            position: Vec3Fixed::ZERO,
            facing,
            owner_velocity: Vec3Fixed::ZERO,
        }).unwrap();

        let mut arena = arena_with_target(42, 5, Fixed::ONE);
        let mut seen_destroyed = false;
        let mut detonations = 0usize;

        loop {
            let events = sim.tick(&mut arena);
            detonations += events.detonations.len();

            match sim.get(result.entity) {
                Some(actor) => {
                    if seen_destroyed {
                        prop_assert!(actor.destroyed(), "destroyed flag reset");
                    }
                    seen_destroyed |= actor.destroyed();
                }
                None => break,
            }
        }

        prop_assert!(detonations <= 1);
    }

    /// Lifetime bounds: despawned exactly at the life deadline, never
    /// destroyed before the fade deadline absent an impact.
    #[test]
    fn lifetime_bounds_hold_without_impact(
        config in arb_projectile_config(),
        facing in arb_facing(),
    ) {
        let fade_at = ticks_from_seconds(config.time_to_live);
        let life_at = ticks_from_seconds(config.time_to_live + config.time_to_fade);

        let mut sim = Simulation::new(Authority::Server);
        let result = sim.fire(FireRequest {
            owner: volley_core::components::ParticipantId(1),
            config,
            position: Vec3Fixed::ZERO,
            facing,
            owner_velocity: Vec3Fixed::ZERO,
        }).unwrap();

        // Empty world: nothing to hit
        let mut arena = Arena::new();

        for now in 0..=life_at {
            let events = sim.tick(&mut arena);
            let alive = sim.get(result.entity).is_some();

            if now < fade_at {
                prop_assert!(alive);
                prop_assert!(!sim.get(result.entity).unwrap().destroyed(),
                    "destroyed early at tick {}", now);
            }
            if now < life_at {
                prop_assert!(alive, "despawned early at tick {}", now);
            } else {
                prop_assert!(events.despawned.contains(&result.entity));
                prop_assert!(!alive);
            }
        }
    }

    /// Self-exclusion holds for arbitrary configs: the owner's hitbox on
    /// the flight path never takes damage.
    #[test]
    fn owner_never_damaged(
        config in arb_projectile_config(),
        facing in arb_facing(),
    ) {
        let shooter = volley_core::components::ParticipantId(9);
        let mut arena = Arena::new();
        arena.add_target(
            ArenaTarget::at(1, Vec3Fixed::ZERO, Fixed::from_num(2)).with_owner(shooter),
        );

        let mut sim = Simulation::new(Authority::Server);
        sim.fire(FireRequest {
            owner: shooter,
            config,
            position: Vec3Fixed::ZERO,
            facing,
            owner_velocity: Vec3Fixed::ZERO,
        }).unwrap();

        for _ in 0..=ticks_from_seconds(config.time_to_live + config.time_to_fade) {
            sim.tick(&mut arena);
        }

        prop_assert_eq!(arena.damage_count(1), 0);
    }
}
