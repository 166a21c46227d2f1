//! Two-peer network harness.
//!
//! Drives a server simulation and a client simulation in lockstep and
//! models the replicated spawn path between them: the client predicts,
//! the server spawns authoritatively, and the authoritative state is
//! delivered to the client after a configurable delay, always at a
//! tick boundary, the way the real substrate serializes delivery.
//! Setting `drop_spawns` models a rejected or lost spawn, which is the
//! prediction-failure path.

use volley_core::events::TickEvents;
use volley_core::prediction::PredictionKey;
use volley_core::simulation::{Authority, FireRequest, FireResult, Simulation, SpawnArrival};

use crate::arena::Arena;

/// A replicated spawn on the wire.
#[derive(Debug, Clone, Copy)]
struct Delivery {
    /// Client tick at which the spawn arrives.
    due: u64,
    /// Reconciliation key it carries.
    key: PredictionKey,
    /// The authoritative instance on the server.
    server_entity: u64,
}

/// Report from one lockstep tick of both peers.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Spawns delivered to the client at this boundary.
    pub arrivals: Vec<SpawnArrival>,
    /// Server events for the tick.
    pub server_events: TickEvents,
    /// Client events for the tick.
    pub client_events: TickEvents,
}

/// Lockstep server+client pair with a scripted world on each side.
#[derive(Debug)]
pub struct NetSim {
    /// The authoritative peer.
    pub server: Simulation,
    /// The predicting peer.
    pub client: Simulation,
    /// Server-side collision world.
    pub server_world: Arena,
    /// Client-side collision world (same script in most tests).
    pub client_world: Arena,
    /// Ticks between the fire action and authoritative arrival.
    pub delivery_delay: u64,
    /// Drop every replicated spawn (prediction-failure scenarios).
    pub drop_spawns: bool,
    in_flight: Vec<Delivery>,
}

impl NetSim {
    /// Create a pair with identical empty worlds and the given delay.
    #[must_use]
    pub fn new(delivery_delay: u64) -> Self {
        Self::with_worlds(delivery_delay, Arena::new(), Arena::new())
    }

    /// Create a pair with explicit world scripts.
    #[must_use]
    pub fn with_worlds(delivery_delay: u64, server_world: Arena, client_world: Arena) -> Self {
        Self {
            server: Simulation::new(Authority::Server),
            client: Simulation::new(Authority::Client),
            server_world,
            client_world,
            delivery_delay,
            drop_spawns: false,
            in_flight: Vec::new(),
        }
    }

    /// Fire on both peers: predicted on the client, authoritative on the
    /// server, with the replicated spawn scheduled for later delivery.
    ///
    /// Returns `(predicted, authoritative)` fire results.
    ///
    /// # Panics
    ///
    /// Panics when either peer refuses the spawn; harness scripts fire
    /// at most once per participant per tick.
    pub fn fire(&mut self, request: FireRequest) -> (FireResult, FireResult) {
        let predicted = self.client.fire(request).expect("client fire refused");
        let authoritative = self.server.fire(request).expect("server fire refused");
        assert_eq!(
            predicted.key, authoritative.key,
            "peers disagree on the prediction key"
        );

        if !self.drop_spawns {
            self.in_flight.push(Delivery {
                due: self.client.current_tick() + self.delivery_delay,
                key: authoritative.key,
                server_entity: authoritative.entity,
            });
        }

        (predicted, authoritative)
    }

    /// Deliver every spawn due at the current client tick boundary.
    pub fn deliver_due(&mut self) -> Vec<SpawnArrival> {
        let now = self.client.current_tick();
        let mut arrivals = Vec::new();

        let mut remaining = Vec::with_capacity(self.in_flight.len());
        for delivery in self.in_flight.drain(..) {
            if delivery.due > now {
                remaining.push(delivery);
                continue;
            }
            // A spawn the server already retired just never arrives;
            // the client's prediction times out on its own.
            if let Ok(snapshot) = self.server.snapshot_projectile(delivery.server_entity) {
                arrivals.push(
                    self.client
                        .receive_authoritative_spawn(delivery.key, &snapshot),
                );
            }
        }
        self.in_flight = remaining;
        arrivals
    }

    /// One lockstep step: deliver due spawns, then tick both peers.
    pub fn step(&mut self) -> StepReport {
        let arrivals = self.deliver_due();
        let server_events = self.server.tick(&mut self.server_world);
        let client_events = self.client.tick(&mut self.client_world);
        StepReport {
            arrivals,
            server_events,
            client_events,
        }
    }

    /// Run `n` steps, returning the concatenated reports.
    pub fn step_n(&mut self, n: u64) -> Vec<StepReport> {
        (0..n).map(|_| self.step()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::straight_shot;

    #[test]
    fn test_peers_stay_tick_aligned() {
        let mut net = NetSim::new(3);
        net.step_n(5);
        assert_eq!(net.server.current_tick(), net.client.current_tick());
    }

    #[test]
    fn test_delivery_waits_for_delay() {
        let mut net = NetSim::new(3);
        net.fire(straight_shot(1));

        assert!(net.step().arrivals.is_empty());
        assert!(net.step().arrivals.is_empty());
        assert!(net.step().arrivals.is_empty());
        // Fourth boundary is tick 3: due
        assert_eq!(net.step().arrivals.len(), 1);
    }

    #[test]
    fn test_dropped_spawn_never_arrives() {
        let mut net = NetSim::new(3);
        net.drop_spawns = true;
        net.fire(straight_shot(1));

        for report in net.step_n(10) {
            assert!(report.arrivals.is_empty());
        }
    }
}
