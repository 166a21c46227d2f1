//! Key-based matching of predicted spawns to authoritative arrivals.
//!
//! A firing peer spawns a speculative projectile immediately and tags
//! the spawn request with a small key derived from `(participant,
//! tick)`. When the authoritative instance for that request arrives over
//! the network, the key matches it back to exactly one outstanding
//! predicted instance, which is then discarded in favor of the
//! authoritative one. If nothing arrives within the timeout window the
//! prediction has failed: the local instance is despawned and the miss
//! is logged, never retried.
//!
//! State machine per entry: `Predicted -> Confirmed | Failed`, terminal
//! in both outcomes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, ParticipantId};
use crate::error::{Result, SimError};

/// How long a predicted spawn waits for its authoritative counterpart
/// before being declared failed, in ticks (one second at 60 Hz).
pub const PREDICTION_TIMEOUT_TICKS: u64 = 60;

/// Matching key attached to a predicted spawn request.
///
/// Two bytes are enough: the owner byte separates participants firing
/// in the same tick, and the tick byte separates one participant's
/// consecutive shots. The 256-tick aliasing window is far wider than
/// the reconciliation window, so keys cannot collide while live. The
/// key is used only for matching and never persisted past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredictionKey {
    /// Low byte of the firing participant's raw id.
    pub owner: u8,
    /// Low byte of the fire tick.
    pub tick: u8,
}

impl PredictionKey {
    /// Build the key for a fire action by `owner` at tick `tick`.
    #[must_use]
    pub const fn new(owner: ParticipantId, tick: u64) -> Self {
        Self {
            owner: owner.low_byte(),
            tick: (tick & 0xFF) as u8,
        }
    }
}

/// One outstanding predicted spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PendingSpawn {
    /// The locally spawned predicted instance.
    entity: EntityId,
    /// Tick at which the prediction is declared failed.
    deadline: u64,
}

/// Ledger of predicted spawns still waiting for confirmation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionLedger {
    pending: HashMap<PredictionKey, PendingSpawn>,
}

impl PredictionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicted spawn under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidState`] if the key is already live;
    /// two predicted spawns from one participant in one tick cannot be
    /// told apart at confirmation time, so the second is refused.
    pub fn register(&mut self, key: PredictionKey, entity: EntityId, now: u64) -> Result<()> {
        if self.pending.contains_key(&key) {
            return Err(SimError::InvalidState(format!(
                "prediction key {key:?} already has an outstanding spawn"
            )));
        }
        self.pending.insert(
            key,
            PendingSpawn {
                entity,
                deadline: now + PREDICTION_TIMEOUT_TICKS,
            },
        );
        Ok(())
    }

    /// Match an arriving authoritative spawn against the ledger.
    ///
    /// On a match the entry is removed (terminal) and the predicted
    /// instance's id is returned so the caller can discard it. Returns
    /// `None` on peers that never predicted this spawn, or when the
    /// prediction already timed out.
    pub fn confirm(&mut self, key: PredictionKey) -> Option<EntityId> {
        self.pending.remove(&key).map(|entry| entry.entity)
    }

    /// Collect and remove every entry whose deadline has passed.
    ///
    /// Returned in key order so the caller's despawn sequence is
    /// deterministic.
    pub fn expire(&mut self, now: u64) -> Vec<(PredictionKey, EntityId)> {
        let mut expired: Vec<(PredictionKey, EntityId)> = self
            .pending
            .iter()
            .filter(|(_, entry)| now >= entry.deadline)
            .map(|(key, entry)| (*key, entry.entity))
            .collect();
        expired.sort_unstable_by_key(|(key, _)| *key);

        for (key, _) in &expired {
            self.pending.remove(key);
        }
        expired
    }

    /// Number of outstanding predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_differ_across_participants_same_tick() {
        let a = PredictionKey::new(ParticipantId(1), 500);
        let b = PredictionKey::new(ParticipantId(2), 500);
        assert_ne!(a, b);
        assert_eq!(a.tick, b.tick);
    }

    #[test]
    fn test_keys_differ_across_ticks_same_participant() {
        let a = PredictionKey::new(ParticipantId(1), 500);
        let b = PredictionKey::new(ParticipantId(1), 501);
        assert_ne!(a, b);
    }

    #[test]
    fn test_confirm_matches_exactly_once() {
        let mut ledger = PredictionLedger::new();
        let key = PredictionKey::new(ParticipantId(3), 10);
        ledger.register(key, 77, 10).unwrap();

        assert_eq!(ledger.confirm(key), Some(77));
        // Terminal: a second confirmation finds nothing
        assert_eq!(ledger.confirm(key), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_register_rejects_live_duplicate() {
        let mut ledger = PredictionLedger::new();
        let key = PredictionKey::new(ParticipantId(3), 10);
        ledger.register(key, 1, 10).unwrap();
        assert!(ledger.register(key, 2, 10).is_err());
    }

    #[test]
    fn test_expire_honors_deadline() {
        let mut ledger = PredictionLedger::new();
        let key = PredictionKey::new(ParticipantId(1), 100);
        ledger.register(key, 5, 100).unwrap();

        assert!(ledger.expire(100 + PREDICTION_TIMEOUT_TICKS - 1).is_empty());

        let expired = ledger.expire(100 + PREDICTION_TIMEOUT_TICKS);
        assert_eq!(expired, vec![(key, 5)]);
        assert!(ledger.is_empty());

        // Terminal: expiring again yields nothing
        assert!(ledger.expire(u64::MAX).is_empty());
    }

    #[test]
    fn test_expire_order_is_deterministic() {
        let mut ledger = PredictionLedger::new();
        let keys: Vec<PredictionKey> = (0..8u32)
            .map(|p| PredictionKey::new(ParticipantId(p), 0))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            ledger.register(*key, i as EntityId, 0).unwrap();
        }

        let expired = ledger.expire(PREDICTION_TIMEOUT_TICKS);
        let order: Vec<PredictionKey> = expired.iter().map(|(k, _)| *k).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
        assert_eq!(expired.len(), keys.len());
    }
}
