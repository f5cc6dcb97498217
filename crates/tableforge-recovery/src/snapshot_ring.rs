//! A bounded per-interaction ring of state snapshots, used to roll back
//! when state corruption or validation failures are detected.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tableforge_protocol::{GameState, Snapshot, DEFAULT_SNAPSHOT_CAPACITY};

use crate::error::RecoveryError;

pub struct SnapshotRing {
    capacity: usize,
    entries: VecDeque<Snapshot>,
}

impl Default for SnapshotRing {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CAPACITY)
    }
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Records a snapshot, evicting the oldest entry once `capacity` is
    /// exceeded.
    pub fn push(&mut self, state: GameState, taken_at: DateTime<Utc>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Snapshot { state, taken_at });
    }

    /// The newest snapshot taken strictly before `before`.
    pub fn newest_before(&self, before: DateTime<Utc>) -> Result<&Snapshot, RecoveryError> {
        self.entries
            .iter()
            .rev()
            .find(|s| s.taken_at < before)
            .ok_or(RecoveryError::NoSnapshotAvailable)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tableforge_protocol::{InteractionId, InteractionStatus, MapState};

    fn state() -> GameState {
        GameState {
            interaction_id: InteractionId::new("int-1"),
            status: InteractionStatus::Active,
            initiative_order: vec![],
            current_turn_index: 0,
            round_number: 1,
            participants: vec![],
            map_state: MapState { width: 10, height: 10, entities: vec![], obstacles: vec![], terrain: vec![] },
            turn_history: vec![],
            chat_log: vec![],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_newest_before_on_empty_ring_fails() {
        let ring = SnapshotRing::new(10);
        assert!(matches!(ring.newest_before(Utc::now()), Err(RecoveryError::NoSnapshotAvailable)));
    }

    #[test]
    fn test_push_then_newest_before_returns_it() {
        let mut ring = SnapshotRing::new(10);
        let t0 = Utc::now();
        ring.push(state(), t0);
        let found = ring.newest_before(t0 + Duration::seconds(1)).unwrap();
        assert_eq!(found.taken_at, t0);
    }

    #[test]
    fn test_newest_before_excludes_snapshots_not_strictly_older() {
        let mut ring = SnapshotRing::new(10);
        let t0 = Utc::now();
        ring.push(state(), t0);
        assert!(matches!(ring.newest_before(t0), Err(RecoveryError::NoSnapshotAvailable)));
    }

    #[test]
    fn test_push_evicts_oldest_once_capacity_exceeded() {
        let mut ring = SnapshotRing::new(2);
        let t0 = Utc::now();
        ring.push(state(), t0);
        ring.push(state(), t0 + Duration::seconds(1));
        ring.push(state(), t0 + Duration::seconds(2));
        assert_eq!(ring.len(), 2);

        let newest = ring.newest_before(t0 + Duration::seconds(3)).unwrap();
        assert_eq!(newest.taken_at, t0 + Duration::seconds(2));

        // the original t0 snapshot was evicted, so nothing matches before t0 + 1s
        assert!(ring.newest_before(t0 + Duration::seconds(1)).is_err());
    }

    #[test]
    fn test_default_capacity_matches_protocol_constant() {
        let ring = SnapshotRing::default();
        assert_eq!(ring.capacity, DEFAULT_SNAPSHOT_CAPACITY);
    }
}
