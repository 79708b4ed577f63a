//! Engine-level snapshot with BLAKE3 hashing.
//!
//! [`EngineSnapshot`] is a serializable capture of what a player can observe
//! of the controller: the tick, the tail generation's objects, the promise
//! ledger and the paradox/win flags, plus a BLAKE3 content hash used for
//! determinism testing and replay checkpoints.
//!
//! # Usage
//!
//! ```
//! use chronofork_engine::prelude::*;
//!
//! let level = Level::new("room", &["#####", "#...#", "#####"])
//!     .with(ObjectKind::Player, Snapshot::at(48.0, 48.0));
//!
//! let mut a = TemporalController::new(&level, EngineConfig::default()).unwrap();
//! let mut b = TemporalController::new(&level, EngineConfig::default()).unwrap();
//! for _ in 0..5 {
//!     a.step(&InputFrame::moving(1.0, 0.0)).unwrap();
//!     b.step(&InputFrame::moving(1.0, 0.0)).unwrap();
//! }
//!
//! let snapshot = a.capture_snapshot();
//! assert_eq!(snapshot.tick, 5);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//!
//! // Same level + same inputs = same hash.
//! assert_eq!(snapshot.hash, b.state_hash());
//! ```
//!
//! # What Is NOT Hashed
//!
//! - **Ancestor generations**: they are immutable once a child is pushed, so
//!   the tail and its depth already pin them down.
//! - **Histories and observation logs**: derived from the inputs that led to
//!   the current tick.
//! - **Journal, status line, diagnostics**: presentation only.

use chronofork_ledger::identity::Direction;
use chronofork_ledger::object::TemporalObject;
use serde::{Deserialize, Serialize};

use crate::controller::TemporalController;
use crate::promise::PromiseLedger;

// ---------------------------------------------------------------------------
// EngineSnapshot
// ---------------------------------------------------------------------------

/// A serializable capture of the controller's observable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Steps taken when the snapshot was captured.
    pub step: u64,
    pub tick: u64,
    pub depth: usize,
    pub direction: Direction,
    /// Tail objects in identity order.
    pub objects: Vec<TemporalObject>,
    pub promises: PromiseLedger,
    pub paradox: Option<String>,
    pub won: bool,
    /// BLAKE3 hex digest (64 lowercase hex chars) of everything above except
    /// the step counter.
    pub hash: String,
}

impl EngineSnapshot {
    /// Recompute the digest and compare it with the stored one.
    pub fn verify(&self) -> bool {
        compute_hash(&HashableState {
            tick: self.tick,
            depth: self.depth,
            direction: self.direction,
            objects: &self.objects,
            promises: &self.promises,
            paradox: self.paradox.as_deref(),
            won: self.won,
        }) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

/// Deterministic wrapper so the hash is stable across field reordering of
/// the public snapshot.
#[derive(Serialize)]
struct HashableState<'a> {
    tick: u64,
    depth: usize,
    direction: Direction,
    objects: &'a [TemporalObject],
    promises: &'a PromiseLedger,
    paradox: Option<&'a str>,
    won: bool,
}

fn compute_hash(state: &HashableState<'_>) -> String {
    let json_bytes = serde_json::to_vec(state)
        .expect("EngineSnapshot state should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// TemporalController snapshot methods
// ---------------------------------------------------------------------------

impl TemporalController {
    /// Capture the observable state and its BLAKE3 hash.
    pub fn capture_snapshot(&self) -> EngineSnapshot {
        let objects: Vec<TemporalObject> = self.tail().objects().cloned().collect();
        let hash = compute_hash(&HashableState {
            tick: self.tick(),
            depth: self.depth(),
            direction: self.direction(),
            objects: &objects,
            promises: self.promises(),
            paradox: self.paradox(),
            won: self.has_won(),
        });
        EngineSnapshot {
            step: self.steps(),
            tick: self.tick(),
            depth: self.depth(),
            direction: self.direction(),
            objects,
            promises: self.promises().clone(),
            paradox: self.paradox().map(str::to_owned),
            won: self.has_won(),
            hash,
        }
    }

    /// Compute the state hash without keeping the snapshot.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn level() -> Level {
        Level::new("room", &["#######", "#.....#", "#.....#", "#######"])
            .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
            .with(ObjectKind::Enemy, Snapshot::at(144.0, 80.0))
    }

    #[test]
    fn hash_is_hex_and_verifies() {
        let c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        let snapshot = c.capture_snapshot();
        assert_eq!(snapshot.hash.len(), 64);
        assert!(snapshot.hash.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert!(snapshot.verify());
    }

    #[test]
    fn tampering_breaks_verification() {
        let c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        let mut snapshot = c.capture_snapshot();
        snapshot.objects[0].state.position.x += 1.0;
        assert!(!snapshot.verify());
    }

    #[test]
    fn hash_changes_with_the_tick_but_not_with_pausing() {
        let mut c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        let before = c.state_hash();
        c.step(&InputFrame::pause()).unwrap();
        assert_eq!(c.state_hash(), before);
        c.step(&InputFrame::idle()).unwrap();
        assert_ne!(c.state_hash(), before);
    }

    #[test]
    fn scrubbing_back_restores_the_hash() {
        let mut c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        for _ in 0..4 {
            c.step(&InputFrame::moving(0.0, 1.0)).unwrap();
        }
        let at_four = c.state_hash();
        for _ in 0..3 {
            c.step(&InputFrame::moving(1.0, 0.0)).unwrap();
        }
        for _ in 0..3 {
            c.step(&InputFrame::rewind()).unwrap();
        }
        assert_eq!(c.tick(), 4);
        assert_eq!(c.state_hash(), at_four);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        let snapshot = c.capture_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: EngineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash, snapshot.hash);
        assert!(back.verify());
    }
}
