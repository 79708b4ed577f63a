//! Cross-timeline commitments.
//!
//! A [`Promise`] states that a target object will be absent from (or dead
//! in) the world. It is made at an origin `(depth, tick)` and stays
//! *pending* until a later timeline running the opposite way crosses the
//! origin tick; from then on it is *binding*. Behaviors consume promises
//! through [`PromiseLedger::is_pending`] and [`PromiseLedger::is_binding`].

use chronofork_ledger::identity::{Direction, ObjectId};
use chronofork_ledger::timeline::Timeline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromiseKind {
    /// The target must stay out of sight.
    Absence,
    /// The target must end up dead.
    Death,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promise {
    pub origin_depth: usize,
    pub origin_tick: u64,
    pub target: ObjectId,
    pub kind: PromiseKind,
    /// Depth of the timeline in which the origin was crossed the opposite
    /// way. `None` while pending.
    pub activated: Option<usize>,
}

impl Promise {
    pub fn new(origin_depth: usize, origin_tick: u64, target: ObjectId, kind: PromiseKind) -> Self {
        Self {
            origin_depth,
            origin_tick,
            target,
            kind,
            activated: None,
        }
    }

    pub fn origin_direction(&self) -> Direction {
        Direction::for_depth(self.origin_depth)
    }

    pub fn is_pending(&self) -> bool {
        self.activated.is_none()
    }
}

/// Every outstanding promise, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromiseLedger {
    promises: Vec<Promise>,
}

impl PromiseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, promise: Promise) {
        self.promises.push(promise);
    }

    pub fn len(&self) -> usize {
        self.promises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promises.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Promise> {
        self.promises.iter()
    }

    pub fn clear(&mut self) {
        self.promises.clear();
    }

    /// A promise of this kind on `target` exists and has not been activated.
    pub fn is_pending(&self, target: ObjectId, kind: PromiseKind) -> bool {
        self.promises
            .iter()
            .any(|p| p.target == target && p.kind == kind && p.is_pending())
    }

    /// A promise of this kind on `target` has been activated.
    pub fn is_binding(&self, target: ObjectId, kind: PromiseKind) -> bool {
        self.promises
            .iter()
            .any(|p| p.target == target && p.kind == kind && !p.is_pending())
    }

    /// Activate every pending promise whose origin tick is being played by
    /// `timeline` against the origin's direction, provided the target exists
    /// there. Returns how many were activated.
    pub fn activate_crossings(&mut self, timeline: &Timeline, tick: u64) -> usize {
        let direction = timeline.direction();
        let mut activated = 0;
        for promise in &mut self.promises {
            if promise.is_pending()
                && promise.origin_tick == tick
                && promise.origin_direction() != direction
                && timeline.contains(promise.target)
            {
                promise.activated = Some(timeline.depth());
                activated += 1;
            }
        }
        activated
    }

    /// Drop promises made in the timeline at `depth` whose origin tick now
    /// lies ahead of `tick` after a rewind in `direction`.
    pub fn discard_rewound(&mut self, depth: usize, tick: u64, direction: Direction) -> usize {
        let before = self.promises.len();
        self.promises
            .retain(|p| !(p.origin_depth == depth && direction.is_behind(tick, p.origin_tick)));
        before - self.promises.len()
    }

    /// Reconcile with a stack cut back to `depth`: activations recorded in
    /// deeper timelines are undone and promises made there are deleted.
    pub fn rewind_to_depth(&mut self, depth: usize) {
        self.promises.retain(|p| p.origin_depth <= depth);
        for promise in &mut self.promises {
            if promise.activated.is_some_and(|d| d > depth) {
                promise.activated = None;
            }
        }
    }
}
