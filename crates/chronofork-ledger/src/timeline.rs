//! One generation of the simulated world.
//!
//! A [`Timeline`] owns every object of its generation, each object's
//! [`HistoryBuffer`] of snapshots, the observation frames of its players and
//! a per-kind index that fixes the per-tick processing order. Objects refer to
//! each other only through [`ObjectId`]s, so deriving a child generation with
//! [`Timeline::fork`] is a plain deep copy.
//!
//! # Example
//!
//! ```
//! use chronofork_ledger::prelude::*;
//!
//! let mut root = Timeline::root();
//! let player = root.spawn(ObjectKind::Player, Snapshot::at(16.0, 16.0), 0, Direction::Forwards);
//! root.set_controlled(player);
//!
//! let child = root.fork(0).unwrap();
//! assert_eq!(child.depth(), 2);
//! assert_eq!(child.direction(), Direction::Backwards);
//! assert_eq!(child.breakpoint(), 0);
//! assert!(child.contains(player));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::history::HistoryBuffer;
use crate::identity::{Direction, ObjectId};
use crate::kind::ObjectKind;
use crate::object::{Lifetime, TemporalObject};
use crate::snapshot::{ObservationFrame, Snapshot};
use crate::LedgerError;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// A generation: objects, their histories and their observation frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Position in the timeline stack; the root has depth 1.
    depth: usize,
    /// Tick at which this generation branched from its parent.
    breakpoint: u64,
    objects: BTreeMap<ObjectId, TemporalObject>,
    histories: BTreeMap<ObjectId, HistoryBuffer<Snapshot>>,
    observations: BTreeMap<ObjectId, HistoryBuffer<ObservationFrame>>,
    /// Object ids grouped by [`ObjectKind::tick_rank`].
    by_kind: BTreeMap<usize, BTreeSet<ObjectId>>,
    /// Next identity to hand out. Inherited by child generations.
    next_id: u32,
    /// The player the user currently controls in this generation.
    controlled: Option<ObjectId>,
}

impl Timeline {
    /// An empty root generation (depth 1, breakpoint 0).
    pub fn root() -> Self {
        Self {
            depth: 1,
            breakpoint: 0,
            objects: BTreeMap::new(),
            histories: BTreeMap::new(),
            observations: BTreeMap::new(),
            by_kind: BTreeMap::new(),
            next_id: 0,
            controlled: None,
        }
    }

    // -- metadata -----------------------------------------------------------

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn breakpoint(&self) -> u64 {
        self.breakpoint
    }

    /// Direction of this generation, from stack-depth parity.
    pub fn direction(&self) -> Direction {
        Direction::for_depth(self.depth)
    }

    pub fn controlled(&self) -> Option<ObjectId> {
        self.controlled
    }

    pub fn set_controlled(&mut self, id: ObjectId) {
        self.controlled = Some(id);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // -- identity -----------------------------------------------------------

    /// Reserve a fresh identity.
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The identity the next allocation will return.
    pub fn peek_next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    // -- insertion / removal --------------------------------------------------

    /// Create an object born at `tick` in this generation and seed its
    /// history with `state`.
    pub fn spawn(
        &mut self,
        kind: ObjectKind,
        state: Snapshot,
        tick: u64,
        direction: Direction,
    ) -> ObjectId {
        let id = self.allocate_id();
        let mut object = TemporalObject::new(id, kind, state);
        object.lifetime = Lifetime::born_at(tick, direction);
        object.direction = direction;
        object.initial_timeline = self.depth;
        let history = HistoryBuffer::seeded(tick, object.state.clone());
        self.insert(object, history);
        id
    }

    /// Insert a fully built object together with its history buffer.
    ///
    /// An object already present under the same id is replaced.
    pub fn insert(&mut self, object: TemporalObject, history: HistoryBuffer<Snapshot>) {
        let id = object.id;
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
        if let Some(previous) = self.objects.get(&id) {
            let rank = previous.kind.tick_rank();
            if let Some(ids) = self.by_kind.get_mut(&rank) {
                ids.remove(&id);
            }
        }
        self.by_kind
            .entry(object.kind.tick_rank())
            .or_default()
            .insert(id);
        self.objects.insert(id, object);
        self.histories.insert(id, history);
    }

    /// Remove an object and everything recorded about it.
    pub fn remove(&mut self, id: ObjectId) -> Option<TemporalObject> {
        let object = self.objects.remove(&id)?;
        if let Some(ids) = self.by_kind.get_mut(&object.kind.tick_rank()) {
            ids.remove(&id);
        }
        self.histories.remove(&id);
        self.observations.remove(&id);
        if self.controlled == Some(id) {
            self.controlled = None;
        }
        Some(object)
    }

    // -- lookup -------------------------------------------------------------

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&TemporalObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut TemporalObject> {
        self.objects.get_mut(&id)
    }

    /// Like [`get`](Self::get), but a missing object is an error.
    pub fn object(&self, id: ObjectId) -> Result<&TemporalObject, LedgerError> {
        self.objects.get(&id).ok_or(LedgerError::UnknownObject {
            id,
            depth: self.depth,
        })
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut TemporalObject, LedgerError> {
        let depth = self.depth;
        self.objects
            .get_mut(&id)
            .ok_or(LedgerError::UnknownObject { id, depth })
    }

    /// All objects in identity order.
    pub fn objects(&self) -> impl Iterator<Item = &TemporalObject> + '_ {
        self.objects.values()
    }

    /// Identities in per-tick processing order: by kind rank, then by id.
    pub fn ids_in_tick_order(&self) -> Vec<ObjectId> {
        self.by_kind
            .values()
            .flat_map(|ids| ids.iter().copied())
            .collect()
    }

    /// Objects active at `tick`, in processing order.
    pub fn active_at(&self, tick: u64) -> impl Iterator<Item = &TemporalObject> + '_ {
        self.by_kind
            .values()
            .flat_map(|ids| ids.iter())
            .filter_map(move |id| self.objects.get(id))
            .filter(move |obj| obj.active_at(tick))
    }

    /// Objects of exactly `kind`, in id order.
    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &TemporalObject> + '_ {
        self.by_kind
            .get(&kind.tick_rank())
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(move |id| self.objects.get(id))
    }

    // -- history ------------------------------------------------------------

    pub fn history(&self, id: ObjectId) -> Result<&HistoryBuffer<Snapshot>, LedgerError> {
        self.histories.get(&id).ok_or(LedgerError::MissingHistory {
            id,
            depth: self.depth,
        })
    }

    /// Write `snapshot` into the history of `id` at `tick`.
    pub fn record_history(
        &mut self,
        id: ObjectId,
        tick: u64,
        snapshot: Snapshot,
    ) -> Result<(), LedgerError> {
        let depth = self.depth;
        let history = self
            .histories
            .get_mut(&id)
            .ok_or(LedgerError::MissingHistory { id, depth })?;
        history
            .record(tick, snapshot)
            .map_err(|source| LedgerError::History { id, source })
    }

    /// Read the history of `id` at `tick`.
    pub fn history_at(&self, id: ObjectId, tick: u64) -> Result<&Snapshot, LedgerError> {
        self.history(id)?
            .read(tick)
            .map_err(|source| LedgerError::History { id, source })
    }

    // -- observations -------------------------------------------------------

    pub fn observations(&self, id: ObjectId) -> Option<&HistoryBuffer<ObservationFrame>> {
        self.observations.get(&id)
    }

    /// Store the frame a player perceived at `tick`.
    ///
    /// The first frame of a player may start at any tick; later frames must
    /// keep the log contiguous.
    pub fn record_observation(
        &mut self,
        id: ObjectId,
        tick: u64,
        frame: ObservationFrame,
    ) -> Result<(), LedgerError> {
        match self.observations.get_mut(&id) {
            Some(log) => log
                .record(tick, frame)
                .map_err(|source| LedgerError::History { id, source }),
            None => {
                self.observations
                    .insert(id, HistoryBuffer::seeded(tick, frame));
                Ok(())
            }
        }
    }

    // -- forking ------------------------------------------------------------

    /// Derive the child generation branching at `at_tick`.
    ///
    /// Every object is deep-copied. Recorded objects keep their whole
    /// history; the history of a simulated object is cut at the fork point
    /// whenever it covers it, dropping the side that lies beyond the fork in
    /// this generation's direction, because that future was never committed.
    pub fn fork(&self, at_tick: u64) -> Result<Timeline, LedgerError> {
        let mut histories = BTreeMap::new();
        for (id, history) in &self.histories {
            histories.insert(*id, self.cut(*id, history, at_tick)?);
        }

        let mut observations = BTreeMap::new();
        for (id, log) in &self.observations {
            observations.insert(*id, self.cut(*id, log, at_tick)?);
        }

        trace!(
            parent_depth = self.depth,
            at_tick,
            objects = self.objects.len(),
            "forked timeline generation"
        );

        Ok(Timeline {
            depth: self.depth + 1,
            breakpoint: at_tick,
            objects: self.objects.clone(),
            histories,
            observations,
            by_kind: self.by_kind.clone(),
            next_id: self.next_id,
            controlled: self.controlled,
        })
    }

    fn cut<T: Clone>(
        &self,
        id: ObjectId,
        buffer: &HistoryBuffer<T>,
        at_tick: u64,
    ) -> Result<HistoryBuffer<T>, LedgerError> {
        let recorded = self.objects.get(&id).is_some_and(|o| o.recorded);
        if recorded || !buffer.covers(at_tick) {
            return Ok(buffer.carry(at_tick));
        }
        let copy = match self.direction() {
            Direction::Forwards => buffer.fork(at_tick),
            Direction::Backwards => buffer.fork_reversed(at_tick),
        };
        copy.map_err(|source| LedgerError::History { id, source })
    }

    /// Remove transient objects whose whole lifetime window lies behind
    /// `at_tick` relative to this generation's direction. They can never be
    /// reached on this branch. A forwards generation also drops rederived
    /// markers born after `at_tick`, since it decides their cause again.
    ///
    /// Returns the removed identities.
    pub fn purge_unreachable_transients(&mut self, at_tick: u64) -> Vec<ObjectId> {
        let direction = self.direction();
        let doomed: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|obj| obj.kind.is_transient())
            .filter(|obj| match direction {
                Direction::Backwards => obj.lifetime.beginning > at_tick,
                Direction::Forwards => {
                    obj.lifetime.ending.is_some_and(|end| end < at_tick)
                        || (obj.kind.is_rederived() && obj.lifetime.beginning > at_tick)
                }
            })
            .map(|obj| obj.id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
