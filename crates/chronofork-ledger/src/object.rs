//! Simulated objects and their lifetime bookkeeping.
//!
//! A [`TemporalObject`] carries a current and a staged snapshot, a
//! [`Lifetime`] window in tick space and an `[initial_timeline,
//! final_timeline?]` window in timeline-depth space. The lifetime decides
//! whether the object exists at a given tick; the depth window decides in
//! which generations this instance is live.

use serde::{Deserialize, Serialize};

use crate::identity::{Direction, ObjectId};
use crate::kind::ObjectKind;
use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Lifetime
// ---------------------------------------------------------------------------

/// Tick window `[beginning, ending?]` in which an object exists.
///
/// A forwards object is born at `beginning` and stays open-ended until
/// `ending` is set. A backwards object is born at `ending` and its
/// `beginning` stays at 0 until its life is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub beginning: u64,
    pub ending: Option<u64>,
}

impl Lifetime {
    /// Open from tick 0 onwards; used for level objects.
    pub const ALWAYS: Lifetime = Lifetime {
        beginning: 0,
        ending: None,
    };

    /// Lifetime of an object born at `tick` whose personal time runs in
    /// `direction`.
    pub fn born_at(tick: u64, direction: Direction) -> Self {
        match direction {
            Direction::Forwards => Lifetime {
                beginning: tick,
                ending: None,
            },
            Direction::Backwards => Lifetime {
                beginning: 0,
                ending: Some(tick),
            },
        }
    }

    /// `tick >= beginning && (no ending || tick <= ending)`.
    #[inline]
    pub fn active_at(&self, tick: u64) -> bool {
        tick >= self.beginning && self.ending.map_or(true, |end| tick <= end)
    }

    /// Tick at which an object travelling in `direction` came into being.
    pub fn birth(&self, direction: Direction) -> Option<u64> {
        match direction {
            Direction::Forwards => Some(self.beginning),
            Direction::Backwards => self.ending,
        }
    }

    /// Close the window at `tick` on the side the object is travelling
    /// towards. Closing never extends an already closed window.
    pub fn close(&mut self, tick: u64, direction: Direction) {
        match direction {
            Direction::Forwards => {
                self.ending = Some(self.ending.map_or(tick, |end| end.min(tick)));
            }
            Direction::Backwards => {
                self.beginning = self.beginning.max(tick);
            }
        }
    }

    /// Undo a [`close`](Self::close) on the given side.
    pub fn reopen(&mut self, direction: Direction) {
        match direction {
            Direction::Forwards => self.ending = None,
            Direction::Backwards => self.beginning = 0,
        }
    }

    /// Shrink the window so it lies inside `[first, last]`.
    ///
    /// A recorded object is replayed from history, so it can never be
    /// active at a tick its history does not cover.
    pub fn clamp(&mut self, first: u64, last: u64) {
        self.beginning = self.beginning.max(first);
        self.ending = Some(self.ending.map_or(last, |end| end.min(last)));
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::ALWAYS
    }
}

// ---------------------------------------------------------------------------
// TemporalObject
// ---------------------------------------------------------------------------

/// One simulated individual within a timeline generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Snapshot at the current tick.
    pub state: Snapshot,
    /// Snapshot staged by the last behavior run.
    pub next: Snapshot,
    pub lifetime: Lifetime,
    /// Depth of the generation that introduced this instance.
    pub initial_timeline: usize,
    /// Last depth at which the instance was live; set when a fork hands
    /// control to a successor.
    pub final_timeline: Option<usize>,
    /// Personal arrow of time.
    pub direction: Direction,
    /// Motion is replayed from history instead of simulated.
    pub recorded: bool,
    /// Containers only. Not stored in history; rederived after an abandon.
    pub occupant: Option<ObjectId>,
}

impl TemporalObject {
    /// A live forwards object present since tick 0 in the root generation.
    pub fn new(id: ObjectId, kind: ObjectKind, state: Snapshot) -> Self {
        Self {
            id,
            kind,
            next: state.clone(),
            state,
            lifetime: Lifetime::ALWAYS,
            initial_timeline: 1,
            final_timeline: None,
            direction: Direction::Forwards,
            recorded: false,
            occupant: None,
        }
    }

    #[inline]
    pub fn active_at(&self, tick: u64) -> bool {
        self.lifetime.active_at(tick)
    }

    /// Tick at which this instance came into being.
    pub fn birth(&self) -> Option<u64> {
        self.lifetime.birth(self.direction)
    }

    /// Replace both the current and the staged snapshot.
    pub fn set_state(&mut self, state: Snapshot) {
        self.next = state.clone();
        self.state = state;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
