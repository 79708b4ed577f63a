//! Behavior collaborators and the read-only world view they run against.
//!
//! A behavior is a plain function registered per [`ObjectKind`]. It receives
//! a [`WorldView`] of the tail timeline as it was *before* the tick, the
//! object being simulated and a [`CommandBuffer`] for side effects, and
//! returns the object's staged snapshot for the tick. Staged snapshots are
//! committed only after every active object has run, so behaviors never see
//! each other's output for the same tick.
//!
//! # Example
//!
//! ```
//! use chronofork_engine::behavior::{BehaviorRegistry, WorldView};
//! use chronofork_engine::command::CommandBuffer;
//! use chronofork_engine::TemporalError;
//! use chronofork_ledger::prelude::*;
//!
//! fn drift(
//!     _view: &WorldView<'_>,
//!     object: &TemporalObject,
//!     _cmds: &mut CommandBuffer,
//! ) -> Result<Snapshot, TemporalError> {
//!     let mut next = object.state.clone();
//!     next.position.x += 1.0;
//!     Ok(next)
//! }
//!
//! let mut registry = BehaviorRegistry::new();
//! registry.register(ObjectKind::Enemy, "drift", drift);
//! assert!(registry.contains(ObjectKind::Enemy));
//! assert!(!registry.contains(ObjectKind::Door));
//! ```

use std::collections::BTreeMap;

use chronofork_ledger::identity::{Direction, ObjectId};
use chronofork_ledger::kind::ObjectKind;
use chronofork_ledger::object::TemporalObject;
use chronofork_ledger::snapshot::Snapshot;
use chronofork_ledger::timeline::Timeline;

use crate::command::CommandBuffer;
use crate::config::EngineConfig;
use crate::input::InputFrame;
use crate::perception::{ObstructionGrid, Perception};
use crate::promise::PromiseLedger;
use crate::TemporalError;

// ---------------------------------------------------------------------------
// WorldView
// ---------------------------------------------------------------------------

/// Read access to the tail timeline while one tick is being played.
pub struct WorldView<'a> {
    pub timeline: &'a Timeline,
    /// The tick being played.
    pub tick: u64,
    pub input: &'a InputFrame,
    pub promises: &'a PromiseLedger,
    pub grid: &'a ObstructionGrid,
    pub perception: &'a dyn Perception,
    pub config: &'a EngineConfig,
}

impl<'a> WorldView<'a> {
    pub fn depth(&self) -> usize {
        self.timeline.depth()
    }

    pub fn direction(&self) -> Direction {
        self.timeline.direction()
    }

    pub fn controlled(&self) -> Option<&'a TemporalObject> {
        self.timeline.controlled().and_then(|id| self.timeline.get(id))
    }

    pub fn get(&self, id: ObjectId) -> Option<&'a TemporalObject> {
        self.timeline.get(id)
    }

    /// Objects of `kind` active at the tick being played.
    pub fn active_of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &'a TemporalObject> {
        let tick = self.tick;
        self.timeline
            .of_kind(kind)
            .filter(move |object| object.active_at(tick))
    }

    /// The committed snapshot of an object whose personal arrow of time
    /// opposes the tail's, when its history covers the tick.
    ///
    /// Such an object is seen running in reverse: left undisturbed, it
    /// retraces what it already did.
    pub fn reversed_replay(&self, object: &TemporalObject) -> Option<Snapshot> {
        if object.direction == self.direction() {
            return None;
        }
        self.timeline
            .history(object.id)
            .ok()
            .and_then(|h| h.read(self.tick).ok())
            .cloned()
    }

    /// Whether two circles overlap.
    pub fn overlaps(a: &Snapshot, ra: f64, b: &Snapshot, rb: f64) -> bool {
        a.position.distance(b.position) < ra + rb
    }
}

// ---------------------------------------------------------------------------
// BehaviorFn / BehaviorRegistry
// ---------------------------------------------------------------------------

/// Computes the staged snapshot of one object for one tick.
pub type BehaviorFn =
    fn(&WorldView<'_>, &TemporalObject, &mut CommandBuffer) -> Result<Snapshot, TemporalError>;

struct RegisteredBehavior {
    name: String,
    func: BehaviorFn,
}

/// One behavior per object kind. Kinds without a behavior keep their
/// snapshot unchanged from tick to tick.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: BTreeMap<ObjectKind, RegisteredBehavior>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if a behavior is already registered for `kind`.
    pub fn register(&mut self, kind: ObjectKind, name: &str, func: BehaviorFn) {
        if let Some(existing) = self.behaviors.get(&kind) {
            panic!(
                "a behavior for kind '{kind}' is already registered ('{}')",
                existing.name
            );
        }
        self.behaviors.insert(
            kind,
            RegisteredBehavior {
                name: name.to_owned(),
                func,
            },
        );
    }

    pub fn contains(&self, kind: ObjectKind) -> bool {
        self.behaviors.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Registered `(kind, name)` pairs in kind order.
    pub fn names(&self) -> Vec<(ObjectKind, &str)> {
        self.behaviors
            .iter()
            .map(|(kind, b)| (*kind, b.name.as_str()))
            .collect()
    }

    /// Run the behavior registered for the object's kind.
    pub fn run(
        &self,
        view: &WorldView<'_>,
        object: &TemporalObject,
        cmds: &mut CommandBuffer,
    ) -> Result<Snapshot, TemporalError> {
        match self.behaviors.get(&object.kind) {
            Some(b) => (b.func)(view, object, cmds),
            None => Ok(object.state.clone()),
        }
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.behaviors.iter().map(|(k, b)| (k, &b.name)))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
