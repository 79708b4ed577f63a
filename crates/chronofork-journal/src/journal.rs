//! Temporal event journal.
//!
//! The [`TemporalJournal`] records one [`TemporalEvent`] per notable
//! occurrence in the temporal engine: a timeline fork, an abandon, a time
//! boundary notice, a paradox, a win, a restart, or a notice raised by a
//! behavior collaborator. Each entry carries the engine step counter, the
//! tick and the stack depth at which it happened.
//!
//! # Query API
//!
//! - **Depth**: [`TemporalJournal::events_at_depth`]
//! - **Kind**: [`TemporalJournal::forks`], [`TemporalJournal::abandons`],
//!   [`TemporalJournal::paradoxes`]
//! - **Recency**: [`TemporalJournal::since_step`],
//!   [`TemporalJournal::last_paradox`]
//!
//! # Example
//!
//! ```
//! use chronofork_journal::journal::{EventKind, TemporalEvent, TemporalJournal};
//! use chronofork_ledger::identity::ObjectId;
//!
//! let mut journal = TemporalJournal::new();
//! journal.record(TemporalEvent {
//!     step: 12,
//!     tick: 12,
//!     depth: 1,
//!     kind: EventKind::Forked {
//!         at_tick: 12,
//!         new_depth: 2,
//!         predecessor: ObjectId(0),
//!         successor: ObjectId(5),
//!     },
//! });
//!
//! assert_eq!(journal.len(), 1);
//! assert_eq!(journal.forks().count(), 1);
//! ```

use chronofork_ledger::identity::ObjectId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new timeline was pushed.
    Forked {
        at_tick: u64,
        new_depth: usize,
        predecessor: ObjectId,
        successor: ObjectId,
    },
    /// The tail timeline was popped.
    Abandoned {
        /// Depth of the timeline that was discarded.
        discarded_depth: usize,
        /// Identities deleted by the cleanup of the resumed timeline.
        removed: Vec<ObjectId>,
    },
    /// Time could not move any further in the requested direction.
    Boundary,
    /// A past self's perception or survival was contradicted.
    Paradox { message: String },
    /// The objective reached an exit.
    Won,
    /// The level was reloaded from scratch.
    Restarted,
    /// A user-facing message raised by a behavior collaborator.
    Notice { message: String },
}

// ---------------------------------------------------------------------------
// TemporalEvent
// ---------------------------------------------------------------------------

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalEvent {
    /// Number of engine steps taken before this event, including paused ones.
    pub step: u64,
    /// Tick on the visible axis when the event happened.
    pub tick: u64,
    /// Depth of the tail timeline when the event happened.
    pub depth: usize,
    pub kind: EventKind,
}

// ---------------------------------------------------------------------------
// TemporalJournal
// ---------------------------------------------------------------------------

/// Append-only log of [`TemporalEvent`]s with query helpers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalJournal {
    events: Vec<TemporalEvent>,
}

impl TemporalJournal {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, event: TemporalEvent) {
        self.events.push(event);
    }

    /// Drop every event, e.g. on level restart.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in insertion order.
    pub fn all_events(&self) -> &[TemporalEvent] {
        &self.events
    }

    /// Events that happened while the tail timeline had the given depth.
    pub fn events_at_depth(&self, depth: usize) -> impl Iterator<Item = &TemporalEvent> {
        self.events.iter().filter(move |e| e.depth == depth)
    }

    pub fn forks(&self) -> impl Iterator<Item = &TemporalEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Forked { .. }))
    }

    pub fn abandons(&self) -> impl Iterator<Item = &TemporalEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Abandoned { .. }))
    }

    pub fn paradoxes(&self) -> impl Iterator<Item = &TemporalEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Paradox { .. }))
    }

    /// Message of the most recent paradox, if any.
    pub fn last_paradox(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match &e.kind {
            EventKind::Paradox { message } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Events recorded at or after engine step `step`.
    pub fn since_step(&self, step: u64) -> impl Iterator<Item = &TemporalEvent> {
        self.events.iter().filter(move |e| e.step >= step)
    }

    /// Serialize the whole journal as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
