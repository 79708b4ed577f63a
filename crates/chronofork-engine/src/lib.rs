//! Chronofork Engine -- temporal controller for single-timeline time travel.
//!
//! This crate builds on [`chronofork_ledger`] to drive a stack of timeline
//! generations: advancing and scrubbing the visible tick, forking a new
//! generation when the player reverses time, abandoning a generation back to
//! its parent, keeping promises, and detecting paradoxes between what a past
//! self perceived and what the present now shows.
//!
//! Object behavior and world geometry are collaborators: behaviors are plain
//! functions registered per object kind, and visibility/navigation sits
//! behind the [`Perception`](perception::Perception) trait. The
//! [`behaviors::standard`] registry and [`GridPerception`](perception::GridPerception)
//! make a level playable out of the box.
//!
//! # Quick Start
//!
//! ```
//! use chronofork_engine::prelude::*;
//!
//! let level = Level::new("corridor", &["#######", "#.....#", "#######"])
//!     .with(ObjectKind::Player, Snapshot::at(48.0, 48.0));
//! let mut controller = TemporalController::new(&level, EngineConfig::default()).unwrap();
//!
//! for _ in 0..10 {
//!     controller.step(&InputFrame::moving(1.0, 0.0)).unwrap();
//! }
//! assert_eq!(controller.tick(), 10);
//!
//! // Reverse time: a successor player now walks a backwards timeline.
//! controller.step(&InputFrame::reverse()).unwrap();
//! assert_eq!(controller.depth(), 2);
//! assert_eq!(controller.direction(), Direction::Backwards);
//! ```

#![deny(unsafe_code)]

pub mod behavior;
pub mod behaviors;
pub mod cleanup;
pub mod command;
pub mod config;
pub mod controller;
pub mod input;
pub mod level;
pub mod paradox;
pub mod perception;
pub mod promise;
pub mod replay;
pub mod snapshot;

use chronofork_ledger::LedgerError;

use crate::perception::NavigationError;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ledger crate for convenience.
pub use chronofork_ledger;

/// Re-export the journal crate for convenience.
pub use chronofork_journal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal engine errors.
///
/// Each variant means an engine invariant was broken (or the input that
/// builds the engine was unusable), except [`TemporalError::AbandonRoot`]
/// and [`TemporalError::ParadoxPending`], which refuse a request and leave
/// the controller running. Recoverable situations such as hitting the
/// boundary of explored time are reported through the step status instead.
#[derive(Debug, thiserror::Error)]
pub enum TemporalError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The sole root timeline cannot be popped.
    #[error("cannot abandon the root timeline")]
    AbandonRoot,

    /// A fork was requested while a paradox is still pending.
    #[error("cannot fork while a paradox is pending: {paradox}")]
    ParadoxPending { paradox: String },

    /// A fork was attempted while the tail has no controlled player.
    #[error("the timeline at depth {depth} has no controlled player")]
    MissingPlayer { depth: usize },

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// A level description holds no player object.
    #[error("level has no player object")]
    NoPlayer,

    #[error("malformed level description: {0}")]
    LevelFormat(#[from] serde_json::Error),

    /// A tile row is longer or shorter than the first row.
    #[error("tile row {row} has {found} columns, expected {expected}")]
    RaggedTiles {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The controller stopped after an earlier fatal error.
    #[error("controller halted: {reason}")]
    Halted { reason: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ledger prelude.
    pub use chronofork_ledger::prelude::*;

    pub use chronofork_journal::journal::{EventKind, TemporalEvent, TemporalJournal};

    // Engine-specific exports.
    pub use crate::behavior::{BehaviorFn, BehaviorRegistry, WorldView};
    pub use crate::command::{ApplyReport, CommandBuffer, CommandKind, TemporalCommand};
    pub use crate::config::EngineConfig;
    pub use crate::controller::{StepDiagnostics, TemporalController, TickOutcome};
    pub use crate::input::{InputFrame, TickAction};
    pub use crate::level::{Level, LevelObject};
    pub use crate::perception::{
        GridPerception, NavigationError, ObstructionGrid, Perception, Tile, TileGrid,
    };
    pub use crate::promise::{Promise, PromiseKind, PromiseLedger};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::snapshot::EngineSnapshot;
    pub use crate::TemporalError;
}
