//! Chronofork Ledger -- objects, per-tick histories and timeline generations.
//!
//! This crate is the data layer of the Chronofork temporal engine. It knows
//! nothing about input, behaviors or paradoxes; it only guarantees that every
//! object's per-tick history is stored contiguously, that lifetime windows are
//! answered exactly, and that a timeline generation can be forked into an
//! independent child.
//!
//! # Quick Start
//!
//! ```
//! use chronofork_ledger::prelude::*;
//!
//! let mut root = Timeline::root();
//! let bullet = root.spawn(ObjectKind::Bullet, Snapshot::at(0.0, 0.0), 40, Direction::Forwards);
//!
//! let obj = root.get_mut(bullet).unwrap();
//! obj.lifetime.close(47, Direction::Forwards);
//! assert!(obj.active_at(46));
//! assert!(!obj.active_at(48));
//! ```

#![deny(unsafe_code)]

pub mod history;
pub mod identity;
pub mod kind;
pub mod object;
pub mod snapshot;
pub mod timeline;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ledger operations.
///
/// Every variant signals a broken engine invariant; there is no corrected
/// state to continue from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// An identity was looked up that the generation does not contain.
    #[error("object {id} does not exist in the timeline at depth {depth}")]
    UnknownObject {
        id: identity::ObjectId,
        depth: usize,
    },

    /// A live object has no history buffer.
    #[error("object {id} has no history buffer in the timeline at depth {depth}")]
    MissingHistory {
        id: identity::ObjectId,
        depth: usize,
    },

    /// A history buffer was read or written outside its contract.
    #[error("history of object {id}: {source}")]
    History {
        id: identity::ObjectId,
        #[source]
        source: history::HistoryError,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::history::{HistoryBuffer, HistoryError};
    pub use crate::identity::{Direction, ObjectId};
    pub use crate::kind::{ContainerKind, ObjectKind, ThrowableKind};
    pub use crate::object::{Lifetime, TemporalObject};
    pub use crate::snapshot::{AiState, Observation, ObservationFrame, Snapshot, Vec2};
    pub use crate::timeline::Timeline;
    pub use crate::LedgerError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
