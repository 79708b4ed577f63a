//! Deferred world mutations raised by behavior collaborators.
//!
//! Behaviors only ever see the pre-tick world. Everything they want to change
//! besides their own staged snapshot (spawning a bullet, ending a lifetime,
//! picking up an item, asking for a fork) is queued in a [`CommandBuffer`]
//! and applied in FIFO order after every active object has been staged and
//! committed. Each command carries the identity of the object that issued it.
//!
//! # Example
//!
//! ```
//! use chronofork_engine::command::CommandBuffer;
//! use chronofork_engine::promise::PromiseLedger;
//! use chronofork_ledger::prelude::*;
//!
//! let mut root = Timeline::root();
//! let player = root.spawn(ObjectKind::Player, Snapshot::default(), 0, Direction::Forwards);
//!
//! let mut cmds = CommandBuffer::new();
//! cmds.spawn(player, ObjectKind::Bullet, Snapshot::at(10.0, 0.0));
//! cmds.notice(player, "bang");
//!
//! let report = cmds.apply(&mut root, &mut PromiseLedger::new(), 0).unwrap();
//! assert_eq!(report.spawned.len(), 1);
//! assert_eq!(report.notices, vec!["bang".to_owned()]);
//! assert!(cmds.is_empty());
//! ```

use chronofork_ledger::identity::ObjectId;
use chronofork_ledger::kind::ObjectKind;
use chronofork_ledger::snapshot::{Snapshot, Vec2};
use chronofork_ledger::timeline::Timeline;
use chronofork_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::promise::{Promise, PromiseKind, PromiseLedger};

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What mutation to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Create an object born at the current tick in the tail's direction.
    Spawn { kind: ObjectKind, snapshot: Snapshot },
    /// Close the target's lifetime at the current tick.
    EndLifetime { target: ObjectId },
    Delete { target: ObjectId },
    /// Put a throwable into a holder's hands.
    Attach { item: ObjectId, holder: ObjectId },
    /// Let go of a throwable with an initial velocity.
    Release { item: ObjectId, velocity: Vec2 },
    /// Set or clear a container's occupant.
    Occupy {
        container: ObjectId,
        occupant: Option<ObjectId>,
    },
    Promise { target: ObjectId, kind: PromiseKind },
    /// Fork a new timeline once this step's dispatch is over.
    RequestFork,
    /// A user-facing message for the status line.
    Notice { message: String },
}

// ---------------------------------------------------------------------------
// TemporalCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalCommand {
    /// Object whose behavior queued the command.
    pub issued_by: ObjectId,
    pub kind: CommandKind,
    /// Sequential index within the buffer.
    pub command_index: u32,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// What one [`CommandBuffer::apply`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: usize,
    /// Commands whose target was missing, inactive or recorded.
    pub skipped: usize,
    pub spawned: Vec<ObjectId>,
    pub removed: Vec<ObjectId>,
    pub notices: Vec<String>,
    pub fork_requested: bool,
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// FIFO queue of [`TemporalCommand`]s for one tick.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<TemporalCommand>,
    next_index: u32,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issued_by: ObjectId, kind: CommandKind) {
        self.commands.push(TemporalCommand {
            issued_by,
            kind,
            command_index: self.next_index,
        });
        self.next_index += 1;
    }

    pub fn spawn(&mut self, issued_by: ObjectId, kind: ObjectKind, snapshot: Snapshot) {
        self.push(issued_by, CommandKind::Spawn { kind, snapshot });
    }

    pub fn end_lifetime(&mut self, issued_by: ObjectId, target: ObjectId) {
        self.push(issued_by, CommandKind::EndLifetime { target });
    }

    pub fn delete(&mut self, issued_by: ObjectId, target: ObjectId) {
        self.push(issued_by, CommandKind::Delete { target });
    }

    pub fn attach(&mut self, issued_by: ObjectId, item: ObjectId, holder: ObjectId) {
        self.push(issued_by, CommandKind::Attach { item, holder });
    }

    pub fn release(&mut self, issued_by: ObjectId, item: ObjectId, velocity: Vec2) {
        self.push(issued_by, CommandKind::Release { item, velocity });
    }

    pub fn occupy(&mut self, issued_by: ObjectId, container: ObjectId, occupant: Option<ObjectId>) {
        self.push(issued_by, CommandKind::Occupy { container, occupant });
    }

    pub fn promise(&mut self, issued_by: ObjectId, target: ObjectId, kind: PromiseKind) {
        self.push(issued_by, CommandKind::Promise { target, kind });
    }

    pub fn request_fork(&mut self, issued_by: ObjectId) {
        self.push(issued_by, CommandKind::RequestFork);
    }

    pub fn notice(&mut self, issued_by: ObjectId, message: impl Into<String>) {
        self.push(
            issued_by,
            CommandKind::Notice {
                message: message.into(),
            },
        );
    }

    /// Queued commands in insertion order.
    pub fn commands(&self) -> &[TemporalCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every queued command to `timeline` at `tick`, in insertion
    /// order, and empty the buffer.
    ///
    /// Commands against missing objects, or that would rewrite a recorded
    /// object, are skipped with a warning. Ledger failures while amending
    /// history are fatal and returned.
    pub fn apply(
        &mut self,
        timeline: &mut Timeline,
        promises: &mut PromiseLedger,
        tick: u64,
    ) -> Result<ApplyReport, LedgerError> {
        let direction = timeline.direction();
        let mut report = ApplyReport::default();
        self.next_index = 0;

        for cmd in std::mem::take(&mut self.commands) {
            let done = match cmd.kind {
                CommandKind::Spawn { kind, snapshot } => {
                    let id = timeline.spawn(kind, snapshot, tick, direction);
                    report.spawned.push(id);
                    true
                }
                CommandKind::EndLifetime { target } => match timeline.get_mut(target) {
                    Some(object) => {
                        object.lifetime.close(tick, direction);
                        true
                    }
                    None => false,
                },
                CommandKind::Delete { target } => {
                    let removed = timeline.remove(target).is_some();
                    if removed {
                        report.removed.push(target);
                    }
                    removed
                }
                CommandKind::Attach { item, holder } => match timeline.get(holder) {
                    Some(h) => {
                        let position = h.state.position;
                        let facing = h.state.facing;
                        amend(timeline, item, tick, |s| {
                            s.attached_object_id = Some(holder);
                            s.position = position;
                            s.facing = facing;
                            s.velocity = Vec2::ZERO;
                        })?
                    }
                    None => false,
                },
                CommandKind::Release { item, velocity } => amend(timeline, item, tick, |s| {
                    s.attached_object_id = None;
                    s.velocity = velocity;
                })?,
                CommandKind::Occupy {
                    container,
                    occupant,
                } => match timeline.get_mut(container) {
                    Some(object) if object.kind.is_container() => {
                        object.occupant = occupant;
                        true
                    }
                    _ => false,
                },
                CommandKind::Promise { target, kind } => {
                    if timeline.contains(target) {
                        promises.add(Promise::new(timeline.depth(), tick, target, kind));
                        true
                    } else {
                        false
                    }
                }
                CommandKind::RequestFork => {
                    report.fork_requested = true;
                    true
                }
                CommandKind::Notice { message } => {
                    report.notices.push(message);
                    true
                }
            };

            if done {
                report.applied += 1;
            } else {
                report.skipped += 1;
                warn!(
                    command_index = cmd.command_index,
                    issued_by = %cmd.issued_by,
                    tick,
                    "skipping command against a missing or immutable object"
                );
            }
        }
        Ok(report)
    }
}

/// Patch the committed snapshot of a live, simulated object at `tick` and
/// rewrite its history entry. Returns `false` when the object cannot be
/// amended.
fn amend(
    timeline: &mut Timeline,
    id: ObjectId,
    tick: u64,
    patch: impl FnOnce(&mut Snapshot),
) -> Result<bool, LedgerError> {
    let snapshot = match timeline.get_mut(id) {
        Some(object) if object.active_at(tick) && !object.recorded => {
            patch(&mut object.state);
            object.next = object.state.clone();
            object.state.clone()
        }
        _ => return Ok(false),
    };
    timeline.record_history(id, tick, snapshot)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
