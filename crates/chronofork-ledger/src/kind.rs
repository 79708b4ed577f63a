//! Closed set of object kinds.
//!
//! Every place that needs per-kind behavior matches on [`ObjectKind`]; there
//! is no open-ended type registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::snapshot::Snapshot;

/// Containers a player can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    /// A portable box; its occupant cannot see out.
    Box,
    /// A fixed closet.
    Closet,
    /// A turnstile; entering it reverses time.
    Turnstile,
}

/// Items a player can carry and throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThrowableKind {
    Knife,
    Gun,
    /// The item that must be carried to an exit.
    Objective,
}

/// Type tag of a simulated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Player,
    Bullet,
    Enemy,
    Door,
    Switch,
    Container(ContainerKind),
    Spikes,
    Throwable(ThrowableKind),
    Exit,
    /// Evidence left behind by a killing.
    Crime,
    Alarm,
}

impl ObjectKind {
    /// Every kind, in per-tick processing order.
    pub const ALL: [ObjectKind; 15] = [
        ObjectKind::Switch,
        ObjectKind::Door,
        ObjectKind::Spikes,
        ObjectKind::Player,
        ObjectKind::Container(ContainerKind::Box),
        ObjectKind::Container(ContainerKind::Closet),
        ObjectKind::Container(ContainerKind::Turnstile),
        ObjectKind::Throwable(ThrowableKind::Knife),
        ObjectKind::Throwable(ThrowableKind::Gun),
        ObjectKind::Throwable(ThrowableKind::Objective),
        ObjectKind::Enemy,
        ObjectKind::Bullet,
        ObjectKind::Crime,
        ObjectKind::Alarm,
        ObjectKind::Exit,
    ];

    /// Position of this kind in the per-tick processing order.
    pub fn tick_rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Transient objects only survive a fork if their lifetime window can
    /// still be reached from the fork point.
    pub fn is_transient(self) -> bool {
        matches!(self, ObjectKind::Crime | ObjectKind::Bullet)
    }

    /// Markers derived from another object's fate. A forwards generation
    /// simulates that fate again, so a marker from beyond its fork point is
    /// stale.
    pub fn is_rederived(self) -> bool {
        self == ObjectKind::Crime
    }

    /// Level furniture that is always drawn and therefore never part of an
    /// observation frame.
    pub fn is_always_drawn(self) -> bool {
        matches!(
            self,
            ObjectKind::Door
                | ObjectKind::Switch
                | ObjectKind::Container(_)
                | ObjectKind::Spikes
                | ObjectKind::Exit
                | ObjectKind::Alarm
        )
    }

    /// Whether an object of this kind in the given state blocks movement and
    /// line of sight on its tile.
    pub fn obstructs(self, state: &Snapshot) -> bool {
        match self {
            ObjectKind::Door => !state.open,
            ObjectKind::Container(ContainerKind::Closet) => true,
            _ => false,
        }
    }

    pub fn is_player(self) -> bool {
        self == ObjectKind::Player
    }

    pub fn is_container(self) -> bool {
        matches!(self, ObjectKind::Container(_))
    }

    pub fn is_throwable(self) -> bool {
        matches!(self, ObjectKind::Throwable(_))
    }

    /// Lowercase human-readable name used in status messages.
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Player => "player",
            ObjectKind::Bullet => "bullet",
            ObjectKind::Enemy => "enemy",
            ObjectKind::Door => "door",
            ObjectKind::Switch => "switch",
            ObjectKind::Container(ContainerKind::Box) => "box",
            ObjectKind::Container(ContainerKind::Closet) => "closet",
            ObjectKind::Container(ContainerKind::Turnstile) => "turnstile",
            ObjectKind::Spikes => "spikes",
            ObjectKind::Throwable(ThrowableKind::Knife) => "knife",
            ObjectKind::Throwable(ThrowableKind::Gun) => "gun",
            ObjectKind::Throwable(ThrowableKind::Objective) => "objective",
            ObjectKind::Exit => "exit",
            ObjectKind::Crime => "crime",
            ObjectKind::Alarm => "alarm",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
