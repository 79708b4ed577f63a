//! Per-tick object state.
//!
//! A [`Snapshot`] is deliberately flat: it carries every field any object kind
//! might need, so history storage and replay comparison are uniform across
//! kinds. Fields that do not apply to a kind keep their default value.
//!
//! Cross-object relationships (held item, occupied container, linked switch)
//! are stored as [`ObjectId`]s and resolved against the owning timeline, so a
//! fork only has to re-point identities.

use serde::{Deserialize, Serialize};

use crate::identity::ObjectId;
use crate::kind::ObjectKind;

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A 2D world-space vector in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians).
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f64) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f64 {
        self.sub(other).length()
    }

    /// Angle of this vector in radians.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }
}

// ---------------------------------------------------------------------------
// AiState
// ---------------------------------------------------------------------------

/// Sub-state of an enemy's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Idle,
    Patrol,
    Alert,
    Dead,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full state of one object at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub position: Vec2,
    /// Facing angle in radians.
    pub facing: f64,
    pub animation: u32,
    pub velocity: Vec2,
    pub ai: AiState,
    /// On throwables: the object holding this item.
    pub attached_object_id: Option<ObjectId>,
    /// On players: the item being held.
    pub held_object_id: Option<ObjectId>,
    /// On players: the container being occupied.
    pub container_id: Option<ObjectId>,
    /// Door <-> switch link.
    pub linked_object_id: Option<ObjectId>,
    pub visible: bool,
    /// Spikes.
    pub raised: bool,
    /// Doors.
    pub open: bool,
    /// Switches.
    pub pressed: bool,
    pub cooldown: u32,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            facing: 0.0,
            animation: 0,
            velocity: Vec2::ZERO,
            ai: AiState::Idle,
            attached_object_id: None,
            held_object_id: None,
            container_id: None,
            linked_object_id: None,
            visible: true,
            raised: false,
            open: false,
            pressed: false,
            cooldown: 0,
        }
    }
}

impl Snapshot {
    /// A default snapshot placed at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Default::default()
        }
    }

    /// Exact perceptual equality: position, facing and animation index.
    ///
    /// No epsilon is applied; replay is bit-for-bit deterministic.
    pub fn looks_like(&self, other: &Snapshot) -> bool {
        self.position == other.position
            && self.facing == other.facing
            && self.animation == other.animation
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// One object as seen by a player at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObjectKind,
    pub snapshot: Snapshot,
    pub id: ObjectId,
}

impl Observation {
    /// Same kind and same appearance; the identity is not compared.
    pub fn matches(&self, other: &Observation) -> bool {
        self.kind == other.kind && self.snapshot.looks_like(&other.snapshot)
    }
}

/// Everything a player perceived at one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationFrame {
    pub seen: Vec<Observation>,
}

impl ObservationFrame {
    pub fn new(seen: Vec<Observation>) -> Self {
        Self { seen }
    }

    /// A frame in which nothing was seen.
    pub fn blind() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
