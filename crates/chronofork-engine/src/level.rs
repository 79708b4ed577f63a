//! Level descriptions and construction of the root timeline.
//!
//! A [`Level`] is the only input the engine reads from a level loader: text
//! tile rows plus an ordered list of objects. Objects receive identities in
//! list order, so a door can name its switch through
//! `snapshot.linked_object_id` before the level is built.
//!
//! # Example
//!
//! ```
//! use chronofork_engine::level::Level;
//!
//! let json = r######"{
//!     "name": "lobby",
//!     "tiles": ["#####", "#...#", "#####"],
//!     "objects": [
//!         { "kind": "Player", "snapshot": { "position": { "x": 48.0, "y": 48.0 } } },
//!         { "kind": "Exit", "snapshot": { "position": { "x": 112.0, "y": 48.0 } } }
//!     ]
//! }"######;
//! let level = Level::from_json_str(json).unwrap();
//! let root = level.build_root().unwrap();
//! assert_eq!(root.len(), 2);
//! assert!(root.controlled().is_some());
//! ```

use chronofork_ledger::identity::Direction;
use chronofork_ledger::kind::ObjectKind;
use chronofork_ledger::snapshot::Snapshot;
use chronofork_ledger::timeline::Timeline;
use serde::{Deserialize, Serialize};

use crate::perception::TileGrid;
use crate::TemporalError;

/// One object placed by the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    pub kind: ObjectKind,
    #[serde(default)]
    pub snapshot: Snapshot,
}

/// Tile rows (`#` is a wall) plus the objects present at tick 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    #[serde(default)]
    pub name: String,
    pub tiles: Vec<String>,
    pub objects: Vec<LevelObject>,
}

impl Level {
    /// An empty level over the given tile rows.
    pub fn new(name: impl Into<String>, rows: &[&str]) -> Self {
        Self {
            name: name.into(),
            tiles: rows.iter().map(|r| (*r).to_owned()).collect(),
            objects: Vec::new(),
        }
    }

    /// Builder-style: append an object. It gets the next identity.
    pub fn with(mut self, kind: ObjectKind, snapshot: Snapshot) -> Self {
        self.objects.push(LevelObject { kind, snapshot });
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, TemporalError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn tile_grid(&self) -> Result<TileGrid, TemporalError> {
        TileGrid::from_rows(&self.tiles)
    }

    /// The depth-1 timeline: every object born at tick 0, forwards, with its
    /// history seeded at tick 0. The first player is the controlled one.
    pub fn build_root(&self) -> Result<Timeline, TemporalError> {
        let player = self
            .objects
            .iter()
            .position(|o| o.kind == ObjectKind::Player)
            .ok_or(TemporalError::NoPlayer)?;

        let mut root = Timeline::root();
        let mut controlled = None;
        for (index, object) in self.objects.iter().enumerate() {
            let id = root.spawn(object.kind, object.snapshot.clone(), 0, Direction::Forwards);
            if index == player {
                controlled = Some(id);
            }
        }
        if let Some(id) = controlled {
            root.set_controlled(id);
        }
        Ok(root)
    }
}
