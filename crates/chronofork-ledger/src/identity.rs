//! Object identities and the arrow of time.
//!
//! An [`ObjectId`] names one simulated individual. Identities are allocated by
//! the [`Timeline`](crate::timeline::Timeline) generation that creates the
//! object and are carried unchanged into every descendant generation, so two
//! objects with equal ids in different generations are the same individual at
//! different moments of its causal life.
//!
//! [`Direction`] is the personal arrow of time of a timeline or an object.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Stable identity of a simulated object.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Raw numeric value.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Direction in which a timeline (or an object's personal time) flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Ticks increase as the simulation advances.
    Forwards,
    /// Ticks decrease as the simulation advances.
    Backwards,
}

impl Direction {
    /// Direction of the timeline at the given stack depth.
    ///
    /// The root timeline has depth 1 and runs forwards; every fork flips the
    /// direction, so even depths run backwards.
    #[inline]
    pub fn for_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            Direction::Backwards
        } else {
            Direction::Forwards
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forwards => Direction::Backwards,
            Direction::Backwards => Direction::Forwards,
        }
    }

    /// `true` if `tick` lies strictly behind `origin` when moving in this
    /// direction.
    #[inline]
    pub fn is_behind(self, tick: u64, origin: u64) -> bool {
        match self {
            Direction::Forwards => tick < origin,
            Direction::Backwards => tick > origin,
        }
    }

    /// `true` if `tick` lies at or beyond `origin` when moving in this
    /// direction.
    #[inline]
    pub fn reaches(self, tick: u64, origin: u64) -> bool {
        !self.is_behind(tick, origin)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forwards => f.write_str("forwards"),
            Direction::Backwards => f.write_str("backwards"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_parity_selects_direction() {
        assert_eq!(Direction::for_depth(1), Direction::Forwards);
        assert_eq!(Direction::for_depth(2), Direction::Backwards);
        assert_eq!(Direction::for_depth(3), Direction::Forwards);
        assert_eq!(Direction::for_depth(4), Direction::Backwards);
    }

    #[test]
    fn reversed_flips() {
        assert_eq!(Direction::Forwards.reversed(), Direction::Backwards);
        assert_eq!(Direction::Backwards.reversed(), Direction::Forwards);
    }

    #[test]
    fn behind_depends_on_direction() {
        assert!(Direction::Forwards.is_behind(3, 5));
        assert!(!Direction::Forwards.is_behind(5, 5));
        assert!(Direction::Backwards.is_behind(7, 5));
        assert!(Direction::Backwards.reaches(5, 5));
        assert!(Direction::Backwards.reaches(2, 5));
    }

    #[test]
    fn object_id_display_and_serde() {
        let id = ObjectId(42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "ObjectId(42)");
        let json = serde_json::to_string(&id).unwrap();
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
