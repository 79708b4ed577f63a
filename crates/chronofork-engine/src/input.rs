//! Per-tick input intents and their resolution into a tick action.
//!
//! The engine never reads devices. Whoever drives it decodes keyboard or
//! scripted input into an [`InputFrame`] once per step; the controller then
//! resolves the frame into exactly one [`TickAction`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// InputFrame
// ---------------------------------------------------------------------------

/// Decoded intents for a single step.
///
/// Axes are expected in `[-1, 1]`; behaviors clamp anything outside that
/// range. Booleans are edge-triggered except `rewind_held`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    pub move_x: f64,
    pub move_y: f64,
    pub fire: bool,
    pub interact: bool,
    pub throw: bool,
    /// Scrub backwards through explored time while held.
    pub rewind_held: bool,
    /// Request a timeline fork at the end of this step.
    pub reverse_pressed: bool,
    /// Reload the level from scratch.
    pub restart: bool,
    pub pause: bool,
}

impl InputFrame {
    /// A frame with no intents; resolves to [`TickAction::Advance`].
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn moving(move_x: f64, move_y: f64) -> Self {
        Self {
            move_x,
            move_y,
            ..Self::default()
        }
    }

    pub fn rewind() -> Self {
        Self {
            rewind_held: true,
            ..Self::default()
        }
    }

    pub fn reverse() -> Self {
        Self {
            reverse_pressed: true,
            ..Self::default()
        }
    }

    pub fn pause() -> Self {
        Self {
            pause: true,
            ..Self::default()
        }
    }

    /// `true` if every field has its default value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// TickAction
// ---------------------------------------------------------------------------

/// What one step does to the tick counter. Selected per step, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickAction {
    Advance,
    Rewind,
    Pause,
}

impl TickAction {
    /// `pause` wins over `rewind_held`, which wins over advancing.
    pub fn resolve(input: &InputFrame) -> Self {
        if input.pause {
            TickAction::Pause
        } else if input.rewind_held {
            TickAction::Rewind
        } else {
            TickAction::Advance
        }
    }
}
