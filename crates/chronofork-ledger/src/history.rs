//! Per-object, per-generation history of values indexed by absolute tick.
//!
//! A [`HistoryBuffer`] covers one contiguous tick range `[first_tick, len)`.
//! It grows at the tail with [`append`](HistoryBuffer::append) (forwards
//! simulation) or at the head with [`prepend`](HistoryBuffer::prepend)
//! (objects born in a backwards timeline), and covered ticks can be
//! re-simulated with [`overwrite`](HistoryBuffer::overwrite). Any write that
//! would leave a gap is an invariant violation and is reported as a
//! [`HistoryError`]; callers treat it as fatal.
//!
//! The same buffer type stores object snapshots and player observation
//! frames.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// HistoryError
// ---------------------------------------------------------------------------

/// A history buffer was used outside its contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// A write would leave a gap in the covered range.
    #[error("history write at tick {tick} is out of sequence (covers {first}..{len})")]
    OutOfSequence { tick: u64, first: u64, len: u64 },

    /// A read or overwrite of a tick the buffer does not cover.
    #[error("tick {tick} is outside recorded history (covers {first}..{len})")]
    OutOfRange { tick: u64, first: u64, len: u64 },
}

// ---------------------------------------------------------------------------
// HistoryBuffer
// ---------------------------------------------------------------------------

/// Contiguous tick-indexed sequence of values with a recorded fork point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBuffer<T> {
    /// Absolute tick of the first entry.
    first: u64,
    entries: VecDeque<T>,
    /// Tick at which this generation's copy was made (or the seed tick of a
    /// freshly created buffer).
    breakpoint: u64,
}

impl<T: Clone> HistoryBuffer<T> {
    /// A buffer holding a single seed entry at `tick`.
    pub fn seeded(tick: u64, value: T) -> Self {
        let mut entries = VecDeque::with_capacity(64);
        entries.push_back(value);
        Self {
            first: tick,
            entries,
            breakpoint: tick,
        }
    }

    /// One past the last covered tick.
    #[inline]
    pub fn len(&self) -> u64 {
        self.first + self.entries.len() as u64
    }

    /// Never true for a buffer built through [`seeded`](Self::seeded); kept
    /// for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn first_tick(&self) -> u64 {
        self.first
    }

    #[inline]
    pub fn breakpoint(&self) -> u64 {
        self.breakpoint
    }

    #[inline]
    pub fn covers(&self, tick: u64) -> bool {
        tick >= self.first && tick < self.len()
    }

    fn out_of_range(&self, tick: u64) -> HistoryError {
        HistoryError::OutOfRange {
            tick,
            first: self.first,
            len: self.len(),
        }
    }

    fn out_of_sequence(&self, tick: u64) -> HistoryError {
        HistoryError::OutOfSequence {
            tick,
            first: self.first,
            len: self.len(),
        }
    }

    /// Extend the buffer at its tail. `tick` must equal [`len`](Self::len).
    pub fn append(&mut self, tick: u64, value: T) -> Result<(), HistoryError> {
        if tick != self.len() {
            return Err(self.out_of_sequence(tick));
        }
        self.entries.push_back(value);
        Ok(())
    }

    /// Extend the buffer at its head. `tick + 1` must equal
    /// [`first_tick`](Self::first_tick).
    pub fn prepend(&mut self, tick: u64, value: T) -> Result<(), HistoryError> {
        if tick.checked_add(1) != Some(self.first) {
            return Err(self.out_of_sequence(tick));
        }
        self.entries.push_front(value);
        self.first = tick;
        Ok(())
    }

    /// Replace the value at an already covered tick.
    pub fn overwrite(&mut self, tick: u64, value: T) -> Result<(), HistoryError> {
        if !self.covers(tick) {
            return Err(self.out_of_range(tick));
        }
        let index = (tick - self.first) as usize;
        self.entries[index] = value;
        Ok(())
    }

    /// Write `value` at `tick`, choosing overwrite, append or prepend.
    pub fn record(&mut self, tick: u64, value: T) -> Result<(), HistoryError> {
        if self.covers(tick) {
            self.overwrite(tick, value)
        } else if tick == self.len() {
            self.append(tick, value)
        } else {
            self.prepend(tick, value)
        }
    }

    pub fn read(&self, tick: u64) -> Result<&T, HistoryError> {
        if !self.covers(tick) {
            return Err(self.out_of_range(tick));
        }
        Ok(&self.entries[(tick - self.first) as usize])
    }

    /// The most recently appended value.
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Copy of the entries up to and including `at_tick`, tagged with
    /// `breakpoint = at_tick`.
    ///
    /// Entries past the fork point belong to a future the new generation
    /// will re-simulate, so they are not carried over.
    pub fn fork(&self, at_tick: u64) -> Result<Self, HistoryError> {
        if !self.covers(at_tick) {
            return Err(self.out_of_range(at_tick));
        }
        let keep = (at_tick - self.first + 1) as usize;
        Ok(Self {
            first: self.first,
            entries: self.entries.iter().take(keep).cloned().collect(),
            breakpoint: at_tick,
        })
    }

    /// Copy of the entries from `at_tick` to the end, tagged with
    /// `breakpoint = at_tick`.
    ///
    /// Mirror of [`fork`](Self::fork) for generations running backwards,
    /// whose unexplored future lies below the fork point.
    pub fn fork_reversed(&self, at_tick: u64) -> Result<Self, HistoryError> {
        if !self.covers(at_tick) {
            return Err(self.out_of_range(at_tick));
        }
        let skip = (at_tick - self.first) as usize;
        Ok(Self {
            first: at_tick,
            entries: self.entries.iter().skip(skip).cloned().collect(),
            breakpoint: at_tick,
        })
    }

    /// Copy of every entry, tagged with `breakpoint = at_tick`.
    ///
    /// Used for recorded objects, whose full past must stay replayable on
    /// both sides of the fork point.
    pub fn carry(&self, at_tick: u64) -> Self {
        Self {
            first: self.first,
            entries: self.entries.clone(),
            breakpoint: at_tick,
        }
    }

    /// Iterate `(tick, value)` pairs in tick order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> + '_ {
        let first = self.first;
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, v)| (first + i as u64, v))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
