//! Tiles, the obstruction grid and the perception/navigation collaborator.
//!
//! The core only needs three things from the world geometry: a per-tile
//! "blocked" cache it can rebuild after every tick, visibility queries for
//! observation recording, and a pathfinding query for behaviors. Those
//! queries sit behind the [`Perception`] trait; [`GridPerception`] is the
//! reference implementation over an [`ObstructionGrid`].
//!
//! # Example
//!
//! ```
//! use chronofork_engine::perception::{GridPerception, ObstructionGrid, Perception, TileGrid};
//! use chronofork_engine::config::EngineConfig;
//! use chronofork_ledger::prelude::*;
//!
//! let tiles = TileGrid::from_rows(&["#####", "#...#", "#####"]).unwrap();
//! let config = EngineConfig::default();
//! let grid = ObstructionGrid::rebuild(&tiles, &Timeline::root(), 0, config.tile_size);
//!
//! let mut perception = GridPerception::new(&config);
//! perception.rebuild(&grid);
//! assert!(perception.line_of_sight(Vec2::new(48.0, 48.0), Vec2::new(112.0, 48.0)));
//! ```

use std::collections::VecDeque;
use std::f64::consts::TAU;

use chronofork_ledger::snapshot::{Snapshot, Vec2};
use chronofork_ledger::timeline::Timeline;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::TemporalError;

// ---------------------------------------------------------------------------
// Tile coordinates
// ---------------------------------------------------------------------------

/// Tile `(col, row)` containing a world-space point.
pub fn tile_coords(position: Vec2, tile_size: f64) -> (i64, i64) {
    (
        (position.x / tile_size).floor() as i64,
        (position.y / tile_size).floor() as i64,
    )
}

/// World-space center of a tile.
pub fn tile_center(col: i64, row: i64, tile_size: f64) -> Vec2 {
    Vec2::new(
        (col as f64 + 0.5) * tile_size,
        (row as f64 + 0.5) * tile_size,
    )
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Floor,
    Wall,
}

/// Static level geometry, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; width * height],
        }
    }

    /// Parse text rows: `#` is a wall, any other character is floor.
    ///
    /// Every row must have the width of the first one.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, TemporalError> {
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count());
        let mut tiles = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != width {
                return Err(TemporalError::RaggedTiles {
                    row,
                    expected: width,
                    found,
                });
            }
            tiles.extend(line.chars().map(|c| if c == '#' { Tile::Wall } else { Tile::Floor }));
        }
        Ok(Self {
            width,
            height: rows.len(),
            tiles,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, col: i64, row: i64) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }

    /// `None` outside the grid.
    pub fn get(&self, col: i64, row: i64) -> Option<Tile> {
        self.index(col, row).map(|i| self.tiles[i])
    }

    pub fn set(&mut self, col: i64, row: i64, tile: Tile) {
        if let Some(i) = self.index(col, row) {
            self.tiles[i] = tile;
        }
    }
}

// ---------------------------------------------------------------------------
// ObstructionGrid
// ---------------------------------------------------------------------------

/// Per-tile "blocked for movement and sight" cache, derived from the tiles
/// and from obstructing objects active at one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstructionGrid {
    width: usize,
    height: usize,
    blocked: Vec<bool>,
}

impl ObstructionGrid {
    /// Walls plus the tiles under active objects whose kind obstructs in
    /// their current state (closed doors, closets).
    pub fn rebuild(tiles: &TileGrid, timeline: &Timeline, tick: u64, tile_size: f64) -> Self {
        let mut blocked: Vec<bool> = tiles.tiles.iter().map(|t| *t == Tile::Wall).collect();
        for object in timeline.active_at(tick) {
            if !object.kind.obstructs(&object.state) {
                continue;
            }
            let (col, row) = tile_coords(object.state.position, tile_size);
            if let Some(i) = tiles.index(col, row) {
                blocked[i] = true;
            }
        }
        Self {
            width: tiles.width,
            height: tiles.height,
            blocked,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tiles outside the grid are always blocked.
    pub fn is_blocked(&self, col: i64, row: i64) -> bool {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return true;
        }
        self.blocked[row as usize * self.width + col as usize]
    }

    pub fn blocks_point(&self, position: Vec2, tile_size: f64) -> bool {
        let (col, row) = tile_coords(position, tile_size);
        self.is_blocked(col, row)
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }
}

// ---------------------------------------------------------------------------
// NavigationError
// ---------------------------------------------------------------------------

/// A pathfinding query reached an inconsistent internal state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("path backtrace broke at tile ({col}, {row}) before reaching the start")]
    BrokenBacktrace { col: i64, row: i64 },
}

// ---------------------------------------------------------------------------
// Perception
// ---------------------------------------------------------------------------

/// Visibility and navigation queries consumed by the core and by behaviors.
pub trait Perception {
    /// Called after every obstruction grid recompute.
    fn rebuild(&mut self, grid: &ObstructionGrid);

    /// Point-to-point visibility; the end tiles themselves never block.
    fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool;

    /// Whether an observer in state `viewer` can see the point `target`.
    fn perceives(&self, viewer: &Snapshot, target: Vec2) -> bool;

    /// Waypoints (tile centers) from `from` to `to`, excluding the start.
    ///
    /// `Ok(None)` when the goal is unreachable.
    fn find_path(&self, from: Vec2, to: Vec2) -> Result<Option<Vec<Vec2>>, NavigationError>;
}

// ---------------------------------------------------------------------------
// GridPerception
// ---------------------------------------------------------------------------

/// Reference [`Perception`]: grid traversal for sight, a view cone for
/// perception and breadth-first search for paths.
#[derive(Debug, Clone)]
pub struct GridPerception {
    grid: ObstructionGrid,
    tile_size: f64,
    view_radius: f64,
    field_of_view: f64,
    rebuilds: u64,
}

impl GridPerception {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            grid: ObstructionGrid::default(),
            tile_size: config.tile_size,
            view_radius: config.view_radius,
            field_of_view: config.field_of_view,
            rebuilds: 0,
        }
    }

    /// Number of grid rebuilds seen so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn tile_index(&self, col: i64, row: i64) -> usize {
        row as usize * self.grid.width + col as usize
    }
}

/// Smallest absolute difference between two angles, in `[0, PI]`.
fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

/// Walk a parent table from `goal` back to `start`.
fn backtrace(
    parents: &[Option<usize>],
    width: usize,
    start: usize,
    goal: usize,
    tile_size: f64,
) -> Result<Vec<Vec2>, NavigationError> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        let col = (current % width) as i64;
        let row = (current / width) as i64;
        if path.len() > parents.len() {
            return Err(NavigationError::BrokenBacktrace { col, row });
        }
        path.push(tile_center(col, row, tile_size));
        current = parents[current].ok_or(NavigationError::BrokenBacktrace { col, row })?;
    }
    path.reverse();
    Ok(path)
}

impl Perception for GridPerception {
    fn rebuild(&mut self, grid: &ObstructionGrid) {
        self.grid = grid.clone();
        self.rebuilds += 1;
    }

    fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let ts = self.tile_size;
        let (mut col, mut row) = tile_coords(from, ts);
        let (end_col, end_row) = tile_coords(to, ts);
        let delta = to.sub(from);
        let step_col = if delta.x > 0.0 { 1 } else { -1 };
        let step_row = if delta.y > 0.0 { 1 } else { -1 };

        let (mut t_max_col, t_delta_col) = if delta.x != 0.0 {
            let boundary = if delta.x > 0.0 { (col + 1) as f64 * ts } else { col as f64 * ts };
            ((boundary - from.x) / delta.x, ts / delta.x.abs())
        } else {
            (f64::INFINITY, f64::INFINITY)
        };
        let (mut t_max_row, t_delta_row) = if delta.y != 0.0 {
            let boundary = if delta.y > 0.0 { (row + 1) as f64 * ts } else { row as f64 * ts };
            ((boundary - from.y) / delta.y, ts / delta.y.abs())
        } else {
            (f64::INFINITY, f64::INFINITY)
        };

        let steps = (end_col - col).abs() + (end_row - row).abs();
        for _ in 0..steps {
            if t_max_col < t_max_row {
                col += step_col;
                t_max_col += t_delta_col;
            } else {
                row += step_row;
                t_max_row += t_delta_row;
            }
            if (col, row) == (end_col, end_row) {
                return true;
            }
            if self.grid.is_blocked(col, row) {
                return false;
            }
        }
        true
    }

    fn perceives(&self, viewer: &Snapshot, target: Vec2) -> bool {
        let offset = target.sub(viewer.position);
        let distance = offset.length();
        if distance > self.view_radius {
            return false;
        }
        if distance > f64::EPSILON
            && angle_between(viewer.facing, offset.angle()) > self.field_of_view / 2.0
        {
            return false;
        }
        self.line_of_sight(viewer.position, target)
    }

    fn find_path(&self, from: Vec2, to: Vec2) -> Result<Option<Vec<Vec2>>, NavigationError> {
        let (start_col, start_row) = tile_coords(from, self.tile_size);
        let (goal_col, goal_row) = tile_coords(to, self.tile_size);
        if self.grid.is_blocked(start_col, start_row) || self.grid.is_blocked(goal_col, goal_row) {
            return Ok(None);
        }
        let start = self.tile_index(start_col, start_row);
        let goal = self.tile_index(goal_col, goal_row);
        if start == goal {
            return Ok(Some(Vec::new()));
        }

        let width = self.grid.width;
        let mut parents: Vec<Option<usize>> = vec![None; self.grid.blocked.len()];
        let mut visited = vec![false; self.grid.blocked.len()];
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back((start_col, start_row));

        while let Some((col, row)) = queue.pop_front() {
            let here = self.tile_index(col, row);
            if here == goal {
                return backtrace(&parents, width, start, goal, self.tile_size).map(Some);
            }
            for (dc, dr) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nc, nr) = (col + dc, row + dr);
                if self.grid.is_blocked(nc, nr) {
                    continue;
                }
                let next = self.tile_index(nc, nr);
                if !visited[next] {
                    visited[next] = true;
                    parents[next] = Some(here);
                    queue.push_back((nc, nr));
                }
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
