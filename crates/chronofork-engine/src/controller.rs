//! The temporal controller: a stack of timeline generations and the tick
//! state machine that drives it.
//!
//! Each [`step`](TemporalController::step) resolves its [`InputFrame`] into
//! one [`TickAction`]:
//!
//! | tail      | action  | effect                                                           |
//! |-----------|---------|------------------------------------------------------------------|
//! | forwards  | advance | `tick += 1`, play the tick                                       |
//! | forwards  | rewind  | `tick -= 1` and restore while above the breakpoint, else abandon |
//! | backwards | advance | `tick -= 1` and play while above 0, else a boundary notice       |
//! | backwards | rewind  | `tick += 1` and restore while below the breakpoint, else abandon |
//! | any       | pause   | nothing                                                          |
//!
//! Rewinding the root at its breakpoint is a boundary notice as well. After
//! dispatch a requested fork is performed, the obstruction grid is rebuilt,
//! and a completed advance is checked for paradoxes and for a win.
//!
//! Playing a tick runs behaviors against the pre-tick world. Staged
//! snapshots are committed only after every active object ran, then the
//! queued commands are applied in FIFO order. Recorded objects are replayed
//! from their history.
//!
//! Any fatal error halts the controller: every later step returns
//! [`TemporalError::Halted`].

use std::time::{Duration, Instant};

use chronofork_journal::journal::{EventKind, TemporalEvent, TemporalJournal};
use chronofork_ledger::history::HistoryBuffer;
use chronofork_ledger::identity::{Direction, ObjectId};
use chronofork_ledger::kind::ObjectKind;
use chronofork_ledger::object::{Lifetime, TemporalObject};
use chronofork_ledger::snapshot::Snapshot;
use chronofork_ledger::timeline::Timeline;
use tracing::{debug, error, info, warn};

use crate::behavior::{BehaviorRegistry, WorldView};
use crate::behaviors;
use crate::cleanup::rewind_cleanup;
use crate::command::CommandBuffer;
use crate::config::EngineConfig;
use crate::input::{InputFrame, TickAction};
use crate::level::Level;
use crate::paradox;
use crate::perception::{GridPerception, ObstructionGrid, Perception, TileGrid};
use crate::promise::PromiseLedger;
use crate::TemporalError;

/// Status line shown when time cannot move any further.
pub const BOUNDARY_NOTICE: &str = "time's boundary";

/// Status line shown on the step the objective reaches an exit.
pub const WIN_NOTICE: &str = "objective secured";

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

/// What one [`TemporalController::step`] did, for the caller's HUD.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub action: TickAction,
    pub tick: u64,
    pub depth: usize,
    /// User-facing message raised during this step, if any.
    pub status: Option<String>,
    /// Pending paradox; advancing is refused until time is rewound.
    pub paradox: Option<String>,
    pub won: bool,
}

// ---------------------------------------------------------------------------
// StepDiagnostics
// ---------------------------------------------------------------------------

/// Counters and timing for the last step.
#[derive(Debug, Clone, Default)]
pub struct StepDiagnostics {
    /// Objects staged by behaviors or replayed from history.
    pub staged: usize,
    pub commands_applied: usize,
    pub commands_skipped: usize,
    /// Stale objects discarded before re-simulating a tick.
    pub discarded: usize,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TemporalController
// ---------------------------------------------------------------------------

/// Owner of the timeline stack and the single visible tick.
pub struct TemporalController {
    level: Level,
    config: EngineConfig,
    tiles: TileGrid,
    behaviors: BehaviorRegistry,
    perception: Box<dyn Perception>,
    /// Every generation below the tail, root first.
    ancestors: Vec<Timeline>,
    tail: Timeline,
    tick: u64,
    promises: PromiseLedger,
    grid: ObstructionGrid,
    journal: TemporalJournal,
    /// Message raised during the current step.
    status: Option<String>,
    paradox: Option<String>,
    won: bool,
    fork_requested: bool,
    /// Steps taken since the level was loaded, paused ones included.
    steps: u64,
    halted: Option<String>,
    last_diagnostics: StepDiagnostics,
}

impl TemporalController {
    /// Load `level` with the standard behaviors and grid perception.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(level: &Level, config: EngineConfig) -> Result<Self, TemporalError> {
        let perception = Box::new(GridPerception::new(&config));
        Self::with_collaborators(level, config, behaviors::standard(), perception)
    }

    /// Load `level` with caller-supplied collaborators.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn with_collaborators(
        level: &Level,
        config: EngineConfig,
        behaviors: BehaviorRegistry,
        perception: Box<dyn Perception>,
    ) -> Result<Self, TemporalError> {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        let tiles = level.tile_grid()?;
        let tail = level.build_root()?;
        let mut controller = Self {
            level: level.clone(),
            config,
            tiles,
            behaviors,
            perception,
            ancestors: Vec::new(),
            tail,
            tick: 0,
            promises: PromiseLedger::new(),
            grid: ObstructionGrid::default(),
            journal: TemporalJournal::new(),
            status: None,
            paradox: None,
            won: false,
            fork_requested: false,
            steps: 0,
            halted: None,
            last_diagnostics: StepDiagnostics::default(),
        };
        controller.settle_at_start()?;
        Ok(controller)
    }

    // -- driving ------------------------------------------------------------

    /// Run one step.
    ///
    /// Recoverable conditions are reported in [`TickOutcome::status`]. An
    /// error halts the controller.
    pub fn step(&mut self, input: &InputFrame) -> Result<TickOutcome, TemporalError> {
        self.guarded(|c| c.step_inner(input))
    }

    /// Fork a new generation at the current tick, as a reverse input would.
    ///
    /// Refused with [`TemporalError::ParadoxPending`] until the pending
    /// paradox is rewound or abandoned; the refusal does not halt.
    pub fn fork(&mut self) -> Result<(), TemporalError> {
        self.guarded(|c| {
            if let Some(paradox) = &c.paradox {
                return Err(TemporalError::ParadoxPending {
                    paradox: paradox.clone(),
                });
            }
            c.fork_inner()?;
            c.rebuild_grid();
            Ok(())
        })
    }

    /// Pop the tail generation and resume its parent at the fork point.
    ///
    /// Abandoning the root is rejected before anything changes and does not
    /// halt the controller.
    pub fn abandon(&mut self) -> Result<(), TemporalError> {
        self.guarded(Self::abandon_inner)
    }

    /// Reload `level` from scratch with a fresh journal and step counter.
    /// Clears a halt.
    pub fn reset_to(&mut self, level: &Level) -> Result<(), TemporalError> {
        self.tiles = level.tile_grid()?;
        self.level = level.clone();
        self.halted = None;
        self.steps = 0;
        self.journal.clear();
        self.reload()
    }

    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, TemporalError>,
    ) -> Result<T, TemporalError> {
        if let Some(reason) = &self.halted {
            return Err(TemporalError::Halted {
                reason: reason.clone(),
            });
        }
        let result = op(self);
        if let Err(err) = &result {
            let refused = matches!(
                err,
                TemporalError::AbandonRoot | TemporalError::ParadoxPending { .. }
            );
            if !refused {
                let reason = err.to_string();
                error!(
                    step = self.steps,
                    tick = self.tick,
                    depth = self.depth(),
                    %reason,
                    "temporal controller halted"
                );
                self.halted = Some(reason);
            }
        }
        result
    }

    fn step_inner(&mut self, input: &InputFrame) -> Result<TickOutcome, TemporalError> {
        let started = Instant::now();
        self.steps += 1;
        self.status = None;
        let mut diagnostics = StepDiagnostics::default();
        let action = TickAction::resolve(input);

        if input.restart {
            self.reload()?;
            self.record_event(EventKind::Restarted);
            info!(step = self.steps, level = %self.level.name, "level restarted");
            return Ok(self.outcome(action));
        }
        if action == TickAction::Pause {
            return Ok(self.outcome(action));
        }
        if input.reverse_pressed {
            self.fork_requested = true;
        }

        let mut played = false;
        if action == TickAction::Rewind {
            self.paradox = None;
            self.rewind()?;
        } else if let Some(paradox) = self.paradox.clone() {
            self.status = Some(paradox);
            self.fork_requested = false;
        } else {
            played = self.advance(input, &mut diagnostics)?;
        }

        if self.fork_requested {
            self.fork_requested = false;
            self.fork_inner()?;
        }
        self.rebuild_grid();

        if played {
            self.check_after_advance()?;
        }

        diagnostics.total_time = started.elapsed();
        self.last_diagnostics = diagnostics;
        Ok(self.outcome(action))
    }

    fn outcome(&self, action: TickAction) -> TickOutcome {
        TickOutcome {
            action,
            tick: self.tick,
            depth: self.depth(),
            status: self.status.clone(),
            paradox: self.paradox.clone(),
            won: self.won,
        }
    }

    // -- advance / rewind ---------------------------------------------------

    /// Returns whether a tick was played.
    fn advance(
        &mut self,
        input: &InputFrame,
        diagnostics: &mut StepDiagnostics,
    ) -> Result<bool, TemporalError> {
        match self.tail.direction() {
            Direction::Forwards => self.tick += 1,
            Direction::Backwards if self.tick > 0 => self.tick -= 1,
            Direction::Backwards => {
                self.boundary();
                return Ok(false);
            }
        }
        self.play_tick(input, diagnostics)?;
        Ok(true)
    }

    fn rewind(&mut self) -> Result<(), TemporalError> {
        let breakpoint = self.tail.breakpoint();
        let direction = self.tail.direction();
        let scrubbable = match direction {
            Direction::Forwards => self.tick > breakpoint,
            Direction::Backwards => self.tick < breakpoint,
        };
        if scrubbable {
            match direction {
                Direction::Forwards => self.tick -= 1,
                Direction::Backwards => self.tick += 1,
            }
            let discarded = self
                .promises
                .discard_rewound(self.depth(), self.tick, direction);
            if discarded > 0 {
                debug!(discarded, tick = self.tick, "promises rewound away");
            }
            self.restore_state(self.tick)
        } else if self.ancestors.is_empty() {
            self.boundary();
            Ok(())
        } else {
            self.abandon_inner()
        }
    }

    fn boundary(&mut self) {
        self.status = Some(BOUNDARY_NOTICE.to_owned());
        self.record_event(EventKind::Boundary);
        warn!(tick = self.tick, depth = self.depth(), "time's boundary");
    }

    // -- playTick / restoreState --------------------------------------------

    fn play_tick(
        &mut self,
        input: &InputFrame,
        diagnostics: &mut StepDiagnostics,
    ) -> Result<(), TemporalError> {
        let tick = self.tick;
        diagnostics.discarded = self.discard_stale_future(tick);

        // Stage every active object against the pre-tick world.
        let mut cmds = CommandBuffer::new();
        let mut staged: Vec<(ObjectId, bool, Snapshot)> = Vec::with_capacity(self.tail.len());
        {
            let view = WorldView {
                timeline: &self.tail,
                tick,
                input,
                promises: &self.promises,
                grid: &self.grid,
                perception: self.perception.as_ref(),
                config: &self.config,
            };
            for object in self.tail.active_at(tick) {
                let next = if object.recorded {
                    self.tail.history_at(object.id, tick)?.clone()
                } else {
                    self.behaviors.run(&view, object, &mut cmds)?
                };
                staged.push((object.id, object.recorded, next));
            }
        }
        diagnostics.staged = staged.len();

        // Commit.
        for (id, recorded, next) in staged {
            if !recorded {
                self.tail.record_history(id, tick, next.clone())?;
            }
            self.tail.object_mut(id)?.set_state(next);
        }

        let report = cmds.apply(&mut self.tail, &mut self.promises, tick)?;
        diagnostics.commands_applied = report.applied;
        diagnostics.commands_skipped = report.skipped;
        for message in report.notices {
            self.notice(message);
        }
        self.fork_requested |= report.fork_requested;

        let activated = self.promises.activate_crossings(&self.tail, tick);
        if activated > 0 {
            debug!(activated, tick, depth = self.depth(), "promises became binding");
        }

        self.rebuild_grid();
        if let Some(player) = self.tail.controlled() {
            paradox::record_observations(&mut self.tail, player, tick, self.perception.as_ref())?;
        }

        debug!(
            tick,
            depth = self.depth(),
            staged = diagnostics.staged,
            commands = report.applied,
            "played tick"
        );
        Ok(())
    }

    /// Before re-simulating `tick`, drop what an earlier pass through the
    /// same ticks left behind: objects this generation spawned at or beyond
    /// `tick`, and lifetimes closed at or beyond it on the side the tail is
    /// heading to.
    fn discard_stale_future(&mut self, tick: u64) -> usize {
        let depth = self.depth();
        let direction = self.tail.direction();
        let stale: Vec<ObjectId> = self
            .tail
            .objects()
            .filter(|o| !o.recorded && o.initial_timeline == depth)
            .filter(|o| Some(o.id) != self.tail.controlled())
            .filter(|o| o.birth().is_some_and(|birth| direction.reaches(birth, tick)))
            .map(|o| o.id)
            .collect();
        for id in &stale {
            self.tail.remove(*id);
        }

        for id in self.tail.ids_in_tick_order() {
            let Some(object) = self.tail.get_mut(id) else {
                continue;
            };
            if object.recorded || object.direction != direction {
                continue;
            }
            let closed_ahead = match direction {
                Direction::Forwards => object.lifetime.ending.is_some_and(|end| end >= tick),
                Direction::Backwards => {
                    object.lifetime.beginning > 0 && object.lifetime.beginning <= tick
                }
            };
            if closed_ahead {
                object.lifetime.reopen(direction);
            }
        }

        if !stale.is_empty() {
            debug!(tick, discarded = stale.len(), "discarded stale objects");
        }
        stale.len()
    }

    /// Read-only replay: every object active at `tick` takes its snapshot
    /// from history. A missing entry is fatal.
    fn restore_state(&mut self, tick: u64) -> Result<(), TemporalError> {
        let mut restored = 0usize;
        for id in self.tail.ids_in_tick_order() {
            let active = self.tail.get(id).is_some_and(|o| o.active_at(tick));
            if !active {
                continue;
            }
            let snapshot = self.tail.history_at(id, tick)?.clone();
            self.tail.object_mut(id)?.set_state(snapshot);
            restored += 1;
        }
        debug!(tick, depth = self.depth(), restored, "restored state");
        Ok(())
    }

    // -- fork / abandon -----------------------------------------------------

    fn fork_inner(&mut self) -> Result<(), TemporalError> {
        let at = self.tick;
        let parent_direction = self.tail.direction();
        let predecessor_id = self
            .tail
            .controlled()
            .ok_or(TemporalError::MissingPlayer {
                depth: self.depth(),
            })?;
        let predecessor = self.tail.object(predecessor_id)?.clone();

        let mut child = self.tail.fork(at)?;
        let new_depth = child.depth();
        let new_direction = child.direction();

        let held = predecessor
            .state
            .held_object_id
            .filter(|id| child.contains(*id));
        let container = predecessor
            .state
            .container_id
            .filter(|id| child.contains(*id));

        let successor = child.allocate_id();
        let held_successor = held.map(|_| child.allocate_id());
        let container_successor = container.map(|_| child.allocate_id());

        let mut player_state = predecessor.state.clone();
        player_state.held_object_id = held_successor;
        player_state.container_id = container_successor;
        seed_successor(&mut child, successor, ObjectKind::Player, player_state, at);

        if let (Some(item), Some(item_successor)) = (held, held_successor) {
            let original = child.object(item)?;
            let kind = original.kind;
            let mut state = original.state.clone();
            state.attached_object_id = Some(successor);
            seed_successor(&mut child, item_successor, kind, state, at);
        }
        if let (Some(container), Some(container_successor)) = (container, container_successor) {
            let original = child.object(container)?;
            let kind = original.kind;
            let state = original.state.clone();
            seed_successor(&mut child, container_successor, kind, state, at);
            child.object_mut(container_successor)?.occupant = Some(successor);
        }

        for retired in [Some(predecessor_id), held].into_iter().flatten() {
            let history = child.history(retired)?;
            let (first, last) = (history.first_tick(), history.len().saturating_sub(1));
            let object = child.object_mut(retired)?;
            object.lifetime.close(at, parent_direction);
            object.lifetime.clamp(first, last);
            object.final_timeline = Some(new_depth - 1);
            object.recorded = true;
        }

        child.set_controlled(successor);
        let purged = child.purge_unreachable_transients(at);

        let parent = std::mem::replace(&mut self.tail, child);
        self.ancestors.push(parent);
        self.record_event(EventKind::Forked {
            at_tick: at,
            new_depth,
            predecessor: predecessor_id,
            successor,
        });
        info!(
            at_tick = at,
            new_depth,
            direction = %new_direction,
            predecessor = %predecessor_id,
            successor = %successor,
            purged = purged.len(),
            "forked timeline"
        );
        Ok(())
    }

    fn abandon_inner(&mut self) -> Result<(), TemporalError> {
        let parent = self.ancestors.pop().ok_or(TemporalError::AbandonRoot)?;
        let discarded = std::mem::replace(&mut self.tail, parent);
        let discarded_depth = discarded.depth();
        self.tick = discarded.breakpoint();

        let removed = rewind_cleanup(&mut self.tail, &mut self.promises, self.tick);
        self.restore_state(self.tick)?;
        self.paradox = None;
        self.fork_requested = false;
        self.rebuild_grid();

        info!(
            discarded_depth,
            resumed_depth = self.depth(),
            tick = self.tick,
            removed = removed.len(),
            "abandoned timeline"
        );
        self.record_event(EventKind::Abandoned {
            discarded_depth,
            removed,
        });
        Ok(())
    }

    // -- paradox / win ------------------------------------------------------

    fn check_after_advance(&mut self) -> Result<(), TemporalError> {
        let found = paradox::check_paradoxes(
            &self.tail,
            self.tick,
            &self.config,
            self.perception.as_ref(),
        )?;
        if let Some(message) = found {
            warn!(tick = self.tick, depth = self.depth(), %message, "paradox");
            self.record_event(EventKind::Paradox {
                message: message.clone(),
            });
            self.status = Some(message.clone());
            self.paradox = Some(message);
        } else if !self.won && paradox::check_win(&self.tail, self.tick, &self.config) {
            self.won = true;
            self.status = Some(WIN_NOTICE.to_owned());
            self.record_event(EventKind::Won);
            info!(tick = self.tick, depth = self.depth(), "level won");
        }
        Ok(())
    }

    // -- helpers ------------------------------------------------------------

    /// Reset the stack to the level's root generation, keeping the journal
    /// and the step counter.
    fn reload(&mut self) -> Result<(), TemporalError> {
        self.tail = self.level.build_root()?;
        self.ancestors.clear();
        self.tick = 0;
        self.promises.clear();
        self.status = None;
        self.paradox = None;
        self.won = false;
        self.fork_requested = false;
        self.settle_at_start()
    }

    /// Grid and first observation frame at tick 0.
    fn settle_at_start(&mut self) -> Result<(), TemporalError> {
        self.rebuild_grid();
        if let Some(player) = self.tail.controlled() {
            paradox::record_observations(&mut self.tail, player, 0, self.perception.as_ref())?;
        }
        Ok(())
    }

    fn rebuild_grid(&mut self) {
        self.grid =
            ObstructionGrid::rebuild(&self.tiles, &self.tail, self.tick, self.config.tile_size);
        self.perception.rebuild(&self.grid);
    }

    fn notice(&mut self, message: String) {
        self.record_event(EventKind::Notice {
            message: message.clone(),
        });
        self.status = Some(message);
    }

    fn record_event(&mut self, kind: EventKind) {
        self.journal.record(TemporalEvent {
            step: self.steps,
            tick: self.tick,
            depth: self.depth(),
            kind,
        });
    }

    // -- accessors ----------------------------------------------------------

    /// The tick on the visible axis.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Stack depth; the root alone is depth 1.
    pub fn depth(&self) -> usize {
        self.tail.depth()
    }

    pub fn direction(&self) -> Direction {
        self.tail.direction()
    }

    /// The tail generation.
    pub fn tail(&self) -> &Timeline {
        &self.tail
    }

    /// Every generation, root first, tail last.
    pub fn timelines(&self) -> impl Iterator<Item = &Timeline> + '_ {
        self.ancestors.iter().chain(std::iter::once(&self.tail))
    }

    pub fn controlled_player(&self) -> Option<&TemporalObject> {
        self.tail.controlled().and_then(|id| self.tail.get(id))
    }

    /// Message raised by the last step.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn paradox(&self) -> Option<&str> {
        self.paradox.as_deref()
    }

    pub fn has_won(&self) -> bool {
        self.won
    }

    pub fn grid(&self) -> &ObstructionGrid {
        &self.grid
    }

    pub fn promises(&self) -> &PromiseLedger {
        &self.promises
    }

    pub fn journal(&self) -> &TemporalJournal {
        &self.journal
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Steps taken since the level was loaded.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Wall-clock seconds represented by the steps taken so far.
    ///
    /// Computed as `steps * fixed_dt` to avoid floating-point drift from
    /// repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.steps as f64 * self.config.fixed_dt
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn last_diagnostics(&self) -> &StepDiagnostics {
        &self.last_diagnostics
    }
}

/// Insert a successor born at `at` in the child's direction, with its
/// history seeded at `at`.
fn seed_successor(child: &mut Timeline, id: ObjectId, kind: ObjectKind, state: Snapshot, at: u64) {
    let direction = child.direction();
    let mut object = TemporalObject::new(id, kind, state.clone());
    object.lifetime = Lifetime::born_at(at, direction);
    object.direction = direction;
    object.initial_timeline = child.depth();
    child.insert(object, HistoryBuffer::seeded(at, state));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chronofork_ledger::prelude::*;

    fn corridor() -> Level {
        Level::new("corridor", &["##########", "#........#", "#........#", "##########"])
            .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
    }

    fn controller() -> TemporalController {
        TemporalController::new(&corridor(), EngineConfig::default()).unwrap()
    }

    fn run(c: &mut TemporalController, input: InputFrame, n: usize) {
        for _ in 0..n {
            c.step(&input).unwrap();
        }
    }

    // -- 1. construction ----------------------------------------------------

    #[test]
    fn starts_at_tick_zero_on_the_root() {
        let c = controller();
        assert_eq!(c.tick(), 0);
        assert_eq!(c.depth(), 1);
        assert_eq!(c.direction(), Direction::Forwards);
        assert!(c.controlled_player().is_some());
        assert!(c.tail().observations(ObjectId(0)).is_some());
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive and finite")]
    fn zero_dt_panics() {
        let config = EngineConfig {
            fixed_dt: 0.0,
            ..Default::default()
        };
        let _ = TemporalController::new(&corridor(), config);
    }

    // -- 2. tick state machine ----------------------------------------------

    #[test]
    fn advance_then_rewind_to_the_root_boundary() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 3);
        assert_eq!(c.tick(), 3);
        run(&mut c, InputFrame::rewind(), 3);
        assert_eq!(c.tick(), 0);

        let outcome = c.step(&InputFrame::rewind()).unwrap();
        assert_eq!(outcome.tick, 0);
        assert_eq!(outcome.status.as_deref(), Some(BOUNDARY_NOTICE));
        assert_eq!(c.journal().all_events().last().unwrap().kind, EventKind::Boundary);
    }

    #[test]
    fn pause_changes_nothing_but_the_step_counter() {
        let mut c = controller();
        run(&mut c, InputFrame::moving(1.0, 0.0), 2);
        let before = c.tail().clone();
        let outcome = c.step(&InputFrame::pause()).unwrap();
        assert_eq!(outcome.action, TickAction::Pause);
        assert_eq!(c.tail(), &before);
        assert_eq!(c.steps(), 3);
    }

    #[test]
    fn backwards_tail_stops_at_zero() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 2);
        c.fork().unwrap();
        run(&mut c, InputFrame::idle(), 2);
        assert_eq!(c.tick(), 0);
        let outcome = c.step(&InputFrame::idle()).unwrap();
        assert_eq!(outcome.status.as_deref(), Some(BOUNDARY_NOTICE));
        assert_eq!(c.tick(), 0);
    }

    #[test]
    fn rewinding_a_child_at_its_breakpoint_abandons_it() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 5);
        c.step(&InputFrame::reverse()).unwrap();
        assert_eq!(c.depth(), 2);
        assert_eq!(c.tick(), 6);

        run(&mut c, InputFrame::idle(), 2);
        assert_eq!(c.tick(), 4);
        run(&mut c, InputFrame::rewind(), 2);
        assert_eq!(c.tick(), 6);
        c.step(&InputFrame::rewind()).unwrap();
        assert_eq!(c.depth(), 1);
        assert_eq!(c.tick(), 6);
        assert_eq!(c.journal().abandons().count(), 1);
    }

    // -- 3. fork ------------------------------------------------------------

    #[test]
    fn fork_hands_control_to_a_successor() {
        let mut c = controller();
        run(&mut c, InputFrame::moving(1.0, 0.0), 4);
        let predecessor = c.controlled_player().unwrap().id;
        c.fork().unwrap();

        let successor = c.controlled_player().unwrap();
        assert_ne!(successor.id, predecessor);
        assert_eq!(successor.direction, Direction::Backwards);
        assert_eq!(successor.initial_timeline, 2);
        assert_eq!(successor.lifetime, Lifetime::born_at(4, Direction::Backwards));

        let old = c.tail().get(predecessor).unwrap();
        assert!(old.recorded);
        assert_eq!(old.final_timeline, Some(1));
        assert_eq!(old.lifetime.ending, Some(4));
        assert_eq!(successor.state.position, old.state.position);
    }

    #[test]
    fn fork_then_abandon_round_trips() {
        let mut c = controller();
        run(&mut c, InputFrame::moving(1.0, 0.0), 6);
        let tail_before = c.tail().clone();
        c.fork().unwrap();
        c.abandon().unwrap();
        assert_eq!(c.tick(), 6);
        assert_eq!(c.depth(), 1);
        assert_eq!(c.tail(), &tail_before);
    }

    #[test]
    fn abandoning_the_root_is_rejected_without_halting() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 2);
        let before = c.tail().clone();
        assert!(matches!(c.abandon(), Err(TemporalError::AbandonRoot)));
        assert!(!c.is_halted());
        assert_eq!(c.tail(), &before);
        assert_eq!(c.tick(), 2);
    }

    #[test]
    fn forking_waits_for_a_pending_paradox_to_clear() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 4);
        c.paradox = Some("missed a knife".to_owned());

        let err = c.fork().unwrap_err();
        assert!(matches!(err, TemporalError::ParadoxPending { .. }));
        assert!(!c.is_halted());
        assert_eq!((c.depth(), c.tick()), (1, 4));

        c.step(&InputFrame::rewind()).unwrap();
        assert!(c.paradox().is_none());
        c.fork().unwrap();
        assert_eq!((c.depth(), c.tick()), (2, 3));
    }

    // -- 4. halting ---------------------------------------------------------

    #[test]
    fn fork_without_a_player_halts() {
        let mut c = controller();
        let player = c.controlled_player().unwrap().id;
        c.tail.remove(player);
        let err = c.fork().unwrap_err();
        assert!(matches!(err, TemporalError::MissingPlayer { depth: 1 }));
        assert!(c.is_halted());
        assert!(matches!(
            c.step(&InputFrame::idle()),
            Err(TemporalError::Halted { .. })
        ));
    }

    // -- 5. restart ---------------------------------------------------------

    #[test]
    fn restart_reloads_but_keeps_the_journal() {
        let mut c = controller();
        run(&mut c, InputFrame::idle(), 3);
        c.fork().unwrap();
        c.step(&InputFrame {
            restart: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.tick(), 0);
        assert_eq!(c.depth(), 1);
        assert_eq!(c.journal().forks().count(), 1);
        assert_eq!(c.journal().all_events().last().unwrap().kind, EventKind::Restarted);
    }

    #[test]
    fn sim_time_counts_steps() {
        let mut c = controller();
        run(&mut c, InputFrame::pause(), 60);
        assert!((c.sim_time() - 1.0).abs() < 1e-9);
    }
}
