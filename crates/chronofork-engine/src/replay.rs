//! Deterministic replay with input recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] captures the level, the engine configuration, every
//! non-idle [`InputFrame`] and periodic state hash checkpoints, producing a
//! [`ReplayLog`]. [`replay`] reloads a controller from the logged level,
//! feeds the recorded inputs step by step and compares state hashes at each
//! checkpoint. Because rewinding and forking are ordinary inputs, a log
//! covers a whole session across any number of generations.
//!
//! # Recording and replaying
//!
//! ```
//! use chronofork_engine::prelude::*;
//!
//! let level = Level::new("hall", &["########", "#......#", "########"])
//!     .with(ObjectKind::Player, Snapshot::at(48.0, 48.0));
//! let config = EngineConfig::default();
//! let mut controller = TemporalController::new(&level, config.clone()).unwrap();
//!
//! let mut recorder = ReplayRecorder::new(level.clone(), config, 4);
//! let script = [
//!     InputFrame::moving(1.0, 0.0),
//!     InputFrame::moving(1.0, 0.0),
//!     InputFrame::reverse(),
//!     InputFrame::idle(),
//!     InputFrame::rewind(),
//! ];
//! for input in script.iter().cycle().take(20) {
//!     let hash = controller.state_hash();
//!     recorder.record_step(controller.steps(), input, Some(hash));
//!     controller.step(input).unwrap();
//! }
//! let log = recorder.finish();
//!
//! let result = replay(&mut controller, &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! assert_eq!(result.steps_replayed, 20);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::controller::TemporalController;
use crate::input::InputFrame;
use crate::level::Level;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay log: the level and configuration plus an ordered
/// sequence of inputs and checkpoints.
///
/// The log is fully serializable to JSON for storage or regression test
/// fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Replay begins by reloading this level.
    pub level: Level,
    /// Configuration the session ran with. Replay refuses a controller
    /// configured differently.
    pub config: EngineConfig,
    /// Replay executes exactly this many steps, whatever the entries hold.
    pub total_steps: u64,
    pub entries: Vec<ReplayEntry>,
}

// ---------------------------------------------------------------------------
// ReplayEntry
// ---------------------------------------------------------------------------

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Input for the given step. Steps without an entry ran an idle frame.
    Input { step: u64, input: InputFrame },
    /// State hash taken before the given step was executed.
    Checkpoint { step: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of replaying a [`ReplayLog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every step ran without a divergence.
    pub completed: bool,
    pub steps_replayed: u64,
    /// The first checkpoint whose hash did not match. `None` if the replay
    /// was deterministic.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details about a determinism failure detected during replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub step: u64,
    /// Tick the controller was on when the divergence was found.
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a session into a [`ReplayLog`].
///
/// Call [`record_step`](Self::record_step) before each step, then
/// [`finish`](Self::finish). Step numbers must strictly increase.
pub struct ReplayRecorder {
    log: ReplayLog,
    /// How often (in steps) to keep a checkpoint. 0 keeps every hash given.
    checkpoint_interval: u64,
    steps_recorded: u64,
    last_step: Option<u64>,
}

impl ReplayRecorder {
    pub fn new(level: Level, config: EngineConfig, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                level,
                config,
                total_steps: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            steps_recorded: 0,
            last_step: None,
        }
    }

    /// Record one step before it is executed.
    ///
    /// Non-idle inputs are stored. A checkpoint is stored when `state_hash`
    /// is given and the step falls on the interval.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not strictly greater than the previous one.
    pub fn record_step(&mut self, step: u64, input: &InputFrame, state_hash: Option<String>) {
        if let Some(prev) = self.last_step {
            assert!(
                step > prev,
                "ReplayRecorder::record_step: step {step} is not strictly greater than previous step {prev}"
            );
        }
        self.last_step = Some(step);
        self.steps_recorded += 1;

        if !input.is_empty() {
            self.log.entries.push(ReplayEntry::Input {
                step,
                input: input.clone(),
            });
        }

        if let Some(hash) = state_hash {
            let should_checkpoint =
                self.checkpoint_interval == 0 || step % self.checkpoint_interval == 0;
            if should_checkpoint {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    step,
                    state_hash: hash,
                });
            }
        }
    }

    pub fn finish(mut self) -> ReplayLog {
        self.log.total_steps = self.steps_recorded;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `controller`, verifying state hashes at each checkpoint.
///
/// The log is validated (no duplicate entries, matching configuration)
/// before the controller is touched. The controller is then reset to the
/// logged level and stepped `total_steps` times. Replay stops at the first
/// divergence.
///
/// # Errors
///
/// Returns an error if the log is malformed, the level cannot be loaded, or
/// the controller halts while stepping.
pub fn replay(
    controller: &mut TemporalController,
    log: &ReplayLog,
) -> Result<ReplayResult, anyhow::Error> {
    let mut input_map: BTreeMap<u64, &InputFrame> = BTreeMap::new();
    let mut checkpoint_map: BTreeMap<u64, &str> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { step, input } => {
                if input_map.insert(*step, input).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Input entry at step {step}"
                    ));
                }
            }
            ReplayEntry::Checkpoint { step, state_hash } => {
                if checkpoint_map.insert(*step, state_hash).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Checkpoint entry at step {step}"
                    ));
                }
            }
        }
    }

    if controller.config() != &log.config {
        return Err(anyhow::anyhow!(
            "replay log was recorded with a different engine configuration"
        ));
    }

    controller
        .reset_to(&log.level)
        .map_err(|e| anyhow::anyhow!("failed to load level for replay: {e}"))?;

    let mut steps_replayed: u64 = 0;
    let idle = InputFrame::idle();

    for step in 0..log.total_steps {
        if let Some(expected_hash) = checkpoint_map.get(&step) {
            let actual_hash = controller.state_hash();
            if actual_hash != *expected_hash {
                warn!(step, tick = controller.tick(), "replay diverged");
                return Ok(ReplayResult {
                    completed: false,
                    steps_replayed,
                    first_divergence: Some(ReplayDivergence {
                        step,
                        tick: controller.tick(),
                        expected_hash: (*expected_hash).to_owned(),
                        actual_hash,
                    }),
                });
            }
        }

        let input = input_map.get(&step).copied().unwrap_or(&idle);
        controller
            .step(input)
            .map_err(|e| anyhow::anyhow!("replay halted at step {step}: {e}"))?;
        steps_replayed += 1;
    }

    info!(
        steps = steps_replayed,
        checkpoints = checkpoint_map.len(),
        level = %log.level.name,
        "replay completed"
    );
    Ok(ReplayResult {
        completed: true,
        steps_replayed,
        first_divergence: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    fn level() -> Level {
        Level::new("yard", &["########", "#......#", "#......#", "########"])
            .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
            .with(ObjectKind::Enemy, Snapshot::at(176.0, 80.0))
            .with(
                ObjectKind::Throwable(ThrowableKind::Gun),
                Snapshot::at(56.0, 48.0),
            )
    }

    fn record(inputs: &[InputFrame], interval: u64) -> (TemporalController, ReplayLog) {
        let config = EngineConfig::default();
        let mut c = TemporalController::new(&level(), config.clone()).unwrap();
        let mut recorder = ReplayRecorder::new(level(), config, interval);
        for input in inputs {
            recorder.record_step(c.steps(), input, Some(c.state_hash()));
            c.step(input).unwrap();
        }
        (c, recorder.finish())
    }

    fn session() -> Vec<InputFrame> {
        let mut inputs = vec![InputFrame::moving(1.0, 0.0); 6];
        inputs.push(InputFrame {
            interact: true,
            ..Default::default()
        });
        inputs.extend(vec![InputFrame::moving(0.0, 1.0); 4]);
        inputs.push(InputFrame {
            fire: true,
            ..Default::default()
        });
        inputs.push(InputFrame::reverse());
        inputs.extend(vec![InputFrame::idle(); 5]);
        inputs.extend(vec![InputFrame::rewind(); 8]);
        inputs.push(InputFrame::pause());
        inputs
    }

    // -- 1. recorder --------------------------------------------------------

    #[test]
    fn idle_inputs_are_not_stored() {
        let (_, log) = record(&[InputFrame::idle(), InputFrame::moving(1.0, 0.0)], 0);
        let inputs: Vec<u64> = log
            .entries
            .iter()
            .filter_map(|e| match e {
                ReplayEntry::Input { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(inputs, vec![1]);
        assert_eq!(log.total_steps, 2);
    }

    #[test]
    fn checkpoints_follow_the_interval() {
        let (_, log) = record(&vec![InputFrame::idle(); 10], 4);
        let checkpoints: Vec<u64> = log
            .entries
            .iter()
            .filter_map(|e| match e {
                ReplayEntry::Checkpoint { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(checkpoints, vec![0, 4, 8]);
    }

    #[test]
    #[should_panic(expected = "not strictly greater")]
    fn non_monotonic_steps_panic() {
        let mut recorder = ReplayRecorder::new(level(), EngineConfig::default(), 1);
        recorder.record_step(3, &InputFrame::idle(), None);
        recorder.record_step(3, &InputFrame::idle(), None);
    }

    // -- 2. replay ----------------------------------------------------------

    #[test]
    fn a_session_with_forks_and_scrubs_replays_exactly() {
        let (mut c, log) = record(&session(), 1);
        let final_hash = c.state_hash();
        let result = replay(&mut c, &log).unwrap();
        assert!(result.completed, "diverged: {:?}", result.first_divergence);
        assert_eq!(result.steps_replayed, log.total_steps);
        assert_eq!(c.state_hash(), final_hash);
    }

    #[test]
    fn a_tampered_checkpoint_is_reported() {
        let (mut c, mut log) = record(&session(), 5);
        for entry in &mut log.entries {
            if let ReplayEntry::Checkpoint { step: 10, state_hash } = entry {
                *state_hash = "0".repeat(64);
            }
        }
        let result = replay(&mut c, &log).unwrap();
        assert!(!result.completed);
        let divergence = result.first_divergence.unwrap();
        assert_eq!(divergence.step, 10);
        assert_eq!(result.steps_replayed, 10);
    }

    #[test]
    fn duplicate_entries_are_rejected_before_touching_the_controller() {
        let (mut c, mut log) = record(&session(), 0);
        log.entries.push(ReplayEntry::Input {
            step: 0,
            input: InputFrame::moving(1.0, 0.0),
        });
        let tick = c.tick();
        assert!(replay(&mut c, &log).is_err());
        assert_eq!(c.tick(), tick);
    }

    #[test]
    fn a_different_config_is_rejected() {
        let (mut c, mut log) = record(&session(), 0);
        log.config.player_speed += 1.0;
        let err = replay(&mut c, &log).unwrap_err();
        assert!(err.to_string().contains("different engine configuration"));
    }

    #[test]
    fn log_round_trips_through_json() {
        let (_, log) = record(&session(), 3);
        let json = serde_json::to_string(&log).unwrap();
        let back: ReplayLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level, log.level);
        assert_eq!(back.total_steps, log.total_steps);
        assert_eq!(back.entries.len(), log.entries.len());
    }
}
