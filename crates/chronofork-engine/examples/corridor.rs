//! Scripted headless session: a door held open by a past self.
//!
//! The player stands on a switch that opens a door, reverses time, and walks
//! the successor through the door while the recorded predecessor keeps the
//! switch pressed. Each step prints the tick, the stack and any status line.
//!
//! Run with:
//!   cargo run --example corridor -p chronofork-engine
//!
//! Set `RUST_LOG=chronofork_engine=debug` to watch forks, abandons and
//! paradox checks as they happen.

use chronofork_engine::prelude::*;

const LEVEL: &str = r#############"{
    "name": "corridor",
    "tiles": [
        "############",
        "#....#.....#",
        "#..........#",
        "#....#.....#",
        "############"
    ],
    "objects": [
        { "kind": "Player", "snapshot": { "position": { "x": 48.0, "y": 80.0 } } },
        { "kind": "Switch", "snapshot": { "position": { "x": 112.0, "y": 48.0 } } },
        { "kind": "Door", "snapshot": { "position": { "x": 176.0, "y": 80.0 }, "linked_object_id": 1 } },
        { "kind": { "Throwable": "Objective" }, "snapshot": { "position": { "x": 272.0, "y": 80.0 } } },
        { "kind": "Exit", "snapshot": { "position": { "x": 48.0, "y": 112.0 } } }
    ]
}"#############;

fn print_outcome(step: usize, c: &TemporalController, outcome: &TickOutcome) {
    let status = outcome
        .status
        .as_deref()
        .map(|s| format!("  [{s}]"))
        .unwrap_or_default();
    println!(
        "step {step:>3}  tick {:>3}  depth {}  {:<9}  {:?}{status}",
        outcome.tick,
        outcome.depth,
        c.direction().to_string(),
        outcome.action,
    );
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let level = Level::from_json_str(LEVEL)?;
    let mut controller = TemporalController::new(&level, EngineConfig::default())?;

    let interact = InputFrame {
        interact: true,
        ..Default::default()
    };

    // Walk onto the switch, wait there, then reverse time.
    let mut script: Vec<InputFrame> = Vec::new();
    script.extend(std::iter::repeat(InputFrame::moving(1.0, -0.5)).take(32));
    script.extend(std::iter::repeat(InputFrame::idle()).take(40));
    script.push(InputFrame::reverse());
    // The successor heads for the door while the past self holds the switch.
    script.extend(std::iter::repeat(InputFrame::moving(1.0, 0.5)).take(16));
    script.extend(std::iter::repeat(InputFrame::moving(1.0, 0.0)).take(40));
    script.push(interact);
    script.extend(std::iter::repeat(InputFrame::rewind()).take(4));
    script.extend(std::iter::repeat(InputFrame::moving(-1.0, 0.0)).take(8));

    for (step, input) in script.iter().enumerate() {
        let outcome = controller.step(input)?;
        if outcome.status.is_some() || step % 8 == 0 {
            print_outcome(step, &controller, &outcome);
        }
    }

    let diagnostics = controller.last_diagnostics();
    println!();
    println!(
        "finished at tick {} on depth {} after {} steps ({:.2}s simulated)",
        controller.tick(),
        controller.depth(),
        controller.steps(),
        controller.sim_time(),
    );
    println!(
        "last step staged {} objects and applied {} commands in {:?}",
        diagnostics.staged, diagnostics.commands_applied, diagnostics.total_time
    );
    println!(
        "journal: {} forks, {} abandons, {} paradoxes",
        controller.journal().forks().count(),
        controller.journal().abandons().count(),
        controller.journal().paradoxes().count(),
    );
    println!("state hash: {}", controller.state_hash());
    Ok(())
}
