//! Property tests for the temporal controller.
//!
//! Random sequences of advance, rewind, reverse, pause and interact inputs
//! must keep the timeline stack consistent after every step, never mutate a
//! generation below the tail, and replay deterministically.

use chronofork_engine::prelude::*;
use proptest::prelude::*;

/// Inputs a player can give in one step.
#[derive(Debug, Clone)]
enum Op {
    Walk(i8, i8),
    Idle,
    Rewind,
    Reverse,
    Pause,
    Interact,
    Throw,
}

impl Op {
    fn input(&self) -> InputFrame {
        match self {
            Op::Walk(x, y) => InputFrame::moving(f64::from(*x), f64::from(*y)),
            Op::Idle => InputFrame::idle(),
            Op::Rewind => InputFrame::rewind(),
            Op::Reverse => InputFrame::reverse(),
            Op::Pause => InputFrame::pause(),
            Op::Interact => InputFrame {
                interact: true,
                ..Default::default()
            },
            Op::Throw => InputFrame {
                throw: true,
                ..Default::default()
            },
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (-1i8..=1, -1i8..=1).prop_map(|(x, y)| Op::Walk(x, y)),
        2 => Just(Op::Idle),
        3 => Just(Op::Rewind),
        1 => Just(Op::Reverse),
        1 => Just(Op::Pause),
        1 => Just(Op::Interact),
        1 => Just(Op::Throw),
    ]
}

fn level() -> Level {
    Level::new(
        "yard",
        &[
            "##########",
            "#........#",
            "#........#",
            "#........#",
            "##########",
        ],
    )
    .with(ObjectKind::Player, Snapshot::at(80.0, 80.0))
    .with(
        ObjectKind::Throwable(ThrowableKind::Knife),
        Snapshot::at(96.0, 80.0),
    )
}

fn check_stack(c: &TemporalController) {
    let timelines: Vec<&Timeline> = c.timelines().collect();
    assert_eq!(timelines.len(), c.depth());
    assert_eq!(c.direction(), Direction::for_depth(c.depth()));
    for (i, timeline) in timelines.iter().enumerate() {
        assert_eq!(timeline.depth(), i + 1);
    }

    let tail = c.tail();
    match c.direction() {
        Direction::Forwards => assert!(c.tick() >= tail.breakpoint()),
        Direction::Backwards => assert!(c.tick() <= tail.breakpoint()),
    }

    let player = c.controlled_player().expect("a controlled player");
    assert!(!player.recorded);
    assert!(player.active_at(c.tick()));
    assert_eq!(player.direction, c.direction());
    let live_players = tail
        .active_at(c.tick())
        .filter(|o| o.kind.is_player() && !o.recorded)
        .count();
    assert_eq!(live_players, 1);

    for object in tail.active_at(c.tick()).filter(|o| o.recorded) {
        let history = tail.history(object.id).unwrap();
        assert!(history.covers(c.tick()), "{} has no history at {}", object.id, c.tick());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The stack stays well formed after every step.
    #[test]
    fn stack_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        check_stack(&c);
        for op in &ops {
            c.step(&op.input()).unwrap();
            check_stack(&c);
        }
        prop_assert!(!c.is_halted());
    }

    /// Generations below the tail are never written to.
    #[test]
    fn ancestors_are_immutable(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut c = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        for op in &ops {
            let before: Vec<Timeline> = c.timelines().cloned().collect();
            let ancestors_before = before.len() - 1;
            c.step(&op.input()).unwrap();
            let after: Vec<Timeline> = c.timelines().cloned().collect();
            let shared = ancestors_before.min(after.len() - 1);
            prop_assert_eq!(&before[..shared], &after[..shared]);
        }
    }

    /// Two controllers fed the same inputs end in the same state.
    #[test]
    fn sessions_are_deterministic(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut a = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        let mut b = TemporalController::new(&level(), EngineConfig::default()).unwrap();
        for op in &ops {
            let input = op.input();
            let oa = a.step(&input).unwrap();
            let ob = b.step(&input).unwrap();
            prop_assert_eq!(oa, ob);
        }
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.tail(), b.tail());
    }
}
