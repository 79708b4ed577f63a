//! Integration tests for paradox detection and the win condition, driven
//! through the controller with the standard behaviors.

use chronofork_engine::controller::WIN_NOTICE;
use chronofork_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HALL: [&str; 4] = [
    "##############",
    "#............#",
    "#............#",
    "##############",
];

fn start(level: &Level, config: EngineConfig) -> TemporalController {
    TemporalController::new(level, config).unwrap()
}

fn button(f: impl FnOnce(&mut InputFrame)) -> InputFrame {
    let mut input = InputFrame::default();
    f(&mut input);
    input
}

/// Step until a paradox is raised or `limit` steps ran.
fn until_paradox(
    c: &mut TemporalController,
    input: &InputFrame,
    limit: usize,
) -> Option<TickOutcome> {
    for _ in 0..limit {
        let outcome = c.step(input).unwrap();
        if outcome.paradox.is_some() {
            return Some(outcome);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// 1. Observation paradoxes
// ---------------------------------------------------------------------------

#[test]
fn taking_an_item_a_past_self_saw_is_a_paradox() {
    let level = Level::new("knife", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(
            ObjectKind::Throwable(ThrowableKind::Knife),
            Snapshot::at(80.0, 48.0),
        );
    let mut c = start(&level, EngineConfig::default());

    for _ in 0..10 {
        assert!(c.step(&InputFrame::idle()).unwrap().paradox.is_none());
    }
    c.step(&InputFrame::reverse()).unwrap();
    assert_eq!((c.depth(), c.tick()), (2, 11));

    // Walking is harmless: the past self ignores other players.
    for _ in 0..4 {
        let outcome = c.step(&InputFrame::moving(1.0, 0.0)).unwrap();
        assert!(outcome.paradox.is_none(), "{outcome:?}");
    }
    let outcome = c.step(&button(|i| i.interact = true)).unwrap();
    assert_eq!(outcome.tick, 6);
    assert_eq!(outcome.paradox.as_deref(), Some("missed a knife"));
    assert_eq!(c.journal().last_paradox(), Some("missed a knife"));
}

#[test]
fn a_pending_paradox_blocks_advancing_until_rewound() {
    let level = Level::new("knife", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(
            ObjectKind::Throwable(ThrowableKind::Knife),
            Snapshot::at(80.0, 48.0),
        );
    let mut c = start(&level, EngineConfig::default());
    for _ in 0..10 {
        c.step(&InputFrame::idle()).unwrap();
    }
    c.step(&InputFrame::reverse()).unwrap();
    for _ in 0..4 {
        c.step(&InputFrame::moving(1.0, 0.0)).unwrap();
    }
    c.step(&button(|i| i.interact = true)).unwrap();
    let tick = c.tick();

    let refused = c.step(&InputFrame::idle()).unwrap();
    assert_eq!(refused.tick, tick);
    assert_eq!(refused.status.as_deref(), Some("missed a knife"));

    // A reverse press while blocked does not fork either.
    let refused = c.step(&InputFrame::reverse()).unwrap();
    assert_eq!(refused.depth, 2);

    let rewound = c.step(&InputFrame::rewind()).unwrap();
    assert_eq!(rewound.tick, tick + 1);
    assert!(rewound.paradox.is_none());
    assert!(c.paradox().is_none());
}

// ---------------------------------------------------------------------------
// 2. Hazards
// ---------------------------------------------------------------------------

#[test]
fn walking_into_a_replayed_bullet_is_a_paradox() {
    let level = Level::new("range", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(
            ObjectKind::Throwable(ThrowableKind::Gun),
            Snapshot::at(48.0, 48.0),
        );
    let mut c = start(&level, EngineConfig::default());
    c.step(&button(|i| i.interact = true)).unwrap();
    c.step(&button(|i| i.fire = true)).unwrap();
    assert_eq!(c.tail().of_kind(ObjectKind::Bullet).count(), 1);
    for _ in 0..5 {
        c.step(&InputFrame::idle()).unwrap();
    }
    c.step(&InputFrame::reverse()).unwrap();
    assert_eq!(c.direction(), Direction::Backwards);

    let outcome = until_paradox(&mut c, &InputFrame::moving(1.0, 0.0), 8)
        .expect("the bullet flies back into the successor");
    assert_eq!(outcome.paradox.as_deref(), Some("hit by a bullet"));
}

#[test]
fn standing_on_raised_spikes_is_a_paradox() {
    let level = Level::new("spikes", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(ObjectKind::Spikes, Snapshot::at(48.0, 48.0));
    let config = EngineConfig {
        spike_period: 2,
        ..Default::default()
    };
    let mut c = start(&level, config);

    assert!(c.step(&InputFrame::idle()).unwrap().paradox.is_none());
    let outcome = c.step(&InputFrame::idle()).unwrap();
    assert_eq!(outcome.tick, 2);
    assert_eq!(outcome.paradox.as_deref(), Some("impaled on spikes"));
    assert_eq!(c.journal().paradoxes().count(), 1);
}

#[test]
fn firing_without_a_gun_only_raises_a_notice() {
    let level = Level::new("empty", &HALL).with(ObjectKind::Player, Snapshot::at(48.0, 48.0));
    let mut c = start(&level, EngineConfig::default());
    let outcome = c.step(&button(|i| i.fire = true)).unwrap();
    assert_eq!(outcome.status.as_deref(), Some("nothing to fire"));
    assert!(outcome.paradox.is_none());
    assert_eq!(outcome.tick, 1);
}

// ---------------------------------------------------------------------------
// 3. Winning
// ---------------------------------------------------------------------------

#[test]
fn carrying_the_objective_to_the_exit_wins() {
    let level = Level::new("vault", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(
            ObjectKind::Throwable(ThrowableKind::Objective),
            Snapshot::at(48.0, 48.0),
        )
        .with(ObjectKind::Exit, Snapshot::at(176.0, 48.0));
    let mut c = start(&level, EngineConfig::default());
    c.step(&button(|i| i.interact = true)).unwrap();

    let mut won_at = None;
    for _ in 0..80 {
        let outcome = c.step(&InputFrame::moving(1.0, 0.0)).unwrap();
        if outcome.won {
            assert_eq!(outcome.status.as_deref(), Some(WIN_NOTICE));
            won_at = Some(outcome.tick);
            break;
        }
    }
    assert!(won_at.is_some());
    assert!(c.has_won());
    assert_eq!(
        c.journal()
            .all_events()
            .iter()
            .filter(|e| e.kind == EventKind::Won)
            .count(),
        1
    );

    // Winning is reported once.
    let outcome = c.step(&InputFrame::idle()).unwrap();
    assert!(outcome.won);
    assert_eq!(outcome.status, None);
}

#[test]
fn reaching_the_exit_empty_handed_does_not_win() {
    let level = Level::new("vault", &HALL)
        .with(ObjectKind::Player, Snapshot::at(48.0, 48.0))
        .with(ObjectKind::Exit, Snapshot::at(80.0, 48.0));
    let mut c = start(&level, EngineConfig::default());
    for _ in 0..30 {
        assert!(!c.step(&InputFrame::moving(1.0, 0.0)).unwrap().won);
    }
}
