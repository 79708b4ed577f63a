//! Reference behaviors for every simulated object kind.
//!
//! [`standard`] returns a registry that makes a level playable end to end:
//! a controllable player that walks, shoots, carries and throws items, hides
//! in containers and makes promises; bullets; patrolling enemies; doors
//! driven by switches; timed spikes; throwables; and an alarm that trips
//! when an enemy spots a crime.
//!
//! Enemy patrols draw from a [`Pcg32`] seeded with the enemy's identity and
//! the tick, so re-simulating a tick always reproduces the same choice.

use chronofork_ledger::identity::ObjectId;
use chronofork_ledger::kind::{ContainerKind, ObjectKind, ThrowableKind};
use chronofork_ledger::object::TemporalObject;
use chronofork_ledger::snapshot::{AiState, Snapshot, Vec2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::behavior::{BehaviorRegistry, WorldView};
use crate::command::CommandBuffer;
use crate::perception::tile_coords;
use crate::promise::PromiseKind;
use crate::TemporalError;

/// Enemies pick a new patrol heading every this many ticks.
const PATROL_TURN_TICKS: u64 = 30;

const QUARTER_TURNS: [f64; 4] = [
    0.0,
    std::f64::consts::FRAC_PI_2,
    std::f64::consts::PI,
    -std::f64::consts::FRAC_PI_2,
];

/// Registry with the reference behavior of every kind that moves or reacts.
pub fn standard() -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    registry.register(ObjectKind::Player, "player", player);
    registry.register(ObjectKind::Bullet, "bullet", bullet);
    registry.register(ObjectKind::Enemy, "enemy", enemy);
    registry.register(ObjectKind::Door, "door", door);
    registry.register(ObjectKind::Switch, "switch", switch);
    registry.register(ObjectKind::Spikes, "spikes", spikes);
    registry.register(ObjectKind::Alarm, "alarm", alarm);
    for item in [ThrowableKind::Knife, ThrowableKind::Gun, ThrowableKind::Objective] {
        registry.register(ObjectKind::Throwable(item), "throwable", throwable);
    }
    registry
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Move by `delta`, one axis at a time, refusing to enter blocked tiles.
fn slide(view: &WorldView<'_>, from: Vec2, delta: Vec2) -> Vec2 {
    let ts = view.config.tile_size;
    let mut at = from;
    let along_x = Vec2::new(at.x + delta.x, at.y);
    if !view.grid.blocks_point(along_x, ts) {
        at = along_x;
    }
    let along_y = Vec2::new(at.x, at.y + delta.y);
    if !view.grid.blocks_point(along_y, ts) {
        at = along_y;
    }
    at
}

/// Closest active object within `reach` of `from` matching `pred`, ties
/// broken by processing order.
fn nearest<'a>(
    view: &WorldView<'a>,
    from: Vec2,
    reach: f64,
    exclude: ObjectId,
    pred: impl Fn(&TemporalObject) -> bool,
) -> Option<&'a TemporalObject> {
    let mut best: Option<(&'a TemporalObject, f64)> = None;
    for object in view.timeline.active_at(view.tick) {
        if object.id == exclude || !pred(object) {
            continue;
        }
        let distance = object.state.position.distance(from);
        if distance > reach {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((object, distance));
        }
    }
    best.map(|(object, _)| object)
}

fn patrol_seed(id: ObjectId, tick: u64) -> u64 {
    (u64::from(id.to_raw()) << 32) ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

fn player(
    view: &WorldView<'_>,
    object: &TemporalObject,
    cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let mut next = object.state.clone();
    if view.timeline.controlled() != Some(object.id) {
        return Ok(next);
    }
    let input = view.input;
    let config = view.config;
    let id = object.id;
    next.cooldown = next.cooldown.saturating_sub(1);

    if let Some(container) = next.container_id {
        if input.interact {
            next.container_id = None;
            cmds.occupy(id, container, None);
        }
        next.animation = 0;
        return Ok(next);
    }

    let axis = Vec2::new(input.move_x.clamp(-1.0, 1.0), input.move_y.clamp(-1.0, 1.0));
    let magnitude = axis.length();
    if magnitude > 0.0 {
        let step = axis.scale(config.player_speed / magnitude.max(1.0));
        next.facing = axis.angle();
        next.position = slide(view, next.position, step);
        next.animation = (next.animation + 1) % 4;
    } else {
        next.animation = 0;
    }

    let held = next.held_object_id.and_then(|item| view.get(item));

    if input.fire {
        match held {
            Some(gun) if gun.kind == ObjectKind::Throwable(ThrowableKind::Gun) => {
                if next.cooldown > 0 {
                    cmds.notice(id, "gun is cooling down");
                } else {
                    let heading = Vec2::from_angle(next.facing);
                    let muzzle = next
                        .position
                        .add(heading.scale(config.player_radius + config.bullet_radius + 1.0));
                    let mut shot = Snapshot::at(muzzle.x, muzzle.y);
                    shot.facing = next.facing;
                    shot.velocity = heading.scale(config.bullet_speed);
                    cmds.spawn(id, ObjectKind::Bullet, shot);
                    next.cooldown = config.fire_cooldown;
                }
            }
            _ => cmds.notice(id, "nothing to fire"),
        }
    }

    if input.throw {
        match next.held_object_id.take() {
            Some(item) => {
                let velocity = Vec2::from_angle(next.facing).scale(config.bullet_speed * 0.5);
                cmds.release(id, item, velocity);
            }
            None => cmds.notice(id, "nothing to throw"),
        }
    }

    if input.interact {
        interact(view, object, &mut next, cmds);
    }
    Ok(next)
}

/// Pick up an item, enter a container or make a promise, in that order.
fn interact(
    view: &WorldView<'_>,
    object: &TemporalObject,
    next: &mut Snapshot,
    cmds: &mut CommandBuffer,
) {
    let id = object.id;
    let here = next.position;
    let reach = view.config.interact_radius;

    if next.held_object_id.is_none() {
        let item = nearest(view, here, reach, id, |o| {
            o.kind.is_throwable() && o.state.attached_object_id.is_none() && !o.recorded
        });
        if let Some(item) = item {
            cmds.attach(id, item.id, id);
            next.held_object_id = Some(item.id);
            return;
        }
    }

    let container = nearest(view, here, reach, id, |o| {
        o.kind.is_container() && o.occupant.is_none() && !o.recorded
    });
    if let Some(container) = container {
        cmds.occupy(id, container.id, Some(id));
        next.container_id = Some(container.id);
        next.position = container.state.position;
        if container.kind == ObjectKind::Container(ContainerKind::Turnstile) {
            cmds.request_fork(id);
        }
        return;
    }

    let target = nearest(view, here, reach, id, |o| {
        o.kind == ObjectKind::Enemy && o.state.ai != AiState::Dead
    });
    if let Some(target) = target {
        let holding_knife = next
            .held_object_id
            .and_then(|item| view.get(item))
            .is_some_and(|item| item.kind == ObjectKind::Throwable(ThrowableKind::Knife));
        let kind = if holding_knife {
            PromiseKind::Death
        } else {
            PromiseKind::Absence
        };
        cmds.promise(id, target.id, kind);
        cmds.notice(id, format!("promised the {kind:?} of enemy {}", target.id).to_lowercase());
        return;
    }

    cmds.notice(id, "nothing to interact with");
}

// ---------------------------------------------------------------------------
// Bullet
// ---------------------------------------------------------------------------

fn bullet(
    view: &WorldView<'_>,
    object: &TemporalObject,
    cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    if let Some(replayed) = view.reversed_replay(object) {
        return Ok(replayed);
    }
    let config = view.config;
    let mut next = object.state.clone();
    next.position = next.position.add(next.velocity);

    let hit_enemy = view.active_of_kind(ObjectKind::Enemy).any(|e| {
        e.state.ai != AiState::Dead
            && WorldView::overlaps(
                &e.state,
                config.player_radius,
                &object.state,
                config.bullet_radius,
            )
    });
    if hit_enemy || view.grid.blocks_point(next.position, config.tile_size) {
        cmds.end_lifetime(object.id, object.id);
    }
    Ok(next)
}

// ---------------------------------------------------------------------------
// Enemy
// ---------------------------------------------------------------------------

fn enemy(
    view: &WorldView<'_>,
    object: &TemporalObject,
    cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let config = view.config;
    let hidden = view.promises.is_pending(object.id, PromiseKind::Absence);
    let reversed = object.direction != view.direction();
    let mut next = object.state.clone();
    next.visible = !hidden;

    if next.ai != AiState::Dead {
        let shot = view.active_of_kind(ObjectKind::Bullet).any(|b| {
            WorldView::overlaps(&b.state, config.bullet_radius, &object.state, config.player_radius)
        });
        if shot || view.promises.is_binding(object.id, PromiseKind::Death) {
            let at = next.position;
            cmds.spawn(object.id, ObjectKind::Crime, Snapshot::at(at.x, at.y));
            if reversed {
                // Seen against its own arrow, the enemy simply stops existing.
                cmds.end_lifetime(object.id, object.id);
            } else {
                next.ai = AiState::Dead;
                next.velocity = Vec2::ZERO;
                next.animation = 0;
            }
            return Ok(next);
        }
    }

    if let Some(mut replayed) = view.reversed_replay(object) {
        replayed.visible = !hidden;
        return Ok(replayed);
    }
    if next.ai == AiState::Dead {
        return Ok(next);
    }

    let here = object.state.position;
    let quarry = view
        .controlled()
        .filter(|p| p.active_at(view.tick) && p.state.container_id.is_none())
        .filter(|p| view.perception.perceives(&object.state, p.state.position));

    if let Some(quarry) = quarry {
        next.ai = AiState::Alert;
        next.facing = quarry.state.position.sub(here).angle();
        if let Some(path) = view.perception.find_path(here, quarry.state.position)? {
            if let Some(waypoint) = path.first() {
                let delta = waypoint.sub(here);
                let length = delta.length();
                let speed = config.player_speed * 0.75;
                if length > 0.0 {
                    next.position = here.add(delta.scale(speed.min(length) / length));
                }
            }
        }
    } else {
        next.ai = AiState::Patrol;
        let mut rng = Pcg32::seed_from_u64(patrol_seed(object.id, view.tick));
        if view.tick % PATROL_TURN_TICKS == 0 {
            next.facing = QUARTER_TURNS[rng.gen_range(0..QUARTER_TURNS.len())];
        }
        let ahead = here.add(Vec2::from_angle(next.facing).scale(config.player_speed * 0.5));
        if view.grid.blocks_point(ahead, config.tile_size) {
            next.facing = QUARTER_TURNS[rng.gen_range(0..QUARTER_TURNS.len())];
        } else {
            next.position = ahead;
        }
    }
    next.animation = (next.animation + 1) % 4;
    Ok(next)
}

// ---------------------------------------------------------------------------
// Level furniture
// ---------------------------------------------------------------------------

fn door(
    view: &WorldView<'_>,
    object: &TemporalObject,
    _cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let mut next = object.state.clone();
    if let Some(switch) = next.linked_object_id.and_then(|id| view.get(id)) {
        next.open = switch.state.pressed;
        next.animation = u32::from(next.open);
    }
    Ok(next)
}

fn switch(
    view: &WorldView<'_>,
    object: &TemporalObject,
    _cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let ts = view.config.tile_size;
    let tile = tile_coords(object.state.position, ts);
    let mut next = object.state.clone();
    next.pressed = view.timeline.active_at(view.tick).any(|o| {
        matches!(o.kind, ObjectKind::Player | ObjectKind::Enemy)
            && tile_coords(o.state.position, ts) == tile
    });
    next.animation = u32::from(next.pressed);
    Ok(next)
}

fn spikes(
    view: &WorldView<'_>,
    object: &TemporalObject,
    _cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let period = view.config.spike_period.max(1);
    let mut next = object.state.clone();
    next.raised = (view.tick / period) % 2 == 1;
    next.animation = u32::from(next.raised);
    Ok(next)
}

fn alarm(
    view: &WorldView<'_>,
    object: &TemporalObject,
    _cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let crimes: Vec<&TemporalObject> = view.active_of_kind(ObjectKind::Crime).collect();
    let mut next = object.state.clone();
    next.raised = view
        .active_of_kind(ObjectKind::Enemy)
        .filter(|e| e.state.ai != AiState::Dead)
        .any(|e| {
            crimes
                .iter()
                .any(|c| view.perception.perceives(&e.state, c.state.position))
        });
    next.animation = u32::from(next.raised);
    Ok(next)
}

fn throwable(
    view: &WorldView<'_>,
    object: &TemporalObject,
    _cmds: &mut CommandBuffer,
) -> Result<Snapshot, TemporalError> {
    let mut next = object.state.clone();
    if let Some(holder) = next.attached_object_id.and_then(|id| view.get(id)) {
        next.position = holder.state.position;
        next.facing = holder.state.facing;
        next.velocity = Vec2::ZERO;
        return Ok(next);
    }
    if let Some(replayed) = view.reversed_replay(object) {
        return Ok(replayed);
    }
    if next.velocity != Vec2::ZERO {
        let ahead = next.position.add(next.velocity);
        if view.grid.blocks_point(ahead, view.config.tile_size) {
            next.velocity = Vec2::ZERO;
        } else {
            next.position = ahead;
            next.velocity = next.velocity.scale(0.9);
            if next.velocity.length() < 0.1 {
                next.velocity = Vec2::ZERO;
            }
        }
    }
    Ok(next)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
