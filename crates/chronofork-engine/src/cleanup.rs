//! Reconciliation of a resumed timeline after its child was abandoned.
//!
//! Popping a generation erases the branch it represented. Whatever the
//! resumed generation still holds because of that branch has to go: objects
//! introduced deeper than the stack now reaches, objects whose window no
//! longer covers the resumed tick, promises made or activated on the erased
//! branch. Predecessors whose life was ended by the fork come back.

use std::collections::BTreeSet;

use chronofork_ledger::identity::{Direction, ObjectId};
use chronofork_ledger::object::TemporalObject;
use chronofork_ledger::timeline::Timeline;
use tracing::debug;

use crate::promise::PromiseLedger;

/// Clean `timeline` (the new tail) at `tick` and return the identities that
/// were deleted, in processing order.
pub fn rewind_cleanup(
    timeline: &mut Timeline,
    promises: &mut PromiseLedger,
    tick: u64,
) -> Vec<ObjectId> {
    let depth = timeline.depth();
    let exempt = exempt_from_window_rule(timeline);

    let mut removed = Vec::new();
    for id in timeline.ids_in_tick_order() {
        let Some(object) = timeline.get(id) else {
            continue;
        };
        if object.initial_timeline > depth
            || (!exempt.contains(&id) && introduced_here_but_out_of_window(object, depth, tick))
        {
            timeline.remove(id);
            removed.push(id);
            continue;
        }
        if let Some(object) = timeline.get_mut(id) {
            if object.final_timeline.is_some_and(|last| last > depth) {
                if let Some(last) = object.final_timeline {
                    object.lifetime.reopen(Direction::for_depth(last));
                }
                object.final_timeline = None;
                object.recorded = false;
            }
        }
    }

    promises.rewind_to_depth(depth);
    reoccupy(timeline);

    debug!(depth, tick, removed = removed.len(), "rewind cleanup finished");
    removed
}

/// The controlled player and whatever it holds or occupies.
fn exempt_from_window_rule(timeline: &Timeline) -> BTreeSet<ObjectId> {
    let mut exempt = BTreeSet::new();
    if let Some(player) = timeline.controlled().and_then(|id| timeline.get(id)) {
        exempt.insert(player.id);
        exempt.extend(player.state.held_object_id);
        exempt.extend(player.state.container_id);
    }
    exempt
}

/// Window rule for objects introduced at the resumed depth. The comparison
/// is strict on the forwards side and inclusive on the backwards side.
fn introduced_here_but_out_of_window(object: &TemporalObject, depth: usize, tick: u64) -> bool {
    if object.initial_timeline != depth {
        return false;
    }
    match object.direction {
        Direction::Forwards => tick < object.lifetime.beginning,
        Direction::Backwards => object.lifetime.ending.is_some_and(|end| end <= tick),
    }
}

/// Container occupancy is not part of history; point the container the
/// resumed player sits in back at them.
fn reoccupy(timeline: &mut Timeline) {
    let Some(player) = timeline.controlled().and_then(|id| timeline.get(id)) else {
        return;
    };
    let (player_id, container) = (player.id, player.state.container_id);
    if let Some(container) = container.and_then(|c| timeline.get_mut(c)) {
        container.occupant = Some(player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::{Promise, PromiseKind};
    use chronofork_ledger::prelude::*;

    fn root_with_player() -> (Timeline, ObjectId) {
        let mut root = Timeline::root();
        let player = root.spawn(ObjectKind::Player, Snapshot::default(), 0, Direction::Forwards);
        root.set_controlled(player);
        (root, player)
    }

    // -- 1. depth rule ------------------------------------------------------

    #[test]
    fn objects_from_deeper_generations_are_deleted() {
        let (root, _) = root_with_player();
        let mut child = root.fork(10).unwrap();
        let ghost = child.spawn(ObjectKind::Crime, Snapshot::default(), 8, Direction::Backwards);

        // Pretend the child is being resumed after its own child was popped,
        // with the ghost carried over from the deeper generation.
        child.get_mut(ghost).unwrap().initial_timeline = 3;
        let removed = rewind_cleanup(&mut child, &mut PromiseLedger::new(), 8);
        assert_eq!(removed, vec![ghost]);
        assert!(!child.contains(ghost));
    }

    // -- 2. window rule boundaries ------------------------------------------

    #[test]
    fn forwards_window_boundary_is_strict() {
        let (mut root, _) = root_with_player();
        let bullet = root.spawn(ObjectKind::Bullet, Snapshot::default(), 20, Direction::Forwards);

        let mut at_birth = root.clone();
        rewind_cleanup(&mut at_birth, &mut PromiseLedger::new(), 20);
        assert!(at_birth.contains(bullet));

        let removed = rewind_cleanup(&mut root, &mut PromiseLedger::new(), 19);
        assert_eq!(removed, vec![bullet]);
    }

    #[test]
    fn backwards_window_boundary_is_inclusive() {
        let (root, _) = root_with_player();
        let mut child = root.fork(30).unwrap();
        let bullet = child.spawn(ObjectKind::Bullet, Snapshot::default(), 20, Direction::Backwards);

        let mut above = child.clone();
        rewind_cleanup(&mut above, &mut PromiseLedger::new(), 19);
        assert!(above.contains(bullet));

        let mut at_birth = child.clone();
        assert_eq!(rewind_cleanup(&mut at_birth, &mut PromiseLedger::new(), 20), vec![bullet]);

        assert_eq!(rewind_cleanup(&mut child, &mut PromiseLedger::new(), 25), vec![bullet]);
    }

    #[test]
    fn controlled_player_and_gear_are_exempt() {
        let mut root = Timeline::root();
        let player = root.spawn(ObjectKind::Player, Snapshot::default(), 12, Direction::Forwards);
        let knife = root.spawn(
            ObjectKind::Throwable(ThrowableKind::Knife),
            Snapshot::default(),
            12,
            Direction::Forwards,
        );
        root.get_mut(player).unwrap().state.held_object_id = Some(knife);
        root.set_controlled(player);

        assert!(rewind_cleanup(&mut root, &mut PromiseLedger::new(), 5).is_empty());
    }

    // -- 3. reopening -------------------------------------------------------

    #[test]
    fn predecessor_comes_back_to_life() {
        let (mut root, player) = root_with_player();
        {
            // Ended by a fork out of a forwards generation at depth 3.
            let p = root.get_mut(player).unwrap();
            p.lifetime.close(12, Direction::Forwards);
            p.final_timeline = Some(3);
            p.recorded = true;
        }

        rewind_cleanup(&mut root, &mut PromiseLedger::new(), 12);
        let p = root.get(player).unwrap();
        assert_eq!(p.lifetime.ending, None);
        assert!(p.final_timeline.is_none());
        assert!(!p.recorded);
    }

    #[test]
    fn final_timeline_at_the_resumed_depth_stays_closed() {
        let (mut root, player) = root_with_player();
        {
            let p = root.get_mut(player).unwrap();
            p.lifetime.close(12, Direction::Forwards);
            p.final_timeline = Some(1);
        }
        rewind_cleanup(&mut root, &mut PromiseLedger::new(), 12);
        assert_eq!(root.get(player).unwrap().lifetime.ending, Some(12));
        assert_eq!(root.get(player).unwrap().final_timeline, Some(1));
    }

    #[test]
    fn predecessor_closed_by_a_backwards_branch_reopens_its_beginning() {
        let (mut root, player) = root_with_player();
        {
            let p = root.get_mut(player).unwrap();
            p.lifetime.ending = Some(40);
            p.lifetime.close(15, Direction::Backwards);
            p.final_timeline = Some(2);
        }
        rewind_cleanup(&mut root, &mut PromiseLedger::new(), 40);
        assert_eq!(root.get(player).unwrap().lifetime.beginning, 0);
        assert_eq!(root.get(player).unwrap().lifetime.ending, Some(40));
    }

    // -- 4. promises and occupancy ------------------------------------------

    #[test]
    fn promises_follow_the_depth_cut() {
        let (mut root, player) = root_with_player();
        let mut promises = PromiseLedger::new();
        let mut activated = Promise::new(1, 5, player, PromiseKind::Absence);
        activated.activated = Some(2);
        promises.add(activated);
        promises.add(Promise::new(2, 5, player, PromiseKind::Death));

        rewind_cleanup(&mut root, &mut promises, 5);
        assert_eq!(promises.len(), 1);
        assert!(promises.is_pending(player, PromiseKind::Absence));
    }

    #[test]
    fn occupancy_is_rederived() {
        let (mut root, player) = root_with_player();
        let closet = root.spawn(
            ObjectKind::Container(ContainerKind::Closet),
            Snapshot::default(),
            0,
            Direction::Forwards,
        );
        root.get_mut(player).unwrap().state.container_id = Some(closet);

        rewind_cleanup(&mut root, &mut PromiseLedger::new(), 3);
        assert_eq!(root.get(closet).unwrap().occupant, Some(player));
    }
}
