mod common;

use battle_engine::{
    BattleError, CellView, Coord, EndReason, GameConfig, Perspective, SessionManager, ShotOutcome,
    Stage,
};
use common::*;

#[test]
fn classic_battle_from_arrangement_to_end() {
    let manager = SessionManager::new(GameConfig::classic()).unwrap();
    manager.create_or_join(alice(), bob()).unwrap();

    place_layout(&manager, "alice", CLASSIC_LAYOUT.len());
    let snap = manager.commit_arrangement("alice").unwrap();
    assert!(snap.my_committed);
    assert_eq!(snap.stage, Stage::Arrangement);

    place_layout(&manager, "bob", 9);
    assert_eq!(
        manager.commit_arrangement("bob"),
        Err(BattleError::IncompleteFleet {
            placed: 9,
            required: 10
        })
    );
    assert_eq!(
        manager.get_current_battle("bob").unwrap().stage,
        Stage::Arrangement
    );

    let (id, x, y, len) = CLASSIC_LAYOUT[9];
    manager.place_ship("bob", id, &cells(x, y, len)).unwrap();
    let snap = manager.commit_arrangement("bob").unwrap();
    assert_eq!(snap.stage, Stage::Battle);
    assert_eq!(snap.whose_turn, Some(Perspective::Enemy));

    let snap = manager.fire_shot("alice", 0, 0).unwrap();
    assert_eq!(snap.history[0].outcome, ShotOutcome::Miss);
    assert_eq!(snap.whose_turn, Some(Perspective::Enemy));
    assert_eq!(snap.enemy_grid.get(Coord::new(0, 0)), Some(CellView::Miss));

    // Bob sinks the single-cell ship at (9,5) first, then works through the rest.
    let mut bob_targets = layout_cells();
    let single = bob_targets
        .iter()
        .position(|c| *c == Coord::new(9, 5))
        .unwrap();
    bob_targets.swap(0, single);
    let snap = manager.fire_shot("bob", 9, 5).unwrap();
    let last = snap.history.last().unwrap();
    assert_eq!(last.outcome, ShotOutcome::Hit);
    assert!(last.sunk);
    assert_eq!(last.shooter, Perspective::Me);
    assert_eq!(snap.enemy_grid.get(Coord::new(9, 5)), Some(CellView::Sunk));

    let alice_misses: Vec<Coord> = (1..10)
        .map(|x| Coord::new(x, 0))
        .chain((0..10).map(|x| Coord::new(x, 2)))
        .collect();
    for (miss, target) in alice_misses.iter().zip(&bob_targets[1..]) {
        let snap = manager.fire_shot("alice", miss.x, miss.y).unwrap();
        assert_eq!(snap.history.last().unwrap().outcome, ShotOutcome::Miss);
        manager.fire_shot("bob", target.x, target.y).unwrap();
    }

    let snap = manager.get_current_battle("alice").unwrap();
    assert_eq!(snap.stage, Stage::End);
    assert_eq!(snap.winner, Some(Perspective::Enemy));
    assert_eq!(snap.end_reason, Some(EndReason::FleetDestroyed));
    assert_eq!(snap.whose_turn, None);
    assert_eq!(snap.history.len(), 40);
    assert!(snap.my_grid.cells.iter().all(|c| *c != CellView::Ship));

    let bob_view = manager.get_current_battle("bob").unwrap();
    assert_eq!(bob_view.winner, Some(Perspective::Me));
    assert!(bob_view.enemy_fleet_remaining.is_empty());

    assert_eq!(
        manager.fire_shot("alice", 5, 9),
        Err(BattleError::BattleAlreadyEnded)
    );
}

#[test]
fn guards_reject_without_changing_state() {
    let manager = SessionManager::new(GameConfig::classic()).unwrap();
    manager.create_or_join(alice(), bob()).unwrap();

    assert_eq!(
        manager.fire_shot("alice", 0, 0),
        Err(BattleError::WrongStage {
            stage: Stage::Arrangement
        })
    );
    place_layout(&manager, "alice", 10);
    manager.commit_arrangement("alice").unwrap();
    assert_eq!(
        manager.place_ship("alice", 1, &cells(0, 8, 4)),
        Err(BattleError::AlreadyCommitted)
    );
    assert_eq!(
        manager.commit_arrangement("alice"),
        Err(BattleError::AlreadyCommitted)
    );

    place_layout(&manager, "bob", 10);
    manager.commit_arrangement("bob").unwrap();

    assert_eq!(manager.fire_shot("bob", 0, 0), Err(BattleError::NotYourTurn));
    assert_eq!(manager.fire_shot("alice", 10, 0), Err(BattleError::OutOfBounds));
    manager.fire_shot("alice", 0, 0).unwrap();
    manager.fire_shot("bob", 0, 0).unwrap();
    let before = manager.get_current_battle("alice").unwrap();
    assert_eq!(
        manager.fire_shot("alice", 0, 0),
        Err(BattleError::AlreadyTargeted)
    );
    assert_eq!(manager.get_current_battle("alice").unwrap(), before);
}

#[test]
fn placement_errors_are_specific() {
    let manager = SessionManager::new(GameConfig::classic()).unwrap();
    manager.create_or_join(alice(), bob()).unwrap();
    manager.place_ship("alice", 1, &cells(0, 0, 4)).unwrap();

    assert_eq!(
        manager.place_ship("alice", 2, &cells(2, 0, 3)),
        Err(BattleError::Overlap)
    );
    assert_eq!(
        manager.place_ship("alice", 2, &cells(4, 1, 3)),
        Err(BattleError::Adjacent)
    );
    assert_eq!(
        manager.place_ship("alice", 2, &cells(8, 9, 3)),
        Err(BattleError::OutOfBounds)
    );
    assert_eq!(
        manager.place_ship("alice", 2, &[Coord::new(0, 5), Coord::new(2, 5)]),
        Err(BattleError::MalformedShip)
    );
    assert_eq!(
        manager.place_ship("alice", 2, &cells(0, 9, 4)),
        Err(BattleError::WrongShipCount {
            length: 4,
            expected: 1,
            found: 2
        })
    );

    // Moving a ship by re-placing its id is allowed.
    manager.place_ship("alice", 1, &cells(0, 9, 4)).unwrap();
    let snap = manager.remove_ship("alice", 1).unwrap();
    assert!(snap.my_grid.cells.iter().all(|c| *c == CellView::Empty));
    assert_eq!(manager.remove_ship("alice", 1), Err(BattleError::UnknownShip));
}

#[test]
fn one_live_battle_per_player() {
    let manager = SessionManager::new(GameConfig::classic()).unwrap();
    let first = manager.create_or_join(alice(), bob()).unwrap();
    let carol = battle_engine::PlayerRef::new("carol", "Carol");
    assert_eq!(
        manager.create_or_join(carol.clone(), alice()).err(),
        Some(BattleError::AlreadyInBattle)
    );
    assert_eq!(
        manager.create_or_join(alice(), alice()).err(),
        Some(BattleError::InvalidOpponent)
    );

    manager.forfeit("bob").unwrap();
    let snap = manager.get_current_battle("alice").unwrap();
    assert_eq!(snap.winner, Some(Perspective::Me));
    assert_eq!(snap.end_reason, Some(EndReason::Forfeit));

    let second = manager.create_or_join(carol, alice()).unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(manager.find("alice").unwrap().id(), second.id());
    // Bob still sees his finished battle until it is retired.
    assert_eq!(manager.find("bob").unwrap().id(), first.id());
    manager.retire(first.id());
    manager.retire(first.id());
    assert!(manager.find("bob").is_none());
    assert_eq!(manager.live_battles(), 1);
}

#[test]
fn auto_arrange_is_reproducible_and_committable() {
    let manager = SessionManager::new(GameConfig::classic()).unwrap();
    manager.create_or_join(alice(), bob()).unwrap();
    let a = manager.auto_arrange("alice", Some(11)).unwrap();
    let b = manager.auto_arrange("bob", Some(11)).unwrap();
    assert_eq!(a.my_grid, b.my_grid);
    let ship_cells = a.my_grid.cells.iter().filter(|c| **c == CellView::Ship).count();
    assert_eq!(ship_cells, 20);
    manager.commit_arrangement("alice").unwrap();
    let snap = manager.commit_arrangement("bob").unwrap();
    assert_eq!(snap.stage, Stage::Battle);
}

#[test]
fn continue_on_hit_keeps_the_turn() {
    let config = GameConfig {
        turn_policy: battle_engine::TurnPolicy::ContinueOnHit,
        ..GameConfig::classic()
    };
    let manager = battle_ready(config);
    let snap = manager.fire_shot("alice", 0, 1).unwrap();
    assert_eq!(snap.whose_turn, Some(Perspective::Me));
    let snap = manager.fire_shot("alice", 0, 0).unwrap();
    assert_eq!(snap.whose_turn, Some(Perspective::Enemy));
}
