//! Per-player views of a battle.
//!
//! A snapshot is always taken from one participant's point of view: their
//! own grid is fully revealed, the enemy grid only shows cells that have been
//! shot at.

use alloc::string::String;
use alloc::vec::Vec;

use crate::battle::{Battle, BattleId, PlayerRef};
use crate::common::{Coord, EndReason, ShotOutcome, Side, Stage};
use crate::config::GameConfig;
use crate::grid::{Grid, Occupancy, ShotState};

/// A side named relative to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Perspective {
    Me,
    Enemy,
}

impl Perspective {
    fn of(side: Side, viewer: Side) -> Self {
        if side == viewer {
            Perspective::Me
        } else {
            Perspective::Enemy
        }
    }
}

/// What the viewer can see of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum CellView {
    /// Enemy cell that has not been shot at.
    Unknown,
    /// Own cell without a ship, not shot at.
    Empty,
    /// Own ship segment, not shot at.
    Ship,
    Miss,
    /// Hit segment of a ship still afloat.
    Hit,
    /// Segment of a sunk ship.
    Sunk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct GridView {
    pub size: u8,
    /// Row-major: `cells[y * size + x]`.
    pub cells: Vec<CellView>,
}

impl GridView {
    fn of(grid: &Grid, reveal_ships: bool) -> Self {
        let size = grid.size();
        let shots = grid.shots();
        let mut cells = Vec::with_capacity(size as usize * size as usize);
        for y in 0..size {
            for x in 0..size {
                let coord = Coord::new(x, y);
                let ship = grid.ships().iter().find(|s| s.contains(coord));
                let view = match (shots.state(coord), ship) {
                    (ShotState::Hit, Some(s)) if s.is_sunk() => CellView::Sunk,
                    (ShotState::Hit, _) => CellView::Hit,
                    (ShotState::Miss, _) => CellView::Miss,
                    (ShotState::Untouched, _) if !reveal_ships => CellView::Unknown,
                    (ShotState::Untouched, Some(_)) => CellView::Ship,
                    (ShotState::Untouched, None) => CellView::Empty,
                };
                cells.push(view);
            }
        }
        Self { size, cells }
    }

    /// The view of `coord`, or `None` outside the grid.
    pub fn get(&self, coord: Coord) -> Option<CellView> {
        if coord.x >= self.size || coord.y >= self.size {
            return None;
        }
        self.cells
            .get(coord.y as usize * self.size as usize + coord.x as usize)
            .copied()
    }

    /// Cells that can still be fired at.
    pub fn untouched(&self) -> impl Iterator<Item = Coord> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| matches!(v, CellView::Unknown | CellView::Empty | CellView::Ship))
            .map(move |(i, _)| Coord::new(i as u8 % size, i as u8 / size))
    }
}

/// A history entry as shown to a viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct StepView {
    pub seq: u32,
    pub shooter: Perspective,
    pub username: String,
    pub target: Coord,
    pub outcome: ShotOutcome,
    pub sunk: bool,
}

/// Everything a player may know about their battle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleSnapshot {
    pub id: BattleId,
    pub stage: Stage,
    pub rules: GameConfig,
    pub me: PlayerRef,
    pub enemy: PlayerRef,
    pub whose_turn: Option<Perspective>,
    pub my_committed: bool,
    pub enemy_committed: bool,
    pub my_grid: GridView,
    pub enemy_grid: GridView,
    /// Lengths of enemy ships not yet sunk, longest first.
    pub enemy_fleet_remaining: Vec<u8>,
    pub history: Vec<StepView>,
    pub winner: Option<Perspective>,
    pub end_reason: Option<EndReason>,
}

impl Battle {
    /// The battle as seen by `viewer`.
    pub fn snapshot(&self, viewer: Side) -> BattleSnapshot {
        let enemy = viewer.other();
        let enemy_grid = self.grid(enemy);

        let mut remaining: Vec<u8> = self.config().fleet.lengths().collect();
        for sunk in enemy_grid.ships().iter().filter(|s| s.is_sunk()) {
            if let Some(pos) = remaining.iter().position(|l| *l == sunk.length()) {
                remaining.remove(pos);
            }
        }

        BattleSnapshot {
            id: self.id(),
            stage: self.stage(),
            rules: self.config().clone(),
            me: self.player(viewer).clone(),
            enemy: self.player(enemy).clone(),
            whose_turn: self.whose_turn().map(|s| Perspective::of(s, viewer)),
            my_committed: self.is_committed(viewer),
            enemy_committed: self.is_committed(enemy),
            my_grid: GridView::of(self.grid(viewer), true),
            enemy_grid: GridView::of(enemy_grid, false),
            enemy_fleet_remaining: remaining,
            history: self
                .history()
                .iter()
                .map(|step| StepView {
                    seq: step.seq,
                    shooter: Perspective::of(step.side, viewer),
                    username: self.player(step.side).name.clone(),
                    target: step.target,
                    outcome: step.outcome,
                    sunk: step.sunk,
                })
                .collect(),
            winner: self.winner().map(|s| Perspective::of(s, viewer)),
            end_reason: self.end_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FleetConfig, ShipClass};

    fn battle() -> Battle {
        let config = GameConfig {
            grid_size: 4,
            fleet: FleetConfig::new([ShipClass::new(2, 1), ShipClass::new(1, 1)]),
            ..GameConfig::classic()
        };
        let mut battle = Battle::new(
            3,
            PlayerRef::new("a", "Alice"),
            PlayerRef::new("b", "Bob"),
            config,
        )
        .unwrap();
        for side in [Side::Owner, Side::Opponent] {
            battle
                .place_ship(side, 1, &[Coord::new(0, 0), Coord::new(1, 0)])
                .unwrap();
            battle.place_ship(side, 2, &[Coord::new(3, 3)]).unwrap();
            battle.commit(side).unwrap();
        }
        battle
    }

    #[test]
    fn enemy_ships_stay_hidden() {
        let mut battle = battle();
        battle.fire(Side::Owner, Coord::new(0, 0)).unwrap();
        battle.fire(Side::Opponent, Coord::new(2, 2)).unwrap();

        let mine = battle.snapshot(Side::Owner);
        assert_eq!(mine.whose_turn, Some(Perspective::Me));
        assert_eq!(mine.enemy.name, "Bob");
        assert_eq!(mine.my_grid.get(Coord::new(1, 0)), Some(CellView::Ship));
        assert_eq!(mine.my_grid.get(Coord::new(2, 2)), Some(CellView::Miss));
        assert_eq!(mine.enemy_grid.get(Coord::new(0, 0)), Some(CellView::Hit));
        assert_eq!(mine.enemy_grid.get(Coord::new(1, 0)), Some(CellView::Unknown));
        assert_eq!(mine.enemy_grid.get(Coord::new(3, 3)), Some(CellView::Unknown));
        assert!(!mine.enemy_grid.cells.contains(&CellView::Ship));
        assert_eq!(mine.history.len(), 2);
        assert_eq!(mine.history[1].shooter, Perspective::Enemy);
        assert_eq!(mine.history[1].username, "Bob");

        let theirs = battle.snapshot(Side::Opponent);
        assert_eq!(theirs.whose_turn, Some(Perspective::Enemy));
        assert_eq!(theirs.my_grid.get(Coord::new(0, 0)), Some(CellView::Hit));
    }

    #[test]
    fn sunk_ships_shrink_the_remaining_fleet() {
        let mut battle = battle();
        battle.fire(Side::Owner, Coord::new(3, 3)).unwrap();
        let view = battle.snapshot(Side::Owner);
        assert_eq!(view.enemy_grid.get(Coord::new(3, 3)), Some(CellView::Sunk));
        assert_eq!(view.enemy_fleet_remaining, [2]);
        assert_eq!(view.enemy_grid.untouched().count(), 15);
    }
}
