//! A player's grid: ship placements plus the shot-state of every cell.

use alloc::vec::Vec;

use crate::bitboard::Adjacency;
use crate::common::{BattleError, Coord};
use crate::config::BB;
use crate::ship::{Ship, ShipId};

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum Occupancy {
    Empty,
    ShipSegment,
}

/// Whether a cell has been shot at. Never reverts once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum ShotState {
    Untouched,
    Miss,
    Hit,
}

/// Full state of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub occupancy: Occupancy,
    pub shot: ShotState,
}

/// Shot-states of a whole grid, independent of ship positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotBoard {
    pub(crate) hits: BB,
    pub(crate) misses: BB,
}

impl ShotBoard {
    pub fn state(&self, coord: Coord) -> ShotState {
        let (r, c) = coord.row_col();
        if self.hits.get(r, c).unwrap_or(false) {
            ShotState::Hit
        } else if self.misses.get(r, c).unwrap_or(false) {
            ShotState::Miss
        } else {
            ShotState::Untouched
        }
    }

    /// Number of cells shot at so far.
    pub fn shots(&self) -> usize {
        self.hits.count_ones() + self.misses.count_ones()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: u8,
    adjacency: Adjacency,
    ships: Vec<Ship>,
    ship_map: BB,
    shots: ShotBoard,
}

impl Grid {
    /// An empty `size`×`size` grid where ships may not touch per `adjacency`.
    pub fn new(size: u8, adjacency: Adjacency) -> Self {
        Self {
            size,
            adjacency,
            ships: Vec::new(),
            ship_map: BB::new(),
            shots: ShotBoard::default(),
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id() == id)
    }

    /// Place `ship`, replacing any ship with the same id. On failure the grid
    /// is left exactly as it was.
    pub fn place(&mut self, ship: Ship) -> Result<(), BattleError> {
        if ship.cells().any(|c| !self.in_bounds(c)) {
            return Err(BattleError::OutOfBounds);
        }
        let previous = self.remove(ship.id()).ok();
        if let Err(e) = self.check_free(&ship) {
            if let Some(old) = previous {
                self.insert(old);
            }
            return Err(e);
        }
        self.insert(ship);
        Ok(())
    }

    /// Take a ship off the grid.
    pub fn remove(&mut self, id: ShipId) -> Result<Ship, BattleError> {
        let idx = self
            .ships
            .iter()
            .position(|s| s.id() == id)
            .ok_or(BattleError::UnknownShip)?;
        let ship = self.ships.remove(idx);
        self.ship_map = self.ship_map & !ship.mask();
        Ok(ship)
    }

    /// Occupancy and shot-state of `coord`.
    pub fn cell(&self, coord: Coord) -> Result<Cell, BattleError> {
        if !self.in_bounds(coord) {
            return Err(BattleError::OutOfBounds);
        }
        let (r, c) = coord.row_col();
        let occupancy = if self.ship_map.get(r, c)? {
            Occupancy::ShipSegment
        } else {
            Occupancy::Empty
        };
        Ok(Cell {
            occupancy,
            shot: self.shots.state(coord),
        })
    }

    /// `true` once there is at least one ship and every ship is sunk.
    pub fn all_sunk(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(Ship::is_sunk)
    }

    /// Shot-states of every cell.
    pub fn shots(&self) -> ShotBoard {
        self.shots
    }

    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.size && coord.y < self.size
    }

    fn check_free(&self, ship: &Ship) -> Result<(), BattleError> {
        if self.ship_map.intersects(&ship.mask()) {
            return Err(BattleError::Overlap);
        }
        if self.ship_map.dilate(self.adjacency).intersects(&ship.mask()) {
            return Err(BattleError::Adjacent);
        }
        Ok(())
    }

    fn insert(&mut self, ship: Ship) {
        self.ship_map |= ship.mask();
        self.ships.push(ship);
    }

    pub(crate) fn ships_mut(&mut self) -> &mut [Ship] {
        &mut self.ships
    }

    pub(crate) fn shots_mut(&mut self) -> &mut ShotBoard {
        &mut self.shots
    }
}
