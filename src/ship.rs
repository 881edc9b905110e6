//! Ship placement geometry on top of the grid bitboards.

use core::fmt;

use crate::common::{BattleError, Coord};
use crate::config::BB;

/// Client-chosen identifier of a ship within one player's arrangement.
pub type ShipId = u32;

/// Orientation of a ship on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A ship placed on a grid, with hits tracked in its own bitboard.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ship {
    id: ShipId,
    length: u8,
    orientation: Orientation,
    origin: Coord,
    mask: BB,
    hits: BB,
}

impl Ship {
    /// Lay a ship of `length` starting at `origin` and extending right
    /// (horizontal) or down (vertical) on a grid of `grid_size`.
    pub fn new(
        id: ShipId,
        origin: Coord,
        length: u8,
        orientation: Orientation,
        grid_size: u8,
    ) -> Result<Self, BattleError> {
        if length == 0 {
            return Err(BattleError::MalformedShip);
        }
        let (row, col) = origin.row_col();
        let len = length as usize;
        let size = grid_size as usize;
        let fits = match orientation {
            Orientation::Horizontal => row < size && col + len <= size,
            Orientation::Vertical => col < size && row + len <= size,
        };
        if !fits {
            return Err(BattleError::OutOfBounds);
        }

        let mask = BB::from_cells((0..len).map(|i| match orientation {
            Orientation::Horizontal => (row, col + i),
            Orientation::Vertical => (row + i, col),
        }))?;
        Ok(Ship {
            id,
            length,
            orientation,
            origin,
            mask,
            hits: BB::new(),
        })
    }

    /// Build a ship from the exact cells it covers, in any order. The cells
    /// must be in bounds and form one straight contiguous run.
    pub fn from_cells(id: ShipId, cells: &[Coord], grid_size: u8) -> Result<Self, BattleError> {
        if cells
            .iter()
            .any(|c| c.x >= grid_size || c.y >= grid_size)
        {
            return Err(BattleError::OutOfBounds);
        }
        // In bounds and longer than the grid means a repeated cell.
        if cells.is_empty() || cells.len() > grid_size as usize {
            return Err(BattleError::MalformedShip);
        }

        let first = cells[0];
        let orientation = if cells.iter().all(|c| c.y == first.y) {
            Orientation::Horizontal
        } else if cells.iter().all(|c| c.x == first.x) {
            Orientation::Vertical
        } else {
            return Err(BattleError::MalformedShip);
        };

        let along = |c: &Coord| match orientation {
            Orientation::Horizontal => c.x,
            Orientation::Vertical => c.y,
        };
        let start = cells.iter().map(along).min().unwrap_or(0);
        let mut seen = BB::new();
        for cell in cells {
            let (r, c) = cell.row_col();
            if seen.get(r, c)? {
                return Err(BattleError::MalformedShip);
            }
            seen.set(r, c)?;
            if along(cell) - start >= cells.len() as u8 {
                return Err(BattleError::MalformedShip);
            }
        }

        let origin = match orientation {
            Orientation::Horizontal => Coord::new(start, first.y),
            Orientation::Vertical => Coord::new(first.x, start),
        };
        Ship::new(id, origin, cells.len() as u8, orientation, grid_size)
    }

    /// Record a hit at `coord` if the ship covers it.
    pub fn register_hit(&mut self, coord: Coord) -> bool {
        let (r, c) = coord.row_col();
        if self.mask.get(r, c).unwrap_or(false) {
            let _ = self.hits.set(r, c);
            true
        } else {
            false
        }
    }

    /// All segments hit.
    pub fn is_sunk(&self) -> bool {
        self.hits.count_ones() == self.length as usize
    }

    pub fn contains(&self, coord: Coord) -> bool {
        let (r, c) = coord.row_col();
        self.mask.get(r, c).unwrap_or(false)
    }

    /// Covered cells, from the origin outwards.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        let origin = self.origin;
        let orientation = self.orientation;
        (0..self.length).map(move |i| match orientation {
            Orientation::Horizontal => Coord::new(origin.x + i, origin.y),
            Orientation::Vertical => Coord::new(origin.x, origin.y + i),
        })
    }

    pub fn id(&self) -> ShipId {
        self.id
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Occupancy mask of the ship.
    pub(crate) fn mask(&self) -> BB {
        self.mask
    }

    /// Same placement with no hits recorded.
    pub(crate) fn pristine(&self) -> Self {
        Ship {
            hits: BB::new(),
            ..*self
        }
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ id: {}, origin: ({}), length: {}, orientation: {:?}, hits: {} }}",
            self.id,
            self.origin,
            self.length,
            self.orientation,
            self.hits.count_ones(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn from_cells_accepts_any_order() {
        let cells = [Coord::new(3, 5), Coord::new(3, 3), Coord::new(3, 4)];
        let ship = Ship::from_cells(7, &cells, 10).unwrap();
        assert_eq!(ship.orientation(), Orientation::Vertical);
        assert_eq!(ship.origin(), Coord::new(3, 3));
        let cells: Vec<_> = ship.cells().collect();
        assert_eq!(cells, [Coord::new(3, 3), Coord::new(3, 4), Coord::new(3, 5)]);
    }

    #[test]
    fn from_cells_rejects_gaps_bends_and_duplicates() {
        let gap = [Coord::new(0, 0), Coord::new(2, 0)];
        assert_eq!(Ship::from_cells(1, &gap, 10), Err(BattleError::MalformedShip));
        let bend = [Coord::new(0, 0), Coord::new(1, 0), Coord::new(1, 1)];
        assert_eq!(Ship::from_cells(1, &bend, 10), Err(BattleError::MalformedShip));
        let dup = [Coord::new(4, 4), Coord::new(4, 4)];
        assert_eq!(Ship::from_cells(1, &dup, 10), Err(BattleError::MalformedShip));
        assert_eq!(Ship::from_cells(1, &[], 10), Err(BattleError::MalformedShip));
        let repeated = [Coord::new(2, 2); 11];
        assert_eq!(Ship::from_cells(1, &repeated, 10), Err(BattleError::MalformedShip));
    }

    #[test]
    fn out_of_bounds_against_runtime_grid_size() {
        assert_eq!(
            Ship::new(1, Coord::new(8, 0), 3, Orientation::Horizontal, 10),
            Err(BattleError::OutOfBounds)
        );
        assert_eq!(
            Ship::from_cells(1, &[Coord::new(10, 2)], 10),
            Err(BattleError::OutOfBounds)
        );
    }

    #[test]
    fn sinks_after_every_segment_is_hit() {
        let mut ship = Ship::new(1, Coord::new(1, 1), 2, Orientation::Horizontal, 10).unwrap();
        assert!(!ship.register_hit(Coord::new(0, 0)));
        assert!(ship.register_hit(Coord::new(1, 1)));
        assert!(!ship.is_sunk());
        assert!(ship.register_hit(Coord::new(2, 1)));
        assert!(ship.is_sunk());
        assert!(!ship.pristine().is_sunk());
    }
}
