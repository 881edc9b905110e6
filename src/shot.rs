//! Shot resolution against a single grid.

use crate::common::{BattleError, Coord, ShotOutcome};
use crate::grid::Grid;
use crate::ship::ShipId;

/// Everything a resolved shot revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotReport {
    pub outcome: ShotOutcome,
    /// The ship this shot finished off, if any.
    pub sunk: Option<ShipId>,
    /// Every ship on the grid is now sunk.
    pub fleet_destroyed: bool,
}

/// Fire at `coord` on `grid`. The cell's shot-state and the ship's hit
/// record are updated together, before the report is returned.
pub fn resolve_shot(grid: &mut Grid, coord: Coord) -> Result<ShotReport, BattleError> {
    if !grid.in_bounds(coord) {
        return Err(BattleError::OutOfBounds);
    }
    let (r, c) = coord.row_col();
    let shots = grid.shots();
    if shots.hits.get(r, c)? || shots.misses.get(r, c)? {
        return Err(BattleError::AlreadyTargeted);
    }

    let Some(idx) = grid.ships().iter().position(|s| s.contains(coord)) else {
        grid.shots_mut().misses.set(r, c)?;
        return Ok(ShotReport {
            outcome: ShotOutcome::Miss,
            sunk: None,
            fleet_destroyed: false,
        });
    };

    let ship = &mut grid.ships_mut()[idx];
    ship.register_hit(coord);
    let sunk = ship.is_sunk().then(|| ship.id());
    grid.shots_mut().hits.set(r, c)?;
    Ok(ShotReport {
        outcome: ShotOutcome::Hit,
        sunk,
        fleet_destroyed: sunk.is_some() && grid.all_sunk(),
    })
}
