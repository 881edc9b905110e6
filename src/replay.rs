//! Rebuilding a battle's shot-states and turn order from its history alone.

use alloc::vec::Vec;
use core::fmt;

use crate::battle::{next_turn, Step};
use crate::common::{ShotOutcome, Side};
use crate::config::GameConfig;
use crate::grid::ShotBoard;

/// Why a history could not have been produced by a legal battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayError {
    /// Step `index` carries the wrong sequence number.
    OutOfOrder { index: usize },
    /// Step `index` was fired by the side that did not hold the turn.
    OutOfTurn { index: usize },
    /// Step `index` targets a cell that was already shot at.
    DuplicateShot { index: usize },
    /// Step `index` targets a cell outside the grid.
    OutOfBounds { index: usize },
    /// Step `index` follows the destruction of a fleet.
    AfterEnd { index: usize },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::OutOfOrder { index } => write!(f, "step {} is out of sequence", index),
            ReplayError::OutOfTurn { index } => write!(f, "step {} was fired out of turn", index),
            ReplayError::DuplicateShot { index } => {
                write!(f, "step {} repeats an earlier shot", index)
            }
            ReplayError::OutOfBounds { index } => write!(f, "step {} is out of bounds", index),
            ReplayError::AfterEnd { index } => {
                write!(f, "step {} follows a destroyed fleet", index)
            }
        }
    }
}

/// State reconstructed from a history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    shots: [ShotBoard; 2],
    turns: Vec<Side>,
    next: Side,
    destroyed: Option<Side>,
}

impl Replay {
    /// Shot-states of the grid owned by `side`.
    pub fn shots(&self, side: Side) -> ShotBoard {
        self.shots[side.index()]
    }

    /// The side that fired each step, in order.
    pub fn turns(&self) -> &[Side] {
        &self.turns
    }

    /// Who holds the turn after the last step.
    pub fn next_turn(&self) -> Side {
        self.next
    }

    /// The side whose fleet was destroyed by the history, if any.
    pub fn destroyed(&self) -> Option<Side> {
        self.destroyed
    }
}

/// Replay `history` from empty grids under the rules of `config`.
pub fn replay(config: &GameConfig, history: &[Step]) -> Result<Replay, ReplayError> {
    let mut shots = [ShotBoard::default(); 2];
    let mut turns = Vec::with_capacity(history.len());
    let mut next = config.first_turn;
    let mut destroyed = None;
    let fleet_cells = config.fleet.total_cells();

    for (index, step) in history.iter().enumerate() {
        if step.seq as usize != index {
            return Err(ReplayError::OutOfOrder { index });
        }
        if destroyed.is_some() {
            return Err(ReplayError::AfterEnd { index });
        }
        if step.side != next {
            return Err(ReplayError::OutOfTurn { index });
        }
        if step.target.x >= config.grid_size || step.target.y >= config.grid_size {
            return Err(ReplayError::OutOfBounds { index });
        }

        let target = &mut shots[step.side.other().index()];
        let (r, c) = step.target.row_col();
        if target.hits.get(r, c).unwrap_or(false) || target.misses.get(r, c).unwrap_or(false) {
            return Err(ReplayError::DuplicateShot { index });
        }
        match step.outcome {
            ShotOutcome::Hit => {
                let _ = target.hits.set(r, c);
            }
            ShotOutcome::Miss => {
                let _ = target.misses.set(r, c);
            }
        }

        turns.push(step.side);
        if target.hits.count_ones() == fleet_cells {
            destroyed = Some(step.side.other());
        }
        next = next_turn(config.turn_policy, step.side, step.outcome);
    }

    Ok(Replay {
        shots,
        turns,
        next,
        destroyed,
    })
}
