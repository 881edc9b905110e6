//! Common types for the battle engine: coordinates, sides, stages, shot
//! outcomes and the error taxonomy reported to callers.

use core::fmt;

use crate::bitboard::BitBoardError;

/// A cell address. `x` is the column, `y` the row, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// `(row, col)` as used by the bitboards.
    pub(crate) fn row_col(self) -> (usize, usize) {
        (self.y as usize, self.x as usize)
    }

    pub(crate) fn from_row_col(row: usize, col: usize) -> Self {
        Self {
            x: col as u8,
            y: row as u8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.y)
    }
}

/// One of the two symmetric participants of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum Side {
    Owner,
    Opponent,
}

impl Side {
    /// The other participant.
    pub fn other(self) -> Side {
        match self {
            Side::Owner => Side::Opponent,
            Side::Opponent => Side::Owner,
        }
    }

    /// Index into the `[T; 2]` pairs a battle keeps per side.
    pub fn index(self) -> usize {
        match self {
            Side::Owner => 0,
            Side::Opponent => 1,
        }
    }
}

/// Lifecycle phase of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Stage {
    Arrangement,
    Battle,
    End,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Arrangement => write!(f, "ARRANGEMENT"),
            Stage::Battle => write!(f, "BATTLE"),
            Stage::End => write!(f, "END"),
        }
    }
}

/// Result of a resolved shot as recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum ShotOutcome {
    Miss,
    Hit,
}

/// Why a battle reached END.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum EndReason {
    FleetDestroyed,
    Forfeit,
}

/// Errors reported to the caller. None of them leave a battle modified.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleError {
    /// A player already takes part in a live battle that has not ended.
    AlreadyInBattle,
    /// The player has no live battle.
    NoActiveBattle,
    /// Ships of `length` exceed the configured count, or the length is not
    /// part of the fleet at all.
    WrongShipCount { length: u8, expected: u8, found: u8 },
    /// A cell lies outside the grid.
    OutOfBounds,
    /// Two ships share a cell.
    Overlap,
    /// Two ships touch.
    Adjacent,
    /// Fewer ships placed than the fleet requires.
    IncompleteFleet { placed: usize, required: usize },
    /// The player already finalized their arrangement.
    AlreadyCommitted,
    NotYourTurn,
    /// The cell has already been shot at.
    AlreadyTargeted,
    BattleAlreadyEnded,
    /// The operation is not allowed in the current stage.
    WrongStage { stage: Stage },
    /// Ship cells are not one straight contiguous run.
    MalformedShip,
    /// No ship with this id exists in the arrangement.
    UnknownShip,
    /// The caller does not take part in the battle.
    NotAParticipant,
    /// A battle needs two distinct players.
    InvalidOpponent,
    /// The game configuration is unusable.
    InvalidConfig,
    /// Automatic arrangement gave up finding room for a ship.
    UnableToArrange,
}

impl BattleError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BattleError::AlreadyInBattle => "ALREADY_IN_BATTLE",
            BattleError::NoActiveBattle => "NO_ACTIVE_BATTLE",
            BattleError::WrongShipCount { .. } => "WRONG_SHIP_COUNT",
            BattleError::OutOfBounds => "OUT_OF_BOUNDS",
            BattleError::Overlap => "OVERLAP",
            BattleError::Adjacent => "ADJACENT",
            BattleError::IncompleteFleet { .. } => "INCOMPLETE_FLEET",
            BattleError::AlreadyCommitted => "ALREADY_COMMITTED",
            BattleError::NotYourTurn => "NOT_YOUR_TURN",
            BattleError::AlreadyTargeted => "ALREADY_TARGETED",
            BattleError::BattleAlreadyEnded => "BATTLE_ALREADY_ENDED",
            BattleError::WrongStage { .. } => "WRONG_STAGE",
            BattleError::MalformedShip => "MALFORMED_SHIP",
            BattleError::UnknownShip => "UNKNOWN_SHIP",
            BattleError::NotAParticipant => "NOT_A_PARTICIPANT",
            BattleError::InvalidOpponent => "INVALID_OPPONENT",
            BattleError::InvalidConfig => "INVALID_CONFIG",
            BattleError::UnableToArrange => "UNABLE_TO_ARRANGE",
        }
    }
}

impl From<BitBoardError> for BattleError {
    fn from(_: BitBoardError) -> Self {
        BattleError::OutOfBounds
    }
}

impl fmt::Display for BattleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleError::AlreadyInBattle => write!(f, "Player is already in a battle"),
            BattleError::NoActiveBattle => write!(f, "Player has no active battle"),
            BattleError::WrongShipCount {
                length,
                expected,
                found,
            } => write!(
                f,
                "Wrong number of ships of length {}: expected {}, found {}",
                length, expected, found
            ),
            BattleError::OutOfBounds => write!(f, "Cell is out of the grid bounds"),
            BattleError::Overlap => write!(f, "Ship placement overlaps with another ship"),
            BattleError::Adjacent => write!(f, "Ship placement touches another ship"),
            BattleError::IncompleteFleet { placed, required } => write!(
                f,
                "Fleet is incomplete: {} of {} ships placed",
                placed, required
            ),
            BattleError::AlreadyCommitted => write!(f, "Arrangement is already committed"),
            BattleError::NotYourTurn => write!(f, "It is not your turn"),
            BattleError::AlreadyTargeted => write!(f, "Cell has already been shot at"),
            BattleError::BattleAlreadyEnded => write!(f, "Battle has already ended"),
            BattleError::WrongStage { stage } => {
                write!(f, "Operation is not allowed in stage {}", stage)
            }
            BattleError::MalformedShip => {
                write!(f, "Ship cells must form a straight contiguous line")
            }
            BattleError::UnknownShip => write!(f, "Ship is not part of the arrangement"),
            BattleError::NotAParticipant => write!(f, "Player does not take part in this battle"),
            BattleError::InvalidOpponent => write!(f, "A battle needs two distinct players"),
            BattleError::InvalidConfig => write!(f, "Game configuration is invalid"),
            BattleError::UnableToArrange => write!(f, "Unable to arrange the fleet"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BattleError {}
