//! Messages exchanged between the battle server and its clients.

use serde::{Deserialize, Serialize};

use crate::battle::PlayerRef;
use crate::common::{BattleError, Coord};
use crate::ship::ShipId;
use crate::snapshot::BattleSnapshot;

/// Current protocol version used for compatibility checks.
pub const PROTOCOL_VERSION: u16 = 1;

/// An operation requested by the connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    GetCurrentBattle,
    /// Start a battle against `opponent`, as arranged by the matchmaker.
    StartBattle { opponent: PlayerRef },
    PlaceShip { ship_id: ShipId, cells: Vec<Coord> },
    RemoveShip { ship_id: ShipId },
    AutoArrange { seed: Option<u64> },
    CommitArrangement,
    FireShot { x: u8, y: u8 },
    Forfeit,
}

/// A rejected request: stable code, readable message and the typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub error: BattleError,
}

impl From<BattleError> for ApiError {
    fn from(error: BattleError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Answer to `GetCurrentBattle`; `None` when the player has no battle.
    Current(Option<BattleSnapshot>),
    Snapshot(BattleSnapshot),
    Failed(ApiError),
}

/// Frames on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// First frame from the client; identifies the authenticated player.
    Hello { version: u16, player: PlayerRef },
    HelloAck { version: u16 },
    Request { seq: u64, request: Request },
    Response { seq: u64, response: Response },
    /// The server refuses the connection or a frame.
    Rejected { reason: String },
}
