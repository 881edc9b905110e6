//! The battle aggregate: one match from fleet arrangement to completion.
//!
//! A `Battle` is a plain value. It validates every operation against its
//! current stage and turn, applies it completely or not at all, and appends
//! a [`Step`] for every resolved shot. Serializing access between the two
//! players is the job of the session layer.

use alloc::string::String;
use alloc::vec::Vec;
use rand::Rng;

use crate::ai;
use crate::common::{BattleError, Coord, EndReason, ShotOutcome, Side, Stage};
use crate::config::{GameConfig, TurnPolicy};
use crate::grid::Grid;
use crate::replay;
use crate::ship::{Ship, ShipId};
use crate::shot::{resolve_shot, ShotReport};
use crate::validator::validate_arrangement;

/// Identifier of a battle, unique within one session manager.
pub type BattleId = u64;

/// Opaque player identity supplied by the authentication layer.
pub type PlayerId = String;

/// A participant as known to the engine. Score and record are owned by the
/// rating collaborator and only carried through here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
    pub score: i64,
    pub wins: u32,
    pub losses: u32,
}

impl PlayerRef {
    /// A player with an empty record.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score: 0,
            wins: 0,
            losses: 0,
        }
    }
}

/// One resolved shot. Steps are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub seq: u32,
    pub side: Side,
    pub target: Coord,
    pub outcome: ShotOutcome,
    /// The shot finished off a ship.
    pub sunk: bool,
}

#[derive(Debug, Clone)]
pub struct Battle {
    id: BattleId,
    config: GameConfig,
    players: [PlayerRef; 2],
    stage: Stage,
    committed: [bool; 2],
    whose_turn: Side,
    grids: [Grid; 2],
    history: Vec<Step>,
    winner: Option<Side>,
    end_reason: Option<EndReason>,
}

impl Battle {
    /// Start a battle in ARRANGEMENT with two empty grids.
    pub fn new(
        id: BattleId,
        owner: PlayerRef,
        opponent: PlayerRef,
        config: GameConfig,
    ) -> Result<Self, BattleError> {
        if owner.id == opponent.id {
            return Err(BattleError::InvalidOpponent);
        }
        config.validate()?;
        let grid = Grid::new(config.grid_size, config.adjacency);
        Ok(Self {
            id,
            players: [owner, opponent],
            stage: Stage::Arrangement,
            committed: [false; 2],
            whose_turn: config.first_turn,
            grids: [grid.clone(), grid],
            history: Vec::new(),
            winner: None,
            end_reason: None,
            config,
        })
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn player(&self, side: Side) -> &PlayerRef {
        &self.players[side.index()]
    }

    /// Which side `player_id` plays, resolved by identity.
    pub fn side_of(&self, player_id: &str) -> Result<Side, BattleError> {
        [Side::Owner, Side::Opponent]
            .into_iter()
            .find(|s| self.players[s.index()].id == player_id)
            .ok_or(BattleError::NotAParticipant)
    }

    pub fn is_committed(&self, side: Side) -> bool {
        self.committed[side.index()]
    }

    /// The side expected to fire next; `None` outside BATTLE.
    pub fn whose_turn(&self) -> Option<Side> {
        (self.stage == Stage::Battle).then_some(self.whose_turn)
    }

    /// The grid `side` arranged and the other side shoots at.
    pub fn grid(&self, side: Side) -> &Grid {
        &self.grids[side.index()]
    }

    pub fn history(&self) -> &[Step] {
        &self.history
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Put (or move) ship `ship_id` of `side` onto the cells given.
    pub fn place_ship(
        &mut self,
        side: Side,
        ship_id: ShipId,
        cells: &[Coord],
    ) -> Result<(), BattleError> {
        self.guard_arrangement(side)?;
        let ship = Ship::from_cells(ship_id, cells, self.config.grid_size)?;

        let expected = self.config.fleet.count_for(ship.length());
        let same_length = self.grids[side.index()]
            .ships()
            .iter()
            .filter(|s| s.length() == ship.length() && s.id() != ship_id)
            .count();
        if same_length >= expected as usize {
            return Err(BattleError::WrongShipCount {
                length: ship.length(),
                expected,
                found: (same_length + 1).min(u8::MAX as usize) as u8,
            });
        }

        self.grids[side.index()].place(ship)?;
        log::debug!("battle {}: {:?} placed ship {}", self.id, side, ship_id);
        Ok(())
    }

    /// Take ship `ship_id` of `side` off the grid.
    pub fn remove_ship(&mut self, side: Side, ship_id: ShipId) -> Result<(), BattleError> {
        self.guard_arrangement(side)?;
        self.grids[side.index()].remove(ship_id)?;
        Ok(())
    }

    /// Replace the whole arrangement of `side` with a random valid fleet.
    pub fn auto_arrange<R: Rng + ?Sized>(
        &mut self,
        side: Side,
        rng: &mut R,
    ) -> Result<(), BattleError> {
        self.guard_arrangement(side)?;
        let ships = ai::random_fleet(&self.config, rng)?;
        let mut grid = Grid::new(self.config.grid_size, self.config.adjacency);
        for ship in ships {
            grid.place(ship)?;
        }
        self.grids[side.index()] = grid;
        Ok(())
    }

    /// Finalize the arrangement of `side`. Once both sides have committed the
    /// battle moves to BATTLE.
    pub fn commit(&mut self, side: Side) -> Result<(), BattleError> {
        self.guard_arrangement(side)?;
        validate_arrangement(self.grids[side.index()].ships(), &self.config)?;
        self.committed[side.index()] = true;
        log::info!("battle {}: {:?} committed arrangement", self.id, side);

        if self.committed.iter().all(|c| *c) {
            self.stage = Stage::Battle;
            self.whose_turn = self.config.first_turn;
            log::info!(
                "battle {}: stage BATTLE, {:?} fires first",
                self.id,
                self.whose_turn
            );
        }
        self.check_invariants();
        Ok(())
    }

    /// `side` fires at `target` on the other side's grid.
    pub fn fire(&mut self, side: Side, target: Coord) -> Result<ShotReport, BattleError> {
        match self.stage {
            Stage::End => return Err(BattleError::BattleAlreadyEnded),
            Stage::Arrangement => return Err(BattleError::WrongStage { stage: self.stage }),
            Stage::Battle => {}
        }
        if side != self.whose_turn {
            return Err(BattleError::NotYourTurn);
        }

        let report = resolve_shot(&mut self.grids[side.other().index()], target)?;
        self.history.push(Step {
            seq: self.history.len() as u32,
            side,
            target,
            outcome: report.outcome,
            sunk: report.sunk.is_some(),
        });
        log::debug!(
            "battle {}: {:?} fired at {} -> {:?}",
            self.id,
            side,
            target,
            report.outcome
        );

        if report.fleet_destroyed {
            self.finish(side, EndReason::FleetDestroyed);
        } else {
            self.whose_turn = next_turn(self.config.turn_policy, side, report.outcome);
        }
        self.check_invariants();
        Ok(report)
    }

    /// `side` gives up (or was disconnected); the other side wins.
    pub fn forfeit(&mut self, side: Side) -> Result<(), BattleError> {
        if self.stage == Stage::End {
            return Err(BattleError::BattleAlreadyEnded);
        }
        self.finish(side.other(), EndReason::Forfeit);
        self.check_invariants();
        Ok(())
    }

    /// Rebuild shot-states and turn order from the history alone and compare
    /// them with the live grids.
    pub fn verify_replay(&self) -> bool {
        match replay::replay(&self.config, &self.history) {
            Ok(replayed) => {
                replayed.shots(Side::Owner) == self.grids[Side::Owner.index()].shots()
                    && replayed.shots(Side::Opponent) == self.grids[Side::Opponent.index()].shots()
            }
            Err(_) => false,
        }
    }

    fn guard_arrangement(&self, side: Side) -> Result<(), BattleError> {
        match self.stage {
            Stage::End => Err(BattleError::BattleAlreadyEnded),
            _ if self.committed[side.index()] => Err(BattleError::AlreadyCommitted),
            Stage::Battle => Err(BattleError::WrongStage { stage: self.stage }),
            Stage::Arrangement => Ok(()),
        }
    }

    fn finish(&mut self, winner: Side, reason: EndReason) {
        crate::invariant!(
            self.winner.is_none(),
            "battle {}: winner already set to {:?}",
            self.id,
            self.winner
        );
        self.winner = Some(winner);
        self.end_reason = Some(reason);
        self.stage = Stage::End;
        log::info!(
            "battle {}: stage END, {:?} wins ({:?})",
            self.id,
            winner,
            reason
        );
    }

    /// Abort on any state combination that only a bug can produce.
    fn check_invariants(&self) {
        for (i, step) in self.history.iter().enumerate() {
            crate::invariant!(
                step.seq as usize == i,
                "battle {}: history entry {} carries sequence {}",
                self.id,
                i,
                step.seq
            );
        }
        crate::invariant!(
            self.winner.is_some() == (self.stage == Stage::End),
            "battle {}: winner {:?} in stage {}",
            self.id,
            self.winner,
            self.stage
        );
        crate::invariant!(
            self.stage == Stage::Arrangement
                || self.committed.iter().all(|c| *c)
                || self.end_reason == Some(EndReason::Forfeit),
            "battle {}: stage {} with uncommitted fleets",
            self.id,
            self.stage
        );
        crate::invariant!(
            self.verify_replay(),
            "battle {}: history does not replay to the live grids",
            self.id
        );
    }
}

/// Who fires after `shooter` got `outcome`.
pub(crate) fn next_turn(policy: TurnPolicy, shooter: Side, outcome: ShotOutcome) -> Side {
    match (policy, outcome) {
        (TurnPolicy::ContinueOnHit, ShotOutcome::Hit) => shooter,
        _ => shooter.other(),
    }
}
