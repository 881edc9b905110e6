//! Self-play between two automatic players through a [`SessionManager`].

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::ai::choose_target;
use crate::battle::{BattleId, PlayerRef};
use crate::common::{BattleError, EndReason};
use crate::config::GameConfig;
use crate::session::SessionManager;
use crate::snapshot::Perspective;

/// Outcome of a simulated battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub battle_id: BattleId,
    pub seed: u64,
    pub winner: String,
    pub reason: EndReason,
    pub shots: [usize; 2],
    /// The recorded history reproduces the final shot boards.
    pub replay_verified: bool,
}

/// Play one complete battle between two automatic players. The same `seed`
/// always produces the same battle.
pub fn simulate(config: GameConfig, seed: u64) -> Result<SimulationReport, BattleError> {
    let manager = SessionManager::new(config)?;
    let players = [
        PlayerRef::new("ai-1", "Automatic One"),
        PlayerRef::new("ai-2", "Automatic Two"),
    ];
    let handle = manager.create_or_join(players[0].clone(), players[1].clone())?;
    for (i, player) in players.iter().enumerate() {
        manager.auto_arrange(&player.id, Some(seed.wrapping_add(i as u64)))?;
        manager.commit_arrangement(&player.id)?;
    }

    let mut rngs = [
        SmallRng::seed_from_u64(seed ^ 0x5eed_0001),
        SmallRng::seed_from_u64(seed ^ 0x5eed_0002),
    ];
    let mut shots = [0usize; 2];
    let adjacency = manager.config().adjacency;
    let limit = {
        let size = manager.config().grid_size as usize;
        2 * size * size
    };

    for _ in 0..limit {
        let Some(snapshot) = manager.get_current_battle(&players[0].id) else {
            return Err(BattleError::NoActiveBattle);
        };
        let shooter = match snapshot.whose_turn {
            Some(Perspective::Me) => 0,
            Some(Perspective::Enemy) => 1,
            None => break,
        };
        let view = manager
            .get_current_battle(&players[shooter].id)
            .ok_or(BattleError::NoActiveBattle)?;
        let target = choose_target(
            &view.enemy_grid,
            &view.enemy_fleet_remaining,
            adjacency,
            &mut rngs[shooter],
        )
        .ok_or(BattleError::AlreadyTargeted)?;
        manager.fire_shot(&players[shooter].id, target.x, target.y)?;
        shots[shooter] += 1;
    }

    handle.read(|battle| {
        let (Some(winner), Some(reason)) = (battle.winner(), battle.end_reason()) else {
            return Err(BattleError::WrongStage {
                stage: battle.stage(),
            });
        };
        Ok(SimulationReport {
            battle_id: battle.id(),
            seed,
            winner: battle.player(winner).id.clone(),
            reason,
            shots,
            replay_verified: battle.verify_replay(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_finishes_with_a_destroyed_fleet() {
        let report = simulate(GameConfig::classic(), 42).unwrap();
        assert_eq!(report.reason, EndReason::FleetDestroyed);
        assert!(report.replay_verified);
        assert!(report.shots[0] >= 20 || report.shots[1] >= 20);
    }

    #[test]
    fn same_seed_same_battle() {
        let a = simulate(GameConfig::classic(), 7).unwrap();
        let b = simulate(GameConfig::classic(), 7).unwrap();
        assert_eq!(a, b);
    }
}
