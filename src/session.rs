#![cfg(feature = "std")]
//! Live battle registry.
//!
//! The manager owns every live battle and guarantees a player is part of at
//! most one battle that has not ended. Each battle sits behind its own
//! `RwLock`, so mutations on one battle are serialized while distinct
//! battles progress in parallel. The registry has a separate lock that is
//! only held for map lookups and updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::battle::{Battle, BattleId, PlayerId, PlayerRef};
use crate::common::{BattleError, Coord, EndReason, Side, Stage};
use crate::config::GameConfig;
use crate::ship::ShipId;
use crate::snapshot::BattleSnapshot;

/// Result of a finished battle, handed to listeners.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BattleSummary {
    pub battle_id: BattleId,
    pub winner: PlayerRef,
    pub loser: PlayerRef,
    pub reason: EndReason,
    pub shots_fired: usize,
}

/// Collaborators interested in finished battles: rating updates, cleanup of
/// cached display state, durable result storage.
pub trait BattleListener: Send + Sync {
    /// Called exactly once per battle, after it reached END and its lock has
    /// been released.
    fn on_battle_end(&self, summary: &BattleSummary);
}

/// A live battle together with its lock.
pub struct BattleHandle {
    id: BattleId,
    battle: RwLock<Battle>,
    last_activity: Mutex<Instant>,
    /// Mirrors `stage == End` so the registry can check it without taking
    /// the battle lock.
    ended: AtomicBool,
}

impl BattleHandle {
    fn new(battle: Battle) -> Self {
        Self {
            id: battle.id(),
            battle: RwLock::new(battle),
            last_activity: Mutex::new(Instant::now()),
            ended: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    /// The battle reached END. Readable while a mutation holds the lock.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Run `f` against the last committed state of the battle.
    pub fn read<T>(&self, f: impl FnOnce(&Battle) -> T) -> T {
        f(&*self.read_guard())
    }

    /// The battle as seen by `player_id`.
    pub fn snapshot_for(&self, player_id: &str) -> Result<BattleSnapshot, BattleError> {
        let battle = self.read_guard();
        let side = battle.side_of(player_id)?;
        Ok(battle.snapshot(side))
    }

    fn idle_for(&self) -> Duration {
        lock_activity(&self.last_activity).elapsed()
    }

    /// Note a successful mutation of `battle`, which must be this handle's
    /// battle seen through its write guard.
    fn touch(&self, battle: &Battle) {
        *lock_activity(&self.last_activity) = Instant::now();
        if battle.stage() == Stage::End {
            self.ended.store(true, Ordering::Release);
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Battle> {
        match self.battle.read() {
            Ok(guard) => guard,
            Err(_) => poisoned(self.id),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Battle> {
        match self.battle.write() {
            Ok(guard) => guard,
            Err(_) => poisoned(self.id),
        }
    }
}

fn lock_activity(m: &Mutex<Instant>) -> std::sync::MutexGuard<'_, Instant> {
    // The timestamp stays meaningful even if a holder panicked.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A panic while a battle was locked means an invariant broke; nothing
/// about that battle can be trusted any more.
fn poisoned(id: BattleId) -> ! {
    log::error!("battle {}: lock poisoned by an earlier invariant violation", id);
    panic!("battle {} lock poisoned by an earlier invariant violation", id);
}

#[derive(Default)]
struct Registry {
    by_player: HashMap<PlayerId, Arc<BattleHandle>>,
    battles: HashMap<BattleId, Arc<BattleHandle>>,
}

pub struct SessionManager {
    config: GameConfig,
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    listeners: RwLock<Vec<Arc<dyn BattleListener>>>,
}

impl SessionManager {
    /// A manager that starts every battle with `config`.
    pub fn new(config: GameConfig) -> Result<Self, BattleError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: RwLock::new(Registry::default()),
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Register a collaborator to hear about finished battles.
    pub fn add_listener(&self, listener: Arc<dyn BattleListener>) {
        match self.listeners.write() {
            Ok(mut listeners) => listeners.push(listener),
            Err(e) => e.into_inner().push(listener),
        }
    }

    /// Start a battle between `owner` and `opponent`. Fails if either of them
    /// is still part of a battle that has not ended.
    pub fn create_or_join(
        &self,
        owner: PlayerRef,
        opponent: PlayerRef,
    ) -> Result<Arc<BattleHandle>, BattleError> {
        if owner.id == opponent.id {
            return Err(BattleError::InvalidOpponent);
        }
        let mut registry = self.registry_write();
        for player in [&owner, &opponent] {
            if let Some(current) = registry.by_player.get(&player.id) {
                if !current.is_ended() {
                    log::debug!(
                        "player {} already in battle {}",
                        player.id,
                        current.id()
                    );
                    return Err(BattleError::AlreadyInBattle);
                }
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let owner_id = owner.id.clone();
        let opponent_id = opponent.id.clone();
        let battle = Battle::new(id, owner, opponent, self.config.clone())?;
        let handle = Arc::new(BattleHandle::new(battle));
        registry.battles.insert(id, handle.clone());
        registry.by_player.insert(owner_id.clone(), handle.clone());
        registry.by_player.insert(opponent_id.clone(), handle.clone());
        log::info!("battle {} created: {} vs {}", id, owner_id, opponent_id);
        Ok(handle)
    }

    /// The player's current battle. A finished battle is still returned
    /// until it is retired or the player starts a new one.
    pub fn find(&self, player_id: &str) -> Option<Arc<BattleHandle>> {
        self.registry_read().by_player.get(player_id).cloned()
    }

    /// Remove a battle from the live set. Retiring twice is a no-op.
    pub fn retire(&self, battle_id: BattleId) {
        let mut registry = self.registry_write();
        let Some(handle) = registry.battles.remove(&battle_id) else {
            return;
        };
        registry.by_player.retain(|_, h| h.id() != battle_id);
        if !handle.is_ended() {
            log::warn!("battle {} retired before it ended", battle_id);
        } else {
            log::info!("battle {} retired", battle_id);
        }
    }

    /// Number of battles in the live set.
    pub fn live_battles(&self) -> usize {
        self.registry_read().battles.len()
    }

    pub fn get_current_battle(&self, player_id: &str) -> Option<BattleSnapshot> {
        self.find(player_id)?.snapshot_for(player_id).ok()
    }

    pub fn place_ship(
        &self,
        player_id: &str,
        ship_id: ShipId,
        cells: &[Coord],
    ) -> Result<BattleSnapshot, BattleError> {
        self.act(player_id, |battle, side| {
            battle.place_ship(side, ship_id, cells)
        })
    }

    pub fn remove_ship(
        &self,
        player_id: &str,
        ship_id: ShipId,
    ) -> Result<BattleSnapshot, BattleError> {
        self.act(player_id, |battle, side| battle.remove_ship(side, ship_id))
    }

    /// Replace the player's arrangement with a random valid fleet. A fixed
    /// `seed` makes the layout reproducible.
    pub fn auto_arrange(
        &self,
        player_id: &str,
        seed: Option<u64>,
    ) -> Result<BattleSnapshot, BattleError> {
        let mut rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        self.act(player_id, |battle, side| battle.auto_arrange(side, &mut rng))
    }

    pub fn commit_arrangement(&self, player_id: &str) -> Result<BattleSnapshot, BattleError> {
        self.act(player_id, |battle, side| battle.commit(side))
    }

    pub fn fire_shot(&self, player_id: &str, x: u8, y: u8) -> Result<BattleSnapshot, BattleError> {
        self.act(player_id, |battle, side| {
            battle.fire(side, Coord::new(x, y)).map(|_| ())
        })
    }

    /// The player gives up, or their connection was lost.
    pub fn forfeit(&self, player_id: &str) -> Result<BattleSnapshot, BattleError> {
        self.act(player_id, |battle, side| battle.forfeit(side))
    }

    /// Forfeit, on behalf of the stalling player, every battle that saw no
    /// successful mutation for longer than `max_idle`. Returns the ids of the
    /// battles ended this way.
    pub fn forfeit_idle(&self, max_idle: Duration) -> Vec<BattleId> {
        let handles: Vec<Arc<BattleHandle>> =
            self.registry_read().battles.values().cloned().collect();
        let mut ended = Vec::new();
        for handle in handles {
            if handle.idle_for() <= max_idle {
                continue;
            }
            let summary = {
                let mut battle = handle.write_guard();
                // Re-check under the lock; a move may have landed meanwhile.
                if handle.idle_for() <= max_idle || battle.stage() == Stage::End {
                    continue;
                }
                let staller = stalling_side(&battle);
                log::warn!(
                    "battle {}: {} idle for over {:?}, forfeiting",
                    battle.id(),
                    battle.player(staller).id,
                    max_idle
                );
                if battle.forfeit(staller).is_err() {
                    continue;
                }
                handle.touch(&battle);
                summarize(&battle)
            };
            ended.push(handle.id());
            if let Some(summary) = summary {
                self.notify(&summary);
            }
        }
        ended
    }

    /// Apply `op` to the caller's battle under its write lock and return the
    /// caller's snapshot of the result.
    fn act(
        &self,
        player_id: &str,
        op: impl FnOnce(&mut Battle, Side) -> Result<(), BattleError>,
    ) -> Result<BattleSnapshot, BattleError> {
        let handle = self.find(player_id).ok_or(BattleError::NoActiveBattle)?;
        let (snapshot, summary) = {
            let mut battle = handle.write_guard();
            let side = battle.side_of(player_id)?;
            let was_over = battle.stage() == Stage::End;
            if let Err(e) = op(&mut *battle, side) {
                log::debug!(
                    "battle {}: {} rejected: {} ({})",
                    battle.id(),
                    player_id,
                    e,
                    e.code()
                );
                return Err(e);
            }
            handle.touch(&battle);
            let summary = if was_over { None } else { summarize(&battle) };
            (battle.snapshot(side), summary)
        };
        if let Some(summary) = summary {
            self.notify(&summary);
        }
        Ok(snapshot)
    }

    fn notify(&self, summary: &BattleSummary) {
        let listeners: Vec<Arc<dyn BattleListener>> = match self.listeners.read() {
            Ok(l) => l.clone(),
            Err(e) => e.into_inner().clone(),
        };
        for listener in listeners {
            listener.on_battle_end(summary);
        }
    }

    fn registry_read(&self) -> RwLockReadGuard<'_, Registry> {
        match self.registry.read() {
            Ok(guard) => guard,
            Err(_) => registry_poisoned(),
        }
    }

    fn registry_write(&self) -> RwLockWriteGuard<'_, Registry> {
        match self.registry.write() {
            Ok(guard) => guard,
            Err(_) => registry_poisoned(),
        }
    }
}

fn registry_poisoned() -> ! {
    log::error!("battle registry lock poisoned");
    panic!("battle registry lock poisoned");
}

/// Summary of a battle that has reached END, `None` otherwise.
fn summarize(battle: &Battle) -> Option<BattleSummary> {
    let winner = battle.winner()?;
    Some(BattleSummary {
        battle_id: battle.id(),
        winner: battle.player(winner).clone(),
        loser: battle.player(winner.other()).clone(),
        reason: battle.end_reason()?,
        shots_fired: battle.history().len(),
    })
}

/// The side holding the battle up: whoever still has to commit, or whoever
/// has to fire.
fn stalling_side(battle: &Battle) -> Side {
    match battle.whose_turn() {
        Some(side) => side,
        None if !battle.is_committed(Side::Opponent) => Side::Opponent,
        None => Side::Owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct Recorder(StdMutex<Vec<BattleSummary>>);

    impl BattleListener for Recorder {
        fn on_battle_end(&self, summary: &BattleSummary) {
            self.0.lock().unwrap().push(summary.clone());
        }
    }

    fn players() -> (PlayerRef, PlayerRef) {
        (PlayerRef::new("a", "Alice"), PlayerRef::new("b", "Bob"))
    }

    #[test]
    fn one_live_battle_per_player() {
        let manager = SessionManager::new(GameConfig::classic()).unwrap();
        let (a, b) = players();
        let handle = manager.create_or_join(a.clone(), b.clone()).unwrap();
        assert_eq!(
            manager
                .create_or_join(a.clone(), PlayerRef::new("c", "Carol"))
                .err(),
            Some(BattleError::AlreadyInBattle)
        );
        assert_eq!(
            manager.create_or_join(a.clone(), a.clone()).err(),
            Some(BattleError::InvalidOpponent)
        );
        assert_eq!(manager.find("b").unwrap().id(), handle.id());
        assert!(manager.find("c").is_none());

        manager.forfeit("a").unwrap();
        // Ended but not retired: still visible, but no longer blocking.
        assert_eq!(manager.find("a").unwrap().id(), handle.id());
        let next = manager
            .create_or_join(a, PlayerRef::new("c", "Carol"))
            .unwrap();
        assert_eq!(manager.find("a").unwrap().id(), next.id());
        assert_eq!(manager.find("b").unwrap().id(), handle.id());
        assert_eq!(manager.live_battles(), 2);

        manager.retire(handle.id());
        manager.retire(handle.id());
        assert!(manager.find("b").is_none());
        assert_eq!(manager.find("a").unwrap().id(), next.id());
        assert_eq!(manager.live_battles(), 1);
    }

    #[test]
    fn operations_without_battle_fail() {
        let manager = SessionManager::new(GameConfig::classic()).unwrap();
        assert!(manager.get_current_battle("nobody").is_none());
        assert_eq!(
            manager.commit_arrangement("nobody").unwrap_err(),
            BattleError::NoActiveBattle
        );
        assert_eq!(
            manager.fire_shot("nobody", 0, 0).unwrap_err(),
            BattleError::NoActiveBattle
        );
    }

    #[test]
    fn listeners_hear_about_the_end_once() {
        let manager = SessionManager::new(GameConfig::classic()).unwrap();
        let recorder = Arc::new(Recorder(StdMutex::new(Vec::new())));
        manager.add_listener(recorder.clone());
        let (a, b) = players();
        manager.create_or_join(a, b).unwrap();

        let snapshot = manager.forfeit("b").unwrap();
        assert_eq!(snapshot.stage, Stage::End);
        assert_eq!(manager.forfeit("a").unwrap_err(), BattleError::BattleAlreadyEnded);

        let seen = recorder.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].winner.id, "a");
        assert_eq!(seen[0].loser.id, "b");
        assert_eq!(seen[0].reason, EndReason::Forfeit);
    }

    #[test]
    fn registry_does_not_wait_on_a_locked_battle() {
        let manager = Arc::new(SessionManager::new(GameConfig::classic()).unwrap());
        let (a, b) = players();
        let first = manager.create_or_join(a.clone(), b).unwrap();
        let guard = first.write_guard();

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let manager = manager.clone();
            std::thread::spawn(move || {
                let joined = manager
                    .create_or_join(a, PlayerRef::new("c", "Carol"))
                    .map(|h| h.id());
                let other = manager
                    .create_or_join(PlayerRef::new("d", "Dan"), PlayerRef::new("e", "Eve"))
                    .map(|h| h.id());
                tx.send((joined, other, manager.find("a").map(|h| h.id())))
                    .unwrap();
            })
        };
        let (joined, other, found) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        drop(guard);
        worker.join().unwrap();

        assert_eq!(joined, Err(BattleError::AlreadyInBattle));
        assert!(other.is_ok());
        assert_eq!(found, Some(first.id()));
    }

    #[test]
    fn ended_flag_follows_the_battle() {
        let manager = SessionManager::new(GameConfig::classic()).unwrap();
        let (a, b) = players();
        let handle = manager.create_or_join(a, b).unwrap();
        manager.auto_arrange("a", Some(3)).unwrap();
        assert!(!handle.is_ended());
        manager.forfeit("a").unwrap();
        assert!(handle.is_ended());
        assert!(handle.read(|battle| battle.stage() == Stage::End));
    }

    #[test]
    fn idle_battles_are_forfeited_by_the_staller() {
        let manager = SessionManager::new(GameConfig::classic()).unwrap();
        let (a, b) = players();
        let handle = manager.create_or_join(a, b).unwrap();
        manager.auto_arrange("a", Some(1)).unwrap();
        manager.commit_arrangement("a").unwrap();

        assert!(manager.forfeit_idle(Duration::from_secs(60)).is_empty());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.forfeit_idle(Duration::from_millis(5)), [handle.id()]);
        assert!(handle.is_ended());

        let view = manager.get_current_battle("a").unwrap();
        assert_eq!(view.stage, Stage::End);
        assert_eq!(view.winner, Some(crate::snapshot::Perspective::Me));
        assert!(manager.forfeit_idle(Duration::from_millis(0)).is_empty());
    }
}
