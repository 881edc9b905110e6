#![allow(dead_code)]

use battle_engine::{Coord, PlayerRef, SessionManager, ShipId, GameConfig};

pub fn alice() -> PlayerRef {
    PlayerRef::new("alice", "Alice")
}

pub fn bob() -> PlayerRef {
    PlayerRef::new("bob", "Bob")
}

/// A valid classic layout that leaves (0,0) empty. Ship `(id, x, y, len)`,
/// all horizontal.
pub const CLASSIC_LAYOUT: [(ShipId, u8, u8, u8); 10] = [
    (1, 0, 1, 4),
    (2, 5, 1, 3),
    (3, 0, 3, 3),
    (4, 4, 3, 2),
    (5, 7, 3, 2),
    (6, 0, 5, 2),
    (7, 3, 5, 1),
    (8, 5, 5, 1),
    (9, 7, 5, 1),
    (10, 9, 5, 1),
];

pub fn cells(x: u8, y: u8, len: u8) -> Vec<Coord> {
    (0..len).map(|k| Coord::new(x + k, y)).collect()
}

/// Every ship cell of [`CLASSIC_LAYOUT`].
pub fn layout_cells() -> Vec<Coord> {
    CLASSIC_LAYOUT
        .iter()
        .flat_map(|&(_, x, y, len)| cells(x, y, len))
        .collect()
}

pub fn place_layout(manager: &SessionManager, player: &str, ships: usize) {
    for &(id, x, y, len) in CLASSIC_LAYOUT.iter().take(ships) {
        manager.place_ship(player, id, &cells(x, y, len)).unwrap();
    }
}

/// A manager with a battle between alice (owner) and bob, both committed.
pub fn battle_ready(config: GameConfig) -> SessionManager {
    let manager = SessionManager::new(config).unwrap();
    manager.create_or_join(alice(), bob()).unwrap();
    for player in ["alice", "bob"] {
        place_layout(&manager, player, CLASSIC_LAYOUT.len());
        manager.commit_arrangement(player).unwrap();
    }
    manager
}
