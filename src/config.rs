//! Per-match game configuration: grid size, fleet composition, adjacency
//! strictness and turn policy.

use alloc::vec::Vec;

pub use crate::bitboard::Adjacency;
use crate::bitboard::BitBoard;
use crate::common::{BattleError, Side};

/// Classic grid edge length.
pub const CLASSIC_GRID_SIZE: u8 = 10;

/// Largest grid edge that still fits into a 128-bit board.
pub const MAX_GRID_SIZE: usize = 11;

/// Bitboard type backing every grid.
pub(crate) type BB = BitBoard<u128, MAX_GRID_SIZE>;

/// A group of identical ships in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ShipClass {
    pub length: u8,
    pub count: u8,
}

impl ShipClass {
    pub const fn new(length: u8, count: u8) -> Self {
        Self { length, count }
    }
}

/// The multiset of ship lengths each player must place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "std",
    serde(from = "Vec<ShipClass>", into = "Vec<ShipClass>")
)]
pub struct FleetConfig {
    classes: Vec<ShipClass>,
}

impl From<Vec<ShipClass>> for FleetConfig {
    fn from(classes: Vec<ShipClass>) -> Self {
        Self::new(classes)
    }
}

impl From<FleetConfig> for Vec<ShipClass> {
    fn from(fleet: FleetConfig) -> Self {
        fleet.classes
    }
}

impl FleetConfig {
    /// Build a fleet from `(length, count)` groups. Groups are kept sorted
    /// from the longest ship to the shortest.
    pub fn new(classes: impl IntoIterator<Item = ShipClass>) -> Self {
        let mut classes: Vec<ShipClass> = classes.into_iter().collect();
        classes.sort_by(|a, b| b.length.cmp(&a.length));
        Self { classes }
    }

    /// One 4, two 3s, three 2s and four 1s.
    pub fn classic() -> Self {
        Self::new([
            ShipClass::new(4, 1),
            ShipClass::new(3, 2),
            ShipClass::new(2, 3),
            ShipClass::new(1, 4),
        ])
    }

    pub fn classes(&self) -> &[ShipClass] {
        &self.classes
    }

    /// Number of ships of `length` the fleet requires (zero if none).
    pub fn count_for(&self, length: u8) -> u8 {
        self.classes
            .iter()
            .filter(|c| c.length == length)
            .map(|c| c.count)
            .sum()
    }

    /// Total number of ships in the fleet.
    pub fn total_ships(&self) -> usize {
        self.classes.iter().map(|c| c.count as usize).sum()
    }

    /// Total number of ship cells in the fleet.
    pub fn total_cells(&self) -> usize {
        self.classes
            .iter()
            .map(|c| c.length as usize * c.count as usize)
            .sum()
    }

    /// Every ship length, longest first, repeated by count.
    pub fn lengths(&self) -> impl Iterator<Item = u8> + '_ {
        self.classes
            .iter()
            .flat_map(|c| core::iter::repeat(c.length).take(c.count as usize))
    }
}

/// What happens to the turn after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum TurnPolicy {
    /// The turn passes after every resolved shot.
    #[default]
    Toggle,
    /// A hit lets the shooter fire again.
    ContinueOnHit,
}

/// Rules fixed for the lifetime of one battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct GameConfig {
    pub grid_size: u8,
    pub fleet: FleetConfig,
    pub adjacency: Adjacency,
    pub turn_policy: TurnPolicy,
    /// Side that fires first once both fleets are committed.
    pub first_turn: Side,
}

impl GameConfig {
    /// 10×10 grid, classic fleet, no touching even at corners, turn always
    /// passes, owner fires first.
    pub fn classic() -> Self {
        Self {
            grid_size: CLASSIC_GRID_SIZE,
            fleet: FleetConfig::classic(),
            adjacency: Adjacency::Diagonal,
            turn_policy: TurnPolicy::Toggle,
            first_turn: Side::Owner,
        }
    }

    /// Check that a fleet matching this configuration can exist at all.
    pub fn validate(&self) -> Result<(), BattleError> {
        let size = self.grid_size as usize;
        if size == 0 || size > MAX_GRID_SIZE {
            return Err(BattleError::InvalidConfig);
        }
        if self.fleet.classes().is_empty() {
            return Err(BattleError::InvalidConfig);
        }
        for (i, class) in self.fleet.classes().iter().enumerate() {
            if class.length == 0 || class.count == 0 || class.length as usize > size {
                return Err(BattleError::InvalidConfig);
            }
            if self.fleet.classes()[..i]
                .iter()
                .any(|c| c.length == class.length)
            {
                return Err(BattleError::InvalidConfig);
            }
        }
        if self.fleet.total_cells() > size * size {
            return Err(BattleError::InvalidConfig);
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields fall back to the
    /// classic rules.
    #[cfg(feature = "std")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config: GameConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::classic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_fleet_shape() {
        let fleet = FleetConfig::classic();
        assert_eq!(fleet.total_ships(), 10);
        assert_eq!(fleet.total_cells(), 20);
        assert_eq!(fleet.count_for(3), 2);
        assert_eq!(fleet.count_for(5), 0);
        let lengths: Vec<u8> = fleet.lengths().collect();
        assert_eq!(lengths, [4, 3, 3, 2, 2, 2, 1, 1, 1, 1]);
        assert!(GameConfig::classic().validate().is_ok());
    }

    #[test]
    fn rejects_unusable_configs() {
        let mut config = GameConfig::classic();
        config.grid_size = 12;
        assert_eq!(config.validate(), Err(BattleError::InvalidConfig));

        let mut config = GameConfig::classic();
        config.grid_size = 3;
        assert_eq!(config.validate(), Err(BattleError::InvalidConfig));

        let mut config = GameConfig::classic();
        config.fleet = FleetConfig::new([ShipClass::new(2, 1), ShipClass::new(2, 2)]);
        assert_eq!(config.validate(), Err(BattleError::InvalidConfig));

        let mut config = GameConfig::classic();
        config.fleet = FleetConfig::new([]);
        assert_eq!(config.validate(), Err(BattleError::InvalidConfig));
    }

    #[cfg(feature = "std")]
    #[test]
    fn json_fills_missing_fields_with_classic_rules() {
        let config: GameConfig = serde_json::from_str(
            r#"{"grid_size": 8, "turn_policy": "continue-on-hit",
                "fleet": [{"length": 3, "count": 1}, {"length": 2, "count": 2}]}"#,
        )
        .unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.turn_policy, TurnPolicy::ContinueOnHit);
        assert_eq!(config.adjacency, Adjacency::Diagonal);
        assert_eq!(config.fleet.total_ships(), 3);
        assert!(config.validate().is_ok());
    }
}
