//! Whole-fleet arrangement validation.
//!
//! The checks only look at the set of placements, never at the order in
//! which they were made: bounds for every ship, then every pair for overlap,
//! then every pair for contact, then the fleet composition.

use crate::common::BattleError;
use crate::config::GameConfig;
use crate::ship::Ship;

/// Check a complete candidate layout against `config`.
pub fn validate_arrangement(ships: &[Ship], config: &GameConfig) -> Result<(), BattleError> {
    let size = config.grid_size;
    if ships
        .iter()
        .flat_map(|s| s.cells())
        .any(|c| c.x >= size || c.y >= size)
    {
        return Err(BattleError::OutOfBounds);
    }

    let pairs = || {
        ships
            .iter()
            .enumerate()
            .flat_map(move |(i, a)| ships[i + 1..].iter().map(move |b| (a, b)))
    };
    if pairs().any(|(a, b)| a.mask().intersects(&b.mask())) {
        return Err(BattleError::Overlap);
    }
    if pairs().any(|(a, b)| a.mask().dilate(config.adjacency).intersects(&b.mask())) {
        return Err(BattleError::Adjacent);
    }

    check_composition(ships, config)
}

fn check_composition(ships: &[Ship], config: &GameConfig) -> Result<(), BattleError> {
    // Longest offending length first, so the answer is stable.
    for length in (1..=config.grid_size).rev() {
        let found = ships.iter().filter(|s| s.length() == length).count();
        if found == 0 {
            continue;
        }
        let expected = config.fleet.count_for(length);
        if found > expected as usize {
            return Err(BattleError::WrongShipCount {
                length,
                expected,
                found: found.min(u8::MAX as usize) as u8,
            });
        }
    }

    let required = config.fleet.total_ships();
    if ships.len() < required {
        return Err(BattleError::IncompleteFleet {
            placed: ships.len(),
            required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Coord;
    use crate::config::{Adjacency, FleetConfig, ShipClass};
    use crate::ship::Orientation;
    use alloc::vec::Vec;

    fn small_config() -> GameConfig {
        GameConfig {
            grid_size: 6,
            fleet: FleetConfig::new([ShipClass::new(3, 1), ShipClass::new(1, 2)]),
            ..GameConfig::classic()
        }
    }

    fn ship(id: u32, x: u8, y: u8, len: u8) -> Ship {
        Ship::new(id, Coord::new(x, y), len, Orientation::Horizontal, 11).unwrap()
    }

    #[test]
    fn accepts_exact_fleet() {
        let ships = [ship(1, 0, 0, 3), ship(2, 0, 2, 1), ship(3, 5, 5, 1)];
        assert_eq!(validate_arrangement(&ships, &small_config()), Ok(()));
    }

    #[test]
    fn verdict_does_not_depend_on_order() {
        let mut ships: Vec<Ship> = [ship(1, 0, 0, 3), ship(2, 0, 1, 1), ship(3, 4, 4, 4)].into();
        let config = small_config();
        let forward = validate_arrangement(&ships, &config);
        ships.reverse();
        assert_eq!(forward, validate_arrangement(&ships, &config));
        // Out of bounds beats the contact between ships 1 and 2.
        assert_eq!(forward, Err(BattleError::OutOfBounds));
    }

    #[test]
    fn reports_each_violation() {
        let config = small_config();
        assert_eq!(
            validate_arrangement(&[ship(1, 0, 0, 3), ship(2, 2, 0, 1)], &config),
            Err(BattleError::Overlap)
        );
        assert_eq!(
            validate_arrangement(&[ship(1, 0, 0, 3), ship(2, 3, 1, 1)], &config),
            Err(BattleError::Adjacent)
        );
        assert_eq!(
            validate_arrangement(
                &[ship(1, 0, 0, 3), ship(2, 0, 2, 1), ship(3, 2, 2, 1), ship(4, 4, 2, 1)],
                &config
            ),
            Err(BattleError::WrongShipCount {
                length: 1,
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            validate_arrangement(&[ship(1, 0, 0, 2)], &config),
            Err(BattleError::WrongShipCount {
                length: 2,
                expected: 0,
                found: 1
            })
        );
        assert_eq!(
            validate_arrangement(&[ship(1, 0, 0, 3), ship(2, 0, 2, 1)], &config),
            Err(BattleError::IncompleteFleet {
                placed: 2,
                required: 3
            })
        );
    }

    #[test]
    fn orthogonal_rule_lets_corners_touch() {
        let mut config = small_config();
        config.adjacency = Adjacency::Orthogonal;
        let ships = [ship(1, 0, 0, 3), ship(2, 3, 1, 1), ship(3, 5, 5, 1)];
        assert_eq!(validate_arrangement(&ships, &config), Ok(()));
    }
}
