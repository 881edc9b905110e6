// Random fleet arrangement and probability-based target selection.
// Used by automatic arrangement and by the simulated players.

use alloc::vec;
use alloc::vec::Vec;
use rand::Rng;

use crate::bitboard::Adjacency;
use crate::common::{BattleError, Coord};
use crate::config::GameConfig;
use crate::grid::Grid;
use crate::ship::{Orientation, Ship, ShipId};
use crate::snapshot::{CellView, GridView};

const PLACEMENT_ATTEMPTS: usize = 100;
const LAYOUT_ATTEMPTS: usize = 100;

/// Random non-overlapping, non-touching placement of a whole fleet. Ships are
/// numbered from 1 in fleet order, longest first.
pub fn random_fleet<R: Rng + ?Sized>(
    config: &GameConfig,
    rng: &mut R,
) -> Result<Vec<Ship>, BattleError> {
    config.validate()?;
    'layout: for _ in 0..LAYOUT_ATTEMPTS {
        let mut grid = Grid::new(config.grid_size, config.adjacency);
        for (i, length) in config.fleet.lengths().enumerate() {
            match random_placement(&grid, rng, i as ShipId + 1, length) {
                Some(ship) => grid.place(ship)?,
                None => continue 'layout,
            }
        }
        return Ok(grid.ships().to_vec());
    }
    Err(BattleError::UnableToArrange)
}

/// A random spot on `grid` where a ship of `length` fits.
fn random_placement<R: Rng + ?Sized>(
    grid: &Grid,
    rng: &mut R,
    id: ShipId,
    length: u8,
) -> Option<Ship> {
    let size = grid.size();
    for _ in 0..PLACEMENT_ATTEMPTS {
        let orient = if rng.random() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let (max_x, max_y) = match orient {
            Orientation::Horizontal => (size - length, size - 1),
            Orientation::Vertical => (size - 1, size - length),
        };
        let origin = Coord::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y));
        let Ok(ship) = Ship::new(id, origin, length, orient, size) else {
            continue;
        };
        let mut probe = grid.clone();
        if probe.place(ship).is_ok() {
            return Some(ship);
        }
    }
    None
}

/// Relative likelihood of each enemy cell holding a ship segment, given
/// what has been revealed and which ship lengths are still afloat. The
/// result is row-major and sums to one over cells that can still be shot.
pub fn calc_pdf(view: &GridView, remaining: &[u8], adjacency: Adjacency) -> Vec<f64> {
    // Placements covering more observed hits get much more weight, so
    // squares next to confirmed hits stand out.
    const HIT_BIAS: f64 = 10.0;

    let size = view.size as usize;
    let blocked = blocked_cells(view, adjacency);
    let mut matrix = vec![0.0f64; size * size];

    for &len in remaining {
        let len = len as usize;
        if len == 0 || len > size {
            continue;
        }
        for orient in [Orientation::Horizontal, Orientation::Vertical] {
            let (max_row, max_col) = match orient {
                Orientation::Horizontal => (size, size - len + 1),
                Orientation::Vertical => (size - len + 1, size),
            };
            for r in 0..max_row {
                for c in 0..max_col {
                    let cell = |k: usize| match orient {
                        Orientation::Horizontal => r * size + c + k,
                        Orientation::Vertical => (r + k) * size + c,
                    };
                    if (0..len).any(|k| blocked[cell(k)]) {
                        continue;
                    }
                    let n_hits = (0..len)
                        .filter(|&k| view.cells[cell(k)] == CellView::Hit)
                        .count();
                    let weight = libm::pow(HIT_BIAS, n_hits as f64);
                    for k in 0..len {
                        if view.cells[cell(k)] != CellView::Hit {
                            matrix[cell(k)] += weight;
                        }
                    }
                }
            }
        }
    }

    normalize(view, matrix)
}

/// Cells no remaining ship can occupy: misses, sunk segments and, under the
/// no-touching rule, the ring around every sunk ship.
fn blocked_cells(view: &GridView, adjacency: Adjacency) -> Vec<bool> {
    let size = view.size as i32;
    let mut blocked: Vec<bool> = view
        .cells
        .iter()
        .map(|v| matches!(v, CellView::Miss | CellView::Sunk))
        .collect();
    for (i, v) in view.cells.iter().enumerate() {
        if *v != CellView::Sunk {
            continue;
        }
        let (r, c) = (i as i32 / size, i as i32 % size);
        for dr in -1..=1 {
            for dc in -1..=1 {
                if adjacency == Adjacency::Orthogonal && dr != 0 && dc != 0 {
                    continue;
                }
                let (rr, cc) = (r + dr, c + dc);
                if rr >= 0 && cc >= 0 && rr < size && cc < size {
                    blocked[(rr * size + cc) as usize] = true;
                }
            }
        }
    }
    blocked
}

fn normalize(view: &GridView, mut matrix: Vec<f64>) -> Vec<f64> {
    let total: f64 = matrix.iter().sum();
    if total == 0.0 {
        // Nothing fits any more; spread evenly over cells still open.
        let open: Vec<usize> = (0..matrix.len())
            .filter(|&i| is_open(view.cells[i]))
            .collect();
        for &i in &open {
            matrix[i] = 1.0 / open.len() as f64;
        }
        return matrix;
    }
    for v in matrix.iter_mut() {
        *v /= total;
    }
    matrix
}

fn is_open(view: CellView) -> bool {
    matches!(view, CellView::Unknown | CellView::Empty | CellView::Ship)
}

/// Sample a cell that can still be shot from `pdf`, sharpened by
/// `temperature` (lower values favour likelier cells).
pub fn sample_pdf<R: Rng + ?Sized>(
    view: &GridView,
    pdf: &[f64],
    temperature: f64,
    rng: &mut R,
) -> Option<Coord> {
    let size = view.size;
    let weights: Vec<f64> = pdf
        .iter()
        .zip(&view.cells)
        .map(|(p, v)| {
            if is_open(*v) {
                libm::pow(*p, 1.0 / temperature)
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();
    let to_coord = |i: usize| Coord::new(i as u8 % size, i as u8 / size);
    if total <= 0.0 {
        let open: Vec<Coord> = view.untouched().collect();
        if open.is_empty() {
            return None;
        }
        return Some(open[rng.random_range(0..open.len())]);
    }
    let threshold: f64 = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last_open = None;
    for (i, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_open = Some(i);
        if threshold < cumulative {
            return Some(to_coord(i));
        }
    }
    last_open.map(to_coord)
}

/// Pick the next shot against `view`.
pub fn choose_target<R: Rng + ?Sized>(
    view: &GridView,
    remaining: &[u8],
    adjacency: Adjacency,
    rng: &mut R,
) -> Option<Coord> {
    let pdf = calc_pdf(view, remaining, adjacency);
    sample_pdf(view, &pdf, 0.5, rng)
}
