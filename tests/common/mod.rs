#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use macrocell::Universe;
use macrocell::WorldOffset;
use tracing_subscriber::EnvFilter;

pub type Cells = BTreeSet<(i64, i64)>;

/// Heads south east, 4 generations per cell
pub const GLIDER: [(WorldOffset, WorldOffset); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

pub const BLOCK: [(WorldOffset, WorldOffset); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

pub const R_PENTOMINO: [(WorldOffset, WorldOffset); 5] = [(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)];

/// Log to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn cells(cells: &[(WorldOffset, WorldOffset)]) -> Cells {
    cells.iter().map(|&(x, y)| (x as i64, y as i64)).collect()
}

pub fn shifted(cells: &Cells, dx: i64, dy: i64) -> Cells {
    cells.iter().map(|&(x, y)| (x + dx, y + dy)).collect()
}

/// B3/S23 on an unbounded set of cells
pub fn naive(cells: &Cells, generations: u64) -> Cells {
    let mut cells = cells.clone();

    for _ in 0..generations {
        let mut counts: BTreeMap<(i64, i64), u8> = BTreeMap::new();
        for &(x, y) in &cells {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy) != (0, 0) {
                        *counts.entry((x + dx, y + dy)).or_default() += 1;
                    }
                }
            }
        }

        cells = counts
            .into_iter()
            .filter(|&(c, n)| n == 3 || (n == 2 && cells.contains(&c)))
            .map(|(c, _)| c)
            .collect();
    }

    cells
}

pub fn live(u: &Universe) -> Cells {
    u.live_cells()
        .into_iter()
        .map(|(x, y)| {
            (
                i64::try_from(x).expect("x fits in i64"),
                i64::try_from(y).expect("y fits in i64"),
            )
        })
        .collect()
}

/// Rows of `#` and `.` covering the bounding box, separated by `/`
pub fn render(cells: &Cells) -> String {
    let Some(left) = cells.iter().map(|c| c.0).min() else {
        return String::new();
    };
    let right = cells.iter().map(|c| c.0).max().unwrap_or(left);
    let top = cells.iter().map(|c| c.1).min().unwrap_or(0);
    let bottom = cells.iter().map(|c| c.1).max().unwrap_or(top);

    (top..=bottom)
        .map(|y| {
            (left..=right)
                .map(|x| if cells.contains(&(x, y)) { '#' } else { '.' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("/")
}
