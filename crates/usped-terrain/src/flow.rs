//! D8 steepest-descent flow routing and flow accumulation.
//!
//! Each valid cell drains to the single neighbour (of eight) with the
//! largest distance-normalised elevation drop. Only strictly positive
//! drops qualify, so the routing graph is a forest: every edge goes
//! strictly downhill and cycles cannot form. Cells with no downhill
//! neighbour are pits; they terminate accumulation and are not filled.

use smallvec::SmallVec;
use usped_core::grid_helpers::offset_index;
use usped_core::{CellSize, ElevationGrid, Field};

/// One of the eight D8 flow directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowDirection {
    /// East (`col + 1`).
    East,
    /// South-east.
    SouthEast,
    /// South (`row + 1`).
    South,
    /// South-west.
    SouthWest,
    /// West (`col - 1`).
    West,
    /// North-west.
    NorthWest,
    /// North (`row - 1`).
    North,
    /// North-east.
    NorthEast,
}

impl FlowDirection {
    /// Tie-break priority, south-west-most first.
    ///
    /// When several neighbours share the steepest drop, the earliest entry
    /// here wins. The order is part of the model's reproducibility
    /// contract and must not change.
    pub const PRIORITY: [FlowDirection; 8] = [
        Self::SouthWest,
        Self::South,
        Self::West,
        Self::SouthEast,
        Self::NorthWest,
        Self::East,
        Self::North,
        Self::NorthEast,
    ];

    /// `(d_row, d_col)` offset of the receiving neighbour.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Self::East => (0, 1),
            Self::SouthEast => (1, 1),
            Self::South => (1, 0),
            Self::SouthWest => (1, -1),
            Self::West => (0, -1),
            Self::NorthWest => (-1, -1),
            Self::North => (-1, 0),
            Self::NorthEast => (-1, 1),
        }
    }

    /// ESRI-style power-of-two direction code (E=1 … NE=128).
    pub fn code(self) -> u8 {
        match self {
            Self::East => 1,
            Self::SouthEast => 2,
            Self::South => 4,
            Self::SouthWest => 8,
            Self::West => 16,
            Self::NorthWest => 32,
            Self::North => 64,
            Self::NorthEast => 128,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|d| d.code() == code)
    }

    /// Whether this is a diagonal move.
    pub fn is_diagonal(self) -> bool {
        let (dr, dc) = self.offset();
        dr != 0 && dc != 0
    }

    /// Centre-to-centre distance to the receiving neighbour.
    pub fn distance(self, cell: CellSize) -> f64 {
        match self.offset() {
            (0, _) => cell.dx,
            (_, 0) => cell.dy,
            _ => cell.diagonal(),
        }
    }
}

/// Assign a D8 receiver to every cell.
///
/// `None` marks a pit (no strictly lower valid neighbour) or a no-data cell.
/// No-data neighbours are never receivers.
pub fn flow_directions(grid: &ElevationGrid) -> Vec<Option<FlowDirection>> {
    let rows = grid.rows();
    let cols = grid.cols();
    let cell = grid.cell_size();
    let z = grid.values();

    (0..grid.len())
        .map(|i| {
            if !grid.is_valid(i) {
                return None;
            }
            let (r, c) = grid.coords(i);
            let mut best: Option<(FlowDirection, f64)> = None;
            for dir in FlowDirection::PRIORITY {
                let (dr, dc) = dir.offset();
                let Some(n) = offset_index(r, c, dr, dc, rows, cols) else {
                    continue;
                };
                if !grid.is_valid(n) {
                    continue;
                }
                let drop = (z[i] - z[n]) / dir.distance(cell);
                // Strict `>` keeps the earlier (higher-priority) direction on ties.
                if drop > 0.0 && best.is_none_or(|(_, b)| drop > b) {
                    best = Some((dir, drop));
                }
            }
            best.map(|(dir, _)| dir)
        })
        .collect()
}

/// Flat index of the cell that `index` drains into, if any.
pub fn receiver(grid: &ElevationGrid, index: usize, dir: FlowDirection) -> Option<usize> {
    let (r, c) = grid.coords(index);
    let (dr, dc) = dir.offset();
    offset_index(r, c, dr, dc, grid.rows(), grid.cols())
}

/// Upslope contributing area of every cell, in square metres.
///
/// Each valid cell contributes its own area and passes its total to its
/// receiver. Cells are visited in decreasing elevation order, which is a
/// topological order of the D8 forest because every edge strictly descends.
/// No-data cells are `NaN`.
pub fn flow_accumulation(grid: &ElevationGrid, directions: &[Option<FlowDirection>]) -> Field {
    debug_assert_eq!(directions.len(), grid.len());
    let cell_area = grid.cell_area();
    let z = grid.values();

    let mut acc: Vec<f64> = grid
        .valid_mask()
        .iter()
        .map(|&ok| if ok { cell_area } else { f64::NAN })
        .collect();

    let mut order: Vec<usize> = grid.iter_valid().map(|(i, _)| i).collect();
    order.sort_by(|&a, &b| z[b].total_cmp(&z[a]).then(a.cmp(&b)));

    for i in order {
        if let Some(dir) = directions[i] {
            if let Some(n) = receiver(grid, i, dir) {
                acc[n] += acc[i];
            }
        }
    }

    Field::from_cells(grid, |i| acc[i])
}

/// Cells that drain directly into `index`.
pub fn donors(
    grid: &ElevationGrid,
    directions: &[Option<FlowDirection>],
    index: usize,
) -> SmallVec<[usize; 8]> {
    let (r, c) = grid.coords(index);
    let mut out = SmallVec::new();
    for dir in FlowDirection::PRIORITY {
        let (dr, dc) = dir.offset();
        let Some(n) = offset_index(r, c, -dr, -dc, grid.rows(), grid.cols()) else {
            continue;
        };
        if directions[n] == Some(dir) {
            out.push(n);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> ElevationGrid {
        ElevationGrid::from_fn(rows, cols, CellSize::square(1.0), |r, _| 100.0 - r as f64).unwrap()
    }

    fn corner_basin(n: usize) -> ElevationGrid {
        ElevationGrid::from_fn(n, n, CellSize::square(2.0), |r, c| {
            ((n - 1 - r) + (n - 1 - c)) as f64
        })
        .unwrap()
    }

    #[test]
    fn codes_roundtrip() {
        for d in FlowDirection::PRIORITY {
            assert_eq!(FlowDirection::from_code(d.code()), Some(d));
        }
        assert_eq!(FlowDirection::from_code(3), None);
    }

    #[test]
    fn ramp_drains_south() {
        let g = ramp(4, 3);
        let dirs = flow_directions(&g);
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(dirs[g.index(r, c)], Some(FlowDirection::South));
            }
        }
        // Bottom row has nowhere lower to go.
        for c in 0..3 {
            assert_eq!(dirs[g.index(3, c)], None);
        }
    }

    #[test]
    fn ramp_accumulation_grows_downslope() {
        let g = ramp(5, 3);
        let acc = flow_accumulation(&g, &flow_directions(&g));
        for r in 0..5 {
            assert_eq!(acc.get(r, 1), Some((r + 1) as f64));
        }
    }

    #[test]
    fn equal_drops_prefer_south() {
        // Centre raised by one above a flat surround: every orthogonal
        // neighbour shares the steepest drop.
        let g = ElevationGrid::from_fn(3, 3, CellSize::square(1.0), |r, c| {
            if (r, c) == (1, 1) {
                1.0
            } else {
                0.0
            }
        })
        .unwrap();
        let dirs = flow_directions(&g);
        assert_eq!(dirs[4], Some(FlowDirection::South));
    }

    #[test]
    fn diagonal_wins_when_steeper_after_normalisation() {
        // From (0, 1): south-west is 3 lower, south only 1; 3/sqrt(2) > 1.
        let g = ElevationGrid::new(
            2,
            2,
            CellSize::square(1.0),
            vec![9.5, 10.0, 7.0, 9.0],
        )
        .unwrap();
        let dirs = flow_directions(&g);
        assert_eq!(dirs[1], Some(FlowDirection::SouthWest));
        assert!(FlowDirection::SouthWest.is_diagonal());
    }

    #[test]
    fn pit_has_no_receiver() {
        let g = ElevationGrid::from_fn(3, 3, CellSize::square(1.0), |r, c| {
            if (r, c) == (1, 1) {
                0.0
            } else {
                5.0
            }
        })
        .unwrap();
        let dirs = flow_directions(&g);
        assert_eq!(dirs[4], None);
        let acc = flow_accumulation(&g, &dirs);
        assert_eq!(acc.get(1, 1), Some(9.0));
        assert_eq!(donors(&g, &dirs, 4).len(), 8);
    }

    #[test]
    fn corner_basin_collects_total_area() {
        let g = corner_basin(6);
        let dirs = flow_directions(&g);
        let acc = flow_accumulation(&g, &dirs);
        let total = g.cell_area() * g.len() as f64;
        assert_eq!(acc.get(5, 5), Some(total));
        assert_eq!(acc.max_defined(), Some(total));
    }

    #[test]
    fn nodata_cells_neither_route_nor_receive() {
        let nd = -9999.0;
        let g = ElevationGrid::with_nodata(
            1,
            3,
            CellSize::square(1.0),
            vec![3.0, nd, 1.0],
            nd,
        )
        .unwrap();
        let dirs = flow_directions(&g);
        assert_eq!(dirs, vec![None, None, None]);
        let acc = flow_accumulation(&g, &dirs);
        assert!(acc.values()[1].is_nan());
        assert_eq!(acc.get(0, 0), Some(1.0));
    }
}
