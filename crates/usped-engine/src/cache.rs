//! Content-addressed cache of terrain analyses.
//!
//! Parameters never influence slope, aspect or flow routing, so every
//! sensitivity perturbation and uncertainty sample over one grid can share
//! a single [`TerrainDerivatives`]. The cache is owned by whoever
//! orchestrates runs; the numerical crates never see it.
//!
//! Keys are FNV-1a hashes of the grid geometry, mask and values. A hit is
//! confirmed against the stored grid, so a collision costs a re-analysis
//! rather than a wrong answer.

use std::collections::HashMap;
use std::sync::Arc;

use usped_core::ElevationGrid;
use usped_terrain::{analyze, TerrainDerivatives};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Deterministic content hash of `grid`.
///
/// Covers shape, cell size, the validity mask and every value's bit
/// pattern. No-data cells contribute only their mask bit, so two grids
/// differing only in a masked value hash equal.
pub fn grid_fingerprint(grid: &ElevationGrid) -> u64 {
    let cell = grid.cell_size();
    let mut hash = FNV_OFFSET;
    hash = fnv1a_u64(hash, grid.rows() as u64);
    hash = fnv1a_u64(hash, grid.cols() as u64);
    hash = fnv1a_u64(hash, cell.dx.to_bits());
    hash = fnv1a_u64(hash, cell.dy.to_bits());
    for (&v, &ok) in grid.values().iter().zip(grid.valid_mask()) {
        hash = fnv1a_byte(hash, ok as u8);
        if ok {
            hash = fnv1a_u64(hash, v.to_bits());
        }
    }
    hash
}

fn same_content(a: &ElevationGrid, b: &ElevationGrid) -> bool {
    a.rows() == b.rows()
        && a.cols() == b.cols()
        && a.cell_size() == b.cell_size()
        && a.valid_mask() == b.valid_mask()
        && a
            .iter_valid()
            .zip(b.iter_valid())
            .all(|((_, x), (_, y))| x.to_bits() == y.to_bits())
}

/// Terrain analyses keyed by grid content.
#[derive(Debug, Default)]
pub struct TerrainCache {
    entries: HashMap<u64, (ElevationGrid, Arc<TerrainDerivatives>)>,
    hits: u64,
    misses: u64,
}

impl TerrainCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derivatives for `grid`, analysing it on first sight.
    pub fn get_or_analyze(&mut self, grid: &ElevationGrid) -> Arc<TerrainDerivatives> {
        let key = grid_fingerprint(grid);
        if let Some((stored, derivatives)) = self.entries.get(&key) {
            if same_content(stored, grid) {
                self.hits += 1;
                return Arc::clone(derivatives);
            }
        }
        self.misses += 1;
        tracing::debug!(key, rows = grid.rows(), cols = grid.cols(), "terrain cache miss");
        let derivatives = Arc::new(analyze(grid));
        self.entries
            .insert(key, (grid.clone(), Arc::clone(&derivatives)));
        derivatives
    }

    /// Number of cached analyses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that required an analysis.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usped_core::CellSize;

    fn grid(offset: f64) -> ElevationGrid {
        ElevationGrid::from_fn(4, 4, CellSize::square(1.0), |r, c| offset + (r + c) as f64).unwrap()
    }

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        assert_eq!(grid_fingerprint(&grid(0.0)), grid_fingerprint(&grid(0.0)));
        assert_ne!(grid_fingerprint(&grid(0.0)), grid_fingerprint(&grid(1.0)));
        let wide = ElevationGrid::from_fn(4, 4, CellSize::square(2.0), |r, c| (r + c) as f64)
            .unwrap();
        assert_ne!(grid_fingerprint(&grid(0.0)), grid_fingerprint(&wide));
    }

    #[test]
    fn masked_values_do_not_affect_fingerprint() {
        let a = ElevationGrid::with_nodata(1, 2, CellSize::square(1.0), vec![1.0, -1.0], -1.0)
            .unwrap();
        let b = ElevationGrid::new(1, 2, CellSize::square(1.0), vec![1.0, f64::NAN]).unwrap();
        assert_eq!(grid_fingerprint(&a), grid_fingerprint(&b));
    }

    #[test]
    fn second_lookup_hits() {
        let mut cache = TerrainCache::new();
        let g = grid(0.0);
        let first = cache.get_or_analyze(&g);
        let second = cache.get_or_analyze(&g.clone());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        cache.get_or_analyze(&grid(5.0));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
