//! Terrain analysis over the shared fixtures.

use usped_terrain::{analyze, FlowDirection, FLAT_ASPECT};
use usped_test_utils::{corner_basin, flat_grid, grid_with_holes, row_ramp};

#[test]
fn corner_basin_outlet_collects_everything() {
    let g = corner_basin(8, 5.0);
    let d = analyze(&g);
    let total = g.cell_area() * g.len() as f64;
    let outlet = g.index(7, 7);
    assert_eq!(d.flow_accumulation().values()[outlet], total);
    assert_eq!(d.pits(), vec![outlet]);
    // Interior cells route diagonally towards the outlet.
    assert_eq!(d.flow_direction()[g.index(2, 3)], Some(FlowDirection::SouthEast));
}

#[test]
fn ramp_aspect_faces_south() {
    let g = row_ramp(10, 10, 1.0);
    let d = analyze(&g);
    for v in d.aspect().values() {
        assert!((v - 180.0).abs() < 1e-9);
    }
    for c in 0..10 {
        assert_eq!(d.flow_accumulation().get(9, c), Some(10.0));
    }
}

#[test]
fn flat_grid_is_all_flat() {
    let g = flat_grid(10, 10, 100.0);
    let d = analyze(&g);
    assert!(d.aspect().values().iter().all(|&a| a == FLAT_ASPECT));
    assert_eq!(d.flow_accumulation().max_defined(), Some(1.0));
}

#[test]
fn holes_stay_undefined_and_are_routed_around() {
    let g = grid_with_holes(5, 5, &[(2, 2)]);
    let d = analyze(&g);
    let hole = g.index(2, 2);
    assert!(d.slope().values()[hole].is_nan());
    assert!(d.flow_accumulation().values()[hole].is_nan());
    assert_eq!(d.flow_direction()[hole], None);
    // (1, 2) cannot drain into the hole; it takes the next steepest
    // valid neighbour, a diagonal, with south-west first on the tie.
    assert_eq!(
        d.flow_direction()[g.index(1, 2)],
        Some(FlowDirection::SouthWest)
    );
    // Slope next to the hole falls back to a one-sided difference.
    assert!((d.slope().values()[g.index(1, 2)] - 1.0f64.atan()).abs() < 1e-9);
    let total = g.cell_area() * g.valid_count() as f64;
    let at_pits: f64 = d
        .pits()
        .iter()
        .map(|&i| d.flow_accumulation().values()[i])
        .sum();
    assert!((at_pits - total).abs() < 1e-9);
}
