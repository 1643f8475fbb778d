//! Terrain → transport → step → summary over the shared fixtures.

use proptest::prelude::*;
use usped_core::{CellSize, ElevationGrid, SimulationParameters};
use usped_solver::{compute_transport_capacity, step, summarize, RiskTier};
use usped_terrain::analyze;
use usped_test_utils::{corner_basin, default_params, flat_grid, no_forcing_params, row_ramp};

fn one_pass(
    grid: &ElevationGrid,
    params: &SimulationParameters,
) -> (usped_solver::StepOutput, usped_solver::ErosionStatistics, usped_solver::RiskClassification) {
    let d = analyze(grid);
    let t = compute_transport_capacity(&d, params);
    let out = step(grid, &t, &d, params).expect("stable step");
    let (stats, risk) = summarize(&out.net_erosion(), grid.cell_area());
    (out, stats, risk)
}

#[test]
fn flat_grid_is_quiet_and_tier_one() {
    let g = flat_grid(10, 10, 100.0);
    let (out, stats, risk) = one_pass(&g, &default_params());
    assert!(out.erosion_rate.values().iter().all(|&e| e.abs() < 1e-12));
    assert_eq!(stats.mean_erosion, 0.0);
    assert!(risk.tiers().iter().all(|&t| t == RiskTier::VeryLow.value()));
}

#[test]
fn ramp_peak_is_near_outlet() {
    let g = row_ramp(10, 10, 1.0);
    let (out, stats, risk) = one_pass(&g, &default_params());
    let means = out.erosion_rate.row_means();
    assert!(means.windows(2).take(8).all(|w| w[1] > w[0]));
    assert!(stats.peak_erosion >= stats.mean_erosion);
    assert!(!risk.is_degenerate());
    // The highest tier sits in the bottom rows.
    let top = (0..10)
        .flat_map(|r| (0..10).map(move |c| (r, c)))
        .filter(|&(r, c)| risk.tier(r, c) == Some(RiskTier::VeryHigh))
        .map(|(r, _)| r)
        .min()
        .unwrap();
    assert!(top >= 8);
}

#[test]
fn no_forcing_leaves_basin_unchanged() {
    let g = corner_basin(6, 1.0);
    let (out, stats, _) = one_pass(&g, &no_forcing_params());
    assert_eq!(out.elevation, g);
    assert_eq!(stats.erosion_volume, 0.0);
    assert_eq!(stats.deposition_volume, 0.0);
}

proptest! {
    #[test]
    fn volumes_match_net_elevation_change(
        values in prop::collection::vec(0.0f64..5.0, 36),
        cell in 0.5f64..3.0,
    ) {
        let g = ElevationGrid::new(6, 6, CellSize::square(cell), values).unwrap();
        let p = SimulationParameters::builder().dt(0.01).build().unwrap();
        let d = analyze(&g);
        let t = compute_transport_capacity(&d, &p);
        if let Ok(out) = step(&g, &t, &d, &p) {
            let (stats, _) = summarize(&out.net_erosion(), g.cell_area());
            let net: f64 = g
                .values()
                .iter()
                .zip(out.elevation.values())
                .map(|(a, b)| a - b)
                .sum::<f64>()
                * g.cell_area();
            prop_assert!((stats.net_volume - net).abs() < 1e-9 * (1.0 + net.abs()));
            prop_assert!((stats.erosion_volume - stats.deposition_volume - net).abs() < 1e-9 * (1.0 + net.abs()));
        }
    }
}
