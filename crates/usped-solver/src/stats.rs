//! Erosion statistics and quartile risk classification.
//!
//! The aggregator takes the signed net-erosion field (`z_old − z_new`:
//! positive where material was removed, negative where it was deposited)
//! and the cell area. Erosion statistics and risk quartiles use the
//! strictly positive cells only; volumes use every defined cell.

use std::fmt;

use usped_core::Field;

/// Fewer distinct positive values than this makes quartiles meaningless.
pub const MIN_DISTINCT_FOR_QUARTILES: usize = 4;

/// Five-tier erosion risk class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RiskTier {
    /// At or below the first quartile.
    VeryLow = 1,
    /// Second quartile.
    Low = 2,
    /// Third quartile.
    Moderate = 3,
    /// Above the third quartile, below the maximum.
    High = 4,
    /// Exactly the maximum (P100) positive erosion. Usually a single
    /// cell; ties at the peak all land here.
    VeryHigh = 5,
}

impl RiskTier {
    /// All tiers in ascending order.
    pub const ALL: [RiskTier; 5] = [
        Self::VeryLow,
        Self::Low,
        Self::Moderate,
        Self::High,
        Self::VeryHigh,
    ];

    /// Integer code 1..=5.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Inverse of [`value`](Self::value).
    pub fn from_value(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.value() == v)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-cell risk tiers plus the quartiles that produced them.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskClassification {
    rows: usize,
    cols: usize,
    tiers: Vec<u8>,
    counts: [usize; 5],
    quartiles: Option<[f64; 4]>,
    degenerate: bool,
}

impl RiskClassification {
    /// Row-major tier codes: 0 for no-data, 1..=5 otherwise.
    pub fn tiers(&self) -> &[u8] {
        &self.tiers
    }

    /// Tier at `(row, col)`, `None` for no-data or out of bounds.
    pub fn tier(&self, row: usize, col: usize) -> Option<RiskTier> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        RiskTier::from_value(self.tiers[row * self.cols + col])
    }

    /// Number of positive-erosion cells in `tier`.
    pub fn count(&self, tier: RiskTier) -> usize {
        self.counts[tier.value() as usize - 1]
    }

    /// Counts for tiers 1..=5.
    pub fn counts(&self) -> [usize; 5] {
        self.counts
    }

    /// P25, P50, P75 and P100 of the positive-erosion distribution, absent
    /// in the degenerate case.
    pub fn quartiles(&self) -> Option<[f64; 4]> {
        self.quartiles
    }

    /// True when fewer than [`MIN_DISTINCT_FOR_QUARTILES`] distinct positive
    /// values existed and every cell fell back to [`RiskTier::VeryLow`].
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

/// Scalar summary of one erosion field.
///
/// `mean`/`peak`/`min`/`std` cover strictly positive cells and are 0 when
/// none erode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStatistics {
    /// Mean of positive erosion, metres.
    pub mean_erosion: f64,
    /// Largest erosion, metres.
    pub peak_erosion: f64,
    /// Smallest positive erosion, metres.
    pub min_erosion: f64,
    /// Population standard deviation of positive erosion.
    pub std_erosion: f64,
    /// Number of cells with erosion > 0.
    pub eroding_cells: usize,
    /// Σ positive erosion × cell area, m³.
    pub erosion_volume: f64,
    /// Σ |negative erosion| × cell area, m³.
    pub deposition_volume: f64,
    /// `erosion_volume − deposition_volume`.
    pub net_volume: f64,
    /// `|erosion_volume − deposition_volume|`.
    pub volume_imbalance: f64,
    /// Area of cells in tiers 4 and 5, m².
    pub high_risk_area: f64,
    /// Area of all valid cells, m².
    pub total_area: f64,
    /// `(high_risk_area / total_area) × mean_erosion`, clamped to [0, 100].
    pub erosion_index: f64,
}

/// Percentile `p` (0–100) of ascending `sorted` by linear interpolation
/// between closest ranks. `NaN` for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

fn tier_for(v: f64, q: &[f64; 4]) -> RiskTier {
    if v <= q[0] {
        RiskTier::VeryLow
    } else if v <= q[1] {
        RiskTier::Low
    } else if v <= q[2] {
        RiskTier::Moderate
    } else if v < q[3] {
        RiskTier::High
    } else {
        RiskTier::VeryHigh
    }
}

/// Classify every cell of `net_erosion` into risk tiers.
pub fn classify(net_erosion: &Field) -> RiskClassification {
    let mut positive: Vec<f64> = net_erosion.defined().filter(|&v| v > 0.0).collect();
    positive.sort_by(f64::total_cmp);

    let mut distinct = positive.clone();
    distinct.dedup();
    let degenerate = distinct.len() < MIN_DISTINCT_FOR_QUARTILES;

    let quartiles = (!degenerate).then(|| {
        [
            percentile(&positive, 25.0),
            percentile(&positive, 50.0),
            percentile(&positive, 75.0),
            percentile(&positive, 100.0),
        ]
    });

    if degenerate && !positive.is_empty() {
        tracing::warn!(
            eroding_cells = positive.len(),
            distinct = distinct.len(),
            "too few distinct erosion values for quartiles; defaulting to tier 1"
        );
    }

    let mut counts = [0usize; 5];
    let tiers = net_erosion
        .values()
        .iter()
        .map(|&v| {
            if v.is_nan() {
                return 0;
            }
            let tier = match (&quartiles, v > 0.0) {
                (Some(q), true) => tier_for(v, q),
                _ => RiskTier::VeryLow,
            };
            if v > 0.0 {
                counts[tier.value() as usize - 1] += 1;
            }
            tier.value()
        })
        .collect();

    RiskClassification {
        rows: net_erosion.rows(),
        cols: net_erosion.cols(),
        tiers,
        counts,
        quartiles,
        degenerate,
    }
}

/// Compute statistics and risk classification for `net_erosion`.
pub fn summarize(net_erosion: &Field, cell_area: f64) -> (ErosionStatistics, RiskClassification) {
    let risk = classify(net_erosion);

    let mut sum = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    let mut eroding = 0usize;
    let mut eroded = 0.0;
    let mut deposited = 0.0;
    let mut valid = 0usize;

    for v in net_erosion.defined() {
        valid += 1;
        if v > 0.0 {
            eroding += 1;
            sum += v;
            peak = peak.max(v);
            min = min.min(v);
            eroded += v;
        } else if v < 0.0 {
            deposited += -v;
        }
    }

    let (mean, std, peak, min) = if eroding == 0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let n = eroding as f64;
        let mean = sum / n;
        // Second pass about the mean; eroding cells are often tightly clustered.
        let var = net_erosion
            .defined()
            .filter(|&v| v > 0.0)
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, var.sqrt(), peak, min)
    };

    let erosion_volume = eroded * cell_area;
    let deposition_volume = deposited * cell_area;
    let high_cells = risk.count(RiskTier::High) + risk.count(RiskTier::VeryHigh);
    let high_risk_area = high_cells as f64 * cell_area;
    let total_area = valid as f64 * cell_area;
    let erosion_index = if total_area > 0.0 {
        (high_risk_area / total_area * mean).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let stats = ErosionStatistics {
        mean_erosion: mean,
        peak_erosion: peak,
        min_erosion: min,
        std_erosion: std,
        eroding_cells: eroding,
        erosion_volume,
        deposition_volume,
        net_volume: erosion_volume - deposition_volume,
        volume_imbalance: (erosion_volume - deposition_volume).abs(),
        high_risk_area,
        total_area,
        erosion_index,
    };
    (stats, risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field(values: Vec<f64>) -> Field {
        let n = values.len();
        Field::new(1, n, values).unwrap()
    }

    #[test]
    fn percentile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&s, 0.0), 1.0);
        assert_eq!(percentile(&s, 50.0), 3.0);
        assert_eq!(percentile(&s, 100.0), 5.0);
        assert_eq!(percentile(&[1.0, 2.0], 25.0), 1.25);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn quartile_tiers() {
        // 8 distinct values: P25 = 2.75, P50 = 4.5, P75 = 6.25, P100 = 8.
        let f = field((1..=8).map(f64::from).collect());
        let risk = classify(&f);
        assert!(!risk.is_degenerate());
        assert_eq!(risk.tiers(), &[1, 1, 2, 2, 3, 3, 4, 5]);
        assert_eq!(risk.counts(), [2, 2, 2, 1, 1]);
        assert_eq!(risk.tier(0, 7), Some(RiskTier::VeryHigh));
    }

    #[test]
    fn top_tier_holds_only_the_peak() {
        let f = field(vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 8.0]);
        let risk = classify(&f);
        // P75 = 6.5, so nothing falls strictly between it and the peak.
        assert_eq!(risk.counts(), [2, 2, 1, 0, 2]);
        assert_eq!(risk.tier(0, 5), Some(RiskTier::VeryHigh));
    }

    #[test]
    fn non_eroding_and_nodata_cells() {
        let f = field(vec![-1.0, 0.0, f64::NAN, 1.0, 2.0, 3.0, 4.0]);
        let risk = classify(&f);
        assert_eq!(&risk.tiers()[..3], &[1, 1, 0]);
        assert_eq!(risk.tier(0, 2), None);
        assert_eq!(risk.counts().iter().sum::<usize>(), 4);
    }

    #[test]
    fn too_few_distinct_values_is_degenerate() {
        let f = field(vec![0.5, 0.5, 0.5, 1.0, -0.2]);
        let risk = classify(&f);
        assert!(risk.is_degenerate());
        assert!(risk.quartiles().is_none());
        assert_eq!(risk.count(RiskTier::VeryLow), 4);
        assert!(risk.tiers().iter().all(|&t| t == 1));
    }

    #[test]
    fn summary_statistics_and_volumes() {
        let f = field(vec![1.0, 3.0, -2.0, 0.0]);
        let (s, _) = summarize(&f, 4.0);
        assert_eq!(s.mean_erosion, 2.0);
        assert_eq!(s.peak_erosion, 3.0);
        assert_eq!(s.min_erosion, 1.0);
        assert_eq!(s.std_erosion, 1.0);
        assert_eq!(s.eroding_cells, 2);
        assert_eq!(s.erosion_volume, 16.0);
        assert_eq!(s.deposition_volume, 8.0);
        assert_eq!(s.volume_imbalance, 8.0);
        assert_eq!(s.total_area, 16.0);
    }

    #[test]
    fn spread_survives_a_large_common_offset() {
        let f = field(vec![1e8 + 1.0, 1e8 + 2.0, 1e8 + 3.0, 1e8 + 4.0]);
        let (s, _) = summarize(&f, 1.0);
        assert_eq!(s.mean_erosion, 1e8 + 2.5);
        assert!((s.std_erosion - 1.25f64.sqrt()).abs() < 1e-12, "{}", s.std_erosion);
    }

    #[test]
    fn all_zero_field_is_quiet() {
        let f = field(vec![0.0; 6]);
        let (s, risk) = summarize(&f, 1.0);
        assert_eq!(s, ErosionStatistics { total_area: 6.0, ..Default::default() });
        assert!(risk.tiers().iter().all(|&t| t == 1));
    }

    #[test]
    fn erosion_index_is_clamped() {
        // One of five cells is tier 5 with mean 3000: 0.2 × 3000 > 100.
        let f = field(vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0]);
        let (s, _) = summarize(&f, 1.0);
        assert_eq!(s.erosion_index, 100.0);
    }

    proptest! {
        #[test]
        fn tiers_partition_positive_cells(values in prop::collection::vec(-5.0f64..5.0, 1..80)) {
            let f = field(values);
            let risk = classify(&f);
            let positive = f.defined().filter(|&v| v > 0.0).count();
            prop_assert_eq!(risk.counts().iter().sum::<usize>(), positive);
            if let Some(q) = risk.quartiles() {
                for (&v, &t) in f.values().iter().zip(risk.tiers()) {
                    if v > 0.0 {
                        let tier = RiskTier::from_value(t).unwrap();
                        prop_assert_eq!(tier, tier_for(v, &q));
                    }
                }
            }
        }

        #[test]
        fn peak_at_least_mean(values in prop::collection::vec(-5.0f64..5.0, 1..80)) {
            let (s, _) = summarize(&field(values), 1.0);
            prop_assert!(s.peak_erosion >= s.mean_erosion);
        }
    }
}
