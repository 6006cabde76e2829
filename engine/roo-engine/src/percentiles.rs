//! Percentile aggregation over the outcome matrix

use crate::models::PercentileSet;
use crate::sampler::OutcomeMatrix;

/// Linear-interpolation percentile of an ascending slice
///
/// Rank is `p / 100 * (n - 1)`, interpolated between the neighbouring order
/// statistics. Returns `None` for an empty slice.
pub fn percentile_linear(sorted: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    Some((a + (b - a) * frac).clamp(a, b))
}

/// Percentiles of one player's outcomes
pub fn player_percentiles(mut outcomes: Vec<f64>, percentiles: &[u8]) -> PercentileSet {
    outcomes.sort_by(f64::total_cmp);
    PercentileSet::new(
        percentiles
            .iter()
            .filter_map(|&p| percentile_linear(&outcomes, f64::from(p)).map(|v| (p, v)))
            .collect(),
    )
}

/// Per-player percentiles along the simulation axis
pub fn aggregate(matrix: &OutcomeMatrix, percentiles: &[u8]) -> Vec<PercentileSet> {
    (0..matrix.n_players()).map(|player| player_percentiles(matrix.column(player), percentiles)).collect()
}

/// `(ceiling - floor) / (median + eps)`
pub fn volatility_index(floor: f64, ceiling: f64, median: f64, eps: f64) -> f64 {
    (ceiling - floor) / (median + eps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation_matches_reference_definition() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_linear(&values, 0.0), Some(1.0));
        assert_eq!(percentile_linear(&values, 100.0), Some(4.0));
        assert_eq!(percentile_linear(&values, 50.0), Some(2.5));
        // rank 0.3 * 3 = 0.9
        assert!((percentile_linear(&values, 30.0).unwrap() - 1.9).abs() < 1e-12);
        assert_eq!(percentile_linear(&[], 50.0), None);
        assert_eq!(percentile_linear(&[7.0], 85.0), Some(7.0));
    }

    #[test]
    fn test_player_percentiles_sorts_input() {
        let outcomes: Vec<f64> = (0..=100).rev().map(f64::from).collect();
        let set = player_percentiles(outcomes, &[10, 50, 95]);
        assert!((set.get(10).unwrap() - 10.0).abs() < 1e-9);
        assert!((set.get(50).unwrap() - 50.0).abs() < 1e-9);
        assert!((set.get(95).unwrap() - 95.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_index() {
        assert!((volatility_index(15.0, 25.0, 20.0, 0.01) - 10.0 / 20.01).abs() < 1e-12);
        assert_eq!(volatility_index(5.0, 5.0, 10.0, 0.01), 0.0);
    }
}
