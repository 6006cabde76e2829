//! Lognormal parameter construction
//!
//! A player's median projection becomes the lognormal median (`exp(mu)`), and the
//! relative spread `adj_std / median` is dampened through `ln(1 + x)` before being
//! used as sigma.

use crate::config::{DistributionParams, VolatilityParams};
use serde::{Deserialize, Serialize};

/// Parameters of one player's lognormal outcome distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogNormalParams {
    pub mu_log: f64,
    pub sigma_log: f64,
}

impl LogNormalParams {
    /// Median of the distribution, `exp(mu_log)`
    pub fn median(&self) -> f64 {
        self.mu_log.exp()
    }
}

/// Build lognormal parameters from a median projection and an adjusted std
///
/// Callers must have dropped players whose median is not positive.
pub fn lognormal_params(median_proj: f64, adj_std: f64, params: &DistributionParams) -> LogNormalParams {
    let mu_log = median_proj.max(params.eps).ln();
    let rel_std = adj_std / (median_proj + params.eps);
    let sigma_log = (1.0 + rel_std).ln().clamp(params.min_sigma_log, params.max_sigma_log);

    LogNormalParams { mu_log, sigma_log }
}

/// Scale the effective std by the matchup multiplier and clamp to the std bounds
pub fn adjusted_std(effective_std: f64, matchup_multiplier: f64, params: &VolatilityParams) -> f64 {
    (effective_std * matchup_multiplier).clamp(params.min_std, params.max_std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_player_parameters() {
        let params = lognormal_params(20.0, 6.0, &DistributionParams::default());
        assert!((params.mu_log - 20.0_f64.ln()).abs() < 1e-12);
        assert!((params.mu_log - 2.9957).abs() < 1e-4);
        assert!((params.sigma_log - 0.2612).abs() < 1e-4);
        assert!((params.median() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sigma_is_clamped() {
        let dist = DistributionParams::default();
        // Very stable player: ln(1 + 3/40.1) < 0.2
        assert_eq!(lognormal_params(40.0, 3.0, &dist).sigma_log, 0.2);
        // Tiny median with a large std: ln(1 + 20/0.6) > 1.5
        assert_eq!(lognormal_params(0.5, 20.0, &dist).sigma_log, 1.5);
    }

    #[test]
    fn test_tiny_median_is_guarded() {
        let params = lognormal_params(0.01, 3.0, &DistributionParams::default());
        assert!((params.mu_log - 0.1_f64.ln()).abs() < 1e-12);
        assert!(params.sigma_log.is_finite());
    }

    #[test]
    fn test_adjusted_std_bounds() {
        let vol = VolatilityParams::default();
        assert_eq!(adjusted_std(6.0, 1.0, &vol), 6.0);
        assert_eq!(adjusted_std(2.0, 0.8, &vol), 3.0);
        assert_eq!(adjusted_std(18.0, 1.3, &vol), 20.0);
    }
}
