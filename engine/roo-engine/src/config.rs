use crate::error::{Result, RooError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Percentiles that always appear in the projection artifact
pub const OUTPUT_PERCENTILES: [u8; 8] = [10, 15, 25, 50, 75, 85, 90, 95];

/// Configuration for the range-of-outcomes engine
///
/// Built once per run and passed by reference into every stage; nothing in
/// the engine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RooConfig {
    /// Monte Carlo and percentile parameters
    pub simulation: SimulationParams,

    /// Historical volatility parameters
    pub volatility: VolatilityParams,

    /// Lognormal conversion bounds
    pub distribution: DistributionParams,

    /// Matchup multiplier weights and bounds
    pub matchup: MatchupParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Number of Monte Carlo iterations
    pub n_simulations: usize,

    /// Seed for the run's single random generator
    pub seed: u64,

    /// Percentiles extracted per player (must include every output percentile)
    pub percentiles: Vec<u8>,

    /// Percentile reported as Floor_Proj
    pub floor_percentile: u8,

    /// Percentile reported as Ceiling_Proj
    pub ceiling_percentile: u8,

    /// Epsilon added to the median in the volatility index denominator
    pub volatility_index_eps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    /// How many recent weeks (relative to the latest week present) are analysed
    pub lookback_weeks: u32,

    /// Games needed before a player's own std is used unblended
    pub min_games_for_player: usize,

    /// Lower bound for effective and adjusted std
    pub min_std: f64,

    /// Upper bound for effective and adjusted std
    pub max_std: f64,

    /// Std assumed for a one-game sample, as a share of its mean
    pub single_game_std_ratio: f64,

    /// Multiplier on the position std for players with fewer than two games
    pub uncertainty_premium: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionParams {
    /// Guard against ln(0) and division by zero
    pub eps: f64,

    /// Lower bound for the lognormal sigma
    pub min_sigma_log: f64,

    /// Upper bound for the lognormal sigma
    pub max_sigma_log: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchupParams {
    /// Lower bound for the matchup volatility multiplier (tough matchup)
    pub min_multiplier: f64,

    /// Upper bound for the matchup volatility multiplier (soft matchup)
    pub max_multiplier: f64,

    /// Scale applied to additive EPA differences
    pub epa_scale: f64,

    /// Weight of the offensive factor around the 1.0 baseline
    pub offense_weight: f64,

    /// Weight of the opponent defensive factor around the 1.0 baseline
    pub defense_weight: f64,

    /// Weight of the implied team total factor around the 1.0 baseline
    pub implied_total_weight: f64,

    /// Scale applied to the weighted PROE before it is added
    pub proe_scale: f64,

    /// Per-week decay for PROE weighting (most recent week weighs 1.0)
    pub proe_decay: f64,

    /// Number of recent PROE weeks considered
    pub proe_lookback_weeks: usize,

    /// League implied total used when no matchup row carries an ITT
    pub default_implied_total: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            n_simulations: 10_000,
            seed: 42,
            percentiles: OUTPUT_PERCENTILES.to_vec(),
            floor_percentile: 15,
            ceiling_percentile: 85,
            volatility_index_eps: 0.01,
        }
    }
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            lookback_weeks: 8,
            min_games_for_player: 4,
            min_std: 3.0,
            max_std: 20.0,
            single_game_std_ratio: 0.5,
            uncertainty_premium: 1.2,
        }
    }
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self { eps: 0.1, min_sigma_log: 0.2, max_sigma_log: 1.5 }
    }
}

impl Default for MatchupParams {
    fn default() -> Self {
        Self {
            min_multiplier: 0.8,
            max_multiplier: 1.3,
            epa_scale: 2.5,
            offense_weight: 0.20,
            defense_weight: 0.20,
            implied_total_weight: 0.15,
            proe_scale: 0.67,
            proe_decay: 0.85,
            proe_lookback_weeks: 8,
            default_implied_total: 24.0,
        }
    }
}

impl RooConfig {
    /// Default configuration with the wider std ceiling (3.0 - 25.0)
    pub fn wide_std() -> Self {
        let mut config = Self::default();
        config.volatility.max_std = 25.0;
        config
    }

    /// Load configuration from the flat `ROO_*` variables, an optional TOML file, then nested `ROO_*` overrides
    ///
    /// Nested keys use a double underscore, e.g. `ROO_SIMULATION__SEED=7`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::from_env()?)?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("ROO").prefix_separator("_").separator("__"))
            .build()?;

        let config: RooConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the flat environment variables
    ///
    /// Unparseable values keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(n) = var("ROO_N_SIMULATIONS") {
            config.simulation.n_simulations = n.parse().unwrap_or(config.simulation.n_simulations);
        }

        if let Some(seed) = var("ROO_SEED") {
            config.simulation.seed = seed.parse().unwrap_or(config.simulation.seed);
        }

        if let Some(weeks) = var("ROO_LOOKBACK_WEEKS") {
            config.volatility.lookback_weeks = weeks.parse().unwrap_or(config.volatility.lookback_weeks);
        }

        if let Some(max_std) = var("ROO_MAX_STD") {
            config.volatility.max_std = max_std.parse().unwrap_or(config.volatility.max_std);
        }

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject inconsistent bounds before any work starts
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if sim.n_simulations == 0 {
            return Err(RooError::invalid_config("n_simulations must be positive"));
        }
        if let Some(p) = sim.percentiles.iter().find(|p| **p > 100) {
            return Err(RooError::invalid_config(format!("percentile {p} is outside 0..=100")));
        }
        for required in OUTPUT_PERCENTILES.iter().chain([&sim.floor_percentile, &sim.ceiling_percentile]) {
            if !sim.percentiles.contains(required) {
                return Err(RooError::invalid_config(format!("percentiles must include P{required}")));
            }
        }
        if sim.floor_percentile > sim.ceiling_percentile {
            return Err(RooError::invalid_config("floor percentile exceeds ceiling percentile"));
        }

        let vol = &self.volatility;
        if vol.min_games_for_player == 0 {
            return Err(RooError::invalid_config("min_games_for_player must be positive"));
        }
        if !(vol.min_std > 0.0 && vol.min_std <= vol.max_std) {
            return Err(RooError::invalid_config(format!(
                "std bounds [{}, {}] are invalid",
                vol.min_std, vol.max_std
            )));
        }

        let dist = &self.distribution;
        if !(dist.eps > 0.0 && dist.min_sigma_log > 0.0 && dist.min_sigma_log <= dist.max_sigma_log) {
            return Err(RooError::invalid_config(format!(
                "sigma_log bounds [{}, {}] are invalid",
                dist.min_sigma_log, dist.max_sigma_log
            )));
        }

        let matchup = &self.matchup;
        if matchup.min_multiplier > matchup.max_multiplier {
            return Err(RooError::invalid_config(format!(
                "matchup multiplier bounds [{}, {}] are inverted",
                matchup.min_multiplier, matchup.max_multiplier
            )));
        }
        if matchup.proe_decay <= 0.0 {
            return Err(RooError::invalid_config("proe_decay must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = RooConfig::default();
        assert_eq!(config.simulation.n_simulations, 10_000);
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.volatility.lookback_weeks, 8);
        assert_eq!(config.volatility.min_games_for_player, 4);
        assert_eq!(config.volatility.max_std, 20.0);
        assert_eq!(config.distribution.max_sigma_log, 1.5);
        assert_eq!(config.matchup.min_multiplier, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wide_std_variant() {
        let config = RooConfig::wide_std();
        assert_eq!(config.volatility.min_std, 3.0);
        assert_eq!(config.volatility.max_std, 25.0);
    }

    #[test]
    fn test_validate_rejects_missing_output_percentile() {
        let mut config = RooConfig::default();
        config.simulation.percentiles.retain(|p| *p != 90);
        assert!(matches!(config.validate(), Err(RooError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = RooConfig::default();
        config.matchup.min_multiplier = 1.5;
        assert!(config.validate().is_err());

        let mut config = RooConfig::default();
        config.volatility.min_std = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roo.toml");
        std::fs::write(&path, "[simulation]\nn_simulations = 500\nseed = 7\n\n[volatility]\nmax_std = 25.0\n")
            .unwrap();

        let config = RooConfig::load(Some(&path)).unwrap();
        assert_eq!(config.simulation.n_simulations, 500);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.volatility.max_std, 25.0);
        assert_eq!(config.volatility.min_std, 3.0);
    }

    #[test]
    fn test_flat_variables_override_defaults() {
        let vars: std::collections::HashMap<&str, &str> =
            [("ROO_N_SIMULATIONS", "2500"), ("ROO_SEED", "99"), ("ROO_LOOKBACK_WEEKS", "6"), ("ROO_MAX_STD", "25")]
                .into_iter()
                .collect();
        let config = RooConfig::from_vars(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.simulation.n_simulations, 2500);
        assert_eq!(config.simulation.seed, 99);
        assert_eq!(config.volatility.lookback_weeks, 6);
        assert_eq!(config.volatility.max_std, 25.0);
        assert_eq!(config.volatility.min_std, 3.0);
    }

    #[test]
    fn test_unparseable_flat_variables_keep_defaults() {
        let vars: std::collections::HashMap<&str, &str> =
            [("ROO_N_SIMULATIONS", "lots"), ("ROO_SEED", "-1"), ("ROO_LOOKBACK_WEEKS", ""), ("ROO_MAX_STD", "wide")]
                .into_iter()
                .collect();
        let config = RooConfig::from_vars(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config, RooConfig::default());
    }

    #[test]
    fn test_flat_variables_that_break_bounds_are_rejected() {
        let config = RooConfig::from_vars(|key| (key == "ROO_N_SIMULATIONS").then(|| "0".to_string()));
        assert!(matches!(config, Err(RooError::InvalidConfig(_))));
    }

    #[test]
    fn test_toml_round_trip_preserves_config() {
        let config = RooConfig::wide_std();
        let rendered = config.to_toml().unwrap();
        let parsed: RooConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
