use crate::error::{LineupSimError, Result};
use roo_engine::config::DistributionParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Preset depth of a contest simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimMode {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl FromStr for SimMode {
    type Err = LineupSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(SimMode::Quick),
            "standard" => Ok(SimMode::Standard),
            "deep" => Ok(SimMode::Deep),
            other => Err(LineupSimError::invalid_config(format!("unknown simulation mode '{other}'"))),
        }
    }
}

impl fmt::Display for SimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimMode::Quick => "quick",
            SimMode::Standard => "standard",
            SimMode::Deep => "deep",
        };
        write!(f, "{name}")
    }
}

/// Configuration for a contest simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineupSimConfig {
    /// Number of simulated slates
    pub n_simulations: usize,

    /// Seed for the run's single random generator
    pub seed: u64,

    /// Entries in the real contest
    pub field_size: usize,

    /// Share of the real field generated as opponent lineups, in percent
    pub field_sample_pct: f64,

    /// Lower bound on generated opponent lineups
    pub min_field_lineups: usize,

    /// Generation attempts allowed per wanted field lineup
    pub max_attempt_factor: usize,

    pub entry_fee: f64,

    pub salary_cap: u32,

    /// Ownership assumed for rows without a projection, in percent
    pub default_ownership: f64,

    /// Apply the QB, RB and DST correlation rules
    pub use_correlations: bool,

    /// Lognormal conversion bounds shared with the ROO engine
    pub distribution: DistributionParams,

    pub environment: EnvironmentParams,

    pub correlation: CorrelationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Std of the simulated game total around the line
    pub total_sd: f64,

    /// Std of the simulated spread around the line
    pub spread_sd: f64,

    /// Weight of the z-scored matchup strength on team points
    pub alpha_matchup: f64,

    /// Floor for a simulated game total
    pub min_game_total: f64,

    /// Game total assumed when the matchup row has none
    pub default_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationParams {
    /// QB score above this multiple of its median boosts same-team pass catchers
    pub qb_boom_ratio: f64,

    /// QB score below this multiple of its median penalises same-team pass catchers
    pub qb_bust_ratio: f64,

    pub pass_catcher_boost: [f64; 2],
    pub pass_catcher_penalty: [f64; 2],

    /// Team scoring multiplier above which RBs are boosted
    pub rb_boost_threshold: f64,

    /// Team scoring multiplier below which RBs are penalised
    pub rb_penalty_threshold: f64,

    pub rb_boost: [f64; 2],
    pub rb_penalty: [f64; 2],

    /// Simulated spread (points) beyond which DSTs move
    pub dst_spread_threshold: f64,

    pub dst_boost: [f64; 2],
    pub dst_penalty: [f64; 2],
}

impl Default for LineupSimConfig {
    fn default() -> Self {
        Self {
            n_simulations: 2_000,
            seed: 42,
            field_size: 11_890,
            field_sample_pct: 5.0,
            min_field_lineups: 150,
            max_attempt_factor: 5,
            entry_fee: 3.0,
            salary_cap: 50_000,
            default_ownership: 5.0,
            use_correlations: true,
            distribution: DistributionParams::default(),
            environment: EnvironmentParams::default(),
            correlation: CorrelationParams::default(),
        }
    }
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self { total_sd: 7.0, spread_sd: 4.0, alpha_matchup: 0.05, min_game_total: 10.0, default_total: 45.0 }
    }
}

impl Default for CorrelationParams {
    fn default() -> Self {
        Self {
            qb_boom_ratio: 1.5,
            qb_bust_ratio: 0.5,
            pass_catcher_boost: [1.1, 1.3],
            pass_catcher_penalty: [0.7, 0.9],
            rb_boost_threshold: 1.1,
            rb_penalty_threshold: 0.9,
            rb_boost: [1.05, 1.15],
            rb_penalty: [0.85, 0.95],
            dst_spread_threshold: 3.0,
            dst_boost: [1.1, 1.2],
            dst_penalty: [0.8, 0.9],
        }
    }
}

impl LineupSimConfig {
    /// 500 simulations against a 2% field sample
    pub fn quick() -> Self {
        Self { n_simulations: 500, field_sample_pct: 2.0, ..Self::default() }
    }

    /// 2,000 simulations against a 5% field sample
    pub fn standard() -> Self {
        Self::default()
    }

    /// 5,000 simulations against a 10% field sample
    pub fn deep() -> Self {
        Self { n_simulations: 5_000, field_sample_pct: 10.0, ..Self::default() }
    }

    pub fn for_mode(mode: SimMode) -> Self {
        match mode {
            SimMode::Quick => Self::quick(),
            SimMode::Standard => Self::standard(),
            SimMode::Deep => Self::deep(),
        }
    }

    /// Load a preset, then an optional TOML file, then `LINEUP_SIM_*` environment overrides
    ///
    /// Nested keys use a double underscore, e.g. `LINEUP_SIM_ENVIRONMENT__TOTAL_SD=6`.
    pub fn load(mode: SimMode, path: Option<&Path>) -> Result<Self> {
        let preset = config::Config::try_from(&Self::for_mode(mode))?;
        let mut builder = config::Config::builder().add_source(preset);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("LINEUP_SIM").prefix_separator("_").separator("__"))
            .build()?;

        let config: LineupSimConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Opponent lineups generated for the simulated field
    pub fn field_lineup_target(&self) -> usize {
        let sampled = (self.field_size as f64 * self.field_sample_pct / 100.0) as usize;
        sampled.max(self.min_field_lineups)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_simulations == 0 {
            return Err(LineupSimError::invalid_config("n_simulations must be positive"));
        }
        if self.field_size < 2 {
            return Err(LineupSimError::invalid_config("field_size must be at least 2"));
        }
        if !(self.field_sample_pct > 0.0 && self.field_sample_pct <= 100.0) {
            return Err(LineupSimError::invalid_config(format!(
                "field_sample_pct {} is outside (0, 100]",
                self.field_sample_pct
            )));
        }
        if self.max_attempt_factor == 0 {
            return Err(LineupSimError::invalid_config("max_attempt_factor must be positive"));
        }
        if !(self.entry_fee > 0.0 && self.entry_fee.is_finite()) {
            return Err(LineupSimError::invalid_config("entry_fee must be positive"));
        }
        if self.default_ownership < 0.0 {
            return Err(LineupSimError::invalid_config("default_ownership must not be negative"));
        }

        let env = &self.environment;
        if !(env.total_sd >= 0.0 && env.spread_sd >= 0.0 && env.total_sd.is_finite() && env.spread_sd.is_finite()) {
            return Err(LineupSimError::invalid_config("environment std values must be finite and non-negative"));
        }

        let corr = &self.correlation;
        let ranges = [
            ("pass_catcher_boost", corr.pass_catcher_boost),
            ("pass_catcher_penalty", corr.pass_catcher_penalty),
            ("rb_boost", corr.rb_boost),
            ("rb_penalty", corr.rb_penalty),
            ("dst_boost", corr.dst_boost),
            ("dst_penalty", corr.dst_penalty),
        ];
        for (name, [low, high]) in ranges {
            if !(low > 0.0 && low <= high) {
                return Err(LineupSimError::invalid_config(format!("{name} range [{low}, {high}] is invalid")));
            }
        }
        if corr.qb_bust_ratio > corr.qb_boom_ratio || corr.rb_penalty_threshold > corr.rb_boost_threshold {
            return Err(LineupSimError::invalid_config("correlation thresholds are inverted"));
        }

        Ok(())
    }
}
