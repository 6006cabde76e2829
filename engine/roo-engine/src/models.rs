use crate::distribution::LogNormalParams;
use crate::error::{Result, RooError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DFS roster position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    DST,
}

impl Position {
    /// All positions in artifact sort order
    pub const ALL: [Position; 5] = [Position::QB, Position::RB, Position::WR, Position::TE, Position::DST];

    /// Sort rank used by the projection artifact (QB first, DST last)
    pub fn sort_order(self) -> u8 {
        match self {
            Position::QB => 1,
            Position::RB => 2,
            Position::WR => 3,
            Position::TE => 4,
            Position::DST => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::DST => "DST",
        }
    }

    /// WR and TE catch passes from the same-team QB
    pub fn is_pass_catcher(self) -> bool {
        matches!(self, Position::WR | Position::TE)
    }

    /// RB, WR and TE may fill the FLEX slot
    pub fn is_flex_eligible(self) -> bool {
        matches!(self, Position::RB | Position::WR | Position::TE)
    }
}

impl FromStr for Position {
    type Err = RooError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "DST" | "D" | "DEF" | "D/ST" => Ok(Position::DST),
            other => Err(RooError::data_validation(format!("unknown position '{other}'"))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity used to join players across feeds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerKey {
    pub name: String,
    pub team: String,
    pub position: Position,
}

impl PlayerKey {
    pub fn new(name: impl Into<String>, team: impl Into<String>, position: Position) -> Self {
        Self { name: name.into(), team: team.into(), position }
    }

    /// Name with case, periods, apostrophes, hyphens and spaces removed
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.team, self.position)
    }
}

/// Loose name form used when several team+position candidates exist
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '.' | '\'' | '-' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// One realized fantasy score for one player in one week
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerHistoryRecord {
    pub key: PlayerKey,
    pub week: u32,
    pub fantasy_points: f64,
}

/// Historical volatility summary for one player
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityProfile {
    pub key: PlayerKey,
    /// Games in the lookback window
    pub games: usize,
    pub mean_fpts: f64,
    /// Sample std (one-game players use the single-game heuristic)
    pub std_fpts: f64,
    pub min_fpts: f64,
    pub max_fpts: f64,
    /// Std after position blending and clamping
    pub effective_std: f64,
    /// Coefficient of variation
    pub cv: f64,
}

/// Position-level scoring baseline over the lookback window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionBaseline {
    pub position: Position,
    pub rows: usize,
    pub mean_fpts: f64,
    pub std_fpts: f64,
}

/// Offensive (or allowed) efficiency metrics for one team
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EfficiencyMetrics {
    pub epa_play: Option<f64>,
    pub explosive_play_rate: Option<f64>,
    pub points_per_drive: Option<f64>,
}

/// One row of the matchup/efficiency feed
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMatchup {
    pub team: String,
    pub opponent: Option<String>,
    pub implied_total: Option<f64>,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    pub location: Option<String>,
    pub offense: EfficiencyMetrics,
    pub defense_allowed: EfficiencyMetrics,
}

/// Matchup inputs for one team, resolved against its opponent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupContext {
    pub team: String,
    pub opponent: Option<String>,
    pub offense: EfficiencyMetrics,
    pub opponent_defense: EfficiencyMetrics,
    pub implied_total: Option<f64>,
    /// Decay-weighted pass rate over expectation
    pub proe: Option<f64>,
}

/// Weekly pass-rate-over-expectation for one team
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyProe {
    pub season: Option<i32>,
    pub week: u32,
    pub team: String,
    pub proe: f64,
}

/// One row of the slate feed
#[derive(Debug, Clone, PartialEq)]
pub struct SlateEntry {
    pub key: PlayerKey,
    pub salary: u32,
    pub opponent: Option<String>,
    pub implied_total: Option<f64>,
    pub spread: Option<f64>,
    pub median_proj: f64,
    pub proj_own: Option<f64>,
}

/// How a slate player's volatility was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolatilitySource {
    /// Exact name, team and position match
    Exact,
    /// Matched through team and position
    TeamPosition,
    /// No history; position average with the uncertainty premium
    PositionFallback,
}

/// A slate player with everything needed for sampling
#[derive(Debug, Clone, PartialEq)]
pub struct SlatePlayer {
    pub entry: SlateEntry,
    /// Opponent after filling from the matchup feed (empty when unknown)
    pub opponent: String,
    pub implied_total: f64,
    pub spread: f64,
    pub location: String,
    pub profile: Option<VolatilityProfile>,
    pub volatility_source: VolatilitySource,
    pub effective_std: f64,
    pub matchup: MatchupContext,
    pub matchup_vol_multiplier: f64,
    pub adj_std: f64,
    pub params: LogNormalParams,
}

/// Percentile values for one player, in ascending percentile order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PercentileSet {
    values: Vec<(u8, f64)>,
}

impl PercentileSet {
    pub fn new(mut values: Vec<(u8, f64)>) -> Self {
        values.sort_by_key(|(p, _)| *p);
        Self { values }
    }

    pub fn get(&self, percentile: u8) -> Option<f64> {
        self.values.iter().find(|(p, _)| *p == percentile).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u8, f64)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Final per-player output of a run
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProjection {
    pub player: SlatePlayer,
    pub percentiles: PercentileSet,
    pub floor: f64,
    pub ceiling: f64,
    pub volatility_index: f64,
}
