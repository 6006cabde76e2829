//! Matchup context normalizer
//!
//! Team efficiency is always compared against league averages. EPA sits near
//! zero so it is compared additively; the rate metrics are compared as ratios.
//! Anything missing contributes a neutral factor.

use crate::config::MatchupParams;
use crate::models::{EfficiencyMetrics, MatchupContext, TeamMatchup, WeeklyProe};
use crate::teams::canonical_team;
use std::collections::HashMap;
use tracing::{debug, info};

/// League-wide means of every efficiency metric
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueAverages {
    pub offense: EfficiencyMetrics,
    pub defense_allowed: EfficiencyMetrics,
    pub implied_total: f64,
}

fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values.flatten().fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl LeagueAverages {
    /// Simple means across all team rows; ITT falls back to `default_implied_total`
    pub fn compute(rows: &[TeamMatchup], default_implied_total: f64) -> Self {
        let offense = EfficiencyMetrics {
            epa_play: mean_of(rows.iter().map(|r| r.offense.epa_play)),
            explosive_play_rate: mean_of(rows.iter().map(|r| r.offense.explosive_play_rate)),
            points_per_drive: mean_of(rows.iter().map(|r| r.offense.points_per_drive)),
        };
        let defense_allowed = EfficiencyMetrics {
            epa_play: mean_of(rows.iter().map(|r| r.defense_allowed.epa_play)),
            explosive_play_rate: mean_of(rows.iter().map(|r| r.defense_allowed.explosive_play_rate)),
            points_per_drive: mean_of(rows.iter().map(|r| r.defense_allowed.points_per_drive)),
        };
        let implied_total = mean_of(rows.iter().map(|r| r.implied_total)).unwrap_or(default_implied_total);

        Self { offense, defense_allowed, implied_total }
    }
}

/// `1 + (value - avg) * scale`, neutral when either side is missing
pub fn additive_factor(value: Option<f64>, average: Option<f64>, scale: f64) -> f64 {
    match (value, average) {
        (Some(v), Some(avg)) => 1.0 + (v - avg) * scale,
        _ => 1.0,
    }
}

/// `value / avg`, neutral when either side is missing or the average is zero
pub fn ratio_factor(value: Option<f64>, average: Option<f64>) -> f64 {
    match (value, average) {
        (Some(v), Some(avg)) if avg.abs() > f64::EPSILON => v / avg,
        _ => 1.0,
    }
}

/// Mean of the EPA, explosive-rate and points-per-drive factors
pub fn efficiency_factor(metrics: &EfficiencyMetrics, league: &EfficiencyMetrics, epa_scale: f64) -> f64 {
    let epa = additive_factor(metrics.epa_play, league.epa_play, epa_scale);
    let explosive = ratio_factor(metrics.explosive_play_rate, league.explosive_play_rate);
    let ppd = ratio_factor(metrics.points_per_drive, league.points_per_drive);
    (epa + explosive + ppd) / 3.0
}

/// Bounded volatility multiplier for one team's matchup
pub fn matchup_multiplier(ctx: &MatchupContext, league: &LeagueAverages, params: &MatchupParams) -> f64 {
    let offense = efficiency_factor(&ctx.offense, &league.offense, params.epa_scale);
    let defense = efficiency_factor(&ctx.opponent_defense, &league.defense_allowed, params.epa_scale);
    let implied = match ctx.implied_total {
        Some(itt) if league.implied_total > 0.0 => itt / league.implied_total,
        _ => 1.0,
    };
    let proe = ctx.proe.map_or(0.0, |p| p * params.proe_scale);

    let score = 1.0
        + (offense - 1.0) * params.offense_weight
        + (defense - 1.0) * params.defense_weight
        + (implied - 1.0) * params.implied_total_weight
        + proe;

    if !score.is_finite() {
        return 1.0_f64.clamp(params.min_multiplier, params.max_multiplier);
    }
    score.clamp(params.min_multiplier, params.max_multiplier)
}

/// Decay-weighted PROE over a team's most recent weeks (latest week weighs 1.0)
pub fn weighted_proe(team: &str, weekly: &[WeeklyProe], lookback_weeks: usize, decay: f64) -> Option<f64> {
    let team = canonical_team(team);
    let mut rows: Vec<&WeeklyProe> = weekly.iter().filter(|r| canonical_team(&r.team) == team).collect();
    if rows.is_empty() {
        return None;
    }
    rows.sort_by(|a, b| (b.season, b.week).cmp(&(a.season, a.week)));

    let (weighted, total_weight) = rows
        .iter()
        .take(lookback_weeks)
        .enumerate()
        .fold((0.0, 0.0), |(weighted, total), (i, row)| {
            let weight = decay.powi(i as i32);
            (weighted + row.proe * weight, total + weight)
        });

    (total_weight > 0.0).then(|| weighted / total_weight)
}

/// Per-team matchup rows, league averages and weighted PROE for one slate
#[derive(Debug, Clone)]
pub struct MatchupBook {
    params: MatchupParams,
    league: LeagueAverages,
    teams: HashMap<String, TeamMatchup>,
    proe: HashMap<String, f64>,
}

impl MatchupBook {
    pub fn new(rows: Vec<TeamMatchup>, weekly_proe: &[WeeklyProe], params: &MatchupParams) -> Self {
        let league = LeagueAverages::compute(&rows, params.default_implied_total);
        info!(
            "League averages: ITT {:.1}, EPA/play {}",
            league.implied_total,
            league.offense.epa_play.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
        );

        let teams: HashMap<String, TeamMatchup> =
            rows.into_iter().map(|row| (canonical_team(&row.team), row)).collect();

        let mut proe = HashMap::new();
        for row in weekly_proe {
            let team = canonical_team(&row.team);
            if proe.contains_key(&team) {
                continue;
            }
            if let Some(value) = weighted_proe(&team, weekly_proe, params.proe_lookback_weeks, params.proe_decay) {
                debug!("Weighted PROE for {}: {:.3}", team, value);
                proe.insert(team, value);
            }
        }

        Self { params: params.clone(), league, teams, proe }
    }

    pub fn league(&self) -> &LeagueAverages {
        &self.league
    }

    pub fn team(&self, team: &str) -> Option<&TeamMatchup> {
        self.teams.get(&canonical_team(team))
    }

    /// Resolve a team's matchup context
    ///
    /// An explicit opponent or implied total (from the slate) wins over the
    /// matchup row's values.
    pub fn context(&self, team: &str, opponent: Option<&str>, implied_total: Option<f64>) -> MatchupContext {
        let team = canonical_team(team);
        let row = self.teams.get(&team);

        let opponent = opponent
            .filter(|o| !o.trim().is_empty())
            .map(canonical_team)
            .or_else(|| row.and_then(|r| r.opponent.as_deref()).map(canonical_team));
        let opponent_defense = opponent
            .as_ref()
            .and_then(|opp| self.teams.get(opp))
            .map(|r| r.defense_allowed)
            .unwrap_or_default();

        MatchupContext {
            offense: row.map(|r| r.offense).unwrap_or_default(),
            opponent_defense,
            implied_total: implied_total.or_else(|| row.and_then(|r| r.implied_total)),
            proe: self.proe.get(&team).copied(),
            opponent,
            team,
        }
    }

    /// Bounded volatility multiplier for a resolved context
    pub fn multiplier(&self, ctx: &MatchupContext) -> f64 {
        matchup_multiplier(ctx, &self.league, &self.params)
    }
}
