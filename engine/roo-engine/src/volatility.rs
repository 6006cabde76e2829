//! Historical volatility builder
//!
//! Reduces recent weekly fantasy scores to one [`VolatilityProfile`] per player,
//! blending thin samples toward the position-level std, and resolves slate
//! players against the result.

use crate::config::VolatilityParams;
use crate::error::{Result, RooError};
use crate::models::{PlayerHistoryRecord, PlayerKey, Position, PositionBaseline, VolatilityProfile};
use std::collections::HashMap;
use tracing::{debug, info};

/// Outcome of resolving a slate player against the volatility table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyMatch<'a> {
    /// Name, team and position all matched
    Exact(&'a VolatilityProfile),
    /// Matched through team and position (single candidate or normalized name)
    TeamPosition(&'a VolatilityProfile),
    /// No usable history
    Unmatched,
}

/// Volatility profiles for every player seen in the lookback window
#[derive(Debug, Clone)]
pub struct VolatilityTable {
    params: VolatilityParams,
    profiles: Vec<VolatilityProfile>,
    by_key: HashMap<PlayerKey, usize>,
    by_team_position: HashMap<(String, Position), Vec<usize>>,
    baselines: HashMap<Position, PositionBaseline>,
}

impl VolatilityTable {
    pub fn profiles(&self) -> &[VolatilityProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn baseline(&self, position: Position) -> Option<&PositionBaseline> {
        self.baselines.get(&position)
    }

    /// Resolve a key: exact match, then team+position candidates
    pub fn resolve(&self, key: &PlayerKey) -> KeyMatch<'_> {
        if let Some(&idx) = self.by_key.get(key) {
            return KeyMatch::Exact(&self.profiles[idx]);
        }

        let Some(candidates) = self.by_team_position.get(&(key.team.clone(), key.position)) else {
            return KeyMatch::Unmatched;
        };

        if let [only] = candidates.as_slice() {
            return KeyMatch::TeamPosition(&self.profiles[*only]);
        }

        let wanted = key.normalized_name();
        candidates
            .iter()
            .map(|&idx| &self.profiles[idx])
            .find(|profile| profile.key.normalized_name() == wanted)
            .map_or(KeyMatch::Unmatched, KeyMatch::TeamPosition)
    }

    /// Effective std for a player with no usable history
    ///
    /// Position std with the uncertainty premium, clamped to the std bounds.
    pub fn fallback_std(&self, position: Position) -> Result<f64> {
        let baseline = self.baseline(position).ok_or_else(|| {
            RooError::data_validation(format!("no historical baseline for position {position}"))
        })?;
        Ok((baseline.std_fpts * self.params.uncertainty_premium).clamp(self.params.min_std, self.params.max_std))
    }
}

/// Weight given to a player's own std, ramping linearly up to `min_games_for_player`
///
/// Below two games the player's own std is ignored entirely.
pub fn blend_weight(games: usize, params: &VolatilityParams) -> f64 {
    if games >= params.min_games_for_player {
        1.0
    } else if games >= 2 {
        games as f64 / params.min_games_for_player as f64
    } else {
        0.0
    }
}

/// Effective std after position blending, clamped to the std bounds
pub fn effective_std(games: usize, player_std: f64, position_std: f64, params: &VolatilityParams) -> f64 {
    let raw = if games >= 2 {
        let weight = blend_weight(games, params);
        weight * player_std + (1.0 - weight) * position_std
    } else {
        position_std * params.uncertainty_premium
    };
    raw.clamp(params.min_std, params.max_std)
}

/// Sample (n-1) standard deviation; `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Keep only rows within `lookback_weeks` of the latest week present
fn recent_window(records: &[PlayerHistoryRecord], lookback_weeks: u32) -> Vec<&PlayerHistoryRecord> {
    let Some(max_week) = records.iter().map(|r| r.week).max() else {
        return Vec::new();
    };
    let cutoff = max_week.saturating_sub(lookback_weeks);
    debug!("History window: weeks {}..={}", cutoff + 1, max_week);
    records.iter().filter(|r| r.week > cutoff).collect()
}

/// Build the volatility table from player history and optional DST history
///
/// The DST feed gets its own lookback window based on its own latest week.
pub fn build_volatility_table(
    history: &[PlayerHistoryRecord],
    dst_history: &[PlayerHistoryRecord],
    params: &VolatilityParams,
) -> Result<VolatilityTable> {
    let mut recent = recent_window(history, params.lookback_weeks);
    recent.extend(recent_window(dst_history, params.lookback_weeks));

    if recent.is_empty() {
        return Err(RooError::data_validation("historical stats contain no rows in the lookback window"));
    }

    // Group scores by player, keeping first-seen order
    let mut order: Vec<PlayerKey> = Vec::new();
    let mut scores: HashMap<PlayerKey, Vec<f64>> = HashMap::new();
    let mut by_position: HashMap<Position, Vec<f64>> = HashMap::new();

    for record in &recent {
        by_position.entry(record.key.position).or_default().push(record.fantasy_points);
        scores
            .entry(record.key.clone())
            .or_insert_with(|| {
                order.push(record.key.clone());
                Vec::new()
            })
            .push(record.fantasy_points);
    }

    let baselines: HashMap<Position, PositionBaseline> = by_position
        .iter()
        .map(|(&position, values)| {
            let mean_fpts = mean(values);
            let std_fpts = sample_std(values).unwrap_or(mean_fpts * params.single_game_std_ratio);
            (position, PositionBaseline { position, rows: values.len(), mean_fpts, std_fpts })
        })
        .collect();

    let mut profiles = Vec::with_capacity(order.len());
    let mut by_key = HashMap::with_capacity(order.len());
    let mut by_team_position: HashMap<(String, Position), Vec<usize>> = HashMap::new();

    for key in order {
        let values = &scores[&key];
        let games = values.len();
        let mean_fpts = mean(values);
        let std_fpts = sample_std(values).unwrap_or(mean_fpts * params.single_game_std_ratio);
        let min_fpts = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_fpts = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // The player's own rows always produce a baseline for their position
        let position_std = baselines.get(&key.position).map_or(std_fpts, |b| b.std_fpts);

        let idx = profiles.len();
        by_key.insert(key.clone(), idx);
        by_team_position.entry((key.team.clone(), key.position)).or_default().push(idx);

        profiles.push(VolatilityProfile {
            effective_std: effective_std(games, std_fpts, position_std, params),
            cv: std_fpts / (mean_fpts + 0.01),
            key,
            games,
            mean_fpts,
            std_fpts,
            min_fpts,
            max_fpts,
        });
    }

    let established = profiles.iter().filter(|p| p.games >= params.min_games_for_player).count();
    info!(
        "Built volatility profiles for {} players from {} rows ({} with {}+ games)",
        profiles.len(),
        recent.len(),
        established,
        params.min_games_for_player
    );

    Ok(VolatilityTable { params: params.clone(), profiles, by_key, by_team_position, baselines })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, team: &str, position: Position, week: u32, points: f64) -> PlayerHistoryRecord {
        PlayerHistoryRecord { key: PlayerKey::new(name, team, position), week, fantasy_points: points }
    }

    #[test]
    fn test_sample_std() {
        let std = sample_std(&[10.0, 20.0, 30.0]).unwrap();
        assert!((std - 10.0).abs() < 1e-12);
        assert_eq!(sample_std(&[5.0]), None);
    }

    #[test]
    fn test_blend_weight_ramp() {
        let params = VolatilityParams::default();
        assert_eq!(blend_weight(0, &params), 0.0);
        assert_eq!(blend_weight(1, &params), 0.0);
        assert_eq!(blend_weight(2, &params), 0.5);
        assert_eq!(blend_weight(3, &params), 0.75);
        assert_eq!(blend_weight(4, &params), 1.0);
        assert_eq!(blend_weight(9, &params), 1.0);
    }

    #[test]
    fn test_effective_std_rules() {
        let params = VolatilityParams::default();
        // Enough games: own std
        assert_eq!(effective_std(4, 7.0, 5.0, &params), 7.0);
        // Two games: half and half
        assert_eq!(effective_std(2, 9.0, 5.0, &params), 7.0);
        // Under two games: premium on position std
        assert!((effective_std(1, 15.0, 5.0, &params) - 6.0).abs() < 1e-12);
        // Clamped both ways
        assert_eq!(effective_std(6, 1.0, 5.0, &params), 3.0);
        assert_eq!(effective_std(6, 40.0, 5.0, &params), 20.0);
    }

    #[test]
    fn test_lookback_window_uses_latest_week() {
        let history: Vec<_> = (1..=10).map(|w| record("A", "BUF", Position::WR, w, w as f64)).collect();
        let table = build_volatility_table(&history, &[], &VolatilityParams::default()).unwrap();
        let profile = &table.profiles()[0];
        // Weeks 3..=10 survive
        assert_eq!(profile.games, 8);
        assert_eq!(profile.min_fpts, 3.0);
        assert_eq!(profile.max_fpts, 10.0);
        assert!((profile.mean_fpts - 6.5).abs() < 1e-12);
    }

    #[test]
    fn test_dst_history_has_independent_window() {
        let history = vec![record("A", "BUF", Position::QB, 12, 20.0), record("A", "BUF", Position::QB, 11, 22.0)];
        let dst = vec![record("Bills", "BUF", Position::DST, 2, 8.0), record("Bills", "BUF", Position::DST, 1, 4.0)];
        let table = build_volatility_table(&history, &dst, &VolatilityParams::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(matches!(table.resolve(&PlayerKey::new("Bills", "BUF", Position::DST)), KeyMatch::Exact(p) if p.games == 2));
    }

    #[test]
    fn test_single_game_std_heuristic() {
        let history = vec![record("Solo", "KC", Position::TE, 5, 12.0), record("Other", "KC", Position::TE, 5, 4.0)];
        let table = build_volatility_table(&history, &[], &VolatilityParams::default()).unwrap();
        let solo = &table.profiles()[0];
        assert_eq!(solo.std_fpts, 6.0);
        assert!((solo.cv - 6.0 / 12.01).abs() < 1e-12);
    }

    #[test]
    fn test_resolution_policy() {
        let history = vec![
            record("Josh Allen", "BUF", Position::QB, 1, 25.0),
            record("Amon-Ra St. Brown", "DET", Position::WR, 1, 20.0),
            record("Jameson Williams", "DET", Position::WR, 1, 10.0),
        ];
        let table = build_volatility_table(&history, &[], &VolatilityParams::default()).unwrap();

        assert!(matches!(table.resolve(&PlayerKey::new("Josh Allen", "BUF", Position::QB)), KeyMatch::Exact(_)));
        // Single team+position candidate
        assert!(matches!(
            table.resolve(&PlayerKey::new("Joshua Allen", "BUF", Position::QB)),
            KeyMatch::TeamPosition(p) if p.key.name == "Josh Allen"
        ));
        // Several candidates, normalized name breaks the tie
        assert!(matches!(
            table.resolve(&PlayerKey::new("Amon-Ra St Brown", "DET", Position::WR)),
            KeyMatch::TeamPosition(p) if p.key.name == "Amon-Ra St. Brown"
        ));
        assert_eq!(table.resolve(&PlayerKey::new("Someone Else", "DET", Position::WR)), KeyMatch::Unmatched);
        assert_eq!(table.resolve(&PlayerKey::new("Nobody", "MIA", Position::RB)), KeyMatch::Unmatched);
    }

    #[test]
    fn test_fallback_requires_position_baseline() {
        let history = vec![record("A", "BUF", Position::WR, 1, 10.0), record("B", "BUF", Position::WR, 1, 14.0)];
        let table = build_volatility_table(&history, &[], &VolatilityParams::default()).unwrap();

        let std = sample_std(&[10.0, 14.0]).unwrap();
        assert!((table.fallback_std(Position::WR).unwrap() - std * 1.2).abs() < 1e-12);
        assert!(matches!(table.fallback_std(Position::TE), Err(RooError::DataValidation(_))));
    }

    #[test]
    fn test_empty_history_is_rejected() {
        assert!(build_volatility_table(&[], &[], &VolatilityParams::default()).is_err());
    }
}
