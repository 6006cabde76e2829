//! Player pool built from the ROO projection artifact
//!
//! Every player gets a dense integer id so that per-simulation scores live in a
//! flat array and lineups are arrays of ids.

use crate::config::LineupSimConfig;
use crate::error::{LineupSimError, Result};
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use roo_engine::teams::canonical_team;
use roo_engine::{lognormal_params, LogNormalParams, Position, ProjectionRow};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Z-score of the 95th percentile, used to read a std off the ceiling
const CEILING_Z: f64 = 1.65;

/// Std as a share of the median when nothing better is known
pub fn position_std_share(position: Position) -> f64 {
    match position {
        Position::QB => 0.45,
        Position::RB => 0.60,
        Position::WR => 0.65,
        Position::TE => 0.55,
        Position::DST => 0.70,
    }
}

/// Std for a row without `adj_std`
///
/// A ceiling strictly between the median and three times the median is read
/// as a 1.65-sigma upside; otherwise a position share of the median is used.
pub fn fallback_std(position: Position, median: f64, ceiling: Option<f64>) -> f64 {
    match ceiling {
        Some(c) if c > median && c < 3.0 * median => (c - median) / CEILING_Z,
        _ => median * position_std_share(position),
    }
}

/// Ownership in percent for every row
///
/// Missing values take `default`; when every present value is at most 1 the
/// column is read as fractions and scaled to percent.
pub fn normalize_ownership(values: &[Option<f64>], default: f64) -> Vec<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let scale = if !present.is_empty() && present.iter().all(|v| *v <= 1.0) { 100.0 } else { 1.0 };

    values
        .iter()
        .map(|v| match v.filter(|v| v.is_finite()) {
            Some(own) => (own * scale).max(0.0),
            None => default,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub id: usize,
    pub name: String,
    pub team: String,
    pub opponent: Option<String>,
    pub position: Position,
    pub salary: u32,
    pub median: f64,
    pub std: f64,
    /// Projected ownership in percent
    pub ownership: f64,
    pub params: LogNormalParams,
    distribution: Option<LogNormal<f64>>,
}

impl SimPlayer {
    /// One independent draw; players without a positive median always score zero
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.distribution.as_ref().map_or(0.0, |d| d.sample(rng))
    }
}

/// Id-indexed registry of every player in the projections
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: Vec<SimPlayer>,
    by_name: HashMap<String, usize>,
}

impl PlayerPool {
    pub fn from_rows(rows: &[ProjectionRow], config: &LineupSimConfig) -> Result<Self> {
        let ownership = normalize_ownership(
            &rows.iter().map(|r| r.proj_own).collect::<Vec<_>>(),
            config.default_ownership,
        );
        if rows.iter().all(|r| r.proj_own.is_none()) {
            warn!("⚠️ No ownership projections found, using {}% for every player", config.default_ownership);
        }

        let mut pool = PlayerPool::default();
        let mut fallback = 0;
        for (row, own) in rows.iter().zip(ownership) {
            let name = row.player.trim().to_string();
            if pool.by_name.contains_key(&name) {
                warn!("Duplicate projection for {}, keeping the first row", name);
                continue;
            }

            let position = row.position()?;
            let median = row.median_proj;
            let std = match row.adj_std.filter(|s| s.is_finite() && *s > 0.0) {
                Some(std) => std,
                None => {
                    fallback += 1;
                    fallback_std(position, median, row.ceiling_proj)
                }
            };
            let params = lognormal_params(median, std, &config.distribution);
            let distribution = if median > 0.0 {
                Some(LogNormal::new(params.mu_log, params.sigma_log).map_err(|e| {
                    LineupSimError::data_validation(format!("invalid distribution for {name}: {e}"))
                })?)
            } else {
                debug!("{} has no positive projection and will score zero", name);
                None
            };

            let id = pool.players.len();
            pool.by_name.insert(name.clone(), id);
            pool.players.push(SimPlayer {
                id,
                name,
                team: canonical_team(&row.team),
                opponent: Some(row.opp.trim()).filter(|o| !o.is_empty()).map(canonical_team),
                position,
                salary: row.salary,
                median,
                std,
                ownership: own,
                params,
                distribution,
            });
        }

        if pool.is_empty() {
            return Err(LineupSimError::data_validation("projections contain no players"));
        }
        if fallback > 0 {
            info!("{} players without adj_std use a ceiling or position based std", fallback);
        }
        info!("✅ Created player ID mapping for {} players", pool.len());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&SimPlayer> {
        self.players.get(id)
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.by_name.get(name.trim()).copied()
    }

    pub fn by_position(&self, position: Position) -> impl Iterator<Item = &SimPlayer> {
        self.players.iter().filter(move |p| p.position == position)
    }
}
