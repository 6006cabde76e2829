use crate::config::RooConfig;
use crate::distribution::{adjusted_std, lognormal_params};
use crate::error::{Result, RooError};
use crate::feeds::{self, NameMap};
use crate::matchup::MatchupBook;
use crate::models::{
    PlayerHistoryRecord, PlayerProjection, SlateEntry, SlatePlayer, TeamMatchup, VolatilitySource, WeeklyProe,
};
use crate::output::{ProjectionRow, RunSummary};
use crate::percentiles::{aggregate, volatility_index};
use crate::sampler::MonteCarloSampler;
use crate::volatility::{build_volatility_table, KeyMatch, VolatilityTable};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Location assumed when the matchup feed has none for a team
pub const DEFAULT_LOCATION: &str = "Home";

/// Everything a run reads, fully loaded before any simulation starts
#[derive(Debug, Clone, Default)]
pub struct RooInputs {
    pub history: Vec<PlayerHistoryRecord>,
    pub dst_history: Vec<PlayerHistoryRecord>,
    pub slate: Vec<SlateEntry>,
    pub matchups: Vec<TeamMatchup>,
    pub proe: Vec<WeeklyProe>,
}

/// Input file locations for a run
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub history: PathBuf,
    pub dst_history: Option<PathBuf>,
    pub slate: PathBuf,
    pub matchups: PathBuf,
    pub proe: Option<PathBuf>,
    pub name_map: Option<PathBuf>,
}

impl InputPaths {
    /// Conventional file names inside a data directory
    pub fn in_dir(dir: &Path) -> Self {
        let optional = |name: &str| Some(dir.join(name)).filter(|p| p.exists());
        Self {
            history: dir.join("Weekly_Stats.csv"),
            dst_history: optional("Weekly_DST_Stats.csv"),
            slate: dir.join("Slate.csv"),
            matchups: dir.join("Matchup.csv"),
            proe: optional("weekly_proe.csv"),
            name_map: optional("Player_Mapping.csv"),
        }
    }
}

impl RooInputs {
    /// Load every table; a missing required column stops here
    pub fn load(paths: &InputPaths) -> Result<Self> {
        let names = match &paths.name_map {
            Some(path) => NameMap::load(path)?,
            None => NameMap::default(),
        };

        Ok(Self {
            history: feeds::load_history(&paths.history, &names)?,
            dst_history: match &paths.dst_history {
                Some(path) => feeds::load_dst_history(path, &names)?,
                None => Vec::new(),
            },
            slate: feeds::load_slate(&paths.slate, &names)?,
            matchups: feeds::load_matchups(&paths.matchups)?,
            proe: match &paths.proe {
                Some(path) => feeds::load_proe(path)?,
                None => Vec::new(),
            },
        })
    }
}

/// Completed run: sorted projections plus bookkeeping
#[derive(Debug, Clone)]
pub struct RooRun {
    pub projections: Vec<PlayerProjection>,
    pub fallback_players: usize,
    pub dropped_players: usize,
    pub summary: RunSummary,
}

impl RooRun {
    /// Artifact rows in output order
    pub fn rows(&self) -> Vec<ProjectionRow> {
        self.projections.iter().map(ProjectionRow::from_projection).collect()
    }
}

/// Slate players ready for sampling
#[derive(Debug, Clone)]
pub struct PreparedSlate {
    pub players: Vec<SlatePlayer>,
    pub fallback_players: usize,
    pub dropped_players: usize,
}

/// Range-of-outcomes engine
pub struct RooEngine {
    config: RooConfig,
}

impl RooEngine {
    pub fn new(config: RooConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RooConfig {
        &self.config
    }

    /// Resolve volatility, matchup and distribution parameters for every slate player
    pub fn prepare_slate(&self, inputs: &RooInputs) -> Result<PreparedSlate> {
        let table = build_volatility_table(&inputs.history, &inputs.dst_history, &self.config.volatility)?;
        let book = MatchupBook::new(inputs.matchups.clone(), &inputs.proe, &self.config.matchup);

        let mut players = Vec::with_capacity(inputs.slate.len());
        let mut dropped = 0;
        for entry in &inputs.slate {
            if entry.median_proj <= 0.0 {
                dropped += 1;
                continue;
            }
            players.push(self.slate_player(entry, &table, &book)?);
        }

        let fallback = players.iter().filter(|p| p.volatility_source == VolatilitySource::PositionFallback).count();
        if fallback > 0 {
            warn!("⚠️ {} players missing volatility history, using position averages", fallback);
        }
        if dropped > 0 {
            info!("Dropped {} slate players without a positive projection", dropped);
        }
        info!("✅ Built slate with {} players", players.len());

        Ok(PreparedSlate { players, fallback_players: fallback, dropped_players: dropped })
    }

    fn slate_player(&self, entry: &SlateEntry, table: &VolatilityTable, book: &MatchupBook) -> Result<SlatePlayer> {
        let (profile, volatility_source, effective_std) = match table.resolve(&entry.key) {
            KeyMatch::Exact(profile) => (Some(profile.clone()), VolatilitySource::Exact, profile.effective_std),
            KeyMatch::TeamPosition(profile) => {
                debug!("Matched {} to history of {}", entry.key, profile.key.name);
                (Some(profile.clone()), VolatilitySource::TeamPosition, profile.effective_std)
            }
            KeyMatch::Unmatched => {
                let std = table.fallback_std(entry.key.position).map_err(|_| {
                    RooError::data_validation(format!(
                        "no history or position baseline for {} ({})",
                        entry.key, entry.key.position
                    ))
                })?;
                (None, VolatilitySource::PositionFallback, std)
            }
        };

        let row = book.team(&entry.key.team);
        let matchup = book.context(&entry.key.team, entry.opponent.as_deref(), entry.implied_total);
        let matchup_vol_multiplier = book.multiplier(&matchup);
        let adj_std = adjusted_std(effective_std, matchup_vol_multiplier, &self.config.volatility);
        let params = lognormal_params(entry.median_proj, adj_std, &self.config.distribution);

        Ok(SlatePlayer {
            entry: entry.clone(),
            opponent: matchup.opponent.clone().unwrap_or_default(),
            implied_total: matchup.implied_total.unwrap_or(book.league().implied_total),
            spread: entry.spread.or_else(|| row.and_then(|r| r.spread)).unwrap_or(0.0),
            location: row.and_then(|r| r.location.clone()).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            profile,
            volatility_source,
            effective_std,
            matchup,
            matchup_vol_multiplier,
            adj_std,
            params,
        })
    }

    /// Full pipeline: slate preparation, sampling, percentile aggregation
    pub fn run(&self, inputs: &RooInputs) -> Result<RooRun> {
        info!("🚀 Starting range-of-outcomes run");
        let prepared = self.prepare_slate(inputs)?;
        if prepared.players.is_empty() {
            return Err(RooError::data_validation("slate has no players with a positive projection"));
        }

        let sim = &self.config.simulation;
        let params: Vec<_> = prepared.players.iter().map(|p| p.params).collect();
        let percentiles = {
            let matrix = MonteCarloSampler::new(sim.n_simulations, sim.seed).sample(&params)?;
            aggregate(&matrix, &sim.percentiles)
        };

        let mut projections = prepared
            .players
            .into_iter()
            .zip(percentiles)
            .map(|(player, percentiles)| {
                let floor = percentiles.get(sim.floor_percentile).ok_or_else(|| {
                    RooError::invalid_config(format!("floor percentile P{} was not computed", sim.floor_percentile))
                })?;
                let ceiling = percentiles.get(sim.ceiling_percentile).ok_or_else(|| {
                    RooError::invalid_config(format!("ceiling percentile P{} was not computed", sim.ceiling_percentile))
                })?;
                let volatility_index =
                    volatility_index(floor, ceiling, player.entry.median_proj, sim.volatility_index_eps);
                Ok(PlayerProjection { player, percentiles, floor, ceiling, volatility_index })
            })
            .collect::<Result<Vec<_>>>()?;

        projections.sort_by_key(|p| {
            (p.player.entry.key.position.sort_order(), std::cmp::Reverse(p.player.entry.salary))
        });

        let summary = RunSummary::new(
            &projections,
            sim.n_simulations,
            sim.seed,
            prepared.fallback_players,
            prepared.dropped_players,
        );
        info!("✅ Calculated percentiles for {} players", projections.len());

        Ok(RooRun {
            projections,
            fallback_players: prepared.fallback_players,
            dropped_players: prepared.dropped_players,
            summary,
        })
    }
}
