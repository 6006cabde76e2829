//! Projection artifact and run summary
//!
//! The projection CSV is the contract with every downstream tool; column names
//! and order are fixed by [`ProjectionRow`].

use crate::error::{Result, RooError};
use crate::feeds::{csv_reader, read_rows, require_columns};
use crate::models::{PlayerProjection, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub const PROJECTION_TABLE: &str = "ROO projections";

/// One row of the projection artifact
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionRow {
    #[serde(rename = "Player")]
    pub player: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Salary")]
    pub salary: u32,
    #[serde(rename = "Opp", default)]
    pub opp: String,
    #[serde(rename = "ITT", default, deserialize_with = "csv::invalid_option")]
    pub itt: Option<f64>,
    #[serde(rename = "Spread", default, deserialize_with = "csv::invalid_option")]
    pub spread: Option<f64>,
    #[serde(rename = "Loc", default)]
    pub loc: String,
    #[serde(rename = "OWS_Median_Proj")]
    pub median_proj: f64,
    #[serde(rename = "OWS_Proj_Own", default, deserialize_with = "csv::invalid_option")]
    pub proj_own: Option<f64>,
    #[serde(rename = "Floor_Proj", default, deserialize_with = "csv::invalid_option")]
    pub floor_proj: Option<f64>,
    #[serde(rename = "Ceiling_Proj", default, deserialize_with = "csv::invalid_option")]
    pub ceiling_proj: Option<f64>,
    #[serde(rename = "Sim_P10", default, deserialize_with = "csv::invalid_option")]
    pub sim_p10: Option<f64>,
    #[serde(rename = "Sim_P15", default, deserialize_with = "csv::invalid_option")]
    pub sim_p15: Option<f64>,
    #[serde(rename = "Sim_P25", default, deserialize_with = "csv::invalid_option")]
    pub sim_p25: Option<f64>,
    #[serde(rename = "Sim_P50", default, deserialize_with = "csv::invalid_option")]
    pub sim_p50: Option<f64>,
    #[serde(rename = "Sim_P75", default, deserialize_with = "csv::invalid_option")]
    pub sim_p75: Option<f64>,
    #[serde(rename = "Sim_P85", default, deserialize_with = "csv::invalid_option")]
    pub sim_p85: Option<f64>,
    #[serde(rename = "Sim_P90", default, deserialize_with = "csv::invalid_option")]
    pub sim_p90: Option<f64>,
    #[serde(rename = "Sim_P95", default, deserialize_with = "csv::invalid_option")]
    pub sim_p95: Option<f64>,
    #[serde(rename = "Volatility_Index", default, deserialize_with = "csv::invalid_option")]
    pub volatility_index: Option<f64>,
    #[serde(rename = "hist_games", default, deserialize_with = "csv::invalid_option")]
    pub hist_games: Option<u32>,
    #[serde(rename = "hist_mean_fpts", default, deserialize_with = "csv::invalid_option")]
    pub hist_mean_fpts: Option<f64>,
    #[serde(rename = "hist_std_fpts", default, deserialize_with = "csv::invalid_option")]
    pub hist_std_fpts: Option<f64>,
    #[serde(rename = "hist_max_fpts", default, deserialize_with = "csv::invalid_option")]
    pub hist_max_fpts: Option<f64>,
    #[serde(rename = "effective_std_fpts", default, deserialize_with = "csv::invalid_option")]
    pub effective_std_fpts: Option<f64>,
    #[serde(rename = "matchup_vol_multiplier", default, deserialize_with = "csv::invalid_option")]
    pub matchup_vol_multiplier: Option<f64>,
    #[serde(rename = "adj_std", default, deserialize_with = "csv::invalid_option")]
    pub adj_std: Option<f64>,
}

impl ProjectionRow {
    pub fn from_projection(projection: &PlayerProjection) -> Self {
        let player = &projection.player;
        let entry = &player.entry;
        let profile = player.profile.as_ref();
        let pct = |p: u8| projection.percentiles.get(p);

        Self {
            player: entry.key.name.clone(),
            team: entry.key.team.clone(),
            position: entry.key.position.to_string(),
            salary: entry.salary,
            opp: player.opponent.clone(),
            itt: Some(player.implied_total),
            spread: Some(player.spread),
            loc: player.location.clone(),
            median_proj: entry.median_proj,
            proj_own: entry.proj_own,
            floor_proj: Some(projection.floor),
            ceiling_proj: Some(projection.ceiling),
            sim_p10: pct(10),
            sim_p15: pct(15),
            sim_p25: pct(25),
            sim_p50: pct(50),
            sim_p75: pct(75),
            sim_p85: pct(85),
            sim_p90: pct(90),
            sim_p95: pct(95),
            volatility_index: Some(projection.volatility_index),
            hist_games: profile.map(|p| p.games as u32),
            hist_mean_fpts: profile.map(|p| p.mean_fpts),
            hist_std_fpts: profile.map(|p| p.std_fpts),
            hist_max_fpts: profile.map(|p| p.max_fpts),
            effective_std_fpts: Some(player.effective_std),
            matchup_vol_multiplier: Some(player.matchup_vol_multiplier),
            adj_std: Some(player.adj_std),
        }
    }

    pub fn position(&self) -> Result<Position> {
        self.position.parse()
    }
}

/// Sort rows by position order, then salary descending
pub fn sort_rows(rows: &mut [ProjectionRow]) {
    rows.sort_by_key(|row| {
        let order = row.position().map_or(u8::MAX, Position::sort_order);
        (order, std::cmp::Reverse(row.salary))
    });
}

pub fn write_projections_to<W: Write>(writer: W, rows: &[ProjectionRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the projection artifact
pub fn write_projections(path: &Path, rows: &[ProjectionRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_projections_to(std::fs::File::create(path)?, rows)?;
    info!("Saved {} ROO projections to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_projections_from<R: Read>(rdr: R) -> Result<Vec<ProjectionRow>> {
    let mut reader = csv_reader(rdr);
    require_columns(
        &mut reader,
        PROJECTION_TABLE,
        &[&["Player"], &["Team"], &["Position"], &["Salary"], &["OWS_Median_Proj"]],
    )?;
    let rows: Vec<ProjectionRow> = read_rows(reader, PROJECTION_TABLE, true)?;
    if rows.is_empty() {
        return Err(RooError::data_validation("ROO projections file has no rows"));
    }
    Ok(rows)
}

/// Read a projection artifact back (used by downstream simulators)
pub fn read_projections(path: &Path) -> Result<Vec<ProjectionRow>> {
    read_projections_from(std::fs::File::open(path)?)
}

/// Per-position digest of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    pub position: Position,
    pub count: usize,
    pub avg_ceiling: f64,
    pub max_ceiling: f64,
    pub max_ceiling_player: String,
    pub avg_floor: f64,
    pub avg_volatility_index: f64,
}

/// Run-level digest, optionally persisted as JSON next to the artifact
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub n_simulations: usize,
    pub seed: u64,
    pub players: usize,
    pub fallback_players: usize,
    pub dropped_players: usize,
    pub positions: Vec<PositionSummary>,
}

impl RunSummary {
    pub fn new(
        projections: &[PlayerProjection],
        n_simulations: usize,
        seed: u64,
        fallback_players: usize,
        dropped_players: usize,
    ) -> Self {
        let positions = Position::ALL
            .iter()
            .filter_map(|&position| {
                let group: Vec<&PlayerProjection> =
                    projections.iter().filter(|p| p.player.entry.key.position == position).collect();
                let best = group.iter().max_by(|a, b| a.ceiling.total_cmp(&b.ceiling))?;
                let n = group.len() as f64;
                Some(PositionSummary {
                    position,
                    count: group.len(),
                    avg_ceiling: group.iter().map(|p| p.ceiling).sum::<f64>() / n,
                    max_ceiling: best.ceiling,
                    max_ceiling_player: best.player.entry.key.name.clone(),
                    avg_floor: group.iter().map(|p| p.floor).sum::<f64>() / n,
                    avg_volatility_index: group.iter().map(|p| p.volatility_index).sum::<f64>() / n,
                })
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            n_simulations,
            seed,
            players: projections.len(),
            fallback_players,
            dropped_players,
            positions,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
