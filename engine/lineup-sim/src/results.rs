//! Per-lineup contest statistics

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Finish thresholds as shares of the real field: top 10%, 1% and 0.1%
pub const TOP_FINISH_SHARES: [f64; 3] = [0.10, 0.01, 0.001];

/// Running totals for one user lineup across simulations
#[derive(Debug, Clone, PartialEq)]
pub struct LineupTally {
    simulations: usize,
    score_sum: f64,
    profit_sum: f64,
    cashes: usize,
    top_finishes: [usize; 3],
    min_profit: f64,
    max_profit: f64,
    top_thresholds: [usize; 3],
}

impl LineupTally {
    pub fn new(field_size: usize) -> Self {
        Self {
            simulations: 0,
            score_sum: 0.0,
            profit_sum: 0.0,
            cashes: 0,
            top_finishes: [0; 3],
            min_profit: f64::INFINITY,
            max_profit: f64::NEG_INFINITY,
            top_thresholds: TOP_FINISH_SHARES.map(|share| (field_size as f64 * share) as usize),
        }
    }

    /// Record one simulated finish at `rank` (already scaled to the real field)
    pub fn record(&mut self, score: f64, rank: usize, profit: f64) {
        self.simulations += 1;
        self.score_sum += score;
        self.profit_sum += profit;
        if profit > 0.0 {
            self.cashes += 1;
        }
        for (count, threshold) in self.top_finishes.iter_mut().zip(self.top_thresholds) {
            if rank <= threshold {
                *count += 1;
            }
        }
        self.min_profit = self.min_profit.min(profit);
        self.max_profit = self.max_profit.max(profit);
    }

    pub fn summarize(&self, label: &str, players: &[String], entry_fee: f64) -> LineupSummary {
        let n = self.simulations.max(1) as f64;
        let pct = |count: usize| count as f64 / n * 100.0;
        let mean_profit = self.profit_sum / n;
        let profit_bound = |v: f64| if self.simulations == 0 { 0.0 } else { v };

        LineupSummary {
            lineup: label.to_string(),
            players: players.join(" | "),
            mean_score: self.score_sum / n,
            mean_profit,
            roi: mean_profit / entry_fee * 100.0,
            cash_pct: pct(self.cashes),
            top10_pct: pct(self.top_finishes[0]),
            top1_pct: pct(self.top_finishes[1]),
            top01_pct: pct(self.top_finishes[2]),
            min_profit: profit_bound(self.min_profit),
            max_profit: profit_bound(self.max_profit),
        }
    }
}

/// One row of the results table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupSummary {
    #[serde(rename = "Lineup")]
    pub lineup: String,
    #[serde(rename = "Players")]
    pub players: String,
    #[serde(rename = "Mean Score")]
    pub mean_score: f64,
    #[serde(rename = "Mean Profit")]
    pub mean_profit: f64,
    /// Mean profit over entry fee, in percent
    #[serde(rename = "ROI")]
    pub roi: f64,
    #[serde(rename = "Cash%")]
    pub cash_pct: f64,
    #[serde(rename = "Top 10%")]
    pub top10_pct: f64,
    #[serde(rename = "Top 1%")]
    pub top1_pct: f64,
    #[serde(rename = "Top 0.1%")]
    pub top01_pct: f64,
    #[serde(rename = "Min Profit")]
    pub min_profit: f64,
    #[serde(rename = "Max Profit")]
    pub max_profit: f64,
}

/// Outcome of a contest simulation
#[derive(Debug, Clone, Serialize)]
pub struct ContestResults {
    pub generated_at: DateTime<Utc>,
    pub n_simulations: usize,
    pub seed: u64,
    pub field_size: usize,
    pub field_lineups: usize,
    pub simulated_players: usize,
    pub entry_fee: f64,
    pub lineups: Vec<LineupSummary>,
}

impl ContestResults {
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in &self.lineups {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the per-lineup table as CSV
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_csv_to(std::fs::File::create(path)?)?;
        info!("Saved results for {} lineups to {}", self.lineups.len(), path.display());
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
