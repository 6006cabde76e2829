//! Ownership-weighted opponent field
//!
//! Opponent lineups are drawn slot by slot with probability proportional to
//! projected ownership: QB, two RBs and three WRs without replacement, TE,
//! DST, then FLEX from the RBs, WRs and TEs not already taken. Lineups over
//! the salary cap are discarded.

use crate::config::LineupSimConfig;
use crate::error::{LineupSimError, Result};
use crate::lineups::Lineup;
use crate::players::PlayerPool;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use roo_engine::Position;
use tracing::{debug, info, warn};

/// Players of one position with positive ownership
#[derive(Debug, Clone)]
struct Candidates {
    ids: Vec<usize>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl Candidates {
    fn new(pool: &PlayerPool, position: Position, needed: usize) -> Result<Self> {
        let (ids, weights): (Vec<usize>, Vec<f64>) =
            pool.by_position(position).filter(|p| p.ownership > 0.0).map(|p| (p.id, p.ownership)).unzip();
        if ids.len() < needed {
            return Err(LineupSimError::data_validation(format!(
                "field needs {needed} {position} with projected ownership, found {}",
                ids.len()
            )));
        }
        let index = WeightedIndex::new(&weights)
            .map_err(|e| LineupSimError::data_validation(format!("{position} ownership weights: {e}")))?;
        Ok(Self { ids, weights, index })
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.ids[self.index.sample(rng)]
    }

    /// `k` distinct players, drawing sequentially and removing each pick
    fn pick_distinct<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Option<Vec<usize>> {
        draw_distinct(&self.ids, &self.weights, k, rng)
    }
}

/// Weighted sampling without replacement; `None` when the weights run out
pub fn draw_distinct<R: Rng + ?Sized>(ids: &[usize], weights: &[f64], k: usize, rng: &mut R) -> Option<Vec<usize>> {
    let mut weights = weights.to_vec();
    let mut picked = Vec::with_capacity(k);
    for _ in 0..k {
        let index = WeightedIndex::new(&weights).ok()?;
        let choice = index.sample(rng);
        picked.push(ids[choice]);
        weights[choice] = 0.0;
    }
    Some(picked)
}

/// Generate up to `target` valid opponent lineups
///
/// At most `target * max_attempt_factor` candidates are drawn, so the result
/// may hold fewer lineups when the cap rejects many of them.
pub fn generate_field<R: Rng + ?Sized>(
    pool: &PlayerPool,
    target: usize,
    config: &LineupSimConfig,
    rng: &mut R,
) -> Result<Vec<Lineup>> {
    let qbs = Candidates::new(pool, Position::QB, 1)?;
    let rbs = Candidates::new(pool, Position::RB, 2)?;
    let wrs = Candidates::new(pool, Position::WR, 3)?;
    let tes = Candidates::new(pool, Position::TE, 1)?;
    let dsts = Candidates::new(pool, Position::DST, 1)?;

    let flex_ids: Vec<usize> = rbs.ids.iter().chain(&wrs.ids).chain(&tes.ids).copied().collect();
    let flex_weights: Vec<f64> = rbs.weights.iter().chain(&wrs.weights).chain(&tes.weights).copied().collect();

    let max_attempts = target.saturating_mul(config.max_attempt_factor);
    let mut lineups = Vec::with_capacity(target);
    let mut attempts = 0;
    let mut over_cap = 0;

    while lineups.len() < target && attempts < max_attempts {
        attempts += 1;

        let qb = qbs.pick(rng);
        let (Some(rb), Some(wr)) = (rbs.pick_distinct(2, rng), wrs.pick_distinct(3, rng)) else { continue };
        let te = tes.pick(rng);
        let dst = dsts.pick(rng);

        let taken = [rb[0], rb[1], wr[0], wr[1], wr[2], te];
        let weights: Vec<f64> = flex_ids
            .iter()
            .zip(&flex_weights)
            .map(|(id, w)| if taken.contains(id) { 0.0 } else { *w })
            .collect();
        let Some(flex) = draw_distinct(&flex_ids, &weights, 1, rng) else { continue };

        let lineup: Lineup = [qb, rb[0], rb[1], wr[0], wr[1], wr[2], te, flex[0], dst];
        let salary: u32 = lineup.iter().filter_map(|&id| pool.get(id)).map(|p| p.salary).sum();
        if salary <= config.salary_cap {
            lineups.push(lineup);
        } else {
            over_cap += 1;
        }
    }

    debug!("Field generation: {} attempts, {} over the salary cap", attempts, over_cap);
    if lineups.len() < target {
        warn!("⚠️ Generated only {} of {} field lineups in {} attempts", lineups.len(), target, attempts);
    }
    info!("✅ Generated {} valid field lineups", lineups.len());
    Ok(lineups)
}
