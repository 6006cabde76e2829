//! Contest simulation loop
//!
//! One seeded generator drives the whole run: field generation first, then
//! every simulation in order. Within a simulation each active player is drawn
//! independently, scaled by team tendencies and the simulated game
//! environment, then nudged by the correlation rules before lineups are
//! summed, ranked against the field and paid out.

use crate::config::LineupSimConfig;
use crate::correlation::CorrelationPlan;
use crate::environment::{GameSimulator, TeamEnvironment, TeamOutcome};
use crate::error::{LineupSimError, Result};
use crate::field::generate_field;
use crate::lineups::{resolve_lineups, Lineup, NamedLineup};
use crate::payouts::PayoutTable;
use crate::players::PlayerPool;
use crate::results::{ContestResults, LineupTally};
use chrono::Utc;
use roo_engine::seeded_rng;
use tracing::{debug, info, warn};

const PROGRESS_INTERVAL: usize = 2_000;

/// Rank with ties sharing the best position: 1 + number of strictly higher scores
///
/// `sorted_desc` holds every entry's score in descending order.
pub fn competition_rank(sorted_desc: &[f64], score: f64) -> usize {
    sorted_desc.partition_point(|&s| s > score) + 1
}

/// Scale a rank among the simulated entries to the real contest size
pub fn scale_rank(rank: usize, field_size: usize, simulated_entries: usize) -> usize {
    let scaled = rank as f64 * field_size as f64 / simulated_entries.max(1) as f64;
    (scaled as usize).max(1)
}

#[derive(Debug, Clone, Copy)]
struct ActivePlayer {
    id: usize,
    team: Option<usize>,
    /// Deterministic tendency multiplier
    tendency: f64,
}

/// Simulates user lineups against an ownership-weighted field
pub struct ContestSimulator<'a> {
    pool: &'a PlayerPool,
    env: &'a TeamEnvironment,
    payouts: &'a PayoutTable,
    config: &'a LineupSimConfig,
}

impl<'a> ContestSimulator<'a> {
    pub fn new(
        pool: &'a PlayerPool,
        env: &'a TeamEnvironment,
        payouts: &'a PayoutTable,
        config: &'a LineupSimConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { pool, env, payouts, config })
    }

    /// Validate the lineups, build the field and run every simulation
    pub fn run(&self, user_lineups: &[NamedLineup]) -> Result<ContestResults> {
        if user_lineups.is_empty() {
            return Err(LineupSimError::data_validation("no user lineups to simulate"));
        }
        let users = resolve_lineups(user_lineups, self.pool)?;

        let config = self.config;
        let mut rng = seeded_rng(config.seed);
        let target = config.field_lineup_target();
        info!(
            "Generating {} field lineups ({}% of {} full field)...",
            target, config.field_sample_pct, config.field_size
        );
        let field = generate_field(self.pool, target, config, &mut rng)?;

        let active = self.active_players(&field, &users);
        let active_ids: Vec<usize> = active.iter().map(|p| p.id).collect();
        info!("Optimized to simulate {} unique players (from {} total)", active.len(), self.pool.len());

        let games = GameSimulator::new(self.env, &config.environment)?;
        let plan = CorrelationPlan::new(self.pool, &active_ids, self.env);

        let entries = field.len() + users.len();
        let mut tallies: Vec<LineupTally> = users.iter().map(|_| LineupTally::new(config.field_size)).collect();
        let mut scores = vec![0.0; self.pool.len()];
        let mut outcomes: Vec<Option<TeamOutcome>> = Vec::with_capacity(self.env.len());
        let mut all_scores = Vec::with_capacity(entries);

        info!("🚀 Running {} simulations of {} user lineup(s)", config.n_simulations, users.len());
        for sim in 0..config.n_simulations {
            games.simulate(self.env, &mut rng, &mut outcomes);

            for player in &active {
                let base = self.pool.get(player.id).map_or(0.0, |p| p.sample(&mut rng)) * player.tendency;
                let env_mult = player.team.and_then(|t| outcomes[t]).map_or(1.0, |o| o.scoring_mult);
                scores[player.id] = base * env_mult;
            }

            if config.use_correlations {
                plan.apply(&mut scores, &outcomes, &config.correlation, &mut rng);
            }

            let lineup_score = |lineup: &Lineup| lineup.iter().map(|&id| scores[id]).sum::<f64>();
            let user_scores: Vec<f64> = users.iter().map(lineup_score).collect();
            all_scores.clear();
            all_scores.extend(field.iter().map(lineup_score));
            all_scores.extend_from_slice(&user_scores);
            all_scores.sort_unstable_by(|a, b| b.total_cmp(a));

            for (tally, &score) in tallies.iter_mut().zip(&user_scores) {
                let rank = scale_rank(competition_rank(&all_scores, score), config.field_size, entries);
                let profit = self.payouts.payout(rank) - config.entry_fee;
                tally.record(score, rank, profit);
            }

            if (sim + 1) % PROGRESS_INTERVAL == 0 {
                debug!("Completed {}/{} simulations", sim + 1, config.n_simulations);
            }
        }

        let lineups = tallies
            .iter()
            .zip(user_lineups)
            .map(|(tally, lineup)| tally.summarize(&lineup.label, &lineup.players, config.entry_fee))
            .collect();
        info!("✅ Completed {} simulations", config.n_simulations);

        Ok(ContestResults {
            generated_at: Utc::now(),
            n_simulations: config.n_simulations,
            seed: config.seed,
            field_size: config.field_size,
            field_lineups: field.len(),
            simulated_players: active.len(),
            entry_fee: config.entry_fee,
            lineups,
        })
    }

    /// Every player in any field or user lineup, in id order
    fn active_players(&self, field: &[Lineup], users: &[Lineup]) -> Vec<ActivePlayer> {
        let mut ids: Vec<usize> = field.iter().chain(users).flatten().copied().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut without_team = 0;
        let active: Vec<ActivePlayer> = ids
            .into_iter()
            .filter_map(|id| self.pool.get(id))
            .map(|p| {
                let team = self.env.team_index(&p.team);
                if team.is_none() {
                    without_team += 1;
                }
                ActivePlayer {
                    id: p.id,
                    team,
                    tendency: team.map_or(1.0, |t| self.env.tendency(t, p.position)),
                }
            })
            .collect();
        if without_team > 0 {
            warn!("⚠️ {} lineup players have no matchup row and skip environment scaling", without_team);
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_competition_rank_shares_ties() {
        let sorted = [120.0, 110.0, 110.0, 90.0];
        assert_eq!(competition_rank(&sorted, 120.0), 1);
        assert_eq!(competition_rank(&sorted, 110.0), 2);
        assert_eq!(competition_rank(&sorted, 90.0), 4);
    }

    #[test]
    fn test_scale_rank() {
        assert_eq!(scale_rank(1, 11_890, 595), 19);
        assert_eq!(scale_rank(595, 11_890, 595), 11_890);
        assert_eq!(scale_rank(1, 100, 1_000), 1);
    }
}
