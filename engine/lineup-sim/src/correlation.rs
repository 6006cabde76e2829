//! Correlation nudges applied after the independent draws
//!
//! Rules run in a fixed order: QB to same-team pass catchers, RB to team
//! scoring, DST to the simulated spread. Each nudge multiplies the drawn
//! score by a uniform factor from the configured range.

use crate::config::CorrelationParams;
use crate::environment::{TeamEnvironment, TeamOutcome};
use crate::players::PlayerPool;
use rand::Rng;
use roo_engine::Position;

/// Uniform factor in `[low, high)`; a degenerate range returns `low`
fn uniform<R: Rng + ?Sized>(range: [f64; 2], rng: &mut R) -> f64 {
    let [low, high] = range;
    low + (high - low) * rng.gen::<f64>()
}

#[derive(Debug, Clone, PartialEq)]
struct QbStack {
    qb: usize,
    median: f64,
    pass_catchers: Vec<usize>,
}

/// Precomputed lookups for the players that appear in any lineup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationPlan {
    qb_stacks: Vec<QbStack>,
    /// (player id, team index)
    running_backs: Vec<(usize, usize)>,
    defenses: Vec<(usize, usize)>,
}

impl CorrelationPlan {
    /// `active` must be sorted player ids
    pub fn new(pool: &PlayerPool, active: &[usize], env: &TeamEnvironment) -> Self {
        let mut plan = CorrelationPlan::default();
        let players = || active.iter().filter_map(|&id| pool.get(id));

        for qb in players().filter(|p| p.position == Position::QB) {
            let pass_catchers = players()
                .filter(|p| p.position.is_pass_catcher() && p.team == qb.team && p.id != qb.id)
                .map(|p| p.id)
                .collect();
            plan.qb_stacks.push(QbStack { qb: qb.id, median: qb.median, pass_catchers });
        }

        for player in players() {
            let Some(team) = env.team_index(&player.team) else { continue };
            match player.position {
                Position::RB => plan.running_backs.push((player.id, team)),
                Position::DST => plan.defenses.push((player.id, team)),
                _ => {}
            }
        }
        plan
    }

    /// Apply every rule to `scores` (indexed by player id) for one simulation
    pub fn apply<R: Rng + ?Sized>(
        &self,
        scores: &mut [f64],
        outcomes: &[Option<TeamOutcome>],
        params: &CorrelationParams,
        rng: &mut R,
    ) {
        for stack in &self.qb_stacks {
            let qb_score = scores[stack.qb];
            let range = if qb_score > params.qb_boom_ratio * stack.median {
                params.pass_catcher_boost
            } else if qb_score < params.qb_bust_ratio * stack.median {
                params.pass_catcher_penalty
            } else {
                continue;
            };
            for &pc in &stack.pass_catchers {
                scores[pc] *= uniform(range, rng);
            }
        }

        for &(id, team) in &self.running_backs {
            let Some(outcome) = outcomes.get(team).copied().flatten() else { continue };
            if outcome.scoring_mult > params.rb_boost_threshold {
                scores[id] *= uniform(params.rb_boost, rng);
            } else if outcome.scoring_mult < params.rb_penalty_threshold {
                scores[id] *= uniform(params.rb_penalty, rng);
            }
        }

        for &(id, team) in &self.defenses {
            let Some(outcome) = outcomes.get(team).copied().flatten() else { continue };
            if outcome.spread < -params.dst_spread_threshold {
                scores[id] *= uniform(params.dst_boost, rng);
            } else if outcome.spread > params.dst_spread_threshold {
                scores[id] *= uniform(params.dst_penalty, rng);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvironmentParams, LineupSimConfig};
    use crate::environment::GameLine;
    use roo_engine::{seeded_rng, ProjectionRow};
    use std::collections::HashMap;

    fn row(name: &str, team: &str, position: &str, median: f64) -> ProjectionRow {
        ProjectionRow {
            player: name.to_string(),
            team: team.to_string(),
            position: position.to_string(),
            salary: 5000,
            median_proj: median,
            ..Default::default()
        }
    }

    fn fixture() -> (PlayerPool, TeamEnvironment) {
        let rows = vec![
            row("QB", "BUF", "QB", 20.0),
            row("WR", "BUF", "WR", 10.0),
            row("TE", "BUF", "TE", 8.0),
            row("Other WR", "MIA", "WR", 10.0),
            row("RB", "BUF", "RB", 12.0),
            row("DST", "BUF", "DST", 7.0),
        ];
        let pool = PlayerPool::from_rows(&rows, &LineupSimConfig::default()).unwrap();
        let line = |team: &str, opp: &str| GameLine {
            team: team.to_string(),
            opponent: opp.to_string(),
            total: Some(45.0),
            spread: Some(0.0),
            metrics: Default::default(),
        };
        let env = TeamEnvironment::new(
            &[line("BUF", "MIA"), line("MIA", "BUF")],
            &HashMap::new(),
            &HashMap::new(),
            &EnvironmentParams::default(),
        );
        (pool, env)
    }

    fn outcome(scoring_mult: f64, spread: f64) -> Option<TeamOutcome> {
        Some(TeamOutcome { points: 22.5 * scoring_mult, scoring_mult, spread })
    }

    #[test]
    fn test_qb_boom_boosts_only_same_team_pass_catchers() {
        let (pool, env) = fixture();
        let active: Vec<usize> = (0..pool.len()).collect();
        let plan = CorrelationPlan::new(&pool, &active, &env);

        let mut scores = vec![35.0, 10.0, 8.0, 10.0, 12.0, 7.0];
        let neutral = vec![outcome(1.0, 0.0), outcome(1.0, 0.0)];
        plan.apply(&mut scores, &neutral, &CorrelationParams::default(), &mut seeded_rng(3));

        assert!((11.0..13.0).contains(&scores[1]));
        assert!((8.8..10.4).contains(&scores[2]));
        assert_eq!(scores[3], 10.0);
        assert_eq!(scores[4], 12.0);
        assert_eq!(scores[5], 7.0);
    }

    #[test]
    fn test_qb_bust_penalises_pass_catchers() {
        let (pool, env) = fixture();
        let active: Vec<usize> = (0..pool.len()).collect();
        let plan = CorrelationPlan::new(&pool, &active, &env);

        let mut scores = vec![5.0, 10.0, 8.0, 10.0, 12.0, 7.0];
        let neutral = vec![outcome(1.0, 0.0), outcome(1.0, 0.0)];
        plan.apply(&mut scores, &neutral, &CorrelationParams::default(), &mut seeded_rng(3));
        assert!((7.0..9.0).contains(&scores[1]));
    }

    #[test]
    fn test_rb_and_dst_follow_team_outcome() {
        let (pool, env) = fixture();
        let active: Vec<usize> = (0..pool.len()).collect();
        let plan = CorrelationPlan::new(&pool, &active, &env);
        let buf = env.team_index("BUF").unwrap();

        let mut outcomes = vec![outcome(1.0, 0.0); env.len()];
        outcomes[buf] = outcome(1.25, -6.0);
        let mut scores = vec![20.0, 10.0, 8.0, 10.0, 12.0, 10.0];
        plan.apply(&mut scores, &outcomes, &CorrelationParams::default(), &mut seeded_rng(5));
        assert!((12.6..13.8).contains(&scores[4]));
        assert!((11.0..12.0).contains(&scores[5]));

        outcomes[buf] = outcome(0.8, 6.0);
        let mut scores = vec![20.0, 10.0, 8.0, 10.0, 12.0, 10.0];
        plan.apply(&mut scores, &outcomes, &CorrelationParams::default(), &mut seeded_rng(5));
        assert!((10.2..11.4).contains(&scores[4]));
        assert!((8.0..9.0).contains(&scores[5]));
    }

    #[test]
    fn test_inactive_players_are_not_planned() {
        let (pool, env) = fixture();
        let plan = CorrelationPlan::new(&pool, &[0, 3], &env);
        let mut scores = vec![35.0, 10.0, 8.0, 10.0, 12.0, 7.0];
        plan.apply(&mut scores, &[None, None], &CorrelationParams::default(), &mut seeded_rng(1));
        assert_eq!(scores, vec![35.0, 10.0, 8.0, 10.0, 12.0, 7.0]);
    }
}
