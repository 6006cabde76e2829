//! Monte Carlo sampler
//!
//! Draws independent lognormal outcomes for every player. The outer loop runs
//! over simulations and each iteration draws the whole player vector, so the
//! random stream consumed by a given seed is fixed by (simulation, player) order.

use crate::distribution::LogNormalParams;
use crate::error::{Result, RooError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal};
use tracing::{debug, info};

/// Generator used for every random draw in a run
pub type SimRng = ChaCha8Rng;

/// Create the run's single seeded generator
pub fn seeded_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

const PROGRESS_INTERVAL: usize = 2_000;

/// Outcome matrix of shape [n_simulations, n_players], stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeMatrix {
    n_simulations: usize,
    n_players: usize,
    data: Vec<f64>,
}

impl OutcomeMatrix {
    pub fn n_simulations(&self) -> usize {
        self.n_simulations
    }

    pub fn n_players(&self) -> usize {
        self.n_players
    }

    /// All simulated outcomes for one player
    pub fn column(&self, player: usize) -> Vec<f64> {
        self.data.iter().skip(player).step_by(self.n_players.max(1)).copied().collect()
    }
}

/// Build the per-player sampling distributions, rejecting invalid parameters
pub fn player_distributions(params: &[LogNormalParams]) -> Result<Vec<LogNormal<f64>>> {
    params
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            LogNormal::new(p.mu_log, p.sigma_log).map_err(|e| {
                RooError::data_validation(format!(
                    "invalid lognormal parameters for player {idx} (mu={}, sigma={}): {e}",
                    p.mu_log, p.sigma_log
                ))
            })
        })
        .collect()
}

/// Seeded lognormal Monte Carlo sampler
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloSampler {
    n_simulations: usize,
    seed: u64,
}

impl MonteCarloSampler {
    pub fn new(n_simulations: usize, seed: u64) -> Self {
        Self { n_simulations, seed }
    }

    /// Draw `n_simulations` independent outcomes for every player
    pub fn sample(&self, params: &[LogNormalParams]) -> Result<OutcomeMatrix> {
        let distributions = player_distributions(params)?;
        let mut rng = seeded_rng(self.seed);
        let n_players = distributions.len();

        info!("Running {} simulations for {} players", self.n_simulations, n_players);

        let mut data = Vec::with_capacity(self.n_simulations * n_players);
        for sim in 0..self.n_simulations {
            if sim > 0 && sim % PROGRESS_INTERVAL == 0 {
                debug!("Progress: {} / {} simulations", sim, self.n_simulations);
            }
            data.extend(distributions.iter().map(|dist| dist.sample(&mut rng)));
        }

        info!("Completed {} simulations", self.n_simulations);
        Ok(OutcomeMatrix { n_simulations: self.n_simulations, n_players, data })
    }
}
