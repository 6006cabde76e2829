//! Range-of-Outcomes (ROO) engine
//!
//! Turns median projections into full outcome distributions for an NFL DFS
//! slate. Historical weekly scores give each player a volatility estimate, the
//! matchup scales it, and a seeded lognormal Monte Carlo run produces the
//! percentile floor/median/ceiling artifact consumed by downstream tools.

pub mod config;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod feeds;
pub mod logging;
pub mod matchup;
pub mod models;
pub mod output;
pub mod percentiles;
pub mod sampler;
pub mod teams;
pub mod volatility;

pub use config::RooConfig;
pub use distribution::{lognormal_params, LogNormalParams};
pub use engine::{InputPaths, RooEngine, RooInputs, RooRun};
pub use error::{Result, RooError};
pub use models::*;
pub use output::{ProjectionRow, RunSummary};
pub use sampler::{seeded_rng, MonteCarloSampler, OutcomeMatrix, SimRng};

#[cfg(test)]
mod tests;
