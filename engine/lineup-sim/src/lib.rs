//! Correlated DFS lineup simulator
//!
//! Scores user lineups against an ownership-weighted opponent field across
//! many simulated slates. Player outcomes come from the ROO projection
//! artifact; a per-simulation game environment and correlation rules tie
//! teammates and opponents together before lineups are ranked and paid out.

pub mod config;
pub mod correlation;
pub mod environment;
pub mod error;
pub mod field;
pub mod lineups;
pub mod payouts;
pub mod players;
pub mod results;
pub mod simulator;

pub use config::{LineupSimConfig, SimMode};
pub use environment::{GameLine, TeamEnvironment};
pub use error::{LineupSimError, Result};
pub use lineups::{Lineup, NamedLineup};
pub use payouts::{ContestType, PayoutTable};
pub use players::PlayerPool;
pub use results::{ContestResults, LineupSummary};
pub use simulator::ContestSimulator;
