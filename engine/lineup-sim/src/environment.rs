//! Game environment model
//!
//! Each team carries a Vegas line, a z-scored matchup strength and optional
//! play-calling tendencies. Every simulation redraws each game's total and
//! spread around the line; the resulting team points, relative to the
//! expected points, become the team scoring multiplier applied to its players.
//!
//! Spreads are from the team's own perspective: negative means favoured and
//! team points are `(total - spread) / 2`.

use crate::config::EnvironmentParams;
use crate::error::{LineupSimError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use roo_engine::feeds::{csv_reader, read_rows, require_columns};
use roo_engine::teams::canonical_team;
use roo_engine::Position;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub const GAME_LINES_TABLE: &str = "matchup";
pub const TEAM_OFFENSE_TABLE: &str = "team offense";
pub const TEAM_DEFENSE_TABLE: &str = "team defense";

/// Weights of the z-scored metrics in the matchup strength (EPA, YPP, PPD, explosive, conversion)
pub const STRENGTH_WEIGHTS: [f64; 5] = [0.30, 0.20, 0.20, 0.15, 0.15];

const Z_EPS: f64 = 1e-6;

#[derive(Debug, Deserialize)]
struct RawGameLine {
    #[serde(rename = "Team", alias = "Init")]
    team: String,
    #[serde(rename = "Opp")]
    opp: String,
    #[serde(rename = "Total", default, deserialize_with = "csv::invalid_option")]
    total: Option<f64>,
    #[serde(rename = "Spread", default, deserialize_with = "csv::invalid_option")]
    spread: Option<f64>,
    #[serde(rename = "Init_EPA_Play", alias = "EPA_Play", alias = "EPA", default, deserialize_with = "csv::invalid_option")]
    epa: Option<f64>,
    #[serde(rename = "Init_Yards Per Play", alias = "Yards Per Play", alias = "YPP", default, deserialize_with = "csv::invalid_option")]
    ypp: Option<f64>,
    #[serde(rename = "Init_Points Per Drive", alias = "Points Per Drive", alias = "PPD", default, deserialize_with = "csv::invalid_option")]
    ppd: Option<f64>,
    #[serde(rename = "Init_Explosive Play Rate", alias = "Explosive Play Rate", alias = "Explosive", default, deserialize_with = "csv::invalid_option")]
    explosive: Option<f64>,
    #[serde(rename = "Init_Down Conversion Rate", alias = "Down Conversion Rate", alias = "Conv", default, deserialize_with = "csv::invalid_option")]
    conversion: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTeamOffense {
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Avg Pass Att", default, deserialize_with = "csv::invalid_option")]
    pass_att: Option<f64>,
    #[serde(rename = "Avg Rush Att", default, deserialize_with = "csv::invalid_option")]
    rush_att: Option<f64>,
    #[serde(rename = "Avg Pass Yds", default, deserialize_with = "csv::invalid_option")]
    pass_yds: Option<f64>,
    #[serde(rename = "Avg Rush Yds", default, deserialize_with = "csv::invalid_option")]
    rush_yds: Option<f64>,
    #[serde(rename = "Avg_Pass_TD", default, deserialize_with = "csv::invalid_option")]
    pass_td: Option<f64>,
    #[serde(rename = "Avg_Rush_TD", default, deserialize_with = "csv::invalid_option")]
    rush_td: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTeamDefense {
    #[serde(rename = "Opp")]
    team: String,
    #[serde(rename = "Avg Pass Yds", default, deserialize_with = "csv::invalid_option")]
    pass_yds: Option<f64>,
    #[serde(rename = "Avg Rush Yds", default, deserialize_with = "csv::invalid_option")]
    rush_yds: Option<f64>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Metrics feeding the matchup strength; any may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrengthMetrics {
    pub epa: Option<f64>,
    pub ypp: Option<f64>,
    pub ppd: Option<f64>,
    pub explosive: Option<f64>,
    pub conversion: Option<f64>,
}

impl StrengthMetrics {
    fn values(&self) -> [Option<f64>; 5] {
        [self.epa, self.ypp, self.ppd, self.explosive, self.conversion]
    }
}

/// One team's row of the matchup table
#[derive(Debug, Clone, PartialEq)]
pub struct GameLine {
    pub team: String,
    pub opponent: String,
    pub total: Option<f64>,
    pub spread: Option<f64>,
    pub metrics: StrengthMetrics,
}

/// Per-game offensive averages of a team
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffenseTendencies {
    pub pass_att: Option<f64>,
    pub rush_att: Option<f64>,
    pub pass_yds: Option<f64>,
    pub rush_yds: Option<f64>,
    pub pass_td: Option<f64>,
    pub rush_td: Option<f64>,
}

/// Per-game yardage a defense allows
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefenseAllowed {
    pub pass_yds: Option<f64>,
    pub rush_yds: Option<f64>,
}

pub fn read_game_lines_from<R: Read>(rdr: R) -> Result<Vec<GameLine>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, GAME_LINES_TABLE, &[&["Team", "Init"], &["Opp"], &["Total"]])?;
    let rows: Vec<RawGameLine> = read_rows(reader, GAME_LINES_TABLE, false)?;

    let lines: Vec<GameLine> = rows
        .into_iter()
        .filter(|r| !r.team.trim().is_empty() && !r.opp.trim().is_empty())
        .map(|r| GameLine {
            team: canonical_team(&r.team),
            opponent: canonical_team(&r.opp),
            total: finite(r.total),
            spread: finite(r.spread),
            metrics: StrengthMetrics {
                epa: finite(r.epa),
                ypp: finite(r.ypp),
                ppd: finite(r.ppd),
                explosive: finite(r.explosive),
                conversion: finite(r.conversion),
            },
        })
        .collect();

    if lines.is_empty() {
        return Err(LineupSimError::data_validation("matchup table has no team rows"));
    }
    Ok(lines)
}

pub fn load_game_lines(path: &Path) -> Result<Vec<GameLine>> {
    read_game_lines_from(std::fs::File::open(path)?)
}

pub fn read_team_offense_from<R: Read>(rdr: R) -> Result<HashMap<String, OffenseTendencies>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TEAM_OFFENSE_TABLE, &[&["Team"]])?;
    let rows: Vec<RawTeamOffense> = read_rows(reader, TEAM_OFFENSE_TABLE, false)?;

    let mut teams = HashMap::new();
    for r in rows {
        teams.entry(canonical_team(&r.team)).or_insert(OffenseTendencies {
            pass_att: finite(r.pass_att),
            rush_att: finite(r.rush_att),
            pass_yds: finite(r.pass_yds),
            rush_yds: finite(r.rush_yds),
            pass_td: finite(r.pass_td),
            rush_td: finite(r.rush_td),
        });
    }
    info!("✅ Loaded team offense stats for {} teams", teams.len());
    Ok(teams)
}

pub fn load_team_offense(path: &Path) -> Result<HashMap<String, OffenseTendencies>> {
    read_team_offense_from(std::fs::File::open(path)?)
}

/// Defense table keyed by `Opp`, the team whose defense allowed the yardage
pub fn read_team_defense_from<R: Read>(rdr: R) -> Result<HashMap<String, DefenseAllowed>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, TEAM_DEFENSE_TABLE, &[&["Opp"]])?;
    let rows: Vec<RawTeamDefense> = read_rows(reader, TEAM_DEFENSE_TABLE, false)?;

    let mut teams = HashMap::new();
    for r in rows {
        teams
            .entry(canonical_team(&r.team))
            .or_insert(DefenseAllowed { pass_yds: finite(r.pass_yds), rush_yds: finite(r.rush_yds) });
    }
    info!("✅ Loaded team defense stats for {} teams", teams.len());
    Ok(teams)
}

pub fn load_team_defense(path: &Path) -> Result<HashMap<String, DefenseAllowed>> {
    read_team_defense_from(std::fs::File::open(path)?)
}

/// Z-scores over the present values using the sample std; missing values score 0
pub fn z_scores(values: &[Option<f64>]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return vec![0.0; values.len()];
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let std = (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();

    values.iter().map(|v| v.map_or(0.0, |v| (v - mean) / (std + Z_EPS))).collect()
}

/// Weighted sum of each team's z-scored metrics, in input order
pub fn matchup_strengths(lines: &[GameLine]) -> Vec<f64> {
    let mut strengths = vec![0.0; lines.len()];
    for (metric, weight) in STRENGTH_WEIGHTS.iter().enumerate() {
        let column: Vec<Option<f64>> = lines.iter().map(|l| l.metrics.values()[metric]).collect();
        for (strength, z) in strengths.iter_mut().zip(z_scores(&column)) {
            *strength += weight * z;
        }
    }
    strengths
}

/// Deterministic multiplier from play-calling tendencies
///
/// QBs, RBs and pass catchers read their own offense; DSTs read the yardage
/// their defense allows.
pub fn tendency_multiplier(
    position: Position,
    offense: Option<&OffenseTendencies>,
    defense: Option<&DefenseAllowed>,
) -> f64 {
    let step = |value: f64, high: f64, low: f64, up: f64, down: f64| {
        if value > high {
            up
        } else if value < low {
            down
        } else {
            1.0
        }
    };

    match (position, offense, defense) {
        (Position::QB, Some(o), _) => {
            step(o.pass_att.unwrap_or(30.0), 35.0, 27.0, 1.05, 0.95)
                * step(o.pass_td.unwrap_or(1.5), 2.0, 1.0, 1.08, 0.92)
        }
        (Position::RB, Some(o), _) => {
            step(o.rush_att.unwrap_or(25.0), 28.0, 22.0, 1.08, 0.92)
                * step(o.rush_td.unwrap_or(1.0), 1.3, 0.7, 1.05, 0.95)
        }
        (Position::WR | Position::TE, Some(o), _) => {
            step(o.pass_att.unwrap_or(30.0), 35.0, 27.0, 1.06, 0.94)
                * step(o.pass_yds.unwrap_or(220.0), 260.0, 200.0, 1.04, 0.96)
        }
        (Position::DST, _, Some(d)) => {
            let pass = d.pass_yds.unwrap_or(220.0);
            let rush = d.rush_yds.unwrap_or(115.0);
            if pass < 200.0 && rush < 100.0 {
                1.15
            } else if pass > 260.0 || rush > 140.0 {
                0.85
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}

/// Everything known about one team before simulation
#[derive(Debug, Clone, PartialEq)]
pub struct TeamContext {
    pub team: String,
    pub opponent: String,
    pub total: f64,
    pub spread: f64,
    /// Expected points from the line
    pub base_points: f64,
    pub strength: f64,
    pub offense: Option<OffenseTendencies>,
    pub defense: Option<DefenseAllowed>,
}

/// Two team indices playing each other; `first` sorts before `second`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Game {
    pub first: usize,
    pub second: usize,
}

/// Per-simulation result for one team
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamOutcome {
    pub points: f64,
    /// Simulated points over expected points
    pub scoring_mult: f64,
    /// Simulated spread from this team's perspective
    pub spread: f64,
}

/// Split a simulated game between its two teams
pub fn split_game(
    total: f64,
    spread: f64,
    first: &TeamContext,
    second: &TeamContext,
    alpha: f64,
) -> (TeamOutcome, TeamOutcome) {
    let first_raw = (total - spread) / 2.0 * (1.0 + alpha * first.strength);
    let second_raw = (total + spread) / 2.0 * (1.0 + alpha * second.strength);
    let renorm = total / (first_raw + second_raw).max(1.0);

    let outcome = |raw: f64, team: &TeamContext, spread: f64| {
        let points = raw * renorm;
        TeamOutcome { points, scoring_mult: points / team.base_points.max(1.0), spread }
    };
    (outcome(first_raw, first, spread), outcome(second_raw, second, -spread))
}

/// Teams and games on the slate
#[derive(Debug, Clone, Default)]
pub struct TeamEnvironment {
    teams: Vec<TeamContext>,
    index: HashMap<String, usize>,
    games: Vec<Game>,
}

impl TeamEnvironment {
    pub fn new(
        lines: &[GameLine],
        offense: &HashMap<String, OffenseTendencies>,
        defense: &HashMap<String, DefenseAllowed>,
        params: &EnvironmentParams,
    ) -> Self {
        let strengths = matchup_strengths(lines);
        let mut env = TeamEnvironment::default();

        for (line, strength) in lines.iter().zip(strengths) {
            if env.index.contains_key(&line.team) {
                warn!("Duplicate matchup row for {}, keeping the first", line.team);
                continue;
            }
            let total = line.total.unwrap_or(params.default_total);
            let spread = line.spread.unwrap_or(0.0);
            env.index.insert(line.team.clone(), env.teams.len());
            env.teams.push(TeamContext {
                team: line.team.clone(),
                opponent: line.opponent.clone(),
                total,
                spread,
                base_points: (total - spread) / 2.0,
                strength,
                offense: offense.get(&line.team).copied(),
                defense: defense.get(&line.team).copied(),
            });
        }

        for (idx, team) in env.teams.iter().enumerate() {
            let Some(&opp) = env.index.get(&team.opponent) else {
                warn!("Opponent {} of {} has no matchup row, its game is not simulated", team.opponent, team.team);
                continue;
            };
            let (first, second) = if env.teams[opp].team < team.team { (opp, idx) } else { (idx, opp) };
            let game = Game { first, second };
            if first != second && !env.games.contains(&game) {
                env.games.push(game);
            }
        }

        info!("✅ Built matchup environment for {} teams in {} games", env.teams.len(), env.games.len());
        env
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn team_index(&self, team: &str) -> Option<usize> {
        self.index.get(team).copied()
    }

    pub fn team(&self, idx: usize) -> Option<&TeamContext> {
        self.teams.get(idx)
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Tendency multiplier for a player of `position` on team `idx`
    pub fn tendency(&self, idx: usize, position: Position) -> f64 {
        self.teams
            .get(idx)
            .map_or(1.0, |t| tendency_multiplier(position, t.offense.as_ref(), t.defense.as_ref()))
    }
}

#[derive(Debug, Clone)]
struct GameDraw {
    game: Game,
    total: Normal<f64>,
    spread: Normal<f64>,
}

/// Redraws every game's total and spread around its line
#[derive(Debug, Clone)]
pub struct GameSimulator {
    draws: Vec<GameDraw>,
    min_total: f64,
    alpha: f64,
}

impl GameSimulator {
    pub fn new(env: &TeamEnvironment, params: &EnvironmentParams) -> Result<Self> {
        let draws = env
            .games()
            .iter()
            .map(|&game| {
                // The first team's row carries the game line
                let line = &env.teams[game.first];
                let total = Normal::new(line.total, params.total_sd)
                    .map_err(|e| LineupSimError::invalid_config(format!("total distribution for {}: {e}", line.team)))?;
                let spread = Normal::new(line.spread, params.spread_sd)
                    .map_err(|e| LineupSimError::invalid_config(format!("spread distribution for {}: {e}", line.team)))?;
                Ok(GameDraw { game, total, spread })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { draws, min_total: params.min_game_total, alpha: params.alpha_matchup })
    }

    /// Fill `outcomes` (indexed by team) for one simulation; teams without a game stay `None`
    pub fn simulate<R: Rng + ?Sized>(&self, env: &TeamEnvironment, rng: &mut R, outcomes: &mut Vec<Option<TeamOutcome>>) {
        outcomes.clear();
        outcomes.resize(env.len(), None);

        for draw in &self.draws {
            let total = draw.total.sample(rng).max(self.min_total);
            let spread = draw.spread.sample(rng);
            let (first, second) =
                split_game(total, spread, &env.teams[draw.game.first], &env.teams[draw.game.second], self.alpha);
            outcomes[draw.game.first] = Some(first);
            outcomes[draw.game.second] = Some(second);
        }
    }
}
