//! CSV input feeds
//!
//! Each table is checked for its required columns before any row is read, so a
//! missing column fails the run up front with the table and column named.
//! Reader-based loaders back the path-based ones so tests can feed strings.

use crate::error::{Result, RooError};
use crate::models::{EfficiencyMetrics, PlayerHistoryRecord, PlayerKey, Position, SlateEntry, TeamMatchup, WeeklyProe};
use crate::teams::canonical_team;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub const HISTORY_TABLE: &str = "historical stats";
pub const DST_HISTORY_TABLE: &str = "DST historical stats";
pub const SLATE_TABLE: &str = "slate";
pub const MATCHUP_TABLE: &str = "matchup";
pub const PROE_TABLE: &str = "weekly PROE";
pub const NAME_MAP_TABLE: &str = "player mapping";

/// Open a CSV reader that trims headers and fields
pub fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).flexible(true).from_reader(rdr)
}

/// Fail with `MissingColumn` unless every group has at least one header present
///
/// Each group lists accepted spellings; the first one is reported.
pub fn require_columns<R: Read>(reader: &mut csv::Reader<R>, table: &str, required: &[&[&str]]) -> Result<()> {
    let headers = reader.headers()?;
    for group in required {
        if !group.iter().any(|col| headers.iter().any(|h| h == *col)) {
            return Err(RooError::missing_column(table, group[0]));
        }
    }
    Ok(())
}

/// Deserialize every row; malformed rows are skipped with a warning unless `strict`
pub fn read_rows<T: DeserializeOwned, R: Read>(
    mut reader: csv::Reader<R>,
    table: &str,
    strict: bool,
) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) if strict => return Err(e.into()),
            Err(e) => warn!("Skipping malformed {} row {}: {}", table, line + 1, e),
        }
    }
    Ok(rows)
}

fn open(path: &Path) -> Result<File> {
    debug!("Opening {}", path.display());
    Ok(File::open(path)?)
}

// Raw CSV rows

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Position")]
    position: String,
    #[serde(rename = "Week")]
    week: u32,
    #[serde(rename = "DK_Points", deserialize_with = "csv::invalid_option")]
    dk_points: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawDstHistory {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Week")]
    week: u32,
    #[serde(rename = "DK_Points", deserialize_with = "csv::invalid_option")]
    dk_points: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSlate {
    #[serde(rename = "Player")]
    player: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Position")]
    position: String,
    #[serde(rename = "Salary")]
    salary: u32,
    #[serde(rename = "Opp", default)]
    opp: Option<String>,
    #[serde(rename = "ITT", default, deserialize_with = "csv::invalid_option")]
    itt: Option<f64>,
    #[serde(rename = "Spread", default, deserialize_with = "csv::invalid_option")]
    spread: Option<f64>,
    #[serde(rename = "OWS_Median_Proj", deserialize_with = "csv::invalid_option")]
    median_proj: Option<f64>,
    #[serde(rename = "OWS_Proj_Own", default, deserialize_with = "csv::invalid_option")]
    proj_own: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMatchup {
    #[serde(rename = "Team", alias = "Init")]
    team: String,
    #[serde(rename = "Opp", default)]
    opp: Option<String>,
    #[serde(rename = "ITT", default, deserialize_with = "csv::invalid_option")]
    itt: Option<f64>,
    #[serde(rename = "Spread", default, deserialize_with = "csv::invalid_option")]
    spread: Option<f64>,
    #[serde(rename = "Total", default, deserialize_with = "csv::invalid_option")]
    total: Option<f64>,
    #[serde(rename = "Loc", default)]
    loc: Option<String>,
    #[serde(rename = "EPA_Play", default, deserialize_with = "csv::invalid_option")]
    epa_play: Option<f64>,
    #[serde(rename = "Explosive Play Rate", default, deserialize_with = "csv::invalid_option")]
    explosive_play_rate: Option<f64>,
    #[serde(rename = "Points Per Drive", default, deserialize_with = "csv::invalid_option")]
    points_per_drive: Option<f64>,
    #[serde(rename = "EPA_Play_Allowed", default, deserialize_with = "csv::invalid_option")]
    epa_play_allowed: Option<f64>,
    #[serde(rename = "Explosive Play Rate Allowed", default, deserialize_with = "csv::invalid_option")]
    explosive_play_rate_allowed: Option<f64>,
    #[serde(rename = "Points Per Drive Allowed", default, deserialize_with = "csv::invalid_option")]
    points_per_drive_allowed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawProe {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    season: Option<i32>,
    week: u32,
    posteam: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    proe: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawNameMapping {
    #[serde(rename = "Weekly_Stats", default)]
    weekly_stats: Option<String>,
    #[serde(rename = "DK_Salaries", default)]
    dk_salaries: Option<String>,
    #[serde(rename = "OneWeekSeason", default)]
    one_week_season: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Name spellings across the historical, salary and projection sources
///
/// Salary (DraftKings) spelling is canonical.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    history_to_dk: HashMap<String, String>,
    slate_to_dk: HashMap<String, String>,
    dk_names: HashSet<String>,
}

impl NameMap {
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv_reader(rdr);
        require_columns(&mut reader, NAME_MAP_TABLE, &[&["DK_Salaries"]])?;

        let mut map = NameMap::default();
        for raw in read_rows::<RawNameMapping, _>(reader, NAME_MAP_TABLE, false)? {
            let Some(dk) = non_empty(raw.dk_salaries) else { continue };
            if let Some(hist) = non_empty(raw.weekly_stats) {
                map.history_to_dk.insert(hist, dk.clone());
            }
            if let Some(ows) = non_empty(raw.one_week_season) {
                map.slate_to_dk.insert(ows, dk.clone());
            }
            map.dk_names.insert(dk);
        }

        info!("Loaded {} player name mappings", map.dk_names.len());
        Ok(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_reader(open(path)?)
    }

    /// Historical-stats spelling to salary spelling
    pub fn history_name(&self, name: &str) -> String {
        self.history_to_dk.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    /// Projection spelling to salary spelling
    pub fn slate_name(&self, name: &str) -> String {
        self.slate_to_dk.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.dk_names.is_empty()
    }

    /// Distinct names not present in the salary spelling set
    pub fn count_unmapped<'a>(&self, names: impl Iterator<Item = &'a str>) -> usize {
        names.filter(|n| !self.dk_names.contains(*n)).collect::<HashSet<_>>().len()
    }
}

/// Read the historical stats feed
pub fn read_history<R: Read>(rdr: R, names: &NameMap) -> Result<Vec<PlayerHistoryRecord>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, HISTORY_TABLE, &[&["Player"], &["Team"], &["Position"], &["Week"], &["DK_Points"]])?;

    let mut records = Vec::new();
    for raw in read_rows::<RawHistory, _>(reader, HISTORY_TABLE, false)? {
        let Some(points) = finite(raw.dk_points) else {
            debug!("Skipping {} week {}: no fantasy points", raw.player, raw.week);
            continue;
        };
        let position = match raw.position.parse::<Position>() {
            Ok(position) => position,
            Err(_) => {
                warn!("Skipping {} week {}: unsupported position '{}'", raw.player, raw.week, raw.position);
                continue;
            }
        };
        records.push(PlayerHistoryRecord {
            key: PlayerKey::new(names.history_name(raw.player.trim()), canonical_team(&raw.team), position),
            week: raw.week,
            fantasy_points: points,
        });
    }

    if !names.is_empty() {
        let unmapped = names.count_unmapped(records.iter().map(|r| r.key.name.as_str()));
        debug!("{} historical player names not in mapping", unmapped);
    }
    info!("Loaded {} historical player-game records", records.len());
    Ok(records)
}

/// Read the DST history feed; every row is a DST
pub fn read_dst_history<R: Read>(rdr: R, names: &NameMap) -> Result<Vec<PlayerHistoryRecord>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, DST_HISTORY_TABLE, &[&["Player"], &["Team"], &["Week"], &["DK_Points"]])?;

    let records: Vec<PlayerHistoryRecord> = read_rows::<RawDstHistory, _>(reader, DST_HISTORY_TABLE, false)?
        .into_iter()
        .filter_map(|raw| {
            finite(raw.dk_points).map(|points| PlayerHistoryRecord {
                key: PlayerKey::new(names.history_name(raw.player.trim()), canonical_team(&raw.team), Position::DST),
                week: raw.week,
                fantasy_points: points,
            })
        })
        .collect();

    if !names.is_empty() {
        let unmapped = names.count_unmapped(records.iter().map(|r| r.key.name.as_str()));
        debug!("{} historical DST names not in mapping", unmapped);
    }
    info!("Loaded {} historical DST-game records", records.len());
    Ok(records)
}

/// Read the slate feed
///
/// Unknown positions are a validation error; a missing median is read as 0 and
/// dropped later with the other non-positive projections.
pub fn read_slate<R: Read>(rdr: R, names: &NameMap) -> Result<Vec<SlateEntry>> {
    let mut reader = csv_reader(rdr);
    require_columns(
        &mut reader,
        SLATE_TABLE,
        &[&["Player"], &["Team"], &["Position"], &["Salary"], &["Opp"], &["ITT"], &["Spread"], &["OWS_Median_Proj"]],
    )?;

    let mut entries = Vec::new();
    for raw in read_rows::<RawSlate, _>(reader, SLATE_TABLE, true)? {
        let position = raw.position.parse::<Position>().map_err(|_| {
            RooError::data_validation(format!("slate player '{}' has unsupported position '{}'", raw.player, raw.position))
        })?;
        entries.push(SlateEntry {
            key: PlayerKey::new(names.slate_name(raw.player.trim()), canonical_team(&raw.team), position),
            salary: raw.salary,
            opponent: non_empty(raw.opp).map(|o| canonical_team(&o)),
            implied_total: finite(raw.itt),
            spread: finite(raw.spread),
            median_proj: finite(raw.median_proj).unwrap_or(0.0),
            proj_own: finite(raw.proj_own),
        });
    }

    if !names.is_empty() {
        let unmapped = names.count_unmapped(entries.iter().map(|e| e.key.name.as_str()));
        info!("{} unique slate players not in mapping (using original names)", unmapped);
    }
    info!("Loaded {} slate players", entries.len());
    Ok(entries)
}

/// Read the matchup/efficiency feed
pub fn read_matchups<R: Read>(rdr: R) -> Result<Vec<TeamMatchup>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, MATCHUP_TABLE, &[&["Team", "Init"], &["Opp"]])?;

    let rows: Vec<TeamMatchup> = read_rows::<RawMatchup, _>(reader, MATCHUP_TABLE, false)?
        .into_iter()
        .map(|raw| TeamMatchup {
            team: canonical_team(&raw.team),
            opponent: non_empty(raw.opp).map(|o| canonical_team(&o)),
            implied_total: finite(raw.itt),
            spread: finite(raw.spread),
            total: finite(raw.total),
            location: non_empty(raw.loc),
            offense: EfficiencyMetrics {
                epa_play: finite(raw.epa_play),
                explosive_play_rate: finite(raw.explosive_play_rate),
                points_per_drive: finite(raw.points_per_drive),
            },
            defense_allowed: EfficiencyMetrics {
                epa_play: finite(raw.epa_play_allowed),
                explosive_play_rate: finite(raw.explosive_play_rate_allowed),
                points_per_drive: finite(raw.points_per_drive_allowed),
            },
        })
        .collect();

    info!("Loaded {} team matchup rows", rows.len());
    Ok(rows)
}

/// Read the weekly PROE feed
pub fn read_proe<R: Read>(rdr: R) -> Result<Vec<WeeklyProe>> {
    let mut reader = csv_reader(rdr);
    require_columns(&mut reader, PROE_TABLE, &[&["week"], &["posteam"], &["proe"]])?;

    let rows: Vec<WeeklyProe> = read_rows::<RawProe, _>(reader, PROE_TABLE, false)?
        .into_iter()
        .filter_map(|raw| {
            finite(raw.proe).map(|proe| WeeklyProe {
                season: raw.season,
                week: raw.week,
                team: canonical_team(&raw.posteam),
                proe,
            })
        })
        .collect();

    info!("Loaded {} PROE records", rows.len());
    Ok(rows)
}

pub fn load_history(path: &Path, names: &NameMap) -> Result<Vec<PlayerHistoryRecord>> {
    read_history(open(path)?, names)
}

pub fn load_dst_history(path: &Path, names: &NameMap) -> Result<Vec<PlayerHistoryRecord>> {
    read_dst_history(open(path)?, names)
}

pub fn load_slate(path: &Path, names: &NameMap) -> Result<Vec<SlateEntry>> {
    read_slate(open(path)?, names)
}

pub fn load_matchups(path: &Path) -> Result<Vec<TeamMatchup>> {
    read_matchups(open(path)?)
}

pub fn load_proe(path: &Path) -> Result<Vec<WeeklyProe>> {
    read_proe(open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_slate_column_names_table() {
        let csv = "Player,Team,Position,Salary,Opp,ITT,Spread\nJosh Allen,BUF,QB,8000,MIA,27.5,-6.5\n";
        let err = read_slate(csv.as_bytes(), &NameMap::default()).unwrap_err();
        assert_eq!(err.to_string(), "Missing column 'OWS_Median_Proj' in slate table");
    }

    #[test]
    fn test_slate_parsing_and_defaults() {
        let csv = "Player,Team,Position,Salary,Opp,ITT,Spread,OWS_Median_Proj,OWS_Proj_Own\n\
                   Josh Allen,BUF,QB,8000,MIA,27.5,-6.5,22.4,18.5\n\
                   Bills,BUF,D,3200,,,,7.1,\n";
        let slate = read_slate(csv.as_bytes(), &NameMap::default()).unwrap();
        assert_eq!(slate.len(), 2);
        assert_eq!(slate[0].opponent.as_deref(), Some("MIA"));
        assert_eq!(slate[0].implied_total, Some(27.5));
        assert_eq!(slate[0].proj_own, Some(18.5));
        assert_eq!(slate[1].key.position, Position::DST);
        assert_eq!(slate[1].opponent, None);
        assert_eq!(slate[1].spread, None);
        assert_eq!(slate[1].proj_own, None);
    }

    #[test]
    fn test_slate_rejects_unknown_position() {
        let csv = "Player,Team,Position,Salary,Opp,ITT,Spread,OWS_Median_Proj\nKicker,BUF,K,4000,MIA,27,-6,8\n";
        assert!(matches!(read_slate(csv.as_bytes(), &NameMap::default()), Err(RooError::DataValidation(_))));
    }

    #[test]
    fn test_history_skips_bad_rows_and_maps_names() {
        let mapping = "Weekly_Stats,DK_Salaries,OneWeekSeason\nGabe Davis,Gabriel Davis,G. Davis\n";
        let names = NameMap::from_reader(mapping.as_bytes()).unwrap();

        let csv = "Player,Team,Position,Week,DK_Points\n\
                   Gabe Davis,JAX,WR,3,11.2\n\
                   Some Kicker,JAX,K,3,9.0\n\
                   Empty Row,JAX,WR,3,\n";
        let history = read_history(csv.as_bytes(), &names).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].key.name, "Gabriel Davis");
        assert_eq!(names.slate_name("G. Davis"), "Gabriel Davis");
        assert_eq!(names.slate_name("Unknown"), "Unknown");
    }

    #[test]
    fn test_dst_history_rows_are_dst() {
        let csv = "Player,Team,Week,DK_Points\nBills,BUF,4,12\n";
        let rows = read_dst_history(csv.as_bytes(), &NameMap::default()).unwrap();
        assert_eq!(rows[0].key.position, Position::DST);
        assert_eq!(rows[0].fantasy_points, 12.0);
    }

    #[test]
    fn test_dst_history_maps_names() {
        let mapping = "Weekly_Stats,DK_Salaries,OneWeekSeason\n49ers,San Francisco 49ers,\n";
        let names = NameMap::from_reader(mapping.as_bytes()).unwrap();

        let csv = "Player,Team,Week,DK_Points\n49ers,SF,1,8\nBills,BUF,1,12\n";
        let rows = read_dst_history(csv.as_bytes(), &names).unwrap();
        assert_eq!(rows[0].key, PlayerKey::new("San Francisco 49ers", "SF", Position::DST));
        assert_eq!(rows[1].key.name, "Bills");
    }

    #[test]
    fn test_matchups_accept_init_alias_and_optional_metrics() {
        let csv = "Init,Opp,ITT,Spread,Total,Loc,EPA_Play,Explosive Play Rate\n\
                   BUF,MIA,27.5,-6.5,48.5,Home,0.12,0.11\n\
                   MIA,BUF,21,6.5,48.5,Away,,\n";
        let rows = read_matchups(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].offense.epa_play, Some(0.12));
        assert_eq!(rows[0].offense.points_per_drive, None);
        assert_eq!(rows[1].offense.epa_play, None);
        assert_eq!(rows[1].location.as_deref(), Some("Away"));
    }

    #[test]
    fn test_matchups_require_team_column() {
        let csv = "Opp,ITT\nMIA,27\n";
        let err = read_matchups(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RooError::MissingColumn { ref column, .. } if column == "Team"));
    }

    #[test]
    fn test_proe_nicknames_resolve() {
        let csv = "season,week,posteam,proe\n2025,3,Bills,0.05\n2025,4,Bills,NA\n";
        let rows = read_proe(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team, "BUF");
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proe.csv");
        std::fs::write(&path, "season,week,posteam,proe\n2025,1,KC,0.02\n").unwrap();
        assert_eq!(load_proe(&path).unwrap().len(), 1);
        assert!(matches!(load_proe(&dir.path().join("missing.csv")), Err(RooError::Io(_))));
    }
}
