//! User lineup CSV parsing and validation
//!
//! Accepts either explicit slot headers (`QB,RB1,RB2,WR1,WR2,WR3,TE,FLEX,DST`)
//! or the DraftKings export layout where `RB` and `WR` repeat. DraftKings
//! player ids (`Name (12345)`) are stripped from every cell.

use crate::error::{LineupSimError, Result};
use crate::players::PlayerPool;
use roo_engine::feeds::csv_reader;
use roo_engine::RooError;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{error, info};

pub const LINEUPS_TABLE: &str = "lineups";

pub const SLOT_COUNT: usize = 9;

/// Lineup slots in scoring order
pub const LINEUP_SLOTS: [&str; SLOT_COUNT] = ["QB", "RB1", "RB2", "WR1", "WR2", "WR3", "TE", "FLEX", "DST"];

/// A lineup as player ids into a [`PlayerPool`]
pub type Lineup = [usize; SLOT_COUNT];

/// A user lineup as read from file
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLineup {
    pub label: String,
    pub players: [String; SLOT_COUNT],
}

/// Remove DraftKings ids such as ` (40924875)` from a player cell
pub fn strip_player_id(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut rest = cell;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with(')') {
            out.push_str(rest[..open].trim_end());
            rest = &after[digits + 1..];
        } else {
            out.push_str(&rest[..=open]);
            rest = after;
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Map header positions to slot indices, numbering repeated DraftKings headers
fn slot_columns(headers: &csv::StringRecord) -> Result<[usize; SLOT_COUNT]> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut columns: [Option<usize>; SLOT_COUNT] = [None; SLOT_COUNT];

    for (col, header) in headers.iter().enumerate() {
        let header = header.trim();
        let slot = match header {
            "RB" | "WR" => {
                let n = seen.entry(header).or_insert(0);
                *n += 1;
                format!("{header}{n}")
            }
            "D" | "DEF" | "D/ST" => "DST".to_string(),
            other => other.to_string(),
        };
        if let Some(idx) = LINEUP_SLOTS.iter().position(|s| *s == slot) {
            columns[idx].get_or_insert(col);
        }
    }

    let mut resolved = [0; SLOT_COUNT];
    for (idx, column) in columns.iter().enumerate() {
        resolved[idx] = column.ok_or_else(|| RooError::missing_column(LINEUPS_TABLE, LINEUP_SLOTS[idx]))?;
    }
    Ok(resolved)
}

pub fn read_lineups_from<R: Read>(rdr: R) -> Result<Vec<NamedLineup>> {
    let mut reader = csv_reader(rdr);
    let columns = slot_columns(reader.headers()?)?;

    let mut lineups = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let row = idx + 1;
        let mut players: [String; SLOT_COUNT] = Default::default();
        for (slot, &col) in columns.iter().enumerate() {
            let name = record.get(col).map(strip_player_id).unwrap_or_default();
            if name.is_empty() {
                return Err(LineupSimError::malformed_lineup(row, format!("empty {} slot", LINEUP_SLOTS[slot])));
            }
            players[slot] = name;
        }
        lineups.push(NamedLineup { label: format!("Lineup {}", lineups.len() + 1), players });
    }

    if lineups.is_empty() {
        return Err(LineupSimError::data_validation("lineups file has no lineups"));
    }
    info!("✅ Loaded {} user lineups", lineups.len());
    Ok(lineups)
}

pub fn load_lineups(path: &Path) -> Result<Vec<NamedLineup>> {
    read_lineups_from(std::fs::File::open(path)?)
}

/// Resolve every lineup to player ids
///
/// Any name absent from the pool fails the whole run; every unknown name is
/// logged before the first one is returned.
pub fn resolve_lineups(lineups: &[NamedLineup], pool: &PlayerPool) -> Result<Vec<Lineup>> {
    let missing: BTreeSet<&str> = lineups
        .iter()
        .flat_map(|l| l.players.iter())
        .map(String::as_str)
        .filter(|name| pool.id(name).is_none())
        .collect();
    if !missing.is_empty() {
        error!("❌ Found {} player(s) in lineups that are not in the projections", missing.len());
        for name in &missing {
            error!("   • {}", name);
        }
    }

    lineups
        .iter()
        .enumerate()
        .map(|(idx, lineup)| {
            let mut ids = [0; SLOT_COUNT];
            for (slot, name) in lineup.players.iter().enumerate() {
                ids[slot] = pool.id(name).ok_or_else(|| LineupSimError::unknown_player(idx + 1, name.clone()))?;
            }
            Ok(ids)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_player_id() {
        assert_eq!(strip_player_id("Patrick Mahomes (40924875)"), "Patrick Mahomes");
        assert_eq!(strip_player_id("  Chiefs (123) "), "Chiefs");
        assert_eq!(strip_player_id("Odell Beckham (Jr.)"), "Odell Beckham (Jr.)");
        assert_eq!(strip_player_id("Plain Name"), "Plain Name");
    }

    #[test]
    fn test_explicit_slot_headers() {
        let csv = "QB,RB1,RB2,WR1,WR2,WR3,TE,FLEX,DST\nA,B,C,D,E,F,G,H,I\n";
        let lineups = read_lineups_from(csv.as_bytes()).unwrap();
        assert_eq!(lineups.len(), 1);
        assert_eq!(lineups[0].label, "Lineup 1");
        assert_eq!(lineups[0].players[7], "H");
    }

    #[test]
    fn test_draftkings_export_headers() {
        let csv = "Entry ID,QB,RB,RB,WR,WR,WR,TE,FLEX,DST\n\
                   1,Josh Allen (1),James Cook (2),Kyren Williams (3),A (4),B (5),C (6),Dalton Kincaid (7),D (8),Bills (9)\n";
        let lineups = read_lineups_from(csv.as_bytes()).unwrap();
        let players = &lineups[0].players;
        assert_eq!(players[0], "Josh Allen");
        assert_eq!(players[2], "Kyren Williams");
        assert_eq!(players[5], "C");
        assert_eq!(players[8], "Bills");
    }

    #[test]
    fn test_missing_slot_column_is_reported() {
        let csv = "QB,RB,RB,WR,WR,TE,FLEX,DST\nA,B,C,D,E,G,H,I\n";
        let err = read_lineups_from(csv.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Missing column 'WR3' in lineups table");
    }

    #[test]
    fn test_empty_slot_is_malformed() {
        let csv = "QB,RB1,RB2,WR1,WR2,WR3,TE,FLEX,DST\nA,B,,D,E,F,G,H,I\n";
        assert!(matches!(
            read_lineups_from(csv.as_bytes()),
            Err(LineupSimError::MalformedLineup { row: 1, .. })
        ));
    }
}
