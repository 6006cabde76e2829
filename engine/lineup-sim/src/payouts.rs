//! Contest payout tables

use crate::error::{LineupSimError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Share of the field paid in a double-up
const DOUBLE_UP_CASH_SHARE: f64 = 0.444;
/// Share of the field paid in a 50/50
const FIFTY_FIFTY_CASH_SHARE: f64 = 0.50;
/// Payout as a multiple of the entry fee after rake
const CASH_GAME_MULTIPLIER: f64 = 1.8;

/// NFL $40K Front Four, 11,890 entries at $3
pub const FRONT_FOUR_PAYOUTS: &str = "1-1:4000\n2-2:2000\n3-3:1500\n4-4:1000\n5-5:750\n6-6:600\n7-8:500\n\
9-10:400\n11-12:300\n13-14:250\n15-16:200\n17-21:150\n22-26:100\n27-31:75\n32-36:60\n37-46:50\n47-56:40\n\
57-71:30\n72-96:25\n97-151:20\n152-291:15\n292-661:10\n662-1396:8\n1397-3091:6";

/// Flat GPP, 2,972 entries at $3
pub const FLAT_GPP_PAYOUTS: &str = "1-1:1000\n2-2:500\n3-3:300\n4-4:200\n5-5:150\n6-7:125\n8-10:100\n\
11-13:75\n14-16:60\n17-20:50\n21-25:40\n26-30:30\n31-45:25\n46-75:20\n76-125:15\n126-230:10\n231-410:8\n411-765:6";

/// Top-heavy GPP, 83,234 entries at $5
pub const TOP_HEAVY_PAYOUTS: &str = "1-1:50000\n2-2:20000\n3-3:10000\n4-4:7500\n5-5:5000\n6-6:3000\n\
7-8:2000\n9-10:1500\n11-15:1000\n16-20:750\n21-30:500\n31-50:300\n51-70:200\n71-100:100\n101-150:70\n\
151-225:50\n226-350:40\n351-550:30\n551-1050:25\n1051-1750:20\n1751-3150:15\n3151-6000:12\n6001-10080:10\n\
10081-20080:8";

/// Contest type selecting how the payout table is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestType {
    DoubleUp,
    FiftyFifty,
    FrontFour,
    FlatGpp,
    TopHeavy,
    /// Ranges read from a payout file
    Custom,
}

impl FromStr for ContestType {
    type Err = LineupSimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "double-up" | "doubleup" => Ok(ContestType::DoubleUp),
            "fifty-fifty" | "50/50" => Ok(ContestType::FiftyFifty),
            "front-four" => Ok(ContestType::FrontFour),
            "flat-gpp" => Ok(ContestType::FlatGpp),
            "top-heavy" => Ok(ContestType::TopHeavy),
            "payouts" | "custom" => Ok(ContestType::Custom),
            other => Err(LineupSimError::invalid_config(format!("unknown contest type '{other}'"))),
        }
    }
}

impl fmt::Display for ContestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContestType::DoubleUp => "double-up",
            ContestType::FiftyFifty => "fifty-fifty",
            ContestType::FrontFour => "front-four",
            ContestType::FlatGpp => "flat-gpp",
            ContestType::TopHeavy => "top-heavy",
            ContestType::Custom => "payouts",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutRange {
    pub start: usize,
    pub end: usize,
    pub amount: f64,
}

/// Payout by finishing rank; ranks not covered pay nothing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayoutTable {
    ranges: Vec<PayoutRange>,
}

impl PayoutTable {
    /// Flat payout for ranks `1..=cash_line`
    pub fn cash_game(cash_line: usize, amount: f64) -> Self {
        let ranges = if cash_line == 0 { Vec::new() } else { vec![PayoutRange { start: 1, end: cash_line, amount }] };
        Self { ranges }
    }

    /// Top 44.4% of the field paid 1.8x the entry fee
    pub fn double_up(field_size: usize, entry_fee: f64) -> Self {
        let cash_line = (field_size as f64 * DOUBLE_UP_CASH_SHARE) as usize;
        Self::cash_game(cash_line, entry_fee * CASH_GAME_MULTIPLIER)
    }

    /// Top half of the field paid 1.8x the entry fee
    pub fn fifty_fifty(field_size: usize, entry_fee: f64) -> Self {
        let cash_line = (field_size as f64 * FIFTY_FIFTY_CASH_SHARE) as usize;
        Self::cash_game(cash_line, entry_fee * CASH_GAME_MULTIPLIER)
    }

    /// Parse `start-end:amount` lines; blank lines are ignored
    ///
    /// When ranges overlap the later line wins.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let number = idx + 1;
            let (range, amount) =
                line.split_once(':').ok_or_else(|| LineupSimError::invalid_payout(number, "expected start-end:amount"))?;
            let (start, end) =
                range.split_once('-').ok_or_else(|| LineupSimError::invalid_payout(number, "expected start-end"))?;

            let parse_rank = |value: &str| {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| LineupSimError::invalid_payout(number, format!("bad rank '{}': {e}", value.trim())))
            };
            let start = parse_rank(start)?;
            let end = parse_rank(end)?;
            let amount: f64 = amount
                .trim()
                .parse()
                .map_err(|e| LineupSimError::invalid_payout(number, format!("bad amount '{}': {e}", amount.trim())))?;

            if start == 0 || start > end {
                return Err(LineupSimError::invalid_payout(number, format!("invalid rank range {start}-{end}")));
            }
            if !(amount.is_finite() && amount >= 0.0) {
                return Err(LineupSimError::invalid_payout(number, format!("invalid amount {amount}")));
            }
            ranges.push(PayoutRange { start, end, amount });
        }
        Ok(Self { ranges })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let table = Self::parse(&std::fs::read_to_string(path)?)?;
        info!("Loaded {} payout ranges from {}", table.ranges.len(), path.display());
        Ok(table)
    }

    /// Payout table for a contest type; `Custom` needs a file
    pub fn for_contest(
        contest: ContestType,
        field_size: usize,
        entry_fee: f64,
        payouts_file: Option<&Path>,
    ) -> Result<Self> {
        match contest {
            ContestType::DoubleUp => Ok(Self::double_up(field_size, entry_fee)),
            ContestType::FiftyFifty => Ok(Self::fifty_fifty(field_size, entry_fee)),
            ContestType::FrontFour => Self::parse(FRONT_FOUR_PAYOUTS),
            ContestType::FlatGpp => Self::parse(FLAT_GPP_PAYOUTS),
            ContestType::TopHeavy => Self::parse(TOP_HEAVY_PAYOUTS),
            ContestType::Custom => match payouts_file {
                Some(path) => Self::load(path),
                None => Err(LineupSimError::invalid_config("custom contest needs a payout file")),
            },
        }
    }

    pub fn payout(&self, rank: usize) -> f64 {
        self.ranges.iter().rev().find(|r| (r.start..=r.end).contains(&rank)).map_or(0.0, |r| r.amount)
    }

    /// Number of distinct paid ranks
    pub fn paid_positions(&self) -> usize {
        self.segments().iter().map(|s| s.end - s.start + 1).sum()
    }

    pub fn prize_pool(&self) -> f64 {
        self.segments().iter().map(|s| s.amount * (s.end - s.start + 1) as f64).sum()
    }

    /// Disjoint sorted ranges, each paying what the last covering line says
    fn segments(&self) -> Vec<PayoutRange> {
        let mut bounds: Vec<usize> = self.ranges.iter().flat_map(|r| [r.start, r.end.saturating_add(1)]).collect();
        bounds.sort_unstable();
        bounds.dedup();

        bounds
            .windows(2)
            .filter_map(|w| {
                let (start, end) = (w[0], w[1] - 1);
                self.ranges
                    .iter()
                    .rev()
                    .find(|r| r.start <= start && start <= r.end)
                    .map(|r| PayoutRange { start, end, amount: r.amount })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_up_pays_top_share() {
        let table = PayoutTable::double_up(1_000, 5.0);
        assert_eq!(table.paid_positions(), 444);
        assert_eq!(table.payout(444), 9.0);
        assert_eq!(table.payout(445), 0.0);
    }

    #[test]
    fn test_fifty_fifty_pays_half() {
        let table = PayoutTable::fifty_fifty(11, 3.0);
        assert_eq!(table.paid_positions(), 5);
        assert!((table.payout(1) - 5.4).abs() < 1e-12);
    }

    #[test]
    fn test_parse_ranges() {
        let table = PayoutTable::parse("1-1:1000\n2-3:500\n\n6-7:125\n").unwrap();
        assert_eq!(table.payout(1), 1000.0);
        assert_eq!(table.payout(3), 500.0);
        assert_eq!(table.payout(5), 0.0);
        assert_eq!(table.payout(7), 125.0);
        assert_eq!(table.paid_positions(), 5);
        assert_eq!(table.prize_pool(), 2250.0);
    }

    #[test]
    fn test_later_range_wins_on_overlap() {
        let table = PayoutTable::parse("1-5:10\n3-3:99").unwrap();
        assert_eq!(table.payout(3), 99.0);
        assert_eq!(table.payout(4), 10.0);
        assert_eq!(table.paid_positions(), 5);
        assert_eq!(table.prize_pool(), 139.0);
    }

    #[test]
    fn test_huge_paid_range_is_summed_without_walking_ranks() {
        let table = PayoutTable::parse("1-4000000000:1\n2-2:10").unwrap();
        assert_eq!(table.paid_positions(), 4_000_000_000);
        assert_eq!(table.prize_pool(), 4_000_000_009.0);
        assert_eq!(table.payout(3_999_999_999), 1.0);
    }

    #[test]
    fn test_empty_table_pays_nothing() {
        let table = PayoutTable::cash_game(0, 5.4);
        assert_eq!(table.paid_positions(), 0);
        assert_eq!(table.prize_pool(), 0.0);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = PayoutTable::parse("1-1:100\n5:20").unwrap_err();
        assert!(matches!(err, LineupSimError::InvalidPayout { line: 2, .. }));
        assert!(PayoutTable::parse("3-1:10").is_err());
        assert!(PayoutTable::parse("0-1:10").is_err());
        assert!(PayoutTable::parse("1-1:abc").is_err());
    }

    #[test]
    fn test_presets_parse() {
        let front_four = PayoutTable::parse(FRONT_FOUR_PAYOUTS).unwrap();
        assert_eq!(front_four.paid_positions(), 3091);
        assert_eq!(front_four.payout(1), 4000.0);
        assert_eq!(PayoutTable::parse(FLAT_GPP_PAYOUTS).unwrap().paid_positions(), 765);
        assert_eq!(PayoutTable::parse(TOP_HEAVY_PAYOUTS).unwrap().paid_positions(), 20080);
    }

    #[test]
    fn test_custom_contest_requires_file() {
        assert!(PayoutTable::for_contest(ContestType::Custom, 100, 3.0, None).is_err());
        assert_eq!("50/50".parse::<ContestType>().unwrap(), ContestType::FiftyFifty);
    }
}
