//! NFL team code resolution
//!
//! Efficiency and PROE sources spell teams by nickname ("Bills") while slates
//! use abbreviations ("BUF"). Everything inside the engine keys teams by the
//! canonical abbreviation.

/// Abbreviation and nickname for every NFL team
pub const NFL_TEAMS: [(&str, &str); 32] = [
    ("ARI", "Cardinals"),
    ("ATL", "Falcons"),
    ("BAL", "Ravens"),
    ("BUF", "Bills"),
    ("CAR", "Panthers"),
    ("CHI", "Bears"),
    ("CIN", "Bengals"),
    ("CLE", "Browns"),
    ("DAL", "Cowboys"),
    ("DEN", "Broncos"),
    ("DET", "Lions"),
    ("GB", "Packers"),
    ("HOU", "Texans"),
    ("IND", "Colts"),
    ("JAX", "Jaguars"),
    ("KC", "Chiefs"),
    ("LAC", "Chargers"),
    ("LAR", "Rams"),
    ("LV", "Raiders"),
    ("MIA", "Dolphins"),
    ("MIN", "Vikings"),
    ("NE", "Patriots"),
    ("NO", "Saints"),
    ("NYG", "Giants"),
    ("NYJ", "Jets"),
    ("PHI", "Eagles"),
    ("PIT", "Steelers"),
    ("SEA", "Seahawks"),
    ("SF", "49ers"),
    ("TB", "Buccaneers"),
    ("TEN", "Titans"),
    ("WAS", "Commanders"),
];

/// Resolve an abbreviation or nickname to the canonical abbreviation
///
/// Unknown spellings are returned trimmed and upper-cased so that two sources
/// using the same unknown code still join.
pub fn canonical_team(name: &str) -> String {
    let trimmed = name.trim();
    NFL_TEAMS
        .iter()
        .find(|(abbrev, nickname)| {
            abbrev.eq_ignore_ascii_case(trimmed) || nickname.eq_ignore_ascii_case(trimmed)
        })
        .map(|(abbrev, _)| (*abbrev).to_string())
        .unwrap_or_else(|| trimmed.to_uppercase())
}
