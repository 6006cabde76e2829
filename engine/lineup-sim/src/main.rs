use anyhow::{bail, Context};
use clap::Parser;
use lineup_sim::environment::{load_game_lines, load_team_defense, load_team_offense};
use lineup_sim::lineups::load_lineups;
use lineup_sim::{ContestSimulator, ContestType, LineupSimConfig, PayoutTable, PlayerPool, SimMode, TeamEnvironment};
use roo_engine::logging::{initialize_logging, initialize_logging_with_config, is_valid_level};
use roo_engine::output::read_projections;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info};

/// Correlated DFS lineup contest simulator
#[derive(Parser)]
#[command(name = "lineup-sim")]
#[command(about = "Simulate NFL DFS lineups against an ownership-weighted field")]
struct Cli {
    /// ROO projection artifact written by roo-engine
    #[arg(long, default_value = "./data/roo_projections.csv")]
    roo: PathBuf,

    /// Matchup table with game lines and efficiency metrics
    #[arg(long, default_value = "./data/Matchup.csv")]
    matchups: PathBuf,

    /// DraftKings lineup export
    #[arg(long)]
    lineups: PathBuf,

    /// Team offense tendencies (Avg Pass Att, Avg Rush Att, ...)
    #[arg(long)]
    team_offense: Option<PathBuf>,

    /// Yardage allowed by each defense
    #[arg(long)]
    team_defense: Option<PathBuf>,

    /// Simulation preset (quick, standard, deep)
    #[arg(long, default_value = "standard")]
    mode: SimMode,

    /// Override the number of simulations
    #[arg(long)]
    simulations: Option<usize>,

    /// Entries in the real contest
    #[arg(long)]
    field_size: Option<usize>,

    #[arg(long)]
    entry_fee: Option<f64>,

    /// Payout structure (double-up, fifty-fifty, front-four, flat-gpp, top-heavy, payouts)
    #[arg(long, default_value = "double-up")]
    contest: ContestType,

    /// Payout ranges as `start-end:amount` lines, used with `--contest payouts`
    #[arg(long)]
    payouts: Option<PathBuf>,

    /// Std of simulated game totals
    #[arg(long)]
    total_sd: Option<f64>,

    /// Std of simulated spreads
    #[arg(long)]
    spread_sd: Option<f64>,

    /// Weight of matchup strength when splitting game totals
    #[arg(long)]
    alpha: Option<f64>,

    /// Score players independently
    #[arg(long)]
    no_correlations: bool,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Per-lineup results CSV
    #[arg(short, long, default_value = "./data/lineup_sim_results.csv")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG applies when omitted
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (default, pretty, compact, json)
    #[arg(long, default_value = "default")]
    log_format: String,

    /// Also write the full results as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Cli {
    fn sim_config(&self) -> anyhow::Result<LineupSimConfig> {
        let mut config =
            LineupSimConfig::load(self.mode, self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(n) = self.simulations {
            config.n_simulations = n;
        }
        if let Some(field_size) = self.field_size {
            config.field_size = field_size;
        }
        if let Some(fee) = self.entry_fee {
            config.entry_fee = fee;
        }
        if let Some(sd) = self.total_sd {
            config.environment.total_sd = sd;
        }
        if let Some(sd) = self.spread_sd {
            config.environment.spread_sd = sd;
        }
        if let Some(alpha) = self.alpha {
            config.environment.alpha_matchup = alpha;
        }
        if self.no_correlations {
            config.use_correlations = false;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.log_level.as_deref() {
        None if cli.log_format == "default" => initialize_logging()?,
        level => {
            let level = level.unwrap_or("info");
            if !is_valid_level(level) {
                bail!("Unknown log level '{}'", level);
            }
            initialize_logging_with_config(level, &cli.log_format)?;
        }
    }

    println!("🏈 DFS lineup contest simulator starting...");
    let config = cli.sim_config()?;
    info!(
        "Configuration: {} mode, {} simulations, seed {}, field {} at ${:.2}, correlations {}",
        cli.mode,
        config.n_simulations,
        config.seed,
        config.field_size,
        config.entry_fee,
        if config.use_correlations { "on" } else { "off" }
    );

    println!("📋 Loading projections, matchups and lineups...");
    let rows = read_projections(&cli.roo).with_context(|| format!("Failed to read {}", cli.roo.display()))?;
    let pool = PlayerPool::from_rows(&rows, &config)?;

    let lines = load_game_lines(&cli.matchups).with_context(|| format!("Failed to read {}", cli.matchups.display()))?;
    let offense = match &cli.team_offense {
        Some(path) => load_team_offense(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => HashMap::new(),
    };
    let defense = match &cli.team_defense {
        Some(path) => load_team_defense(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => HashMap::new(),
    };
    let env = TeamEnvironment::new(&lines, &offense, &defense, &config.environment);

    let lineups = load_lineups(&cli.lineups).with_context(|| format!("Failed to read {}", cli.lineups.display()))?;
    let payouts = PayoutTable::for_contest(cli.contest, config.field_size, config.entry_fee, cli.payouts.as_deref())?;
    info!(
        "{} contest: {} paid positions, ${:.2} prize pool",
        cli.contest,
        payouts.paid_positions(),
        payouts.prize_pool()
    );

    let simulator = ContestSimulator::new(&pool, &env, &payouts, &config)?;
    let results = match simulator.run(&lineups) {
        Ok(results) => results,
        Err(e) => {
            error!("❌ Contest simulation failed: {}", e);
            return Err(e.into());
        }
    };

    results.write_csv(&cli.output).with_context(|| format!("Failed to write {}", cli.output.display()))?;
    println!("✅ Saved results for {} lineups to {}", results.lineups.len(), cli.output.display());

    if let Some(path) = &cli.summary_json {
        results.write_json(path).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("📝 Wrote results JSON to {}", path.display());
    }

    println!("\n📊 SUMMARY ({} simulations, {} field lineups)", results.n_simulations, results.field_lineups);
    for lineup in &results.lineups {
        println!("\n{}: {}", lineup.lineup, lineup.players);
        println!("  Mean Score: {:.2}", lineup.mean_score);
        println!("  Mean Profit: ${:.2} (ROI {:.1}%)", lineup.mean_profit, lineup.roi);
        println!("  Cash: {:.1}%", lineup.cash_pct);
        println!(
            "  Top 10% / 1% / 0.1%: {:.1}% / {:.1}% / {:.2}%",
            lineup.top10_pct, lineup.top1_pct, lineup.top01_pct
        );
        println!("  Profit Range: ${:.2} to ${:.2}", lineup.min_profit, lineup.max_profit);
    }

    println!("\n🎉 Contest simulation complete!");
    Ok(())
}
