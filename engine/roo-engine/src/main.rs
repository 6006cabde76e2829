use anyhow::{bail, Context};
use clap::Parser;
use roo_engine::logging::{initialize_logging, initialize_logging_with_config, is_valid_level};
use roo_engine::output::write_projections;
use roo_engine::{InputPaths, RooConfig, RooEngine, RooInputs};
use std::path::PathBuf;
use tracing::{error, info};

/// NFL DFS range-of-outcomes simulator
#[derive(Parser)]
#[command(name = "roo-engine")]
#[command(about = "Monte Carlo floor/median/ceiling projections for an NFL DFS slate")]
struct Cli {
    /// Directory holding the conventional input files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Historical weekly stats (defaults to <data-dir>/Weekly_Stats.csv)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Historical DST stats
    #[arg(long)]
    dst_history: Option<PathBuf>,

    /// Slate with salaries and median projections
    #[arg(long)]
    slate: Option<PathBuf>,

    /// Matchup and efficiency table
    #[arg(long)]
    matchups: Option<PathBuf>,

    /// Weekly pass rate over expectation
    #[arg(long)]
    proe: Option<PathBuf>,

    /// Player name mapping across sources
    #[arg(long)]
    name_map: Option<PathBuf>,

    /// Output projection CSV (defaults to <data-dir>/roo_projections.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of simulations
    #[arg(long)]
    simulations: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Use the wider 3.0-25.0 std bounds
    #[arg(long)]
    wide_std: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG applies when omitted
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (default, pretty, compact, json)
    #[arg(long, default_value = "default")]
    log_format: String,

    /// Also write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Cli {
    fn input_paths(&self) -> InputPaths {
        let defaults = InputPaths::in_dir(&self.data_dir);
        InputPaths {
            history: self.history.clone().unwrap_or(defaults.history),
            dst_history: self.dst_history.clone().or(defaults.dst_history),
            slate: self.slate.clone().unwrap_or(defaults.slate),
            matchups: self.matchups.clone().unwrap_or(defaults.matchups),
            proe: self.proe.clone().or(defaults.proe),
            name_map: self.name_map.clone().or(defaults.name_map),
        }
    }

    fn roo_config(&self) -> anyhow::Result<RooConfig> {
        let mut config = RooConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if self.wide_std {
            config.volatility.max_std = RooConfig::wide_std().volatility.max_std;
        }
        if let Some(n) = self.simulations {
            config.simulation.n_simulations = n;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
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

    println!("🏈 NFL DFS Range-of-Outcomes engine starting...");
    let config = cli.roo_config()?;
    info!(
        "Configuration: {} simulations, seed {}, std bounds [{}, {}]",
        config.simulation.n_simulations, config.simulation.seed, config.volatility.min_std, config.volatility.max_std
    );

    let paths = cli.input_paths();
    println!("📋 Loading input tables...");
    let inputs = RooInputs::load(&paths)
        .with_context(|| format!("Failed to load inputs from {}", cli.data_dir.display()))?;

    let engine = RooEngine::new(config)?;
    let run = match engine.run(&inputs) {
        Ok(run) => run,
        Err(e) => {
            error!("❌ ROO simulation failed: {}", e);
            return Err(e.into());
        }
    };

    let output = cli.output.clone().unwrap_or_else(|| cli.data_dir.join("roo_projections.csv"));
    write_projections(&output, &run.rows()).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("✅ Saved {} projections to {}", run.projections.len(), output.display());

    if let Some(path) = &cli.summary_json {
        run.summary.write_json(path).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("📝 Wrote run summary to {}", path.display());
    }

    println!("\n📊 SUMMARY");
    for position in &run.summary.positions {
        println!("\n{}:", position.position);
        println!("  Count: {}", position.count);
        println!("  Avg Ceiling: {:.1}", position.avg_ceiling);
        println!("  Max Ceiling: {:.1} ({})", position.max_ceiling, position.max_ceiling_player);
        println!("  Avg Floor: {:.1}", position.avg_floor);
        println!("  Avg Volatility Index: {:.2}", position.avg_volatility_index);
    }
    if run.fallback_players > 0 {
        println!("\n⚠️ {} players used position-average volatility", run.fallback_players);
    }

    println!("\n🎉 ROO simulation complete!");
    Ok(())
}
