use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use leverage_lag::config::{Config, LoggingConfig};
use leverage_lag::report::{render_header, render_run_footer, render_session};
use leverage_lag::session::{run_session, SessionAnalyzer, SessionOutcome};

#[derive(Debug, Parser)]
#[clap(name = "leverage-lag", version)]
struct Cli {
    /// Path to the TOML config (defaults to config/default.toml if present)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Session dates to analyse (YYYYMMDD); overrides data.dates
    #[clap(long = "date")]
    dates: Vec<String>,

    /// Print session reports as JSON instead of text
    #[clap(long)]
    json: bool,
}

fn init_tracing(cfg: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        cfg.level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&cfg.file, cfg.json) {
        (Some(path), json) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let builder = builder
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        (None, true) => builder.with_writer(std::io::stderr).json().init(),
        (None, false) => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };
    if !cli.dates.is_empty() {
        config.data.dates = cli.dates.clone();
        config.validate().context("invalid --date")?;
    }

    init_tracing(&config.logging)?;
    tracing::info!(
        reference = %config.instruments.reference,
        derived = config.instruments.derived.len(),
        dates = config.data.dates.len(),
        data_dir = %config.data.dir.display(),
        "Starting leverage-lag"
    );

    let analyzer = SessionAnalyzer::from_config(&config);
    let outcomes: Vec<SessionOutcome> = config
        .data
        .dates
        .iter()
        .map(|date| run_session(&config, &analyzer, date))
        .collect();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcomes).context("failed to serialise report")?
        );
        return Ok(());
    }

    print!("{}", render_header());
    for outcome in &outcomes {
        print!("{}", render_session(outcome, &config));
    }
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, SessionOutcome::Skipped { .. }))
        .count();
    print!("{}", render_run_footer(outcomes.len() - skipped, skipped));
    Ok(())
}
