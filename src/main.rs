// src/main.rs — Rehearsal entry point

use clap::Parser;

use rehearsal::cli::interview::InterviewArgs;
use rehearsal::cli::{Cli, Commands};
use rehearsal::infra::config::Config;
use rehearsal::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The server is long-running and worth watching; CLI commands stay quiet
    let level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    logger::init_logging(level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(rehearsal::cli::exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Serve { port } => rehearsal::cli::serve::run_serve(&config, port).await,
        Commands::Interview {
            category,
            name,
            duration,
            cv,
        } => {
            rehearsal::cli::interview::run_interview(
                &config,
                InterviewArgs {
                    category,
                    name,
                    duration,
                    cv,
                },
            )
            .await
        }
        Commands::Show { session_id } => rehearsal::cli::show::run_show(&config, &session_id).await,
        Commands::Score { action } => rehearsal::cli::score::run_score(&config, action).await,
    }
}
