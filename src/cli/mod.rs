// src/cli/mod.rs — CLI definition (clap derive)

pub mod interview;
pub mod score;
pub mod serve;
pub mod show;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::evaluator::ScoringEngine;
use crate::infra::config::Config;
use crate::provider::openai::OpenAIProvider;
use crate::store::{self, StoreHandle};

#[derive(Parser)]
#[command(name = "rehearsal", about = "AI mock-interview sessions with transcript scoring", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server that receives transcripts
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one interview session from the terminal
    Interview {
        /// Interview category, e.g. "software engineering"
        #[arg(long)]
        category: String,
        /// Human-readable session name
        #[arg(long)]
        name: String,
        /// Expected length in minutes
        #[arg(long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..))]
        duration: u32,
        /// Text file with a CV summary to give the interviewer
        #[arg(long)]
        cv: Option<PathBuf>,
    },
    /// Print a stored session with its transcript and score detail
    Show { session_id: String },
    /// Manual scoring
    Score {
        #[command(subcommand)]
        action: ScoreAction,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum ScoreAction {
    /// Set a session's score by hand; automatic scoring will not replace it
    Set {
        session_id: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        value: u8,
    },
    /// Score a stored transcript again
    Rerun { conversation_id: String },
}

/// Exit status for failures that may clear up on a plain re-run (`EX_TEMPFAIL`).
pub const EXIT_TEMPORARY: i32 = 75;

/// A command failed for a transient reason; running it again may succeed.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TemporaryFailure(pub String);

/// Process exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<TemporaryFailure>().is_some() {
        EXIT_TEMPORARY
    } else {
        1
    }
}

/// Open the configured database and start its store task.
pub fn open_store(config: &Config) -> anyhow::Result<StoreHandle> {
    let path = config.database.resolved_path();
    tracing::debug!("Opening database at {}", path.display());
    let store = store::open(&path)?;
    let (handle, _task) = store::spawn_store_server(store);
    Ok(handle)
}

/// Scoring engine for the configured service, if scoring is enabled and has credentials.
pub fn scoring_engine(config: &Config, store: StoreHandle) -> Option<Arc<ScoringEngine>> {
    let scoring = &config.scoring;
    if !scoring.enabled {
        tracing::info!("Scoring disabled in config");
        return None;
    }
    let Some(api_key) = scoring.resolved_api_key() else {
        tracing::warn!("Scoring enabled but no API key set (OPENAI_API_KEY); transcripts will not be scored");
        return None;
    };
    let provider = Arc::new(OpenAIProvider::with_base_url(api_key, scoring.base_url.clone()));
    Some(Arc::new(ScoringEngine::new(provider, store, scoring)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interview() {
        let cli = Cli::try_parse_from([
            "rehearsal",
            "interview",
            "--category",
            "sales",
            "--name",
            "Mock 1",
        ])
        .unwrap();
        match cli.command {
            Commands::Interview { duration, cv, .. } => {
                assert_eq!(duration, 15);
                assert!(cv.is_none());
            }
            _ => panic!("expected interview"),
        }
    }

    #[test]
    fn test_interview_duration_must_be_positive() {
        let parse = |d: &'static str| {
            Cli::try_parse_from([
                "rehearsal", "interview", "--category", "sales", "--name", "Mock", "--duration", d,
            ])
        };
        assert!(parse("0").is_err());
        match parse("1").unwrap().command {
            Commands::Interview { duration, .. } => assert_eq!(duration, 1),
            _ => panic!("expected interview"),
        }
    }

    #[test]
    fn test_exit_code_for_temporary_failure() {
        let temporary = anyhow::Error::from(TemporaryFailure("provider returned 503".into()));
        assert_eq!(exit_code(&temporary), EXIT_TEMPORARY);
        assert_eq!(exit_code(&anyhow::anyhow!("bad key")), 1);
        let wrapped = temporary.context("interview could not start");
        assert_eq!(exit_code(&wrapped), EXIT_TEMPORARY);
    }

    #[test]
    fn test_score_set_range_checked() {
        assert!(Cli::try_parse_from(["rehearsal", "score", "set", "s-1", "100"]).is_ok());
        assert!(Cli::try_parse_from(["rehearsal", "score", "set", "s-1", "101"]).is_err());
    }

    #[tokio::test]
    async fn test_scoring_engine_disabled() {
        let mut config = Config::default();
        config.scoring.enabled = false;
        let (handle, _) = store::spawn_store_server(store::open_in_memory().unwrap());
        assert!(scoring_engine(&config, handle).is_none());
    }

    #[tokio::test]
    async fn test_scoring_engine_needs_key() {
        let mut config = Config::default();
        config.scoring.api_key = Some("sk-test".into());
        let (handle, _) = store::spawn_store_server(store::open_in_memory().unwrap());
        assert!(scoring_engine(&config, handle).is_some());
    }
}
