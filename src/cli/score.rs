// src/cli/score.rs — Manual score commands

use super::{ScoreAction, TemporaryFailure};
use crate::infra::config::Config;

pub async fn run_score(config: &Config, action: ScoreAction) -> anyhow::Result<()> {
    let store = super::open_store(config)?;
    match action {
        ScoreAction::Set { session_id, value } => {
            if !store.set_manual_score(&session_id, value).await? {
                anyhow::bail!("No session with id {session_id}");
            }
            println!("Session {session_id} score set to {value} (manual)");
        }
        ScoreAction::Rerun { conversation_id } => {
            let engine = super::scoring_engine(config, store.clone())
                .ok_or_else(|| anyhow::anyhow!("Scoring is disabled or has no API key"))?;
            let transcript = store
                .get_transcript(&conversation_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No transcript stored for {conversation_id}"))?;
            let outcome = engine
                .score_conversation(&conversation_id, &transcript.messages)
                .await
                .map_err(|e| {
                    if e.is_retriable() {
                        TemporaryFailure(format!("scoring {conversation_id} failed: {e}")).into()
                    } else {
                        anyhow::Error::from(e)
                    }
                })?;
            println!(
                "Scored {conversation_id}: {} (substance {}, clarity {}, grammar {})",
                outcome.card.weighted_score,
                outcome.card.substance.score,
                outcome.card.clarity.score,
                outcome.card.grammar.score
            );
            if !outcome.session_updated {
                println!("Session score left unchanged (manual score or no session row)");
            }
        }
    }
    Ok(())
}
