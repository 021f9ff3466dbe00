// src/evaluator/mod.rs — Scoring engine
//
// Steps 1-3 (call, parse, composite) run without touching storage; only a
// fully parsed ScoreCard is written. Failures are returned to the caller,
// which logs them and treats the session as simply unscored.

pub mod judge;
pub mod parser;

use std::sync::Arc;
use std::time::Duration;

use crate::core::types::{ScoreCard, TranscriptMessage};
use crate::infra::config::ScoringConfig;
use crate::infra::errors::ScoringError;
use crate::provider::ModelProvider;
use crate::store::StoreHandle;

/// Composite weights, in tenths: substance 0.5, clarity 0.3, grammar 0.2.
const SUBSTANCE_WEIGHT: u32 = 5;
const CLARITY_WEIGHT: u32 = 3;
const GRAMMAR_WEIGHT: u32 = 2;

/// `round(0.5·substance + 0.3·clarity + 0.2·grammar)`, half rounding up.
pub fn composite_score(clarity: u8, grammar: u8, substance: u8) -> u8 {
    let tenths = SUBSTANCE_WEIGHT * substance as u32
        + CLARITY_WEIGHT * clarity as u32
        + GRAMMAR_WEIGHT * grammar as u32;
    ((tenths + 5) / 10) as u8
}

/// What a successful scoring run wrote.
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub card: ScoreCard,
    /// False when the session row is missing or holds a manual score.
    pub session_updated: bool,
}

pub struct ScoringEngine {
    provider: Arc<dyn ModelProvider>,
    store: StoreHandle,
    model: String,
    timeout: Duration,
    reason_max_chars: usize,
}

impl ScoringEngine {
    pub fn new(provider: Arc<dyn ModelProvider>, store: StoreHandle, config: &ScoringConfig) -> Self {
        Self {
            provider,
            store,
            model: config.model.clone(),
            timeout: config.timeout(),
            reason_max_chars: config.reason_max_chars,
        }
    }

    /// Call the scoring service and parse its reply. No side effects.
    pub async fn assess(&self, messages: &[TranscriptMessage]) -> Result<ScoreCard, ScoringError> {
        let request = judge::build_request(&self.model, messages);
        let response = judge::request_scores(self.provider.as_ref(), request, self.timeout).await?;
        tracing::debug!(
            "Scoring service used {} tokens ({})",
            response.usage.total(),
            self.provider.id()
        );
        parser::parse_score_response(&response.content, self.reason_max_chars)
    }

    /// Assess, upsert the ScoreDetail row, then fold the composite into the session.
    pub async fn score_conversation(
        &self,
        conversation_id: &str,
        messages: &[TranscriptMessage],
    ) -> Result<ScoringOutcome, ScoringError> {
        let card = self.assess(messages).await?;

        self.store
            .upsert_score_detail(conversation_id, card.clone())
            .await
            .map_err(|e| ScoringError::Store(e.to_string()))?;

        let session_updated = self
            .store
            .apply_auto_score(conversation_id, card.weighted_score)
            .await
            .map_err(|e| ScoringError::Store(e.to_string()))?;

        if !session_updated {
            tracing::info!(
                "Score detail stored for {conversation_id}; session score left unchanged \
                 (no session row or manual score present)"
            );
        }

        Ok(ScoringOutcome {
            card,
            session_updated,
        })
    }
}
