// src/store/store.rs — SQLite operations
//
// Each writer owns disjoint session columns; every status update is
// conditional on the legal prior status so an out-of-order call touches
// zero rows instead of rewinding the lifecycle.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::core::types::{
    ScoreCard, ScoreSource, SessionStatus, SubScore, TranscriptCounts, TranscriptMessage,
};

/// Low-level SQLite operations for sessions, transcripts and score details.
pub struct Store {
    conn: Connection,
}

/// Values fixed at session creation.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub conversation_id: String,
    pub category: String,
    pub name: String,
    pub expected_duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub conversation_id: Option<String>,
    pub category: String,
    pub name: String,
    pub expected_duration_minutes: i64,
    pub actual_duration_minutes: Option<i64>,
    pub questions_answered: Option<i64>,
    pub score: Option<i64>,
    pub score_source: Option<ScoreSource>,
    pub status: SessionStatus,
    pub end_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRow {
    pub conversation_id: String,
    pub messages: Vec<TranscriptMessage>,
    pub counts: TranscriptCounts,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDetailRow {
    pub conversation_id: String,
    pub card: ScoreCard,
    pub created_at: String,
    pub updated_at: String,
}

const SESSION_COLUMNS: &str = "id, conversation_id, category, name, expected_duration_minutes,
     actual_duration_minutes, questions_answered, score, score_source, status, end_reason,
     created_at, updated_at, completed_at";

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    let status: String = row.get(9)?;
    let source: Option<String> = row.get(8)?;
    Ok(SessionRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        category: row.get(2)?,
        name: row.get(3)?,
        expected_duration_minutes: row.get(4)?,
        actual_duration_minutes: row.get(5)?,
        questions_answered: row.get(6)?,
        score: row.get(7)?,
        score_source: source.as_deref().and_then(ScoreSource::parse),
        status: status.parse().map_err(|e| conversion_error(9, e))?,
        end_reason: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        completed_at: row.get(13)?,
    })
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Raw connection access (used by tests and diagnostics).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // -- Sessions --

    pub fn insert_session(&self, new: &NewSession) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (id, conversation_id, category, name,
             expected_duration_minutes, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'created', ?6, ?6)",
            params![
                new.id,
                new.conversation_id,
                new.category,
                new.name,
                new.expected_duration_minutes,
                now
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> anyhow::Result<Option<SessionRow>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id], session_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn get_session_by_conversation(
        &self,
        conversation_id: &str,
    ) -> anyhow::Result<Option<SessionRow>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE conversation_id = ?1");
        let row = self
            .conn
            .query_row(&sql, [conversation_id], session_from_row)
            .optional()?;
        Ok(row)
    }

    /// `created → active`. Returns false when the row was not in `created`.
    pub fn mark_session_active(&self, id: &str) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET status = 'active', updated_at = ?1
             WHERE id = ?2 AND status = 'created'",
            params![now, id],
        )?;
        Ok(n == 1)
    }

    /// `active → completed`, writing duration, end reason and `completed_at` once.
    pub fn complete_session(
        &self,
        id: &str,
        actual_duration_minutes: u32,
        end_reason: &str,
    ) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET status = 'completed', actual_duration_minutes = ?1,
             end_reason = ?2, completed_at = ?3, updated_at = ?3
             WHERE id = ?4 AND status = 'active'",
            params![actual_duration_minutes, end_reason, now, id],
        )?;
        Ok(n == 1)
    }

    /// `created → cancelled`.
    pub fn cancel_session(&self, id: &str) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET status = 'cancelled', updated_at = ?1
             WHERE id = ?2 AND status = 'created'",
            params![now, id],
        )?;
        Ok(n == 1)
    }

    /// Ingestor-owned column; written regardless of session status.
    pub fn update_questions_answered(
        &self,
        conversation_id: &str,
        questions_answered: u32,
    ) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET questions_answered = ?1, updated_at = ?2
             WHERE conversation_id = ?3",
            params![questions_answered, now, conversation_id],
        )?;
        Ok(n == 1)
    }

    /// Scoring-engine write. Never replaces a manual score.
    pub fn apply_auto_score(&self, conversation_id: &str, score: u8) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET score = ?1, score_source = 'auto', updated_at = ?2
             WHERE conversation_id = ?3
               AND (score_source IS NULL OR score_source = 'auto')",
            params![score, now, conversation_id],
        )?;
        Ok(n == 1)
    }

    /// Manual override path. Always wins.
    pub fn set_manual_score(&self, session_id: &str, score: u8) -> anyhow::Result<bool> {
        let now = Utc::now().to_rfc3339();
        let n = self.conn.execute(
            "UPDATE sessions SET score = ?1, score_source = 'manual', updated_at = ?2
             WHERE id = ?3",
            params![score, now, session_id],
        )?;
        Ok(n == 1)
    }

    // -- Transcripts --

    /// Upsert by conversation id. A redelivery with identical content leaves
    /// the row untouched, including `updated_at`.
    pub fn upsert_transcript(
        &self,
        conversation_id: &str,
        messages: &[TranscriptMessage],
    ) -> anyhow::Result<TranscriptCounts> {
        let counts = TranscriptCounts::from_messages(messages);
        let json = serde_json::to_string(messages)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO transcripts (conversation_id, messages_json, message_count,
             user_message_count, assistant_message_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(conversation_id) DO UPDATE SET
               messages_json = excluded.messages_json,
               message_count = excluded.message_count,
               user_message_count = excluded.user_message_count,
               assistant_message_count = excluded.assistant_message_count,
               updated_at = CASE WHEN transcripts.messages_json = excluded.messages_json
                                 THEN transcripts.updated_at ELSE excluded.updated_at END",
            params![
                conversation_id,
                json,
                counts.message_count,
                counts.user_message_count,
                counts.assistant_message_count,
                now
            ],
        )?;
        Ok(counts)
    }

    pub fn get_transcript(&self, conversation_id: &str) -> anyhow::Result<Option<TranscriptRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT conversation_id, messages_json, message_count, user_message_count,
                 assistant_message_count, created_at, updated_at
                 FROM transcripts WHERE conversation_id = ?1",
                [conversation_id],
                |row| {
                    let json: String = row.get(1)?;
                    let messages: Vec<TranscriptMessage> = serde_json::from_str(&json)
                        .map_err(|e| conversion_error(1, e.to_string()))?;
                    Ok(TranscriptRow {
                        conversation_id: row.get(0)?,
                        messages,
                        counts: TranscriptCounts {
                            message_count: row.get(2)?,
                            user_message_count: row.get(3)?,
                            assistant_message_count: row.get(4)?,
                        },
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // -- Score details --

    pub fn upsert_score_detail(&self, conversation_id: &str, card: &ScoreCard) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO score_details (conversation_id, clarity_score, clarity_reason,
             grammar_score, grammar_reason, substance_score, substance_reason,
             weighted_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(conversation_id) DO UPDATE SET
               clarity_score = excluded.clarity_score,
               clarity_reason = excluded.clarity_reason,
               grammar_score = excluded.grammar_score,
               grammar_reason = excluded.grammar_reason,
               substance_score = excluded.substance_score,
               substance_reason = excluded.substance_reason,
               weighted_score = excluded.weighted_score,
               updated_at = excluded.updated_at",
            params![
                conversation_id,
                card.clarity.score,
                card.clarity.reason,
                card.grammar.score,
                card.grammar.reason,
                card.substance.score,
                card.substance.reason,
                card.weighted_score,
                now
            ],
        )?;
        Ok(())
    }

    pub fn get_score_detail(&self, conversation_id: &str) -> anyhow::Result<Option<ScoreDetailRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT conversation_id, clarity_score, clarity_reason, grammar_score,
                 grammar_reason, substance_score, substance_reason, weighted_score,
                 created_at, updated_at
                 FROM score_details WHERE conversation_id = ?1",
                [conversation_id],
                |row| {
                    Ok(ScoreDetailRow {
                        conversation_id: row.get(0)?,
                        card: ScoreCard {
                            clarity: SubScore {
                                score: row.get(1)?,
                                reason: row.get(2)?,
                            },
                            grammar: SubScore {
                                score: row.get(3)?,
                                reason: row.get(4)?,
                            },
                            substance: SubScore {
                                score: row.get(5)?,
                                reason: row.get(6)?,
                            },
                            weighted_score: row.get(7)?,
                        },
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
