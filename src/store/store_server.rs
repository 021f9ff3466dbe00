// src/store/store_server.rs — Async message passing for Store
//
// The Store owns a non-Sync rusqlite connection, so a single background task
// holds it and async callers talk to it through a cloneable StoreHandle.

use crate::core::types::{ScoreCard, TranscriptCounts, TranscriptMessage};
use crate::store::store::{NewSession, ScoreDetailRow, SessionRow, Store, TranscriptRow};
use tokio::sync::{mpsc, oneshot};

type Reply<T> = oneshot::Sender<anyhow::Result<T>>;

#[derive(Debug)]
pub enum StoreCommand {
    InsertSession {
        session: NewSession,
        resp: Reply<()>,
    },
    GetSession {
        id: String,
        resp: Reply<Option<SessionRow>>,
    },
    GetSessionByConversation {
        conversation_id: String,
        resp: Reply<Option<SessionRow>>,
    },
    MarkSessionActive {
        id: String,
        resp: Reply<bool>,
    },
    CompleteSession {
        id: String,
        actual_duration_minutes: u32,
        end_reason: String,
        resp: Reply<bool>,
    },
    CancelSession {
        id: String,
        resp: Reply<bool>,
    },
    UpdateQuestionsAnswered {
        conversation_id: String,
        questions_answered: u32,
        resp: Reply<bool>,
    },
    ApplyAutoScore {
        conversation_id: String,
        score: u8,
        resp: Reply<bool>,
    },
    SetManualScore {
        session_id: String,
        score: u8,
        resp: Reply<bool>,
    },
    UpsertTranscript {
        conversation_id: String,
        messages: Vec<TranscriptMessage>,
        resp: Reply<TranscriptCounts>,
    },
    GetTranscript {
        conversation_id: String,
        resp: Reply<Option<TranscriptRow>>,
    },
    UpsertScoreDetail {
        conversation_id: String,
        card: ScoreCard,
        resp: Reply<()>,
    },
    GetScoreDetail {
        conversation_id: String,
        resp: Reply<Option<ScoreDetailRow>>,
    },
}

/// A handle to the Store that uses message passing.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> anyhow::Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx.send(build(resp_tx)).await?;
        resp_rx.await?
    }

    pub async fn insert_session(&self, session: NewSession) -> anyhow::Result<()> {
        self.request(|resp| StoreCommand::InsertSession { session, resp })
            .await
    }

    pub async fn get_session(&self, id: &str) -> anyhow::Result<Option<SessionRow>> {
        let id = id.to_string();
        self.request(|resp| StoreCommand::GetSession { id, resp })
            .await
    }

    pub async fn get_session_by_conversation(
        &self,
        conversation_id: &str,
    ) -> anyhow::Result<Option<SessionRow>> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::GetSessionByConversation {
            conversation_id,
            resp,
        })
        .await
    }

    pub async fn mark_session_active(&self, id: &str) -> anyhow::Result<bool> {
        let id = id.to_string();
        self.request(|resp| StoreCommand::MarkSessionActive { id, resp })
            .await
    }

    pub async fn complete_session(
        &self,
        id: &str,
        actual_duration_minutes: u32,
        end_reason: &str,
    ) -> anyhow::Result<bool> {
        let id = id.to_string();
        let end_reason = end_reason.to_string();
        self.request(|resp| StoreCommand::CompleteSession {
            id,
            actual_duration_minutes,
            end_reason,
            resp,
        })
        .await
    }

    pub async fn cancel_session(&self, id: &str) -> anyhow::Result<bool> {
        let id = id.to_string();
        self.request(|resp| StoreCommand::CancelSession { id, resp })
            .await
    }

    pub async fn update_questions_answered(
        &self,
        conversation_id: &str,
        questions_answered: u32,
    ) -> anyhow::Result<bool> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::UpdateQuestionsAnswered {
            conversation_id,
            questions_answered,
            resp,
        })
        .await
    }

    pub async fn apply_auto_score(&self, conversation_id: &str, score: u8) -> anyhow::Result<bool> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::ApplyAutoScore {
            conversation_id,
            score,
            resp,
        })
        .await
    }

    pub async fn set_manual_score(&self, session_id: &str, score: u8) -> anyhow::Result<bool> {
        let session_id = session_id.to_string();
        self.request(|resp| StoreCommand::SetManualScore {
            session_id,
            score,
            resp,
        })
        .await
    }

    pub async fn upsert_transcript(
        &self,
        conversation_id: &str,
        messages: Vec<TranscriptMessage>,
    ) -> anyhow::Result<TranscriptCounts> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::UpsertTranscript {
            conversation_id,
            messages,
            resp,
        })
        .await
    }

    pub async fn get_transcript(&self, conversation_id: &str) -> anyhow::Result<Option<TranscriptRow>> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::GetTranscript {
            conversation_id,
            resp,
        })
        .await
    }

    pub async fn upsert_score_detail(
        &self,
        conversation_id: &str,
        card: ScoreCard,
    ) -> anyhow::Result<()> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::UpsertScoreDetail {
            conversation_id,
            card,
            resp,
        })
        .await
    }

    pub async fn get_score_detail(
        &self,
        conversation_id: &str,
    ) -> anyhow::Result<Option<ScoreDetailRow>> {
        let conversation_id = conversation_id.to_string();
        self.request(|resp| StoreCommand::GetScoreDetail {
            conversation_id,
            resp,
        })
        .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::InsertSession { session, resp } => {
                let _ = resp.send(store.insert_session(&session));
            }
            StoreCommand::GetSession { id, resp } => {
                let _ = resp.send(store.get_session(&id));
            }
            StoreCommand::GetSessionByConversation {
                conversation_id,
                resp,
            } => {
                let _ = resp.send(store.get_session_by_conversation(&conversation_id));
            }
            StoreCommand::MarkSessionActive { id, resp } => {
                let _ = resp.send(store.mark_session_active(&id));
            }
            StoreCommand::CompleteSession {
                id,
                actual_duration_minutes,
                end_reason,
                resp,
            } => {
                let res = store.complete_session(&id, actual_duration_minutes, &end_reason);
                let _ = resp.send(res);
            }
            StoreCommand::CancelSession { id, resp } => {
                let _ = resp.send(store.cancel_session(&id));
            }
            StoreCommand::UpdateQuestionsAnswered {
                conversation_id,
                questions_answered,
                resp,
            } => {
                let res = store.update_questions_answered(&conversation_id, questions_answered);
                let _ = resp.send(res);
            }
            StoreCommand::ApplyAutoScore {
                conversation_id,
                score,
                resp,
            } => {
                let _ = resp.send(store.apply_auto_score(&conversation_id, score));
            }
            StoreCommand::SetManualScore {
                session_id,
                score,
                resp,
            } => {
                let _ = resp.send(store.set_manual_score(&session_id, score));
            }
            StoreCommand::UpsertTranscript {
                conversation_id,
                messages,
                resp,
            } => {
                let _ = resp.send(store.upsert_transcript(&conversation_id, &messages));
            }
            StoreCommand::GetTranscript {
                conversation_id,
                resp,
            } => {
                let _ = resp.send(store.get_transcript(&conversation_id));
            }
            StoreCommand::UpsertScoreDetail {
                conversation_id,
                card,
                resp,
            } => {
                let _ = resp.send(store.upsert_score_detail(&conversation_id, &card));
            }
            StoreCommand::GetScoreDetail {
                conversation_id,
                resp,
            } => {
                let _ = resp.send(store.get_score_detail(&conversation_id));
            }
        }
    }
}
