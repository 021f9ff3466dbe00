// src/session/controller.rs — Client-side session state machine
//
// The controller is the only writer of status, duration and end reason.
// Phase changes happen under the state lock before any I/O, so a duplicate
// trigger racing the first one sees the new phase and collapses to a no-op.
// The lock is never held across an await.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use super::liveness::LivenessEvent;
use super::state::{SessionPhase, TransitionGuards, TransitionOutcome};
use crate::conversation::{
    interview_context, ConversationProperties, ConversationProvider, CreateConversation,
};
use crate::infra::config::ConversationConfig;
use crate::infra::errors::SessionError;
use crate::store::store::NewSession;
use crate::store::StoreHandle;

pub const END_REASON_USER: &str = "user_ended";
pub const END_REASON_CONVERSATION: &str = "conversation_ended";
pub const END_REASON_TIME_LIMIT: &str = "time_limit_reached";

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub category: String,
    pub name: String,
    pub expected_duration_minutes: u32,
    pub cv_summary: Option<String>,
}

/// Point-in-time copy of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session_id: String,
    pub conversation_id: Option<String>,
    pub conversation_url: Option<String>,
    pub actual_duration_minutes: Option<u32>,
    pub end_reason: Option<String>,
    pub last_error: Option<String>,
    pub guards: TransitionGuards,
}

#[derive(Debug)]
struct ControllerState {
    phase: SessionPhase,
    session_id: String,
    conversation_id: Option<String>,
    conversation_url: Option<String>,
    expected_duration_minutes: u32,
    active_since: Option<Instant>,
    actual_duration_minutes: Option<u32>,
    end_reason: Option<String>,
    last_error: Option<String>,
    guards: TransitionGuards,
}

/// `max(1, round(elapsed minutes))`.
pub fn duration_minutes(elapsed: Duration) -> u32 {
    let minutes = (elapsed.as_secs() + 30) / 60;
    minutes.max(1) as u32
}

pub struct SessionController {
    provider: Arc<dyn ConversationProvider>,
    store: StoreHandle,
    config: ConversationConfig,
    state: Mutex<ControllerState>,
}

impl SessionController {
    /// The session id is generated here, before any network call.
    pub fn new(
        provider: Arc<dyn ConversationProvider>,
        store: StoreHandle,
        config: ConversationConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            state: Mutex::new(ControllerState {
                phase: SessionPhase::Idle,
                session_id: uuid::Uuid::new_v4().to_string(),
                conversation_id: None,
                conversation_url: None,
                expected_duration_minutes: 0,
                active_since: None,
                actual_duration_minutes: None,
                end_reason: None,
                last_error: None,
                guards: TransitionGuards::default(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(state: &mut ControllerState, next: SessionPhase) {
        debug_assert!(
            state.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            state.phase,
            next
        );
        tracing::info!("Session {}: {} -> {}", state.session_id, state.phase, next);
        state.phase = next;
    }

    fn enter_error(&self, message: String) {
        let mut st = self.state();
        tracing::error!("Session {} failed: {}", st.session_id, message);
        if !st.phase.is_terminal() {
            Self::enter(&mut st, SessionPhase::Error);
        }
        st.last_error = Some(message);
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.state();
        SessionSnapshot {
            phase: st.phase,
            session_id: st.session_id.clone(),
            conversation_id: st.conversation_id.clone(),
            conversation_url: st.conversation_url.clone(),
            actual_duration_minutes: st.actual_duration_minutes,
            end_reason: st.end_reason.clone(),
            last_error: st.last_error.clone(),
            guards: st.guards,
        }
    }

    /// Deadline for the timer-based end, once the session is active.
    pub fn time_limit_deadline(&self) -> Option<Instant> {
        let st = self.state();
        match (st.phase, st.active_since) {
            (SessionPhase::Active, Some(since)) => Some(
                since + Duration::from_secs(u64::from(st.expected_duration_minutes) * 60),
            ),
            _ => None,
        }
    }

    /// `idle → created`: create the provider conversation, then the session row.
    pub async fn start(&self, request: StartRequest) -> Result<SessionSnapshot, SessionError> {
        let session_id = {
            let mut st = self.state();
            if st.phase != SessionPhase::Idle {
                return Err(SessionError::InvalidTransition {
                    from: st.phase,
                    action: "start",
                });
            }
            if st.guards.starting {
                return Err(SessionError::InFlight("start"));
            }
            st.guards.starting = true;
            st.expected_duration_minutes = request.expected_duration_minutes;
            st.session_id.clone()
        };

        let result = self.create_and_record(&session_id, &request).await;
        self.state().guards.starting = false;

        match result {
            Ok(()) => Ok(self.snapshot()),
            Err(e) => {
                if !matches!(e, SessionError::InvalidTransition { .. }) {
                    self.enter_error(e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn create_and_record(
        &self,
        session_id: &str,
        request: &StartRequest,
    ) -> Result<(), SessionError> {
        self.config.validate().map_err(SessionError::Config)?;
        if let Some(warning) = self.config.callback_warning() {
            tracing::warn!("Session {session_id}: {warning}");
        }

        let create = CreateConversation {
            persona_id: self.config.persona_id.clone().unwrap_or_default(),
            replica_id: self.config.replica_id.clone(),
            conversation_name: request.name.clone(),
            conversational_context: interview_context(
                &request.category,
                request.cv_summary.as_deref(),
                self.config.context_max_chars,
            ),
            callback_url: self.config.callback_url.clone(),
            properties: ConversationProperties::from_config(&self.config),
        };

        let conversation = self.provider.create_conversation(&create).await?;

        // The user may have abandoned the session while creation was in flight
        if self.phase() == SessionPhase::Cancelled {
            tracing::info!(
                "Session {session_id} cancelled during creation; ending conversation {}",
                conversation.conversation_id
            );
            self.end_conversation_best_effort(&conversation.conversation_id, "cancelled")
                .await;
            return Err(SessionError::InvalidTransition {
                from: SessionPhase::Cancelled,
                action: "start",
            });
        }

        let inserted = self
            .store
            .insert_session(NewSession {
                id: session_id.to_string(),
                conversation_id: conversation.conversation_id.clone(),
                category: request.category.clone(),
                name: request.name.clone(),
                expected_duration_minutes: request.expected_duration_minutes,
            })
            .await;

        if let Err(e) = inserted {
            self.end_conversation_best_effort(&conversation.conversation_id, "session_store_failed")
                .await;
            return Err(SessionError::Store(e.to_string()));
        }

        let cancelled_meanwhile = {
            let mut st = self.state();
            st.conversation_id = Some(conversation.conversation_id.clone());
            st.conversation_url = Some(conversation.conversation_url);
            if st.phase == SessionPhase::Cancelled {
                true
            } else {
                Self::enter(&mut st, SessionPhase::Created);
                false
            }
        };

        if cancelled_meanwhile {
            self.end_conversation_best_effort(&conversation.conversation_id, "cancelled")
                .await;
            if let Err(e) = self.store.cancel_session(session_id).await {
                tracing::warn!("Session {session_id}: failed to record cancellation: {e}");
            }
            return Err(SessionError::InvalidTransition {
                from: SessionPhase::Cancelled,
                action: "start",
            });
        }
        Ok(())
    }

    /// Route a detector edge into the state machine.
    pub async fn on_liveness(&self, event: LivenessEvent) -> Result<TransitionOutcome, SessionError> {
        match event {
            LivenessEvent::Started => self.activate().await,
            LivenessEvent::Ended => {
                if self.phase() != SessionPhase::Active {
                    tracing::debug!("Ignoring end signal outside the active phase");
                    return Ok(TransitionOutcome::Skipped);
                }
                self.finish(END_REASON_CONVERSATION).await
            }
        }
    }

    /// `created → active`.
    pub async fn activate(&self) -> Result<TransitionOutcome, SessionError> {
        let session_id = {
            let mut st = self.state();
            if st.phase != SessionPhase::Created || st.guards.activating {
                return Ok(TransitionOutcome::Skipped);
            }
            st.guards.activating = true;
            st.active_since = Some(Instant::now());
            Self::enter(&mut st, SessionPhase::Active);
            st.session_id.clone()
        };

        let written = self.store.mark_session_active(&session_id).await;
        self.state().guards.activating = false;

        match written {
            Ok(true) => Ok(TransitionOutcome::Applied),
            Ok(false) => {
                tracing::warn!("Session {session_id} row was not in 'created' when activating");
                Ok(TransitionOutcome::Applied)
            }
            Err(e) => {
                let err = SessionError::Store(e.to_string());
                self.enter_error(err.to_string());
                Err(err)
            }
        }
    }

    /// Explicit "End Interview". Before the call is confirmed live this abandons the session.
    pub async fn end_interview(&self, reason: &str) -> Result<TransitionOutcome, SessionError> {
        match self.phase() {
            SessionPhase::Idle | SessionPhase::Created => self.cancel().await,
            _ => self.finish(reason).await,
        }
    }

    /// `active → ending → completed`. The provider end call is advisory.
    pub async fn finish(&self, reason: &str) -> Result<TransitionOutcome, SessionError> {
        let (session_id, conversation_id, minutes) = {
            let mut st = self.state();
            match st.phase {
                SessionPhase::Active => {}
                SessionPhase::Ending | SessionPhase::Completed => {
                    return Ok(TransitionOutcome::Skipped)
                }
                from => {
                    return Err(SessionError::InvalidTransition {
                        from,
                        action: "end",
                    })
                }
            }
            if st.guards.ending {
                return Ok(TransitionOutcome::Skipped);
            }
            st.guards.ending = true;
            let elapsed = st
                .active_since
                .map(|since| since.elapsed())
                .unwrap_or_default();
            let minutes = duration_minutes(elapsed);
            st.actual_duration_minutes = Some(minutes);
            st.end_reason = Some(reason.to_string());
            Self::enter(&mut st, SessionPhase::Ending);
            (st.session_id.clone(), st.conversation_id.clone(), minutes)
        };

        if let Some(conversation_id) = &conversation_id {
            self.end_conversation_best_effort(conversation_id, reason)
                .await;
        }

        let written = self
            .store
            .complete_session(&session_id, minutes, reason)
            .await;
        self.state().guards.ending = false;

        match written {
            Ok(applied) => {
                if !applied {
                    tracing::warn!("Session {session_id} row was not active at completion");
                }
                let mut st = self.state();
                if st.phase == SessionPhase::Ending {
                    Self::enter(&mut st, SessionPhase::Completed);
                }
                Ok(TransitionOutcome::Applied)
            }
            Err(e) => {
                let err = SessionError::Store(e.to_string());
                self.enter_error(err.to_string());
                Err(err)
            }
        }
    }

    /// `idle|created → cancelled`. No duration is written.
    pub async fn cancel(&self) -> Result<TransitionOutcome, SessionError> {
        let (session_id, conversation_id) = {
            let mut st = self.state();
            match st.phase {
                SessionPhase::Idle => {
                    Self::enter(&mut st, SessionPhase::Cancelled);
                    return Ok(TransitionOutcome::Applied);
                }
                SessionPhase::Created => {}
                SessionPhase::Cancelled => return Ok(TransitionOutcome::Skipped),
                from => {
                    return Err(SessionError::InvalidTransition {
                        from,
                        action: "cancel",
                    })
                }
            }
            if st.guards.cancelling {
                return Ok(TransitionOutcome::Skipped);
            }
            st.guards.cancelling = true;
            Self::enter(&mut st, SessionPhase::Cancelled);
            (st.session_id.clone(), st.conversation_id.clone())
        };

        if let Some(conversation_id) = &conversation_id {
            self.end_conversation_best_effort(conversation_id, "cancelled")
                .await;
        }

        let written = self.store.cancel_session(&session_id).await;
        self.state().guards.cancelling = false;

        match written {
            Ok(_) => Ok(TransitionOutcome::Applied),
            Err(e) => {
                let err = SessionError::Store(e.to_string());
                self.state().last_error = Some(err.to_string());
                tracing::error!("Session {session_id}: failed to record cancellation: {e}");
                Err(err)
            }
        }
    }

    /// Unrecoverable failure from outside the controller (e.g. the surface died).
    /// The stored row keeps its last valid state.
    pub fn fail(&self, reason: &str) {
        if self.phase().can_transition_to(SessionPhase::Error) {
            self.enter_error(reason.to_string());
        }
    }

    async fn end_conversation_best_effort(&self, conversation_id: &str, reason: &str) {
        match self.provider.end_conversation(conversation_id, reason).await {
            Ok(outcome) => {
                tracing::debug!("Ended conversation {conversation_id}: {outcome:?}");
            }
            Err(e) => {
                tracing::warn!("Failed to end conversation {conversation_id} (continuing): {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_minutes_floor_of_one() {
        assert_eq!(duration_minutes(Duration::from_secs(0)), 1);
        assert_eq!(duration_minutes(Duration::from_secs(29)), 1);
        assert_eq!(duration_minutes(Duration::from_secs(89)), 1);
    }

    #[test]
    fn test_duration_minutes_rounds() {
        assert_eq!(duration_minutes(Duration::from_secs(90)), 2);
        assert_eq!(duration_minutes(Duration::from_secs(14 * 60 + 29)), 14);
        assert_eq!(duration_minutes(Duration::from_secs(14 * 60 + 30)), 15);
    }
}
