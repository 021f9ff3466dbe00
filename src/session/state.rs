// src/session/state.rs — Client-side session phases and the legal transition graph

use serde::Serialize;
use std::fmt;

/// Client-visible phase. `Ending` exists only in memory; the store sees
/// `active` until the completion write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Created,
    Active,
    Ending,
    Completed,
    Cancelled,
    Error,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Created => "created",
            SessionPhase::Active => "active",
            SessionPhase::Ending => "ending",
            SessionPhase::Completed => "completed",
            SessionPhase::Cancelled => "cancelled",
            SessionPhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Cancelled | SessionPhase::Error
        )
    }

    /// Edges of the lifecycle graph. Nothing skips `created`.
    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        match (self, next) {
            (Idle, Created) | (Created, Active) | (Active, Ending) | (Ending, Completed) => true,
            (Idle | Created, Cancelled) => true,
            (Idle | Created | Active | Ending, Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-transition "already in flight" flags owned by the controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransitionGuards {
    pub starting: bool,
    pub activating: bool,
    pub ending: bool,
    pub cancelling: bool,
}

/// Result of asking the controller for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// Duplicate trigger, or the transition already happened.
    Skipped,
}
