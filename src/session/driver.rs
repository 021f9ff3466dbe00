// src/session/driver.rs — Event loop tying liveness, user commands and the time limit together

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::controller::{SessionController, SessionSnapshot, END_REASON_TIME_LIMIT, END_REASON_USER};
use super::liveness::LivenessEvent;
use crate::infra::errors::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    End,
    Cancel,
}

impl UserCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "end" | "end interview" | "quit" => Some(UserCommand::End),
            "cancel" | "abort" => Some(UserCommand::Cancel),
            _ => None,
        }
    }
}

/// Drive a started session until it reaches a terminal phase or no input
/// can move it any further. Whichever of detector end, user end or time
/// limit arrives first wins; the rest collapse to no-ops.
pub async fn drive_session(
    controller: &SessionController,
    mut liveness: mpsc::Receiver<LivenessEvent>,
    mut commands: mpsc::Receiver<UserCommand>,
) -> Result<SessionSnapshot, SessionError> {
    let mut liveness_open = true;
    let mut commands_open = true;

    loop {
        if controller.phase().is_terminal() {
            break;
        }
        let deadline = controller.time_limit_deadline();
        if !liveness_open && !commands_open && deadline.is_none() {
            tracing::debug!("No remaining inputs can advance the session");
            break;
        }
        let wake_at = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        let result = tokio::select! {
            ev = liveness.recv(), if liveness_open => match ev {
                Some(ev) => controller.on_liveness(ev).await,
                None => {
                    liveness_open = false;
                    continue;
                }
            },
            cmd = commands.recv(), if commands_open => match cmd {
                Some(UserCommand::End) => controller.end_interview(END_REASON_USER).await,
                Some(UserCommand::Cancel) => controller.cancel().await,
                None => {
                    commands_open = false;
                    continue;
                }
            },
            _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                tracing::info!("Interview time limit reached");
                controller.finish(END_REASON_TIME_LIMIT).await
            }
        };

        match result {
            Ok(_) => {}
            Err(e @ (SessionError::InvalidTransition { .. } | SessionError::InFlight(_))) => {
                tracing::warn!("{e}");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(controller.snapshot())
}

/// Put the session into `error` if the liveness monitor task dies. A monitor
/// that returns because its input closed is not a failure.
pub async fn watch_monitor(controller: Arc<SessionController>, monitor: JoinHandle<()>) {
    if let Err(e) = monitor.await {
        controller.fail(&format!("liveness monitor stopped: {e}"));
    }
}
