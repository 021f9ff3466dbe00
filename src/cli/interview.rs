// src/cli/interview.rs — Headless interview session
//
// The embedded video surface lives in a host shell; the shell forwards the
// messages the surface posts as JSON lines on stdin. `end` and `cancel`
// lines are user commands. EOF counts as "End Interview".

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::TemporaryFailure;
use crate::conversation::tavus::TavusClient;
use crate::infra::config::Config;
use crate::infra::errors::SessionError;
use crate::session::driver::{drive_session, watch_monitor, UserCommand};
use crate::session::liveness::{spawn_monitor, NullSurface};
use crate::session::{SessionController, SessionPhase, StartRequest};

pub struct InterviewArgs {
    pub category: String,
    pub name: String,
    pub duration: u32,
    pub cv: Option<PathBuf>,
}

pub async fn run_interview(config: &Config, args: InterviewArgs) -> anyhow::Result<()> {
    let cv_summary = match &args.cv {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read CV summary {}: {e}", path.display())
        })?),
        None => None,
    };

    let store = super::open_store(config)?;
    // Credentials are checked by the controller so a missing key is reported
    // like any other configuration error
    let provider = Arc::new(TavusClient::new(
        config.conversation.resolved_api_key().unwrap_or_default(),
        config.conversation.base_url.clone(),
        Duration::from_secs(config.conversation.request_timeout_secs),
    ));
    let controller = Arc::new(SessionController::new(
        provider,
        store,
        config.conversation.clone(),
    ));

    let started = controller
        .start(StartRequest {
            category: args.category,
            name: args.name,
            expected_duration_minutes: args.duration,
            cv_summary,
        })
        .await;
    let snapshot = match started {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{}", e.user_message());
            if e.is_retriable() {
                eprintln!("This looks temporary. Run the same command again to retry.");
            }
            return Err(start_failure(e));
        }
    };

    println!("Session:  {}", snapshot.session_id);
    if let Some(url) = &snapshot.conversation_url {
        println!("Join at:  {url}");
    }
    println!("Type `end` to finish or `cancel` to abandon before the call starts.");

    let (message_tx, message_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(8);
    let (command_tx, command_rx) = mpsc::channel(8);

    let monitor = spawn_monitor(
        config.liveness.clone(),
        Arc::new(NullSurface),
        message_rx,
        event_tx,
    );
    tokio::spawn(watch_monitor(controller.clone(), monitor));
    tokio::spawn(forward_stdin(message_tx, command_tx));

    let result = drive_session(&controller, event_rx, command_rx).await;
    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    match snapshot.phase {
        SessionPhase::Completed => {
            println!(
                "Interview complete: {} min ({}). Transcript and score will arrive shortly.",
                snapshot.actual_duration_minutes.unwrap_or(1),
                snapshot.end_reason.as_deref().unwrap_or("ended")
            );
        }
        SessionPhase::Cancelled => println!("Interview cancelled."),
        other => {
            if let Some(err) = &snapshot.last_error {
                eprintln!("Session stopped in {other}: {err}");
            } else {
                println!("Session stopped in {other}");
            }
        }
    }
    Ok(())
}

/// Transient provider failures exit with `EXIT_TEMPORARY`; a new run gets a
/// fresh controller and session id.
fn start_failure(e: SessionError) -> anyhow::Error {
    let message = format!("interview could not start: {e}");
    if e.is_retriable() {
        TemporaryFailure(message).into()
    } else {
        anyhow::anyhow!(message)
    }
}

async fn forward_stdin(messages: mpsc::Sender<serde_json::Value>, commands: mpsc::Sender<UserCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(cmd) = UserCommand::parse(line) {
                    if commands.send(cmd).await.is_err() {
                        return;
                    }
                    continue;
                }
                match serde_json::from_str(line) {
                    Ok(value) => {
                        if messages.send(value).await.is_err() {
                            tracing::debug!("Liveness monitor stopped; dropping surface message");
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring unrecognized input line: {e}"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read stdin: {e}");
                break;
            }
        }
    }
    let _ = commands.send(UserCommand::End).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{exit_code, EXIT_TEMPORARY};
    use crate::infra::errors::ConversationError;

    #[test]
    fn test_transient_start_failure_exits_temporary() {
        let network = start_failure(ConversationError::Network("connection reset".into()).into());
        assert_eq!(exit_code(&network), EXIT_TEMPORARY);
        let unavailable = start_failure(
            ConversationError::Http {
                status: 503,
                message: "maintenance".into(),
            }
            .into(),
        );
        assert_eq!(exit_code(&unavailable), EXIT_TEMPORARY);
        assert!(unavailable.to_string().starts_with("interview could not start"));
    }

    #[test]
    fn test_permanent_start_failure_exits_one() {
        let denied = start_failure(ConversationError::Unauthorized.into());
        assert_eq!(exit_code(&denied), 1);
        let config = start_failure(SessionError::Config("persona_id is not set".into()));
        assert_eq!(exit_code(&config), 1);
    }
}
