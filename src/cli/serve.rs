// src/cli/serve.rs — Webhook server command

use crate::api::{self, ApiState};
use crate::infra::config::Config;

pub async fn run_serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let mut server = config.server.clone();
    if let Some(port) = port {
        server.port = port;
    }

    let store = super::open_store(config)?;
    let scoring = super::scoring_engine(config, store.clone());
    if scoring.is_some() {
        tracing::info!("Scoring transcripts with {}", config.scoring.model);
    }

    api::start_server(&server, ApiState { store, scoring }).await
}
