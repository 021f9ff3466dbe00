// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// Hosted video-conversation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub base_url: String,
    /// Falls back to `TAVUS_API_KEY` when unset.
    pub api_key: Option<String>,
    pub persona_id: Option<String>,
    pub replica_id: Option<String>,
    /// Where the provider delivers the transcript webhook.
    pub callback_url: Option<String>,
    pub max_call_duration_secs: u32,
    pub participant_left_timeout_secs: u32,
    pub participant_absent_timeout_secs: u32,
    pub enable_recording: bool,
    pub enable_closed_captions: bool,
    pub language: String,
    /// Upper bound on the CV background summary folded into the context.
    pub context_max_chars: usize,
    pub request_timeout_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tavusapi.com/v2".into(),
            api_key: None,
            persona_id: None,
            replica_id: None,
            callback_url: None,
            max_call_duration_secs: 1800,
            participant_left_timeout_secs: 10,
            participant_absent_timeout_secs: 60,
            enable_recording: false,
            enable_closed_captions: true,
            language: "english".into(),
            context_max_chars: 2000,
            request_timeout_secs: 30,
        }
    }
}

impl ConversationConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("TAVUS_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Check everything a session needs before any network call is made.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolved_api_key().is_none() {
            return Err("conversation API key is not set (TAVUS_API_KEY)".into());
        }
        if self
            .persona_id
            .as_deref()
            .map_or(true, |p| p.trim().is_empty())
        {
            return Err("conversation.persona_id is not set".into());
        }
        if let Some(cb) = &self.callback_url {
            url::Url::parse(cb).map_err(|e| format!("invalid callback_url '{cb}': {e}"))?;
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("invalid conversation base_url '{}': {e}", self.base_url))?;
        Ok(())
    }

    /// A session can run without a callback, but its transcript and score
    /// will never arrive.
    pub fn callback_warning(&self) -> Option<&'static str> {
        match &self.callback_url {
            Some(_) => None,
            None => Some(
                "conversation.callback_url is not set; the transcript and score for this session will not be delivered",
            ),
        }
    }
}

/// External text-scoring service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub reason_max_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            timeout_secs: 30,
            reason_max_chars: 500,
        }
    }
}

impl ScoringConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Heuristic thresholds for detecting that a call really started or ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub grace_period_ms: u64,
    pub poll_interval_ms: u64,
    pub min_session_ms: u64,
    pub idle_samples_for_end: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            poll_interval_ms: 7_000,
            min_session_ms: 10_000,
            idle_samples_for_end: 2,
        }
    }
}

impl LivenessConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_session(&self) -> Duration {
        Duration::from_millis(self.min_session_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::db_path)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ConversationConfig {
        ConversationConfig {
            api_key: Some("key".into()),
            persona_id: Some("p-1".into()),
            callback_url: Some("https://example.com/api/v1/webhooks/conversation".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_callback_warns_but_validates() {
        let cfg = ConversationConfig {
            callback_url: None,
            ..configured()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.callback_warning().unwrap().contains("callback_url"));
        assert_eq!(configured().callback_warning(), None);
    }

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.server.port, 8787);
        assert_eq!(c.conversation.max_call_duration_secs, 1800);
        assert_eq!(c.conversation.context_max_chars, 2000);
        assert!(c.scoring.enabled);
        assert_eq!(c.scoring.reason_max_chars, 500);
        assert_eq!(c.liveness.grace_period_ms, 5_000);
        assert_eq!(c.liveness.min_session_ms, 10_000);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.liveness.idle_samples_for_end, 2);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml_str = r#"
[server]
bind = "0.0.0.0"
port = 9000

[conversation]
persona_id = "p9f2"
enable_recording = true

[scoring]
model = "gpt-4.1-mini"
timeout_secs = 10

[liveness]
grace_period_ms = 6000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.conversation.persona_id.as_deref(), Some("p9f2"));
        assert!(config.conversation.enable_recording);
        assert_eq!(config.conversation.language, "english");
        assert_eq!(config.scoring.model, "gpt-4.1-mini");
        assert_eq!(config.scoring.timeout(), Duration::from_secs(10));
        assert_eq!(config.liveness.grace_period(), Duration::from_millis(6000));
        assert_eq!(config.liveness.poll_interval_ms, 7_000);
    }

    #[test]
    fn test_validate_ok() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_persona() {
        let mut c = configured();
        c.persona_id = Some("  ".into());
        let err = c.validate().unwrap_err();
        assert!(err.contains("persona_id"));
    }

    #[test]
    fn test_validate_bad_callback() {
        let mut c = configured();
        c.callback_url = Some("not a url".into());
        assert!(c.validate().unwrap_err().contains("callback_url"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\npath = \"/tmp/r.db\"\n[scoring]\nenabled = false\n")
            .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(!config.scoring.enabled);
        assert_eq!(config.database.resolved_path(), PathBuf::from("/tmp/r.db"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(Config::load_from(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.scoring.model, config.scoring.model);
    }
}
