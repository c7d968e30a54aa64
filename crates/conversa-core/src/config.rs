use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 4270;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MAX_CONTEXT_LENGTH: usize = 4000;
pub const DEFAULT_RESPONSE_WINDOW_HOURS: i64 = 3;
pub const DEFAULT_SESSION_TIMEOUT_HOURS: i64 = 1;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_TOOL_LOOP_DEPTH: u32 = 4;

/// Top-level config (conversa.toml + CONVERSA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversaConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_bind")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ConversaConfig {
    fn default() -> Self {
        Self {
            debug: false,
            host: default_bind(),
            port: default_port(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            context: ContextConfig::default(),
            turn: TurnConfig::default(),
            session: SessionConfig::default(),
            log: LogConfig::default(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Literal "memory" selects the in-process store instead of SQLite.
    #[serde(default = "default_db_url")]
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub namespace: Option<String>,
    pub database: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            user: None,
            password: None,
            namespace: None,
            database: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Mock,
    Openai,
    Azure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            api_url: None,
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_length: default_max_context_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    #[serde(default = "default_response_window_hours")]
    pub response_window_hours: i64,
    #[serde(default = "default_max_tool_loop_depth")]
    pub max_tool_loop_depth: u32,
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            response_window_hours: default_response_window_hours(),
            max_tool_loop_depth: default_max_tool_loop_depth(),
            pipeline_timeout_secs: default_pipeline_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_timeout_hours")]
    pub idle_timeout_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_hours: default_session_timeout_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_url() -> String {
    "memory".to_string()
}
fn default_model() -> String {
    "mock-1".to_string()
}
fn default_max_context_length() -> usize {
    DEFAULT_MAX_CONTEXT_LENGTH
}
fn default_response_window_hours() -> i64 {
    DEFAULT_RESPONSE_WINDOW_HOURS
}
fn default_max_tool_loop_depth() -> u32 {
    DEFAULT_MAX_TOOL_LOOP_DEPTH
}
fn default_pipeline_timeout_secs() -> u64 {
    DEFAULT_PIPELINE_TIMEOUT_SECS
}
fn default_session_timeout_hours() -> i64 {
    DEFAULT_SESSION_TIMEOUT_HOURS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ConversaConfig {
    /// Load config from a TOML file with CONVERSA_* env var overrides.
    ///
    /// Falls back to in-memory defaults entirely when no file is present at
    /// `config_path` and no overriding env vars are set.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(|| "conversa.toml".to_string());

        let config: ConversaConfig = Figment::from(figment::providers::Serialized::defaults(
            ConversaConfig::default(),
        ))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("CONVERSA_").split("__"))
        .extract()
        .map_err(|e| crate::error::ConversaError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = ConversaConfig::default();
        assert_eq!(cfg.context.max_context_length, 4000);
        assert_eq!(cfg.turn.response_window_hours, 3);
        assert_eq!(cfg.session.idle_timeout_hours, 1);
        assert_eq!(cfg.database.url, "memory");
    }

    #[test]
    fn load_with_no_file_present_yields_defaults() {
        let cfg = ConversaConfig::load(Some("/nonexistent/conversa.toml")).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
