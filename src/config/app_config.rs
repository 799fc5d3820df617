use crate::estimation::prompt::DEFAULT_LANGUAGE;
use crate::llm::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ESTIMATOR_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "estimator.toml";

/// Root configuration for the estimator service.
///
/// Load with `AppConfig::load()` which searches:
/// 1. `$ESTIMATOR_CONFIG`
/// 2. `./estimator.toml`
/// 3. Built-in defaults
///
/// Secrets are then taken from the environment (see [`AppConfig::apply_env`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    /// Allowed browser origins; empty allows any origin without credentials
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            cors_origins: Vec::new(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Normally supplied through `DATABASE_URL`
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 20,
            acquire_timeout_secs: 10,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Normally supplied through `JWT_SECRET`
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub cookie_secure: bool,
    pub max_login_failures: u32,
    pub lockout_window_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: 30,
            cookie_secure: false,
            max_login_failures: 5,
            lockout_window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Normally supplied through `GEMINI_API_KEY`
    pub api_key: String,
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let g = GeminiConfig::default();
        Self {
            api_key: g.api_key,
            base_url: g.base_url,
            generation_model: g.generation_model,
            embedding_model: g.embedding_model,
            timeout_secs: g.timeout.as_secs(),
            temperature: g.temperature,
            top_p: g.top_p,
            top_k: g.top_k,
            max_output_tokens: g.max_output_tokens,
        }
    }
}

impl LlmConfig {
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            generation_model: self.generation_model.clone(),
            embedding_model: self.embedding_model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
    /// References spliced into each prompt
    pub top_k: usize,
    /// Language the model writes task names and stories in
    pub output_language: String,
    /// Replaces the built-in estimator prompt when set
    pub system_prompt: Option<String>,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            output_language: DEFAULT_LANGUAGE.to_string(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Load using the standard search order. A file that fails to load is
    /// logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file. Unknown keys only warn.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Toml(err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self = toml::from_str(contents).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay secrets and deployment values from the environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = non_empty("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(addr) = non_empty("ESTIMATOR_ADDR") {
            self.server.addr = addr;
        }
        if let Some(origins) = non_empty("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Range and consistency checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr = '{}' is not a socket address", self.server.addr));
        }
        if self.server.request_timeout_secs == 0 {
            errors.push("server.request_timeout_secs must be > 0".to_string());
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }
        if !(1..=365).contains(&self.auth.token_ttl_days) {
            errors.push(format!(
                "auth.token_ttl_days = {} is outside 1-365",
                self.auth.token_ttl_days
            ));
        }
        if self.auth.max_login_failures == 0 {
            errors.push("auth.max_login_failures must be > 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            errors.push(format!("llm.temperature = {} is outside 0-2", self.llm.temperature));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            errors.push(format!("llm.top_p = {} is outside 0-1", self.llm.top_p));
        }
        if self.llm.max_output_tokens == 0 {
            errors.push("llm.max_output_tokens must be > 0".to_string());
        }
        if self.llm.timeout_secs == 0 {
            errors.push("llm.timeout_secs must be > 0".to_string());
        }
        if !(1..=20).contains(&self.estimation.top_k) {
            errors.push(format!("estimation.top_k = {} is outside 1-20", self.estimation.top_k));
        }
        if self.estimation.output_language.trim().is_empty() {
            errors.push("estimation.output_language must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Fail fast on values the server cannot run without.
    pub fn require_secrets(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.database.url.is_empty() {
            missing.push("DATABASE_URL is not set".to_string());
        }
        if self.auth.jwt_secret.is_empty() {
            missing.push("JWT_SECRET is not set".to_string());
        }
        if self.llm.api_key.is_empty() {
            missing.push("GEMINI_API_KEY is not set".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(missing))
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}
