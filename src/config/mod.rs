//! Configuration loading and validation.
//!
//! Loads configuration from `./config.toml` (or `$CHATBRIDGE_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//! Dotenv files (`.env.local`, then `.env`) are consulted after the real
//! process environment.
//!
//! Precedence: env vars > dotenv files > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::credentials::{ChannelCredentials, Credentials, Secret};

/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "CHATBRIDGE_CONFIG_PATH";

/// Default media download cap, matching WhatsApp's 16 MiB attachment limit.
pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 16 * 1024 * 1024;

// ── Top-level config ────────────────────────────────────────────

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Webhook listener settings.
    pub server: ServerConfig,
    /// Outbound HTTP client limits.
    pub http: HttpConfig,
    /// OpenAI speech-to-text and vision settings.
    pub openai: OpenAiConfig,
    /// Twilio channel credentials for media downloads.
    pub twilio: TwilioConfig,
    /// Retrieval backend settings.
    pub rag: RagConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration: TOML file, then dotenv files, then the process
    /// environment.
    ///
    /// Runs before logging is set up, so diagnostics are returned in a
    /// [`LoadReport`] for the caller to log.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file exists but cannot be read or
    /// parsed, or when a dotenv file is malformed.
    pub fn load() -> Result<(Self, LoadReport)> {
        let dotenv = crate::credentials::load_env_files(&crate::credentials::DEFAULT_ENV_FILES)
            .context("failed to load dotenv files")?;
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        let (mut config, source) = Self::load_from_file(path)?;
        let ignored_overrides = config.apply_overrides(env_resolver(dotenv));
        Ok((
            config,
            LoadReport {
                source,
                ignored_overrides,
            },
        ))
    }

    /// Load from TOML file only, no env overrides. Returns the path when the
    /// file existed.
    fn load_from_file(path: PathBuf) -> Result<(Self, Option<PathBuf>)> {
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok((Self::from_toml(&contents)?, Some(path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((Self::default(), None)),
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve config path using a custom env resolver.
    ///
    /// Checks `$CHATBRIDGE_CONFIG_PATH` first, then `./config.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env(CONFIG_PATH_ENV) {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from("config.toml"),
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error when the TOML is malformed or has wrong types.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: BridgeConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the real environment.
    /// Returns the overrides that were ignored because their value did not
    /// parse.
    pub fn apply_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Vec<IgnoredOverride> {
        let mut ignored = Vec::new();

        // Server.
        if let Some(v) = env("CHATBRIDGE_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("PORT") {
            match v.parse() {
                Ok(n) => self.server.port = n,
                Err(_) => ignored.push(IgnoredOverride::new("PORT", v)),
            }
        }

        // HTTP limits.
        if let Some(v) = env("CHATBRIDGE_REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.http.request_timeout_secs = n,
                Err(_) => {
                    ignored.push(IgnoredOverride::new("CHATBRIDGE_REQUEST_TIMEOUT_SECS", v));
                }
            }
        }
        if let Some(v) = env("CHATBRIDGE_MAX_MEDIA_BYTES") {
            match v.parse() {
                Ok(n) => self.http.max_media_bytes = n,
                Err(_) => ignored.push(IgnoredOverride::new("CHATBRIDGE_MAX_MEDIA_BYTES", v)),
            }
        }

        // OpenAI.
        if let Some(v) = env("OPENAI_API_KEY") {
            self.openai.api_key = Secret::new(v);
        }
        if let Some(v) = env("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }

        // Twilio.
        if let Some(v) = env("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = v;
        }
        if let Some(v) = env("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = Secret::new(v);
        }

        // Retrieval backend.
        if let Some(v) = env("RAG_API_BASE_URL") {
            self.rag.base_url = v;
        }
        if let Some(v) = env("RAG_EMAIL") {
            self.rag.email = v;
        }
        if let Some(v) = env("RAG_PASSWORD") {
            self.rag.password = Secret::new(v);
        }
        if let Some(v) = env("RAG_SESSION_ID") {
            self.rag.session_id = v;
        }

        // Logging.
        if let Some(v) = env("CHATBRIDGE_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }

        ignored
    }

    /// Check that every secret needed to serve traffic is present.
    ///
    /// All problems are reported in one error.
    ///
    /// # Errors
    ///
    /// Returns an error listing each missing setting.
    pub fn validate(&self) -> Result<()> {
        let mut missing: Vec<&str> = Vec::new();
        if self.openai.api_key.is_blank() {
            missing.push("OPENAI_API_KEY");
        }
        if self.twilio.account_sid.trim().is_empty() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if self.twilio.auth_token.is_blank() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if self.rag.base_url.trim().is_empty() {
            missing.push("RAG_API_BASE_URL");
        }
        if self.rag.email.trim().is_empty() {
            missing.push("RAG_EMAIL");
        }
        if self.rag.password.is_blank() {
            missing.push("RAG_PASSWORD");
        }
        if self.rag.session_id.trim().is_empty() {
            missing.push("RAG_SESSION_ID");
        }

        if !missing.is_empty() {
            anyhow::bail!("missing required configuration: {}", missing.join(", "));
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("http.request_timeout_secs must be greater than zero");
        }
        if self.http.connect_timeout_secs == 0 {
            anyhow::bail!("http.connect_timeout_secs must be greater than zero");
        }
        if self.http.max_media_bytes == 0 {
            anyhow::bail!("http.max_media_bytes must be greater than zero");
        }

        if !self.rag.query_path_template.contains("{session_id}") {
            anyhow::bail!("rag.query_path_template must contain {{session_id}}");
        }
        Ok(())
    }

    /// Channel credentials for the media fetcher.
    pub fn channel_credentials(&self) -> ChannelCredentials {
        ChannelCredentials {
            account_sid: self.twilio.account_sid.clone(),
            auth_token: self.twilio.auth_token.clone(),
        }
    }
}

/// Build an env resolver that checks the process environment first, then
/// the loaded dotenv entries.
pub fn env_resolver(dotenv: Credentials) -> impl Fn(&str) -> Option<String> {
    move |key| {
        std::env::var(key)
            .ok()
            .or_else(|| dotenv.get(key).map(str::to_owned))
    }
}

// ── Load diagnostics ────────────────────────────────────────────

/// An env override whose value did not parse and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredOverride {
    /// Environment variable name.
    pub var: &'static str,
    /// The rejected value.
    pub value: String,
}

impl IgnoredOverride {
    fn new(var: &'static str, value: String) -> Self {
        Self { var, value }
    }
}

/// What [`BridgeConfig::load`] saw while loading.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Config file that was read, `None` when defaults were used.
    pub source: Option<PathBuf>,
    /// Env overrides skipped because their value was invalid.
    pub ignored_overrides: Vec<IgnoredOverride>,
}

impl LoadReport {
    /// Emit the collected diagnostics. Call after logging is initialised.
    pub fn log(&self) {
        match &self.source {
            Some(path) => tracing::info!(path = %path.display(), "loaded config from file"),
            None => tracing::info!("no config file found, using defaults"),
        }
        for ignored in &self.ignored_overrides {
            tracing::warn!(
                var = ignored.var,
                value = %ignored.value,
                "ignoring invalid env override"
            );
        }
    }
}

// ── Sections ────────────────────────────────────────────────────

/// Webhook listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5050,
        }
    }
}

/// Limits applied to every outbound HTTP client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Largest media attachment that will be downloaded.
    pub max_media_bytes: u64,
}

impl HttpConfig {
    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            max_media_bytes: DEFAULT_MAX_MEDIA_BYTES,
        }
    }
}

/// OpenAI speech-to-text and vision settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key.
    pub api_key: Secret,
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Speech-to-text model.
    pub transcription_model: String,
    /// Vision-capable chat model.
    pub vision_model: String,
    /// Completion cap for image descriptions.
    pub vision_max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: "https://api.openai.com/v1".to_owned(),
            transcription_model: "whisper-1".to_owned(),
            vision_model: "gpt-4o".to_owned(),
            vision_max_tokens: 300,
        }
    }
}

/// Twilio channel credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    /// Account SID.
    pub account_sid: String,
    /// Auth token.
    pub auth_token: Secret,
}

/// Retrieval backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// API base URL, e.g. `https://rag.example.com/api/v1`.
    pub base_url: String,
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: Secret,
    /// Chat session that receives queries.
    pub session_id: String,
    /// Login endpoint, relative to `base_url`.
    pub login_path: String,
    /// Query endpoint, relative to `base_url`; `{session_id}` is substituted.
    pub query_path_template: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            email: String::new(),
            password: Secret::default(),
            session_id: String::new(),
            login_path: "/auth/login".to_owned(),
            query_path_template: "/chat/sessions/{session_id}/messages".to_owned(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for JSON log files. Console-only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}
