//! Configuration management
//!
//! YAML-based configuration with environment variable overrides. The
//! configuration is loaded once at startup into an immutable [`AppConfig`]
//! carried in the application state; handlers never read settings ad hoc.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// api2d key service connection (optional; without it only binding of
    /// known keys is impossible and provisioning reports the service down)
    #[serde(default)]
    pub api2d: Option<Api2dConfig>,
    #[serde(default)]
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Path to static files directory (frontend build output)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            static_dir: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5080
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to sign JWT access tokens (min 32 bytes)
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
}

fn default_token_expiry_hours() -> u64 {
    24
}

fn default_password_min_length() -> usize {
    8
}

/// api2d key service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api2dConfig {
    /// Base URL of the key management API
    pub url: String,
    /// Admin credential sent as a bearer token
    pub admin_key: String,
    /// Bounded request timeout; expiry surfaces as a remote failure
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: u64,
    /// OpenAI-compatible forward endpoint handed to feature pages
    #[serde(default = "default_openai_endpoint")]
    pub openai_endpoint: String,
    /// Claude forward endpoint handed to feature pages
    #[serde(default = "default_claude_endpoint")]
    pub claude_endpoint: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_openai_endpoint() -> String {
    "https://openai.api2d.net".to_string()
}

fn default_claude_endpoint() -> String {
    "https://oa.api2d.net".to_string()
}

/// Feature page configuration (model names and prompt templates)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureConfig {
    #[serde(default)]
    pub speaking: SpeakingConfig,
    #[serde(default)]
    pub writing: WritingConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            speaking: SpeakingConfig::default(),
            writing: WritingConfig::default(),
        }
    }
}

/// Speaking practice page settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeakingConfig {
    #[serde(default = "default_stt_model")]
    pub stt_model: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
}

impl Default for SpeakingConfig {
    fn default() -> Self {
        Self {
            stt_model: default_stt_model(),
            text_model: default_text_model(),
        }
    }
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

fn default_text_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

/// Writing practice page settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WritingConfig {
    #[serde(default = "default_text_model")]
    pub model: String,
    #[serde(default = "default_writing_prompt")]
    pub system_prompt: String,
}

impl Default for WritingConfig {
    fn default() -> Self {
        Self {
            model: default_text_model(),
            system_prompt: default_writing_prompt(),
        }
    }
}

fn default_writing_prompt() -> String {
    "You are a CELPIP writing coach. Improve the submitted text and explain \
     the corrections at a CLB 9 level."
        .to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub target: LogTarget,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_daily_rotation")]
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_daily_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_prefix() -> String {
    "celprep-webui.log".to_string()
}

fn default_daily_rotation() -> bool {
    true
}

/// Log output format
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Log output target
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
    Both,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides
    /// earlier): default values, configuration file (YAML), environment
    /// variables (prefixed with CELPREP_).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("CELPREP_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str::<AppConfig>(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            }
            _ => AppConfig::default_config(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/celprep-webui/config.yaml"),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("celprep-webui/config.yaml"));
        }
        paths.into_iter().find(|p| p.exists())
    }

    /// Defaults used when no config file is present; the required fields
    /// must then come from the environment.
    fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "sqlite://celprep.db?mode=rwc".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                token_expiry_hours: default_token_expiry_hours(),
                password_min_length: default_password_min_length(),
            },
            logging: LoggingConfig::default(),
            api2d: None,
            features: FeatureConfig::default(),
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CELPREP_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CELPREP_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(url) = std::env::var("CELPREP_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(secret) = std::env::var("CELPREP_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(level) = std::env::var("CELPREP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(url) = std::env::var("CELPREP_API2D_URL") {
            let api2d = self.api2d.get_or_insert_with(|| Api2dConfig {
                url: String::new(),
                admin_key: String::new(),
                timeout_secs: default_timeout(),
                openai_endpoint: default_openai_endpoint(),
                claude_endpoint: default_claude_endpoint(),
            });
            api2d.url = url;
        }
        if let Ok(admin_key) = std::env::var("CELPREP_API2D_ADMIN_KEY") {
            if let Some(ref mut api2d) = self.api2d {
                api2d.admin_key = admin_key;
            }
        }
    }

    /// Forward endpoint for OpenAI-compatible calls, shown on the key page
    pub fn openai_endpoint(&self) -> String {
        self.api2d
            .as_ref()
            .map(|c| c.openai_endpoint.clone())
            .unwrap_or_else(default_openai_endpoint)
    }

    /// Forward endpoint for Claude calls, handed to the feature pages
    pub fn claude_endpoint(&self) -> String {
        self.api2d
            .as_ref()
            .map(|c| c.claude_endpoint.clone())
            .unwrap_or_else(default_claude_endpoint)
    }

    /// Validate configuration consistency
    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("auth.jwt_secret must be at least 32 bytes");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database.url must be set");
        }
        if let Some(ref api2d) = self.api2d {
            if api2d.url.is_empty() {
                anyhow::bail!("api2d.url must be set when the api2d section is present");
            }
            if api2d.admin_key.is_empty() {
                anyhow::bail!("api2d.admin_key must be set when the api2d section is present");
            }
        }
        Ok(())
    }
}
