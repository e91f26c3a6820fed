use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MindbridgeError, Result};

/// Fallback reply sent when the dialogue engine exchange fails.
pub const DEFAULT_ERROR_MESSAGE: &str =
    "Minulla on nyt hiukan teknisiä ongelmia, yritä myöhemmin uudestaan.";

/// Upper bound for `bot.max_idle_session_secs` (one year).
pub const MAX_IDLE_SESSION_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level configuration for a Mindbridge process.
///
/// Loaded from `~/.mindbridge/config.toml` by default. One process serves
/// exactly one bot (one messaging page bound to one dialogue-engine story).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MindbridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

impl MindbridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MindbridgeConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check that every value needed to talk to the platform and the
    /// dialogue engine is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("bot.story", &self.bot.story),
            ("bot.page_id", &self.bot.page_id),
            ("bot.access_token", &self.bot.access_token),
            ("bot.api_url", &self.bot.api_url),
            ("messenger.verify_token", &self.messenger.verify_token),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(MindbridgeError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.bot.max_idle_session_secs == 0 {
            return Err(MindbridgeError::Config(
                "bot.max_idle_session_secs must be greater than zero".to_string(),
            ));
        }
        if self.bot.max_idle_session_secs > MAX_IDLE_SESSION_SECS {
            return Err(MindbridgeError::Config(format!(
                "bot.max_idle_session_secs must be at most {}",
                MAX_IDLE_SESSION_SECS
            )));
        }
        Ok(())
    }
}

/// HTTP server settings for the webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
        }
    }
}

/// Messaging platform settings shared by the webhook and the send client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Token the platform echoes back during the subscription handshake.
    pub verify_token: String,
    /// Base URL of the Graph API, without a trailing slash.
    pub graph_api_url: String,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            graph_api_url: "https://graph.facebook.com/v2.6".to_string(),
        }
    }
}

/// HTTP client settings for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request timeout applied by the HTTP clients.
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Which session store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable SQLite table; bindings never expire.
    #[default]
    Sqlite,
    /// In-process map with sliding expiry; bindings live for the idle timeout.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = MindbridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(MindbridgeError::Config(format!(
                "unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file path; `~/` expands to the home directory.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: "~/.mindbridge/sessions.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// Database path with a leading `~/` expanded.
    pub fn resolved_database_path(&self) -> PathBuf {
        expand_home(&self.database_path)
    }
}

/// Per-bot settings. Immutable once the orchestrator is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Dialogue-engine story identifier.
    pub story: String,
    pub locale: String,
    pub timezone: String,
    /// Platform page this bot answers for.
    pub page_id: String,
    /// Page access token for the send API.
    pub access_token: String,
    /// Dialogue engine base URL.
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Idle timeout for expiring session stores.
    pub max_idle_session_secs: u64,
    /// Postback payload that starts a fresh conversation.
    pub get_started_payload: Option<String>,
    /// Reply sent when the engine exchange fails.
    pub error_message: String,
    /// Serialize event handling per user to avoid duplicate sessions.
    pub serialize_per_user: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            story: String::new(),
            locale: "fi".to_string(),
            timezone: "Europe/Helsinki".to_string(),
            page_id: String::new(),
            access_token: String::new(),
            api_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            max_idle_session_secs: 1800,
            get_started_payload: None,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            serialize_per_user: true,
        }
    }
}

impl BotConfig {
    pub fn max_idle_session(&self) -> Duration {
        Duration::from_secs(self.max_idle_session_secs)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> MindbridgeConfig {
        let mut config = MindbridgeConfig::default();
        config.messenger.verify_token = "verify".to_string();
        config.bot.story = "story-1".to_string();
        config.bot.page_id = "1234".to_string();
        config.bot.access_token = "page-token".to_string();
        config.bot.api_url = "https://engine.example.com/api".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = MindbridgeConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.bot.locale, "fi");
        assert_eq!(config.bot.max_idle_session_secs, 1800);
        assert_eq!(config.bot.error_message, DEFAULT_ERROR_MESSAGE);
        assert!(config.bot.serialize_per_user);
        assert!(config.bot.get_started_payload.is_none());
        assert_eq!(config.engine.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[server]
host = "127.0.0.1"
port = 8080

[messenger]
verify_token = "secret-handshake"

[storage]
backend = "memory"

[bot]
story = "support-story"
locale = "en"
timezone = "UTC"
page_id = "998877"
access_token = "EAAB"
api_url = "https://engine.example.com/api"
client_id = "client"
client_secret = "shh"
max_idle_session_secs = 600
get_started_payload = "GET_STARTED"
"#;
        let file = create_temp_config(content);
        let config = MindbridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.messenger.verify_token, "secret-handshake");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.bot.story, "support-story");
        assert_eq!(config.bot.max_idle_session(), Duration::from_secs(600));
        assert_eq!(config.bot.get_started_payload.as_deref(), Some("GET_STARTED"));
        // Unset fields keep their defaults.
        assert_eq!(config.bot.error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(
            config.messenger.graph_api_url,
            "https://graph.facebook.com/v2.6"
        );
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = MindbridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bot.timezone, "Europe/Helsinki");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = MindbridgeConfig::load(file.path());
        assert!(matches!(result, Err(MindbridgeError::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let file = create_temp_config("[storage]\nbackend = \"redis\"\n");
        assert!(MindbridgeConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MindbridgeConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = valid_config();
        config.save(&path).unwrap();

        let reloaded = MindbridgeConfig::load(&path).unwrap();
        assert_eq!(reloaded.bot.story, "story-1");
        assert_eq!(reloaded.bot.page_id, "1234");
        assert_eq!(reloaded.messenger.verify_token, "verify");
    }

    #[test]
    fn test_example_config_is_valid() {
        let example = include_str!("../../../config.example.toml");
        let config: MindbridgeConfig = toml::from_str(example).unwrap();
        config.validate().unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let err = MindbridgeConfig::default().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bot.story"));
        assert!(msg.contains("bot.page_id"));
        assert!(msg.contains("messenger.verify_token"));
    }

    #[test]
    fn test_validate_rejects_zero_idle_timeout() {
        let mut config = valid_config();
        config.bot.max_idle_session_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_idle_timeout() {
        let mut config = valid_config();
        config.bot.max_idle_session_secs = MAX_IDLE_SESSION_SECS;
        assert!(config.validate().is_ok());

        config.bot.max_idle_session_secs = 10_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MindbridgeError::Config(_)));
        assert!(err.to_string().contains("bot.max_idle_session_secs"));
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("MEMORY".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/lib/db.sqlite"), PathBuf::from("/var/lib/db.sqlite"));
    }
}
