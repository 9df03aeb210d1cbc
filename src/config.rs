//! Configuration for the bot.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DISCORD_TOKEN, OPENAI_ENDPOINT, INNGEST_EVENT_KEY, ...)
//! 2. Config file (.inngestabot/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .inngestabot/config.yaml
//! - Falls back to ~/.inngestabot/config.yaml
//!
//! Outside a deployment (no DEPLOYMENT_ID) a `.env` file is loaded first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::{discord, inngest};
use crate::core::AdapterSettings;
use crate::error::Error;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_APP_NAME: &str = "Inngestabot";
pub const DEFAULT_THINKING_REACTION: &str = "🤔";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: Option<String>,
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub inngest: InngestSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordSection {
    pub token: Option<String>,
    pub bot_id: Option<String>,
    pub api_base: Option<String>,
    pub thinking_reaction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendSection {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InngestSection {
    pub base_url: Option<String>,
    pub event_key: Option<String>,
    pub signing_key: Option<String>,
    pub serve_url: Option<String>,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub address: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub discord_token: Option<String>,
    pub bot_id: Option<String>,
    pub discord_api_base: String,
    pub thinking_reaction: String,
    pub backend_endpoint: Option<String>,
    pub inngest_base_url: String,
    pub event_key: Option<String>,
    pub signing_key: Option<String>,
    pub serve_url: Option<String>,
    pub app_name: String,
    pub bind_address: String,
    /// True when running inside a deployment (DEPLOYMENT_ID set)
    pub production: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Merge a config file and environment lookups over the defaults
    pub fn resolve<F>(file: Option<(PathBuf, ConfigFile)>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config_file, file) = match file {
            Some((path, file)) => (Some(path), file),
            None => (None, ConfigFile::default()),
        };
        let ConfigFile {
            discord,
            backend,
            inngest,
            server,
            ..
        } = file;

        Self {
            discord_token: env("DISCORD_TOKEN").or(discord.token),
            bot_id: env("DISCORD_BOT_ID").or(discord.bot_id),
            discord_api_base: env("DISCORD_API_BASE")
                .or(discord.api_base)
                .unwrap_or_else(|| discord::DEFAULT_API_BASE.to_string()),
            thinking_reaction: env("THINKING_REACTION")
                .or(discord.thinking_reaction)
                .unwrap_or_else(|| DEFAULT_THINKING_REACTION.to_string()),
            backend_endpoint: env("OPENAI_ENDPOINT").or(backend.endpoint),
            inngest_base_url: env("INNGEST_BASE_URL")
                .or(inngest.base_url)
                .unwrap_or_else(|| inngest::DEFAULT_BASE_URL.to_string()),
            event_key: env("INNGEST_EVENT_KEY").or(inngest.event_key),
            signing_key: env("INNGEST_SIGNING_KEY").or(inngest.signing_key),
            serve_url: env("INNGEST_SERVE_URL").or(inngest.serve_url),
            app_name: inngest
                .app_name
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            bind_address: env("INNGESTABOT_BIND")
                .or(server.address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            production: env("DEPLOYMENT_ID").is_some(),
            config_file,
        }
    }

    pub fn require_discord_token(&self) -> Result<&str, Error> {
        require(self.discord_token.as_deref(), "DISCORD_TOKEN")
    }

    pub fn require_bot_id(&self) -> Result<&str, Error> {
        require(self.bot_id.as_deref(), "DISCORD_BOT_ID")
    }

    pub fn require_backend_endpoint(&self) -> Result<&str, Error> {
        require(self.backend_endpoint.as_deref(), "OPENAI_ENDPOINT")
    }

    pub fn require_event_key(&self) -> Result<&str, Error> {
        require(self.event_key.as_deref(), "INNGEST_EVENT_KEY")
    }

    /// Setting names with secrets redacted
    pub fn redacted_summary(&self) -> BTreeMap<String, String> {
        let secret = |v: &Option<String>| match v {
            Some(_) => "[redacted]".to_string(),
            None => "(unset)".to_string(),
        };
        let plain = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());

        [
            ("DISCORD_TOKEN", secret(&self.discord_token)),
            ("DISCORD_BOT_ID", plain(&self.bot_id)),
            ("DISCORD_API_BASE", self.discord_api_base.clone()),
            ("THINKING_REACTION", self.thinking_reaction.clone()),
            ("OPENAI_ENDPOINT", plain(&self.backend_endpoint)),
            ("INNGEST_BASE_URL", self.inngest_base_url.clone()),
            ("INNGEST_EVENT_KEY", secret(&self.event_key)),
            ("INNGEST_SIGNING_KEY", secret(&self.signing_key)),
            ("INNGEST_SERVE_URL", plain(&self.serve_url)),
            ("INNGESTABOT_BIND", self.bind_address.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Settings shown by the protocol adapter's view
    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            app_name: self.app_name.clone(),
            serve_url: self.serve_url.clone(),
            has_event_key: self.event_key.is_some(),
            has_signing_key: self.signing_key.is_some(),
            production: self.production,
            config_summary: self.redacted_summary(),
        }
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, Error> {
    value.ok_or_else(|| Error::Config(format!("{} is not set", name)))
}

/// Find config file by searching current directory and parents, then home
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".inngestabot").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".inngestabot").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// A `.env` load error worth reporting; a missing file is not one
fn dotenv_problem(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded .env");
            None
        }
        Err(e) if e.not_found() => None,
        Err(e) => Some(e),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    if std::env::var("DEPLOYMENT_ID").is_err() {
        if let Some(e) = dotenv_problem(dotenvy::dotenv()) {
            warn!(error = %e, "Ignoring unreadable .env file");
        }
    }

    let file = match find_config_file() {
        Some(path) => {
            let parsed = load_config_file(&path)?;
            Some((path, parsed))
        }
        None => None,
    };

    Ok(ResolvedConfig::resolve(file, |key| std::env::var(key).ok()))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_dotenv_missing_file_is_quiet() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(dotenv_problem(Err(dotenvy::Error::Io(missing))).is_none());
        assert!(dotenv_problem(Ok(PathBuf::from(".env"))).is_none());
    }

    #[test]
    fn test_dotenv_malformed_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        std::fs::write(&path, "DISCORD_TOKEN=abc\nthis line has no equals sign\n").unwrap();

        // Parse without touching the process environment
        let parse_error = dotenvy::from_path_iter(&path)
            .unwrap()
            .find_map(|item| item.err())
            .unwrap();

        let problem = dotenv_problem(Err(parse_error)).unwrap();
        assert!(!problem.not_found());
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = ResolvedConfig::resolve(None, env_from(&[]));

        assert_eq!(config.thinking_reaction, DEFAULT_THINKING_REACTION);
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.inngest_base_url, inngest::DEFAULT_BASE_URL);
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert!(!config.production);
        assert!(config.config_file.is_none());
        assert!(matches!(config.require_discord_token(), Err(Error::Config(_))));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".inngestabot");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
discord:
  bot_id: "1001"
  thinking_reaction: "⏳"
backend:
  endpoint: http://localhost:8001/reply
server:
  address: 127.0.0.1:9000
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, Some("1.0".to_string()));

        let config = ResolvedConfig::resolve(Some((config_path.clone(), parsed)), env_from(&[]));
        assert_eq!(config.bot_id.as_deref(), Some("1001"));
        assert_eq!(config.thinking_reaction, "⏳");
        assert_eq!(config.require_backend_endpoint().unwrap(), "http://localhost:8001/reply");
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            backend: BackendSection {
                endpoint: Some("http://file".to_string()),
            },
            ..Default::default()
        };

        let config = ResolvedConfig::resolve(
            Some((PathBuf::from("/x/config.yaml"), file)),
            env_from(&[("OPENAI_ENDPOINT", "http://env"), ("DEPLOYMENT_ID", "abc")]),
        );

        assert_eq!(config.backend_endpoint.as_deref(), Some("http://env"));
        assert!(config.production);
    }

    #[test]
    fn test_summary_redacts_secrets() {
        let config = ResolvedConfig::resolve(
            None,
            env_from(&[("DISCORD_TOKEN", "very-secret"), ("INNGEST_EVENT_KEY", "key")]),
        );
        let summary = config.redacted_summary();

        assert_eq!(summary["DISCORD_TOKEN"], "[redacted]");
        assert_eq!(summary["INNGEST_EVENT_KEY"], "[redacted]");
        assert_eq!(summary["INNGEST_SIGNING_KEY"], "(unset)");
        assert!(!summary.values().any(|v| v.contains("very-secret")));

        let settings = config.adapter_settings();
        assert!(settings.has_event_key);
        assert!(!settings.has_signing_key);
    }
}
