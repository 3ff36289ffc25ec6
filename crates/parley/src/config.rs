//! Application configuration.
//!
//! Layers, lowest priority first: built-in defaults, the TOML config file,
//! `PARLEY__SECTION__KEY` environment variables. The conventional `PORT` and
//! `GROQ_API_KEY` variables are honored on top of that (see
//! [`AppConfig::apply_env_fallbacks`]).

use anyhow::{Context, Result, anyhow, bail};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "parley";

/// Environment variable carrying the provider key when the config has none.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file. Supports ~ and environment variables.
    /// Default: `{data_dir}/chat.db`
    pub path: Option<String>,
}

/// Completion provider (OpenAI-compatible chat completions) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key. Falls back to the GROQ_API_KEY environment variable.
    pub api_key: Option<String>,
    /// Base URL of the API (the client appends `/chat/completions`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f64,
    /// Upper bound on generated tokens per reply.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional system prompt sent ahead of each user message.
    pub system_prompt: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 60,
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Fill gaps from conventional, unprefixed environment variables.
    ///
    /// `PORT` yields to `PARLEY__SERVER__PORT` and must parse as a port.
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefixed_port = format!("{}__SERVER__PORT", env_prefix());
        if let (None, Some(raw)) = (lookup(&prefixed_port), lookup("PORT")) {
            self.server.port = raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number (got {raw:?})"))?;
        }

        let has_key = self
            .provider
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        let env_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());
        if let (false, Some(key)) = (has_key, env_key) {
            self.provider.api_key = Some(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be between 1 and 65535");
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            bail!(
                "provider.temperature must be between 0.0 and 2.0 (got {})",
                self.provider.temperature
            );
        }
        if self.provider.max_tokens == 0 {
            bail!("provider.max_tokens must be greater than 0");
        }
        if self.provider.timeout_secs == 0 {
            bail!("provider.timeout_secs must be greater than 0");
        }
        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            bail!(
                "provider.base_url must be an http(s) URL (got {})",
                self.provider.base_url
            );
        }
        Ok(())
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.provider.api_key.is_some() {
            copy.provider.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_file: PathBuf,
}

impl AppPaths {
    pub fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        let data_dir = default_data_dir()?;
        let database_file = data_dir.join("chat.db");

        Ok(Self {
            config_file,
            data_dir,
            database_file,
        })
    }

    pub fn apply_overrides(mut self, cfg: &AppConfig) -> Result<Self> {
        if let Some(ref db_override) = cfg.database.path {
            self.database_file = expand_str_path(db_override)?;
        }
        Ok(self)
    }
}

impl fmt::Display for AppPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config: {}, data: {}, database: {}",
            self.config_file.display(),
            self.data_dir.display(),
            self.database_file.display()
        )
    }
}

/// Load configuration, writing the default file first if none exists.
pub fn load_or_init_config(paths: &AppPaths, dry_run: bool) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        if dry_run {
            tracing::info!(
                "dry-run: would create default config at {}",
                paths.config_file.display()
            );
        } else {
            write_default_config(&paths.config_file)?;
        }
    }

    let mut config = load_config(&paths.config_file)?;
    config.apply_env_fallbacks(|name| env::var(name).ok())?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Build the layered configuration from `path` and `PARLEY__*` variables.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let defaults = ServerConfig::default();
    let built = Config::builder()
        .set_default("logging.level", "info")?
        .set_default("server.host", defaults.host)?
        .set_default("server.port", i64::from(defaults.port))?
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(env_prefix().as_str())
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("reading config from {}", path.display()))?;

    built
        .try_deserialize()
        .context("deserializing configuration")
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push_str("# Set provider.api_key here or export ");
    buffer.push_str(API_KEY_ENV);
    buffer.push_str(" to enable AI replies.\n");
    buffer.push('\n');
    buffer
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::data_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
