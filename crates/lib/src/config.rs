//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.line-notion-relay/config.json`) and environment.
//! Environment variables win over file values so the relay can run from env alone.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_TEXT_PROPERTY: &str = "Text";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LINE Messaging API channel credentials.
    #[serde(default)]
    pub line: LineConfig,

    /// Notion integration and target database.
    #[serde(default)]
    pub notion: NotionConfig,
}

/// Bind address and port for the webhook server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// LINE channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineConfig {
    /// Secret used to verify X-Line-Signature. Overridden by CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// Long-lived channel access token. Overridden by CHANNEL_ACCESS_TOKEN env.
    pub channel_access_token: Option<String>,
}

/// Notion config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionConfig {
    /// Internal integration token. Overridden by NOTION_INTEGRATION_TOKEN env.
    pub integration_token: Option<String>,
    /// Target database id. Overridden by NOTION_DATABASE_ID env.
    pub database_id: Option<String>,
    /// API base URL (default https://api.notion.com).
    pub base_url: Option<String>,
    /// Value of the Notion-Version header (default 2022-06-28).
    pub version: Option<String>,
    /// Title property that receives forwarded chat text (default "Text").
    pub text_property: Option<String>,
}

/// Trimmed, non-empty env value.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_value(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the LINE channel secret: env CHANNEL_SECRET overrides config.
pub fn resolve_channel_secret(config: &Config) -> Option<String> {
    env_value("CHANNEL_SECRET").or_else(|| config_value(&config.line.channel_secret))
}

/// Resolve the LINE channel access token: env CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_channel_access_token(config: &Config) -> Option<String> {
    env_value("CHANNEL_ACCESS_TOKEN").or_else(|| config_value(&config.line.channel_access_token))
}

/// Resolve the Notion integration token: env NOTION_INTEGRATION_TOKEN overrides config.
pub fn resolve_notion_token(config: &Config) -> Option<String> {
    env_value("NOTION_INTEGRATION_TOKEN").or_else(|| config_value(&config.notion.integration_token))
}

/// Resolve the Notion database id: env NOTION_DATABASE_ID overrides config.
pub fn resolve_notion_database_id(config: &Config) -> Option<String> {
    env_value("NOTION_DATABASE_ID").or_else(|| config_value(&config.notion.database_id))
}

/// Resolve the server port: env PORT overrides config. An unparsable PORT is an error.
pub fn resolve_port(config: &Config) -> Result<u16> {
    match env_value("PORT") {
        Some(p) => p
            .parse()
            .with_context(|| format!("parsing PORT value {:?}", p)),
        None => Ok(config.gateway.port),
    }
}

/// Everything the relay needs at runtime, validated once at startup.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind: String,
    pub port: u16,
    pub channel_secret: String,
    pub channel_access_token: Option<String>,
    pub notion: NotionSettings,
}

/// Notion connection settings shared by the server and the CLI record commands.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub integration_token: String,
    pub database_id: String,
    pub base_url: String,
    pub version: String,
    pub text_property: String,
}

impl NotionSettings {
    /// Resolve Notion settings from env + config. Token and database id are required.
    pub fn resolve(config: &Config) -> Result<Self> {
        let integration_token = resolve_notion_token(config).context(
            "notion integration token not configured (set NOTION_INTEGRATION_TOKEN or notion.integrationToken)",
        )?;
        let database_id = resolve_notion_database_id(config).context(
            "notion database id not configured (set NOTION_DATABASE_ID or notion.databaseId)",
        )?;
        let base_url = config_value(&config.notion.base_url)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string());
        let version = config_value(&config.notion.version)
            .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string());
        let text_property = config_value(&config.notion.text_property)
            .unwrap_or_else(|| DEFAULT_TEXT_PROPERTY.to_string());
        Ok(Self {
            integration_token,
            database_id,
            base_url,
            version,
            text_property,
        })
    }
}

impl ResolvedConfig {
    /// Resolve and validate the full server config. The channel secret is required; the access
    /// token is optional because the relay never calls the LINE API.
    pub fn resolve(config: &Config) -> Result<Self> {
        let channel_secret = resolve_channel_secret(config).context(
            "LINE channel secret not configured (set CHANNEL_SECRET or line.channelSecret)",
        )?;
        let channel_access_token = resolve_channel_access_token(config);
        if channel_access_token.is_none() {
            log::debug!("CHANNEL_ACCESS_TOKEN not set; not needed for forwarding");
        }
        Ok(Self {
            bind: config.gateway.bind.trim().to_string(),
            port: resolve_port(config)?,
            channel_secret,
            channel_access_token,
            notion: NotionSettings::resolve(config)?,
        })
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".line-notion-relay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, RELAY_CONFIG_PATH, or the default path. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write a default config file (with empty credential slots) if none exists. Returns true when written.
pub fn init_config_file(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        log::debug!("config already exists at {}, skipping", path.display());
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(&Config::default())
        .context("serializing default config")?;
    std::fs::write(path, body)
        .with_context(|| format!("writing default config to {}", path.display()))?;
    log::info!("created default config at {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 8080);
        assert_eq!(g.bind, "0.0.0.0");
    }

    #[test]
    fn parses_camel_case_sections() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 9000 },
                "line": { "channelSecret": "s3cret" },
                "notion": { "databaseId": "db", "textProperty": "Message", "baseUrl": "http://localhost:1/" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.line.channel_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.notion.database_id.as_deref(), Some("db"));
        assert_eq!(config.notion.text_property.as_deref(), Some("Message"));
    }

    #[test]
    fn blank_config_values_are_treated_as_unset() {
        assert_eq!(config_value(&Some("   ".to_string())), None);
        assert_eq!(config_value(&Some(" tok ".to_string())), Some("tok".to_string()));
        assert_eq!(config_value(&None), None);
    }

    #[test]
    fn notion_settings_defaults_and_trailing_slash() {
        let mut config = Config::default();
        config.notion.integration_token = Some("secret_abc".to_string());
        config.notion.database_id = Some("db123".to_string());
        config.notion.base_url = Some("http://127.0.0.1:9999/".to_string());
        // Env may override these in a developer shell; only assert what env cannot change.
        let settings = NotionSettings::resolve(&config).unwrap();
        assert_eq!(settings.base_url, "http://127.0.0.1:9999");
        assert_eq!(settings.version, DEFAULT_NOTION_VERSION);
        assert_eq!(settings.text_property, DEFAULT_TEXT_PROPERTY);
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join("relay-config-missing")
            .join("does-not-exist.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 8080);
    }
}
