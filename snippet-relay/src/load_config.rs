//! `load_config` module: loads the static YAML config and injects secrets from the environment.
//!
//! The YAML file carries everything that is safe to commit: paths, the
//! folder → identity table, Notion property names and payload metadata.
//! Tokens, database ids and endpoint URLs come from environment variables
//! (a `.env` file is loaded by `main`).
//!
//! # Errors
//! Every failure here is a [`ConfigError`], which the CLI maps to exit code 1
//! before any remote call is made.

use chrono::NaiveDate;
use serde::Deserialize;
use snippet_relay_core::config::{default_extensions, ExportConfig, NotionSchema, UploadConfig};
use snippet_relay_core::error::ConfigError;
use snippet_relay_core::identity::IdentityDirectory;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const NOTION_DB_ID: &str = "NOTION_DB_ID";
pub const NOTION_API_URL: &str = "NOTION_API_URL";
pub const TARGET_DATE: &str = "TARGET_DATE";
pub const DAILY_SNIPPET_URL: &str = "DAILY_SNIPPET_URL";
pub const DAILY_SNIPPET_API_KEY: &str = "DAILY_SNIPPET_API_KEY";
pub const API_ID: &str = "API_ID";
pub const FORCE_FULL: &str = "FORCE_FULL";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub snippets_dir: PathBuf,
    pub export_map: PathBuf,
    pub state_file: PathBuf,
    pub extension: String,
    pub identities: IdentityDirectory,
    pub notion: NotionSchema,
    pub upload: UploadSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            snippets_dir: PathBuf::from("snippets"),
            export_map: PathBuf::from(".cache/notion-map.json"),
            state_file: PathBuf::from(".snippet_state.json"),
            extension: "txt".into(),
            identities: IdentityDirectory::default(),
            notion: NotionSchema::default(),
            upload: UploadSection::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub team_name: String,
    pub allowed_extensions: Vec<String>,
    pub mark_processed: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            team_name: "7기-2팀".into(),
            allowed_extensions: default_extensions(),
            mark_processed: false,
            metadata: serde_json::Map::new(),
        }
    }
}

impl CliConfig {
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            snippets_dir: self.snippets_dir.clone(),
            export_map: self.export_map.clone(),
            extension: self.extension.trim_start_matches('.').to_string(),
            identities: self.identities.clone(),
            title: self.notion.title.clone(),
        }
    }

    pub fn upload_config(&self, api_id: Option<String>, force: bool) -> UploadConfig {
        UploadConfig {
            snippets_dir: self.snippets_dir.clone(),
            state_file: self.state_file.clone(),
            export_map: self.export_map.clone(),
            identities: self.identities.clone(),
            allowed_extensions: self.upload.allowed_extensions.clone(),
            team_name: self.upload.team_name.clone(),
            api_id,
            metadata: self.upload.metadata.clone(),
            force,
        }
    }
}

/// Loads the YAML config file. Fails when the file is unreadable, malformed,
/// or defines no identities.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(ConfigError::Read {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(ConfigError::Parse(e.to_string()));
        }
    };

    if config.identities.is_empty() {
        error!(config_path = ?path_ref, "No identities configured");
        return Err(ConfigError::missing("identities"));
    }
    if config.upload.allowed_extensions.is_empty() {
        return Err(ConfigError::invalid(
            "upload.allowed_extensions",
            "at least one extension is required",
        ));
    }

    info!(
        identities = config.identities.len(),
        snippets_dir = %config.snippets_dir.display(),
        "Config loaded"
    );
    Ok(config)
}

/// Credentials for the Notion database.
#[derive(Debug, Clone)]
pub struct NotionSecrets {
    pub token: String,
    pub database_id: String,
    /// Override of the API host, mainly for tests.
    pub base_url: Option<String>,
}

pub fn notion_secrets() -> Result<NotionSecrets, ConfigError> {
    let token = required_env(NOTION_TOKEN)?;
    let database_id = required_env(NOTION_DB_ID)?;
    info!("NOTION_TOKEN and NOTION_DB_ID found in env");
    Ok(NotionSecrets {
        token,
        database_id,
        base_url: optional_env(NOTION_API_URL),
    })
}

/// Ingestion endpoint settings. Without an API key, requests go out unauthenticated.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub api_id: Option<String>,
}

pub fn webhook_settings() -> Result<WebhookSettings, ConfigError> {
    let url = required_env(DAILY_SNIPPET_URL)?;
    let api_key = optional_env(DAILY_SNIPPET_API_KEY);
    if api_key.is_none() {
        warn!("DAILY_SNIPPET_API_KEY not set, uploading without authorization");
    }
    Ok(WebhookSettings {
        url,
        api_key,
        api_id: optional_env(API_ID),
    })
}

/// Export date: the CLI argument if given, else `TARGET_DATE` (first ten characters).
pub fn target_date(arg: Option<NaiveDate>) -> Result<NaiveDate, ConfigError> {
    if let Some(date) = arg {
        return Ok(date);
    }
    let raw = required_env(TARGET_DATE).map_err(|_| ConfigError::missing("TARGET_DATE (YYYY-MM-DD)"))?;
    let ymd = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d").map_err(|e| ConfigError::invalid(TARGET_DATE, e))
}

/// True when the variable is set to `1`.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v.trim() == "1").unwrap_or(false)
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    match optional_env(name) {
        Some(value) => Ok(value),
        None => {
            error!(var = name, "Required environment variable not set");
            Err(ConfigError::missing(name))
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
