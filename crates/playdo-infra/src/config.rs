//! Configuration loading for Playdo.
//!
//! Reads `config.toml` from the data directory (`~/.playdo/` in production)
//! and deserializes it into [`PlaydoConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed. Environment variables override
//! individual settings.

use std::path::{Path, PathBuf};

use playdo_types::config::PlaydoConfig;
use secrecy::SecretString;

/// Overrides the data directory (default `~/.playdo`).
pub const DATA_DIR_ENV: &str = "PLAYDO_DATA_DIR";
/// Overrides the database URL (default `sqlite://{data_dir}/playdo.db?mode=rwc`).
pub const DATABASE_URL_ENV: &str = "PLAYDO_DATABASE_URL";
/// Overrides the upstream model from `config.toml`.
pub const MODEL_ENV: &str = "PLAYDO_ANTHROPIC_MODEL";
/// Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Load configuration from `{data_dir}/config.toml`, then apply env overrides.
///
/// - If the file does not exist, starts from [`PlaydoConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and uses the default.
pub async fn load_config(data_dir: &Path) -> PlaydoConfig {
    let config = read_config_file(data_dir).await;
    apply_overrides(config, std::env::var(MODEL_ENV).ok())
}

async fn read_config_file(data_dir: &Path) -> PlaydoConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return PlaydoConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return PlaydoConfig::default();
        }
    };

    match toml::from_str::<PlaydoConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            PlaydoConfig::default()
        }
    }
}

fn apply_overrides(mut config: PlaydoConfig, model: Option<String>) -> PlaydoConfig {
    if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
        config.model = model;
    }
    config
}

/// Resolve the data directory.
///
/// Checks `PLAYDO_DATA_DIR` first, then falls back to `~/.playdo`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".playdo");
    }

    // Last resort: current directory
    PathBuf::from(".playdo")
}

/// Database URL: `PLAYDO_DATABASE_URL`, or the SQLite file in the data directory.
pub fn database_url(data_dir: &Path) -> String {
    std::env::var(DATABASE_URL_ENV).unwrap_or_else(|_| default_database_url(data_dir))
}

fn default_database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("playdo.db").display())
}

/// The Anthropic API key, if set and non-empty.
pub fn anthropic_api_key() -> Option<SecretString> {
    std::env::var(ANTHROPIC_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}
