use std::{collections::HashMap, fs};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/perfumes.db";
const SETTINGS_FILE: &str = "server.toml";

/// Plain variable names accepted alongside the `APP__` ones.
const LEGACY_ENV_ALIASES: [(&str, &str); 2] = [
    ("SERVER_BIND", "APP__BIND_ADDR"),
    ("DATABASE_URL", "APP__DATABASE_URL"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_url: DEFAULT_DATABASE_URL.into(),
        }
    }
}

/// Loads `.env`, then layers defaults, `server.toml`, and environment
/// variables. `APP__*` beats the plain legacy names.
pub fn load_settings() -> anyhow::Result<Settings> {
    dotenvy::dotenv().ok();

    let file = match fs::read_to_string(SETTINGS_FILE) {
        Ok(raw) => Some(raw),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read {SETTINGS_FILE}"));
        }
    };
    let env: HashMap<String, String> = std::env::vars().collect();
    settings_from_sources(file.as_deref(), &env)
}

fn settings_from_sources(
    file: Option<&str>,
    env: &HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let mut builder = Config::builder()
        .set_default("bind_addr", DEFAULT_BIND_ADDR)?
        .set_default("database_url", DEFAULT_DATABASE_URL)?;

    if let Some(raw) = file {
        builder = builder.add_source(File::from_str(raw, FileFormat::Toml));
    }

    let legacy: HashMap<String, String> = LEGACY_ENV_ALIASES
        .iter()
        .filter_map(|(legacy, key)| env.get(*legacy).map(|v| (key.to_string(), v.clone())))
        .collect();

    let settings = builder
        .add_source(app_environment(legacy))
        .add_source(app_environment(env.clone()))
        .build()
        .context("failed to assemble settings")?
        .try_deserialize()
        .context("invalid settings")?;
    Ok(settings)
}

fn app_environment(vars: HashMap<String, String>) -> Environment {
    Environment::with_prefix("APP")
        .separator("__")
        .source(Some(vars))
}

/// Turns plain paths into `sqlite:` URLs. `Storage::new` creates the parent
/// directory.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if is_windows_drive_path(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    if is_windows_drive_path(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
