use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_filter: String,
    pub password_length: usize,
    pub max_password_tries: u8,
    /// Emit a progress line every this many applied events; 0 disables it.
    pub progress_log_interval: u64,
    pub feed_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            password_length: 4,
            max_password_tries: 3,
            progress_log_interval: 500,
            feed_capacity: 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(DEFAULT_SETTINGS_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, &raw);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };

    if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
        settings.log_filter = v.to_string();
    }
    if let Some(v) = file_cfg.get("password_length").and_then(toml::Value::as_integer) {
        if let Ok(parsed) = usize::try_from(v) {
            settings.password_length = parsed;
        }
    }
    if let Some(v) = file_cfg
        .get("max_password_tries")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(parsed) = u8::try_from(v) {
            settings.max_password_tries = parsed;
        }
    }
    if let Some(v) = file_cfg
        .get("progress_log_interval")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(parsed) = u64::try_from(v) {
            settings.progress_log_interval = parsed;
        }
    }
    if let Some(v) = file_cfg.get("feed_capacity").and_then(toml::Value::as_integer) {
        if let Ok(parsed) = usize::try_from(v) {
            settings.feed_capacity = parsed;
        }
    }
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(parsed) = var("APP__PASSWORD_LENGTH").and_then(|v| v.parse().ok()) {
        settings.password_length = parsed;
    }
    if let Some(parsed) = var("APP__MAX_PASSWORD_TRIES").and_then(|v| v.parse().ok()) {
        settings.max_password_tries = parsed;
    }
    if let Some(parsed) = var("APP__PROGRESS_LOG_INTERVAL").and_then(|v| v.parse().ok()) {
        settings.progress_log_interval = parsed;
    }
    if let Some(parsed) = var("APP__FEED_CAPACITY").and_then(|v| v.parse().ok()) {
        settings.feed_capacity = parsed;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
