use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub server_public_url: Option<String>,
    pub render_timeout_ms: u64,
    pub login_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/snippets.db".into(),
            server_public_url: None,
            render_timeout_ms: 2_000,
            login_path: client_core::DEFAULT_LOGIN_URL.into(),
        }
    }
}

impl Settings {
    /// Where identity-guarded actions send the browser. Absolute when the
    /// server knows its public address, so proxies keep the right host.
    pub fn login_url(&self) -> String {
        match self.server_public_url.as_deref().map(str::trim) {
            Some(public) if !public.is_empty() && self.login_path.starts_with('/') => {
                format!("{}{}", public.trim_end_matches('/'), self.login_path)
            }
            _ => self.login_path.clone(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_settings(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unparsable server.toml");
            return;
        }
    };

    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("server_public_url").and_then(toml::Value::as_str) {
        settings.server_public_url = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("render_timeout_ms") {
        let parsed = v
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()));
        if let Some(ms) = parsed {
            settings.render_timeout_ms = ms;
        }
    }
    if let Some(v) = file_cfg.get("login_path").and_then(toml::Value::as_str) {
        settings.login_path = v.to_string();
    }
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("SERVER_PUBLIC_URL") {
        settings.server_public_url = Some(v);
    }

    if let Some(v) = var("APP__RENDER_TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.render_timeout_ms = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__RENDER_TIMEOUT_MS"),
        }
    }

    if let Some(v) = var("APP__LOGIN_PATH") {
        settings.login_path = v;
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
