use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{transport::parse_endpoint, HttpTransportOptions, DEFAULT_GRAPHQL_URL};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "conference.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graphql_url: String,
    pub request_timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.into(),
            request_timeout_secs: 30,
            accept_invalid_certs: false,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn transport_options(&self) -> HttpTransportOptions {
        HttpTransportOptions {
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Defaults, then the config file, then environment variables.
///
/// An explicitly named file must exist; the default `conference.toml` is
/// optional.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut settings = read_config_file(&path, explicit.is_some())?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate(&settings)?;
    Ok(settings)
}

/// Parses `path`. Only a missing optional file falls back to defaults.
pub fn read_config_file(path: &Path, required: bool) -> anyhow::Result<Settings> {
    match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => Ok(Settings::default()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }
}

pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("GRAPHQL_URL") {
        settings.graphql_url = v;
    }
    if let Some(v) = lookup("APP__GRAPHQL_URL") {
        settings.graphql_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS must be an integer, got '{v}'"))?;
    }

    if let Some(v) = lookup("APP__ACCEPT_INVALID_CERTS") {
        settings.accept_invalid_certs = match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => bail!("APP__ACCEPT_INVALID_CERTS must be a boolean, got '{other}'"),
        };
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    Ok(())
}

pub fn validate(settings: &Settings) -> anyhow::Result<()> {
    parse_endpoint(&settings.graphql_url).context("graphql_url is not a usable endpoint")?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
