use std::{
    fs,
    path::Path,
    time::Duration,
};

use anyhow::Context;
use client_core::GraphqlStoreConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub log_filter: String,
    pub prefill_edit_buffer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            request_timeout_secs: 30,
            log_filter: "warn".into(),
            prefill_edit_buffer: false,
        }
    }
}

impl Settings {
    /// `None` when no endpoint is configured.
    pub fn store_config(&self) -> Option<GraphqlStoreConfig> {
        let endpoint = self.endpoint.as_deref().map(str::trim)?;
        if endpoint.is_empty() {
            return None;
        }
        let mut config = GraphqlStoreConfig::new(endpoint);
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.clone());
        }
        if self.request_timeout_secs > 0 {
            config = config.with_request_timeout(Duration::from_secs(self.request_timeout_secs));
        }
        Some(config)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
    prefill_edit_buffer: Option<bool>,
}

/// The subset of an Amplify `amplifyconfiguration.json` / aws-exports file we read.
#[derive(Debug, Default, Deserialize)]
struct AmplifyExports {
    #[serde(rename = "aws_appsync_graphqlEndpoint")]
    endpoint: Option<String>,
    #[serde(rename = "aws_appsync_apiKey")]
    api_key: Option<String>,
    #[serde(rename = "aws_appsync_authenticationType")]
    authentication_type: Option<String>,
}

/// Settings plus notices raised while reading them. Loading happens before
/// the log subscriber exists, so the caller logs `warnings` once it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub warnings: Vec<String>,
}

/// Layers defaults, the TOML file, Amplify exports and environment, in that order.
pub fn load_settings(
    config_path: Option<&Path>,
    amplify_path: Option<&Path>,
) -> anyhow::Result<LoadedSettings> {
    let mut settings = Settings::default();
    let mut warnings = Vec::new();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    if let Some(path) = amplify_path {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read amplify config '{}'", path.display()))?;
        let notice = apply_amplify(&mut settings, &raw)
            .with_context(|| format!("invalid amplify config '{}'", path.display()))?;
        warnings.extend(notice);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(LoadedSettings { settings, warnings })
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.endpoint {
        settings.endpoint = Some(v);
    }
    if let Some(v) = file_cfg.api_key {
        settings.api_key = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.prefill_edit_buffer {
        settings.prefill_edit_buffer = v;
    }
    Ok(())
}

/// Returns a notice when the exports name an auth mode other than `API_KEY`.
fn apply_amplify(settings: &mut Settings, raw: &str) -> anyhow::Result<Option<String>> {
    let exports: AmplifyExports = serde_json::from_str(raw)?;
    let notice = exports
        .authentication_type
        .as_deref()
        .filter(|auth| *auth != "API_KEY")
        .map(|auth| {
            format!(
                "amplify config uses {auth} authentication; only API_KEY is supported and requests may be rejected"
            )
        });
    if let Some(v) = exports.endpoint {
        settings.endpoint = Some(v);
    }
    if let Some(v) = exports.api_key {
        settings.api_key = Some(v);
    }
    Ok(notice)
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TODO_ENDPOINT") {
        settings.endpoint = Some(v);
    }
    if let Some(v) = lookup("APP__ENDPOINT") {
        settings.endpoint = Some(v);
    }

    if let Some(v) = lookup("TODO_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__PREFILL_EDIT_BUFFER") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.prefill_edit_buffer = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
