use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use client_core::DEFAULT_API_URL;
use serde::Serialize;
use url::Url;

pub const SETTINGS_FILE: &str = "warp_studio.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub api_url: String,
    pub cloud_name: String,
    pub public_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            cloud_name: "demo".into(),
            public_id: "sample".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(Path::new(SETTINGS_FILE)) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Flat `key = "value"` table; unknown keys and malformed files are ignored.
fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("cloud_name") {
        settings.cloud_name = v.clone();
    }
    if let Some(v) = file_cfg.get("public_id") {
        settings.public_id = v.clone();
    }
}

/// Later names win: `REACT_APP_API_URL` < `WARP_API_URL` < `APP__API_URL`.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["REACT_APP_API_URL", "WARP_API_URL", "APP__API_URL"] {
        if let Some(v) = lookup(key) {
            settings.api_url = v;
        }
    }
    if let Some(v) = lookup("APP__CLOUD_NAME") {
        settings.cloud_name = v;
    }
    if let Some(v) = lookup("APP__PUBLIC_ID") {
        settings.public_id = v;
    }
}

pub fn normalize_api_url(raw_api_url: &str) -> anyhow::Result<String> {
    let raw_api_url = raw_api_url.trim();
    if raw_api_url.is_empty() {
        return Ok(Settings::default().api_url);
    }

    let with_scheme = if raw_api_url.contains("://") {
        raw_api_url.to_string()
    } else {
        format!("http://{raw_api_url}")
    };

    let parsed =
        Url::parse(&with_scheme).with_context(|| format!("invalid warp api url '{raw_api_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("warp api url must use http or https: '{raw_api_url}'");
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
