use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "gallery.toml";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Fixture,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GallerySettings {
    pub backend: BackendKind,
    pub api_url: String,
    /// Uniform fixture latency; `None` keeps the per-operation defaults.
    pub fixture_latency_ms: Option<u64>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Fixture,
            api_url: DEFAULT_API_URL.into(),
            fixture_latency_ms: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    backend: Option<BackendKind>,
    api_url: Option<String>,
    fixture_latency_ms: Option<u64>,
}

impl GallerySettings {
    pub fn apply_toml(&mut self, raw: &str) -> Result<()> {
        let file_cfg: FileSettings = toml::from_str(raw).context("invalid gallery settings")?;
        if let Some(backend) = file_cfg.backend {
            self.backend = backend;
        }
        if let Some(api_url) = file_cfg.api_url {
            self.api_url = api_url;
        }
        if file_cfg.fixture_latency_ms.is_some() {
            self.fixture_latency_ms = file_cfg.fixture_latency_ms;
        }
        Ok(())
    }

    /// Applies `GALLERY_*` variables, then their `APP__*` aliases.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ["GALLERY_API_URL", "APP__API_URL"] {
            if let Some(v) = lookup(key) {
                self.api_url = v;
            }
        }
        for key in ["GALLERY_USE_FIXTURE", "APP__USE_FIXTURE"] {
            if let Some(v) = lookup(key) {
                self.backend = if parse_flag(&v).with_context(|| format!("invalid {key}"))? {
                    BackendKind::Fixture
                } else {
                    BackendKind::Remote
                };
            }
        }
        if let Some(v) = lookup("GALLERY_FIXTURE_LATENCY_MS") {
            let ms = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid GALLERY_FIXTURE_LATENCY_MS: {v}"))?;
            self.fixture_latency_ms = Some(ms);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .with_context(|| format!("invalid api_url: {}", self.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_url must use http or https: {}", self.api_url);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

/// Defaults, then the settings file, then the environment. An explicit
/// `path` must exist; the default `gallery.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> Result<GallerySettings> {
    let mut settings = GallerySettings::default();

    let path = match path {
        Some(path) => Some(path),
        None => Some(Path::new(DEFAULT_CONFIG_PATH)).filter(|path| path.exists()),
    };
    if let Some(path) = path {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        settings.apply_toml(&raw)?;
    }

    settings.apply_env(|key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
