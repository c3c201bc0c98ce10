use std::path::Path;

use clap::Args;
use console::style;
use sleuth_core::{AiSettings, Credential};

/// Per-invocation overrides on top of ~/.sleuth/settings.json.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Model identifier, e.g. "openai/gpt-4o-mini"
    #[arg(long, env = "SLEUTH_MODEL")]
    pub model: Option<String>,

    /// Chat-completion endpoint URL
    #[arg(long, env = "SLEUTH_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds; 0 or unset means none
    #[arg(long, env = "SLEUTH_TIMEOUT_SECS")]
    pub timeout: Option<u64>,
}

impl Overrides {
    pub fn apply(self, mut settings: AiSettings) -> AiSettings {
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(endpoint) = self.endpoint {
            settings.endpoint = endpoint;
        }
        if self.timeout.is_some() {
            settings.timeout_secs = self.timeout;
        }
        settings
    }
}

/// Values persisted by `sleuth config set`.
#[derive(Debug, Default, Args)]
pub struct SettingsUpdate {
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Sent as the HTTP-Referer header
    #[arg(long)]
    pub referer: Option<String>,
    /// Sent as the X-Title header
    #[arg(long)]
    pub title: Option<String>,
    /// Request timeout in seconds; 0 removes it
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.endpoint.is_none()
            && self.referer.is_none()
            && self.title.is_none()
            && self.timeout.is_none()
    }

    pub fn apply(self, mut settings: AiSettings) -> AiSettings {
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(endpoint) = self.endpoint {
            settings.endpoint = endpoint;
        }
        if let Some(referer) = self.referer {
            settings.referer = referer;
        }
        if let Some(title) = self.title {
            settings.app_title = title;
        }
        match self.timeout {
            Some(0) => settings.timeout_secs = None,
            Some(secs) => settings.timeout_secs = Some(secs),
            None => {}
        }
        settings
    }
}

pub fn describe(settings: &AiSettings, path: &Path, credential: Option<&Credential>) -> String {
    let key_status = match credential {
        Some(_) => style("(configured)").green(),
        None => style("(not set)").dim(),
    };
    let timeout = settings
        .timeout_secs
        .map(|s| format!("{s}s"))
        .unwrap_or_else(|| "none".to_string());

    let rows = [
        ("settings", path.display().to_string()),
        ("endpoint", settings.endpoint.clone()),
        ("model", settings.model.clone()),
        ("referer", settings.referer.clone()),
        ("title", settings.app_title.clone()),
        ("timeout", timeout),
        (sleuth_core::API_KEY_ENV, key_status.to_string()),
    ];

    rows.iter()
        .map(|(k, v)| format!("  {} {}\n", style(k).cyan().bold(), v))
        .collect()
}
