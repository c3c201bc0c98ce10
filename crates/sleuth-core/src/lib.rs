pub mod contract;
pub mod telemetry;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// --- Types (wire shape of the diagnosis JSON) ---

/// Free-text bug report submitted for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BugInput {
    /// Error message, stack trace or bug description, passed to the model verbatim
    pub error_message: String,
}

impl BugInput {
    /// Returns `None` when the text is empty or whitespace only.
    pub fn new(error_message: impl Into<String>) -> Option<Self> {
        let error_message = error_message.into();
        if error_message.trim().is_empty() {
            return None;
        }
        Some(Self { error_message })
    }

    pub fn is_blank(&self) -> bool {
        self.error_message.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
pub enum Severity {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured diagnosis returned by the model, after normalization.
///
/// Only `title`, `severity`, `classification` and `confidence_score` are
/// required. Everything else defaults to empty, including explicit `null`s,
/// which models tend to emit for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct DiagnosisResult {
    /// Short descriptive title (max ~6 words)
    pub title: String,
    pub severity: Severity,
    /// Bug category, or "Unrelated Request" for off-topic input
    pub classification: String,
    /// Concise 1-2 sentence statement of the underlying cause
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "String")]
    pub root_cause: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "String")]
    pub explanation: String,
    /// Fix instructions; may contain markdown code blocks
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "String")]
    pub suggested_fix: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "Vec<String>")]
    pub reproduction_steps: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "String")]
    pub prevention_strategy: String,
    /// Model's confidence, 0-100. Not range-checked.
    pub confidence_score: f64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl DiagnosisResult {
    /// True when the model flagged the input as not being a bug report.
    pub fn is_unrelated(&self) -> bool {
        self.classification == contract::UNRELATED_SENTINEL
            || self.classification.to_lowercase().contains("unrelated")
    }

    pub fn verdict(&self) -> Verdict<'_> {
        if !self.is_unrelated() {
            return Verdict::Diagnosed(self);
        }
        let explanation = if self.explanation.trim().is_empty() {
            contract::UNRELATED_FALLBACK
        } else {
            self.explanation.as_str()
        };
        Verdict::Rejected { explanation }
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        ConfidenceBand::from_score(self.confidence_score)
    }
}

/// What a caller should do with a normalized result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict<'a> {
    Diagnosed(&'a DiagnosisResult),
    Rejected { explanation: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    Low,
    Moderate,
    High,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score < 60.0 {
            ConfidenceBand::Low
        } else if score < 85.0 {
            ConfidenceBand::Moderate
        } else {
            ConfidenceBand::High
        }
    }
}

/// JSON Schema of [`DiagnosisResult`].
pub fn diagnosis_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(DiagnosisResult);
    serde_json::to_value(&schema).unwrap_or(serde_json::Value::Null)
}

// --- Credential ---

/// Environment variable holding the bearer token for the model endpoint.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Bearer token for the model endpoint. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV).ok().and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

// --- Storage ---

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve the global Sleuth directory (~/.sleuth/).
pub fn sleuth_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sleuth")
}

/// Load `~/.sleuth/env` and the nearest project `.env` into the process
/// environment. Variables that are already set win.
pub fn load_env() {
    let global = sleuth_dir().join("env");
    if let Err(e) = merge_env_file(&global) {
        tracing::warn!(path = %global.display(), error = %e, "failed to load env file");
    }
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => {
            tracing::warn!(error = %e, "failed to load project .env");
        }
        _ => {}
    }
}

/// Merge one env file into the process environment. A missing file is fine.
fn merge_env_file(path: &Path) -> Result<(), dotenvy::Error> {
    match dotenvy::from_path(path) {
        Err(e) if e.not_found() => Ok(()),
        other => other,
    }
}

// --- AI Settings ---

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_REFERER: &str = "http://localhost";
pub const DEFAULT_APP_TITLE: &str = "Smart Bug Diagnosis Assistant";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    /// Chat-completion URL
    pub endpoint: String,
    pub model: String,
    /// Sent as `HTTP-Referer`
    pub referer: String,
    /// Sent as `X-Title`
    pub app_title: String,
    /// Client-side request timeout. `None` leaves it to the HTTP layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            timeout_secs: None,
        }
    }
}

pub fn settings_path() -> PathBuf {
    sleuth_dir().join("settings.json")
}

pub fn read_settings() -> AiSettings {
    read_settings_from(&settings_path())
}

/// Missing or unparseable files fall back to defaults.
pub fn read_settings_from(path: &Path) -> AiSettings {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn write_settings(settings: &AiSettings) -> Result<(), SettingsError> {
    write_settings_to(&settings_path(), settings)
}

/// Atomic write (temp file + rename) so a concurrent reader never sees a
/// truncated file.
pub fn write_settings_to(path: &Path, settings: &AiSettings) -> Result<(), SettingsError> {
    let io_err = |source: std::io::Error| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
