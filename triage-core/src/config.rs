use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Runtime settings for the triage pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Minimum prediction confidence that resolves a disambiguation.
    pub confidence_threshold: f64,
    /// Number of follow-up questions asked before giving up.
    pub max_attempts: u32,
    /// Replies that end a disambiguation, matched case-insensitively.
    pub decline_words: Vec<String>,
    /// Similarity (0-100) a condition lookup has to exceed.
    pub match_threshold: f64,
    pub inference_timeout_ms: u64,
    pub conditions_path: PathBuf,
    pub intents_path: PathBuf,
    pub max_transcript_messages: usize,
    /// Longest message, in chars, accepted at the service boundary.
    pub max_text_chars: usize,
    /// Sessions idle for longer than this are evicted from in-memory storage.
    pub session_ttl_secs: u64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            max_attempts: 5,
            decline_words: ["no", "nah", "nope", "none"]
                .into_iter()
                .map(String::from)
                .collect(),
            match_threshold: 60.0,
            inference_timeout_ms: 5_000,
            conditions_path: PathBuf::from("data/conditions.json"),
            intents_path: PathBuf::from("data/intents.json"),
            max_transcript_messages: 50,
            max_text_chars: 2_000,
            session_ttl_secs: 3_600,
        }
    }
}

impl TriageConfig {
    /// Defaults, then the YAML file named by `TRIAGE_CONFIG`, then `TRIAGE_*` overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("TRIAGE_CONFIG") {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };

        if let Some(v) = lookup("TRIAGE_CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = parse_var("TRIAGE_CONFIDENCE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_MAX_ATTEMPTS") {
            config.max_attempts = parse_var("TRIAGE_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_DECLINE_WORDS") {
            config.decline_words = v
                .split(',')
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect();
        }
        if let Some(v) = lookup("TRIAGE_MATCH_THRESHOLD") {
            config.match_threshold = parse_var("TRIAGE_MATCH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_INFERENCE_TIMEOUT_MS") {
            config.inference_timeout_ms = parse_var("TRIAGE_INFERENCE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_CONDITIONS_PATH") {
            config.conditions_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRIAGE_INTENTS_PATH") {
            config.intents_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TRIAGE_MAX_TRANSCRIPT_MESSAGES") {
            config.max_transcript_messages = parse_var("TRIAGE_MAX_TRANSCRIPT_MESSAGES", &v)?;
        }

        if let Some(v) = lookup("TRIAGE_MAX_TEXT_CHARS") {
            config.max_text_chars = parse_var("TRIAGE_MAX_TEXT_CHARS", &v)?;
        }
        if let Some(v) = lookup("TRIAGE_SESSION_TTL_SECS") {
            config.session_ttl_secs = parse_var("TRIAGE_SESSION_TTL_SECS", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("cannot read {path}: {e}")))?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| TriageError::Config(format!("invalid YAML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TriageError::Config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !(0.0..=100.0).contains(&self.match_threshold) {
            return Err(TriageError::Config(format!(
                "match_threshold must be within [0, 100], got {}",
                self.match_threshold
            )));
        }
        if self.inference_timeout_ms == 0 {
            return Err(TriageError::Config(
                "inference_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_text_chars == 0 {
            return Err(TriageError::Config(
                "max_text_chars must be positive".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(TriageError::Config(
                "session_ttl_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| TriageError::Config(format!("{key}={value:?}: {e}")))
}
