//! Run parameters and their validation.
//!
//! A [`RunConfig`] is either parsed from the raw strings a form collects
//! ([`RunInput`]) or loaded from a JSON file. Validation happens here so that
//! nothing reaches the key loop unless it is runnable.

use crate::error::ConfigError;
use crate::keymap::KeySymbolTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::time::Duration;

/// How many times the key sequence is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "count", rename_all = "snake_case")]
pub enum RepeatMode {
    /// Repeat until stopped.
    #[default]
    Infinite,
    /// Repeat exactly `n` times.
    FixedCount(u32),
    /// Play the sequence a single time.
    Once,
}

impl RepeatMode {
    /// Number of cycles to run, or `None` when unbounded.
    pub fn bound(&self) -> Option<u32> {
        match self {
            RepeatMode::Infinite => None,
            RepeatMode::FixedCount(n) => Some(*n),
            RepeatMode::Once => Some(1),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMode::Infinite => write!(f, "infinite"),
            RepeatMode::FixedCount(n) => write!(f, "{n} times"),
            RepeatMode::Once => write!(f, "once"),
        }
    }
}

/// Validated parameters for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Key symbols pressed in order, one cycle per pass.
    pub sequence: Vec<String>,

    /// Seconds to sleep after each key.
    pub inter_key_delay_secs: f64,

    /// Seconds to count down before the first key.
    #[serde(default)]
    pub pre_start_wait_secs: f64,

    #[serde(default)]
    pub repeat: RepeatMode,
}

impl RunConfig {
    pub fn new(sequence: Vec<String>, inter_key_delay_secs: f64, repeat: RepeatMode) -> Self {
        Self {
            sequence,
            inter_key_delay_secs,
            pre_start_wait_secs: 0.0,
            repeat,
        }
    }

    pub fn with_pre_start_wait(mut self, secs: f64) -> Self {
        self.pre_start_wait_secs = secs;
        self
    }

    /// Check every constraint a run relies on against the global key table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(KeySymbolTable::global())
    }

    pub fn validate_with(&self, table: &KeySymbolTable) -> Result<(), ConfigError> {
        if self.sequence.is_empty() {
            return Err(ConfigError::EmptySequence);
        }

        if let Some(symbol) = self.sequence.iter().find(|s| !table.contains(s)) {
            return Err(ConfigError::UnknownKey(symbol.clone()));
        }

        let delay = self.inter_key_delay_secs;
        if !delay.is_finite() || delay <= 0.0 {
            return Err(ConfigError::invalid_delay(
                delay.to_string(),
                "must be greater than 0",
            ));
        }
        if Duration::try_from_secs_f64(delay).is_err() {
            return Err(ConfigError::invalid_delay(delay.to_string(), "is too large"));
        }

        let wait = self.pre_start_wait_secs;
        if !wait.is_finite() || wait < 0.0 {
            return Err(ConfigError::invalid_wait(
                wait.to_string(),
                "cannot be negative",
            ));
        }
        if Duration::try_from_secs_f64(wait).is_err() {
            return Err(ConfigError::invalid_wait(wait.to_string(), "is too large"));
        }

        if self.repeat == RepeatMode::FixedCount(0) {
            return Err(ConfigError::invalid_count("0", "must be greater than 0"));
        }

        Ok(())
    }

    pub fn inter_key_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_key_delay_secs)
    }

    pub fn pre_start_wait(&self) -> Duration {
        Duration::from_secs_f64(self.pre_start_wait_secs)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::load(path, e.to_string()))?;
        let config: RunConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::load(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ConfigError::save(path, e.to_string()))?;
        Ok(())
    }
}

/// The repeat selection offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RepeatChoice {
    #[default]
    Infinite,
    Count,
    Once,
}

/// Raw, unvalidated form input.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// Comma-separated key symbols, e.g. `"a, b, enter"`.
    pub keys: String,
    pub delay: String,
    /// Empty means no wait.
    pub wait: String,
    pub repeat: RepeatChoice,
    /// Only read when `repeat` is [`RepeatChoice::Count`].
    pub count: String,
}

impl RunInput {
    /// Parse and validate into a [`RunConfig`].
    pub fn parse(&self) -> Result<RunConfig, ConfigError> {
        let sequence = parse_key_sequence(&self.keys);
        if sequence.is_empty() {
            return Err(ConfigError::EmptySequence);
        }

        let inter_key_delay_secs = parse_delay(&self.delay)?;
        let pre_start_wait_secs = parse_wait(&self.wait)?;
        let repeat = match self.repeat {
            RepeatChoice::Infinite => RepeatMode::Infinite,
            RepeatChoice::Count => RepeatMode::FixedCount(parse_count(&self.count)?),
            RepeatChoice::Once => RepeatMode::Once,
        };

        let config = RunConfig {
            sequence,
            inter_key_delay_secs,
            pre_start_wait_secs,
            repeat,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Split a comma-separated list into lowercase symbols, skipping blanks.
pub fn parse_key_sequence(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn parse_delay(text: &str) -> Result<f64, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ConfigError::invalid_delay(text, "a delay is required"));
    }
    let delay: f64 = text
        .parse()
        .map_err(|_| ConfigError::invalid_delay(text, "must be a number"))?;
    if !delay.is_finite() || delay <= 0.0 {
        return Err(ConfigError::invalid_delay(text, "must be greater than 0"));
    }
    if Duration::try_from_secs_f64(delay).is_err() {
        return Err(ConfigError::invalid_delay(text, "is too large"));
    }
    Ok(delay)
}

fn parse_wait(text: &str) -> Result<f64, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let wait: f64 = text
        .parse()
        .map_err(|_| ConfigError::invalid_wait(text, "must be a number"))?;
    if !wait.is_finite() || wait < 0.0 {
        return Err(ConfigError::invalid_wait(text, "cannot be negative"));
    }
    if Duration::try_from_secs_f64(wait).is_err() {
        return Err(ConfigError::invalid_wait(text, "is too large"));
    }
    Ok(wait)
}

fn parse_count(text: &str) -> Result<u32, ConfigError> {
    let text = text.trim();
    let count: i64 = text
        .parse()
        .map_err(|_| ConfigError::invalid_count(text, "must be an integer"))?;
    if count <= 0 {
        return Err(ConfigError::invalid_count(text, "must be greater than 0"));
    }
    u32::try_from(count).map_err(|_| ConfigError::invalid_count(text, "is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(keys: &str, delay: &str) -> RunInput {
        RunInput {
            keys: keys.to_string(),
            delay: delay.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_key_sequence() {
        assert_eq!(parse_key_sequence("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_key_sequence(" A , Enter ,,f1 "), vec!["a", "enter", "f1"]);
        assert!(parse_key_sequence(" , ,").is_empty());
        assert!(parse_key_sequence("").is_empty());
    }

    #[test]
    fn test_parse_minimal_input() {
        let config = input("a,b", "0.5").parse().unwrap();
        assert_eq!(config.sequence, vec!["a", "b"]);
        assert_eq!(config.inter_key_delay_secs, 0.5);
        assert_eq!(config.pre_start_wait_secs, 0.0);
        assert_eq!(config.repeat, RepeatMode::Infinite);
    }

    #[test]
    fn test_parse_repeat_modes() {
        let mut raw = input("space", "1");
        raw.repeat = RepeatChoice::Count;
        raw.count = " 3 ".to_string();
        assert_eq!(raw.parse().unwrap().repeat, RepeatMode::FixedCount(3));

        raw.repeat = RepeatChoice::Once;
        raw.count = "garbage".to_string();
        assert_eq!(raw.parse().unwrap().repeat, RepeatMode::Once);
    }

    #[test]
    fn test_parse_rejects_bad_delay() {
        assert!(matches!(
            input("a", "").parse(),
            Err(ConfigError::InvalidDelay { .. })
        ));
        assert!(matches!(
            input("a", "fast").parse(),
            Err(ConfigError::InvalidDelay { .. })
        ));
        assert!(matches!(
            input("a", "0").parse(),
            Err(ConfigError::InvalidDelay { .. })
        ));
        assert!(matches!(
            input("a", "-1").parse(),
            Err(ConfigError::InvalidDelay { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_wait() {
        let mut raw = input("a", "1");
        raw.wait = "-2".to_string();
        assert!(matches!(raw.parse(), Err(ConfigError::InvalidWait { .. })));

        raw.wait = "soon".to_string();
        assert!(matches!(raw.parse(), Err(ConfigError::InvalidWait { .. })));

        raw.wait = "2.5".to_string();
        assert_eq!(raw.parse().unwrap().pre_start_wait_secs, 2.5);
    }

    #[test]
    fn test_parse_rejects_bad_count() {
        let mut raw = input("a", "1");
        raw.repeat = RepeatChoice::Count;
        for bad in ["0", "-3", "1.5", "", "99999999999"] {
            raw.count = bad.to_string();
            assert!(
                matches!(raw.parse(), Err(ConfigError::InvalidCount { .. })),
                "count {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        match input("a,hyper,b", "1").parse() {
            Err(ConfigError::UnknownKey(key)) => assert_eq!(key, "hyper"),
            other => panic!("expected UnknownKey, got {other:?}"),
        }
        assert!(matches!(
            input(" , ", "1").parse(),
            Err(ConfigError::EmptySequence)
        ));
    }

    #[test]
    fn test_validate_direct_config() {
        let ok = RunConfig::new(vec!["a".into()], 0.1, RepeatMode::Once);
        assert!(ok.validate().is_ok());

        let empty = RunConfig::new(vec![], 0.1, RepeatMode::Once);
        assert!(matches!(empty.validate(), Err(ConfigError::EmptySequence)));

        let zero_count = RunConfig::new(vec!["a".into()], 0.1, RepeatMode::FixedCount(0));
        assert!(matches!(
            zero_count.validate(),
            Err(ConfigError::InvalidCount { .. })
        ));

        let nan_delay = RunConfig::new(vec!["a".into()], f64::NAN, RepeatMode::Once);
        assert!(nan_delay.validate().is_err());

        let negative_wait = ok.clone().with_pre_start_wait(-0.5);
        assert!(matches!(
            negative_wait.validate(),
            Err(ConfigError::InvalidWait { .. })
        ));
    }

    #[test]
    fn test_repeat_bound() {
        assert_eq!(RepeatMode::Infinite.bound(), None);
        assert_eq!(RepeatMode::FixedCount(4).bound(), Some(4));
        assert_eq!(RepeatMode::Once.bound(), Some(1));
    }

    #[test]
    fn test_rejects_delays_beyond_duration_range() {
        assert!(matches!(
            input("a", "1e20").parse(),
            Err(ConfigError::InvalidDelay { .. })
        ));

        let mut raw = input("a", "1");
        raw.wait = "1e20".to_string();
        assert!(matches!(raw.parse(), Err(ConfigError::InvalidWait { .. })));

        let huge_delay = RunConfig::new(vec!["a".into()], 1e20, RepeatMode::Once);
        assert!(matches!(
            huge_delay.validate(),
            Err(ConfigError::InvalidDelay { .. })
        ));

        let huge_wait = RunConfig::new(vec!["a".into()], 1.0, RepeatMode::Once)
            .with_pre_start_wait(1e20);
        assert!(matches!(
            huge_wait.validate(),
            Err(ConfigError::InvalidWait { .. })
        ));

        // Large but representable values stay valid
        let long_delay = RunConfig::new(vec!["a".into()], 86_400.0, RepeatMode::Once);
        assert!(long_delay.validate().is_ok());
    }

    #[test]
    fn test_repeat_mode_json_shape() {
        let json = serde_json::to_string(&RepeatMode::FixedCount(3)).unwrap();
        assert_eq!(json, r#"{"mode":"fixed_count","count":3}"#);

        let mode: RepeatMode = serde_json::from_str(r#"{"mode":"infinite"}"#).unwrap();
        assert_eq!(mode, RepeatMode::Infinite);
    }
}
