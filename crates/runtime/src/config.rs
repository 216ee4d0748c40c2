//! Runtime Options
//!
//! Everything tunable about a runtime instance, with the defaults the
//! language documents: 333 ms moments, USD as the default currency for
//! bare money literals, and a healing recursion ceiling of 16. Options are
//! plain data - build them with the `with_*` methods or load them from a
//! TOML file - and are fixed for the lifetime of the runtime they create.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a runtime instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Length of one moment, in milliseconds
    pub moment_millis: u64,
    /// Currency applied to money literals and number-to-money conversion
    pub default_currency: String,
    /// Maximum healing recursion depth before `HealingOverflow`
    pub healing_depth: u32,
    /// Scheduler polling interval, in milliseconds. Clamped to the moment
    /// duration at runtime construction.
    pub poll_millis: u64,
    /// Optional cap on trigger evaluations per moment; the rest defer to
    /// the next moment
    pub moment_budget: Option<u32>,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            moment_millis: 333,
            default_currency: "USD".to_string(),
            healing_depth: 16,
            poll_millis: 10,
            moment_budget: None,
        }
    }
}

impl RuntimeOptions {
    pub fn new() -> RuntimeOptions {
        RuntimeOptions::default()
    }

    pub fn with_moment_millis(mut self, millis: u64) -> Self {
        self.moment_millis = millis;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_healing_depth(mut self, depth: u32) -> Self {
        self.healing_depth = depth;
        self
    }

    pub fn with_poll_millis(mut self, millis: u64) -> Self {
        self.poll_millis = millis;
        self
    }

    pub fn with_moment_budget(mut self, budget: u32) -> Self {
        self.moment_budget = Some(budget);
        self
    }

    pub fn moment_duration(&self) -> Duration {
        Duration::from_millis(self.moment_millis)
    }

    /// Polling sleep, never longer than the moment itself.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_millis.min(self.moment_millis).max(1))
    }

    /// Load options from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<RuntimeOptions, OptionsError> {
        let text = std::fs::read_to_string(path).map_err(OptionsError::Io)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<RuntimeOptions, OptionsError> {
        toml::from_str(text).map_err(OptionsError::Parse)
    }
}

/// Error loading options from a file.
#[derive(Debug)]
pub enum OptionsError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::Io(e) => write!(f, "cannot read options file: {}", e),
            OptionsError::Parse(e) => write!(f, "cannot parse options file: {}", e),
        }
    }
}

impl std::error::Error for OptionsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.moment_millis, 333);
        assert_eq!(options.default_currency, "USD");
        assert_eq!(options.healing_depth, 16);
        assert_eq!(options.moment_budget, None);
    }

    #[test]
    fn test_builder_chain() {
        let options = RuntimeOptions::new()
            .with_moment_millis(50)
            .with_default_currency("EUR")
            .with_healing_depth(4)
            .with_moment_budget(2);
        assert_eq!(options.moment_millis, 50);
        assert_eq!(options.default_currency, "EUR");
        assert_eq!(options.healing_depth, 4);
        assert_eq!(options.moment_budget, Some(2));
    }

    #[test]
    fn test_poll_interval_clamps_to_moment() {
        let options = RuntimeOptions::new()
            .with_moment_millis(5)
            .with_poll_millis(100);
        assert_eq!(options.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_from_toml_partial_keys() {
        let options =
            RuntimeOptions::from_toml("moment_millis = 100\ndefault_currency = \"GBP\"\n")
                .unwrap();
        assert_eq!(options.moment_millis, 100);
        assert_eq!(options.default_currency, "GBP");
        // Unlisted keys keep their defaults.
        assert_eq!(options.healing_depth, 16);
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        assert!(RuntimeOptions::from_toml("moment_millis = \"fast\"").is_err());
    }
}
