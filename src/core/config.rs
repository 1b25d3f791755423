//! Cognition configuration with documented constants
//!
//! All tunables of the per-agent cognitive cycle are collected here with
//! explanations of their purpose and how they interact with each other.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{Result, SimError};

/// Configuration for the cognitive pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CognitionConfig {
    // === ORACLE ===
    /// Deadline for a single oracle call, in seconds
    ///
    /// A call that exceeds it fails like any other transport error and each
    /// stage falls back to its usual default. 0 disables the deadline.
    pub oracle_timeout_secs: f64,

    // === WORKING MEMORY ===
    /// How many of the most recent experiences are placed into prompts
    ///
    /// Larger windows give the oracle more context at the cost of prompt size.
    pub recent_experience_window: usize,

    /// Maximum experiences kept per agent
    ///
    /// Oldest experiences are evicted first when merging a tick's results.
    /// Must be >= recent_experience_window.
    pub max_experiences: usize,

    /// Maximum thoughts kept in an agent's thought history
    pub max_thought_history: usize,

    // === GOALS & PLANS ===
    /// Minimum new experiences in a tick before change detection runs
    ///
    /// Change detection also requires the agent to have active goals.
    pub change_detection_min_experiences: usize,

    /// Active goals evaluated per tick, highest priority first
    pub max_goal_evaluations: usize,

    /// Whether active goals without an active plan get one generated
    pub plan_missing_goals: bool,
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_secs: 30.0,

            recent_experience_window: 20,
            max_experiences: 200,
            max_thought_history: 10,

            change_detection_min_experiences: 1,
            max_goal_evaluations: 3,
            plan_missing_goals: true,
        }
    }
}

impl CognitionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CognitionConfig = toml::from_str(content)?;
        config.validate().map_err(SimError::Config)?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Oracle deadline, or None when disabled
    pub fn oracle_timeout(&self) -> Option<Duration> {
        if self.oracle_timeout_secs > 0.0 {
            Duration::try_from_secs_f64(self.oracle_timeout_secs).ok()
        } else {
            None
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.recent_experience_window == 0 {
            return Err("recent_experience_window must be at least 1".into());
        }

        if self.max_experiences < self.recent_experience_window {
            return Err(format!(
                "max_experiences ({}) should be >= recent_experience_window ({})",
                self.max_experiences, self.recent_experience_window
            ));
        }

        if Duration::try_from_secs_f64(self.oracle_timeout_secs).is_err() {
            return Err(format!(
                "oracle_timeout_secs ({}) must be a non-negative number of seconds that fits a Duration",
                self.oracle_timeout_secs
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CognitionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CognitionConfig::from_toml_str("recent_experience_window = 5").unwrap();
        assert_eq!(config.recent_experience_window, 5);
        assert_eq!(config.max_experiences, 200);
        assert!(config.plan_missing_goals);
    }

    #[test]
    fn test_rejects_window_larger_than_cap() {
        let result = CognitionConfig::from_toml_str(
            "recent_experience_window = 50\nmax_experiences = 10",
        );
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let mut config = CognitionConfig::default();
        assert_eq!(config.oracle_timeout(), Some(Duration::from_secs(30)));
        config.oracle_timeout_secs = 0.0;
        assert_eq!(config.oracle_timeout(), None);
    }

    #[test]
    fn test_rejects_out_of_range_timeout() {
        for raw in ["oracle_timeout_secs = 1e20", "oracle_timeout_secs = -1.0", "oracle_timeout_secs = inf"] {
            assert!(matches!(CognitionConfig::from_toml_str(raw), Err(SimError::Config(_))), "{}", raw);
        }

        let mut config = CognitionConfig::default();
        config.oracle_timeout_secs = 1e20;
        assert!(config.validate().is_err());
        assert_eq!(config.oracle_timeout(), None);
    }
}
