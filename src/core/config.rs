//! Engine configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use crate::core::error::{EngineError, Result};
use serde::Deserialize;

/// Configuration for the battle engine
///
/// These values have been tuned against the reference stat lines
/// (attack ~300, defense ~200, level ~50). Changing them shifts pacing
/// and time-to-kill.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === ACTION-VALUE SCHEDULER ===
    /// Shared timeline constant. A combatant's inter-turn interval is
    /// `base_action_value / speed`, so at speed 100 a turn comes every
    /// 100 timeline units and doubling speed doubles turn frequency.
    pub base_action_value: f32,

    /// A combatant whose action value is within this distance of zero
    /// after normalization is considered ready to act.
    pub av_epsilon: f32,

    /// How many slots the look-ahead queue shows: the current action
    /// plus `queue_preview - 1` upcoming ones.
    pub queue_preview: usize,

    // === DAMAGE FORMULA ===
    /// Flat term in the mitigation denominator (K). Keeps mitigation
    /// meaningful at low defense values.
    pub mitigation_flat: f32,

    /// Per-attacker-level term in the mitigation denominator (C).
    /// Higher-level attackers punch through defense more easily.
    pub mitigation_per_level: f32,

    /// Lower bound of the uniform damage variance multiplier.
    pub variance_min: f32,

    /// Upper bound of the uniform damage variance multiplier.
    pub variance_max: f32,

    /// Chance that an attack is dodged outright when the defender's
    /// side has an evasion bond active.
    pub evasion_chance: f32,

    // === PACING ===
    /// Cosmetic delay before an enemy action resolves, in milliseconds.
    /// Zero in tests.
    pub enemy_think_delay_ms: u64,

    /// Cosmetic delay after a resolution before the next scheduling
    /// tick, in milliseconds. Zero in tests.
    pub post_resolution_delay_ms: u64,

    // === DECISION PROVIDER ===
    /// How many recent log entries are handed to the decision provider
    /// as conversation context.
    pub history_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Scheduler (reference: speed 100 => one turn per 100 units)
            base_action_value: 10_000.0,
            av_epsilon: 0.01,
            queue_preview: 6,

            // Damage formula (K=200, C=10)
            mitigation_flat: 200.0,
            mitigation_per_level: 10.0,
            variance_min: 0.95,
            variance_max: 1.05,
            evasion_chance: 0.15,

            // Pacing
            enemy_think_delay_ms: 1000,
            post_resolution_delay_ms: 800,

            // Decision context
            history_window: 10,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with all cosmetic delays and variance removed, for tests
    pub fn deterministic() -> Self {
        Self {
            variance_min: 1.0,
            variance_max: 1.0,
            enemy_think_delay_ms: 0,
            post_resolution_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Parse a config from TOML, applying defaults for missing fields
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| EngineError::ConfigError(format!("invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.base_action_value <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "base_action_value ({}) must be positive",
                self.base_action_value
            )));
        }

        if self.av_epsilon <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "av_epsilon ({}) must be positive",
                self.av_epsilon
            )));
        }

        if self.variance_min > self.variance_max {
            return Err(EngineError::ConfigError(format!(
                "variance_min ({}) must be <= variance_max ({})",
                self.variance_min, self.variance_max
            )));
        }

        if !(0.0..=1.0).contains(&self.evasion_chance) {
            return Err(EngineError::ConfigError(format!(
                "evasion_chance ({}) must be within [0, 1]",
                self.evasion_chance
            )));
        }

        if self.mitigation_flat < 0.0 || self.mitigation_per_level < 0.0 {
            return Err(EngineError::ConfigError(
                "mitigation constants must be non-negative".into(),
            ));
        }

        if self.queue_preview == 0 {
            return Err(EngineError::ConfigError(
                "queue_preview must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_deterministic_config_pins_variance() {
        let config = EngineConfig::deterministic();
        assert_eq!(config.variance_min, 1.0);
        assert_eq!(config.variance_max, 1.0);
        assert_eq!(config.enemy_think_delay_ms, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_base_av_rejected() {
        let config = EngineConfig {
            base_action_value: -1.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_variance_rejected() {
        let config = EngineConfig {
            variance_min: 1.1,
            variance_max: 0.9,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
base_action_value = 5000.0
enemy_think_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(config.base_action_value, 5000.0);
        assert_eq!(config.enemy_think_delay_ms, 0);
        // untouched fields keep their defaults
        assert_eq!(config.mitigation_flat, 200.0);
        assert_eq!(config.queue_preview, 6);
    }

    #[test]
    fn test_from_toml_invalid_value_rejected() {
        let result = EngineConfig::from_toml_str("evasion_chance = 1.5");
        assert!(result.is_err());
    }
}
