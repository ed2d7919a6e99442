// Configuration module for reading Snake.toml
// This module provides OOP-style configuration management for the oracle snake

use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading Snake.toml
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub game_rules: GameRulesConfig,
    pub risk: RiskConfig,
    pub strategy: StrategyConfig,
    pub debug: DebugConfig,
}

/// Latency bookkeeping for a match
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub default_latency_ms: u64,
    pub latency_increment_ms: u64,
    pub max_latency_ms: u64,
    /// Used when a move request arrives for a match we never saw start
    pub default_timeout_ms: u64,
}

/// Background search limits
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Deepest scenario (root = 1) that may sit in the active queue
    pub max_age: u32,
    /// Idle-timeout since the engine was last handed a root
    pub max_runtime_between_interactions_ms: u64,
    /// Re-offer deferred descendants of the new root to the active queue
    pub promote_deferred_on_reroot: bool,
}

impl SearchConfig {
    pub fn max_runtime_between_interactions(&self) -> Duration {
        Duration::from_millis(self.max_runtime_between_interactions_ms)
    }
}

/// Game rules constants used by scenario transitions
#[derive(Debug, Deserialize, Clone)]
pub struct GameRulesConfig {
    pub health_on_food: i32,
    pub health_loss_per_turn: i32,
    pub max_health: i32,
}

/// Acceptable loss probability for a heuristic move, by opponents alive
#[derive(Debug, Deserialize, Clone)]
pub struct RiskConfig {
    pub tolerance_one_opponent: f64,
    pub tolerance_two_opponents: f64,
    pub tolerance_many_opponents: f64,
}

impl RiskConfig {
    /// Tolerance tightens as more opponents survive
    pub fn tolerance_for(&self, opponents: usize) -> f64 {
        match opponents {
            0 | 1 => self.tolerance_one_opponent,
            2 => self.tolerance_two_opponents,
            _ => self.tolerance_many_opponents,
        }
    }
}

/// Heuristic strategy thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Length lead over the largest enemy that counts as dominant
    pub dominance_margin: i32,
    pub pressure_min_health: i32,
    pub starving_health: i32,
    pub starving_path_buffer: i32,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                default_latency_ms: 250,
                latency_increment_ms: 25,
                max_latency_ms: 400,
                default_timeout_ms: 500,
            },
            search: SearchConfig {
                max_age: 7,
                max_runtime_between_interactions_ms: 750,
                promote_deferred_on_reroot: true,
            },
            game_rules: GameRulesConfig {
                health_on_food: 80,
                health_loss_per_turn: 1,
                max_health: 100,
            },
            risk: RiskConfig {
                tolerance_one_opponent: 0.45,
                tolerance_two_opponents: 0.35,
                tolerance_many_opponents: 0.30,
            },
            strategy: StrategyConfig {
                dominance_margin: 2,
                pressure_min_health: 50,
                starving_health: 20,
                starving_path_buffer: 8,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "oracle_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_toml_can_be_parsed() {
        let result = Config::from_file("Snake.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Snake.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_all_config_values_match_hardcoded_defaults() {
        let file_config = Config::from_file("Snake.toml").expect("Snake.toml should be parseable");
        let hardcoded = Config::default_hardcoded();

        assert_eq!(file_config.timing.default_latency_ms, hardcoded.timing.default_latency_ms);
        assert_eq!(file_config.timing.latency_increment_ms, hardcoded.timing.latency_increment_ms);
        assert_eq!(file_config.timing.max_latency_ms, hardcoded.timing.max_latency_ms);
        assert_eq!(file_config.timing.default_timeout_ms, hardcoded.timing.default_timeout_ms);

        assert_eq!(file_config.search.max_age, hardcoded.search.max_age);
        assert_eq!(
            file_config.search.max_runtime_between_interactions_ms,
            hardcoded.search.max_runtime_between_interactions_ms
        );
        assert_eq!(
            file_config.search.promote_deferred_on_reroot,
            hardcoded.search.promote_deferred_on_reroot
        );

        assert_eq!(file_config.game_rules.health_on_food, hardcoded.game_rules.health_on_food);
        assert_eq!(
            file_config.game_rules.health_loss_per_turn,
            hardcoded.game_rules.health_loss_per_turn
        );
        assert_eq!(file_config.game_rules.max_health, hardcoded.game_rules.max_health);

        assert_eq!(file_config.risk.tolerance_one_opponent, hardcoded.risk.tolerance_one_opponent);
        assert_eq!(file_config.risk.tolerance_two_opponents, hardcoded.risk.tolerance_two_opponents);
        assert_eq!(
            file_config.risk.tolerance_many_opponents,
            hardcoded.risk.tolerance_many_opponents
        );

        assert_eq!(file_config.strategy.dominance_margin, hardcoded.strategy.dominance_margin);
        assert_eq!(file_config.strategy.pressure_min_health, hardcoded.strategy.pressure_min_health);
        assert_eq!(file_config.strategy.starving_health, hardcoded.strategy.starving_health);
        assert_eq!(
            file_config.strategy.starving_path_buffer,
            hardcoded.strategy.starving_path_buffer
        );

        assert_eq!(file_config.debug.enabled, hardcoded.debug.enabled);
        assert!(!file_config.debug.log_file_path.is_empty());
    }

    #[test]
    fn test_risk_tolerance_tightens_with_more_opponents() {
        let risk = Config::default_hardcoded().risk;
        assert!(risk.tolerance_for(1) > risk.tolerance_for(2));
        assert!(risk.tolerance_for(2) > risk.tolerance_for(3));
        assert_eq!(risk.tolerance_for(3), risk.tolerance_for(7));
    }

    #[test]
    fn test_missing_file_returns_read_error() {
        let result = Config::from_file("nonexistent.toml");
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_load_or_default_works() {
        let config = Config::load_or_default();
        assert_eq!(config.search.max_age, 7);
        assert_eq!(config.game_rules.health_on_food, 80);
    }
}
