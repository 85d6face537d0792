//! Configuration model and hierarchical loader.
//!
//! Precedence (lowest to highest), mirroring the teacher's `ConfigLoader`:
//! 1. Programmatic defaults (`Serialized`)
//! 2. `.goalkeeper/config.yaml` (project config)
//! 3. `.goalkeeper/local.yaml` (optional local overrides)
//! 4. Environment variables (`GOALKEEPER_` prefix, highest priority)

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::priority_calculator::PriorityConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("invalid listener_queue_capacity: {0}. Must be at least 1")]
    InvalidListenerCapacity(usize),

    #[error("invalid stagnation_threshold: {0}. Must be at least 1")]
    InvalidStagnationThreshold(u32),

    #[error("invalid cycle_interval_ms: {0}. Must be at least 1")]
    InvalidCycleInterval(u64),

    #[error("invalid derivation_interval: {0}. Must be at least 1")]
    InvalidDerivationInterval(u64),

    #[error("invalid freshness_decay_interval: {0}. Must be at least 1")]
    InvalidFreshnessDecayInterval(u64),

    #[error("invalid priority range for {0}: min ({1}) must be less than max ({2})")]
    InvalidPriorityRange(&'static str, f64, f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Mirrors `services::priority_calculator::PriorityConfig` as a flat,
/// figment-friendly section; `EngineConfig::priority_config()` converts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfigSection {
    pub user_base_min: f64,
    pub user_base_max: f64,
    pub ai_base_min: f64,
    pub ai_base_max: f64,
    pub active_decay_rate: f64,
    pub queued_decay_rate: f64,
    pub strengthening_min: f64,
    pub strengthening_max: f64,
    pub selection_exponent: f64,
    pub progress_bonus_factor: f64,
    pub archive_floor: f64,
    pub decay_floor: f64,
}

impl Default for PriorityConfigSection {
    fn default() -> Self {
        let defaults = PriorityConfig::default();
        Self {
            user_base_min: defaults.user_base_range.0,
            user_base_max: defaults.user_base_range.1,
            ai_base_min: defaults.ai_base_range.0,
            ai_base_max: defaults.ai_base_range.1,
            active_decay_rate: defaults.active_decay_rate,
            queued_decay_rate: defaults.queued_decay_rate,
            strengthening_min: defaults.strengthening_range.0,
            strengthening_max: defaults.strengthening_range.1,
            selection_exponent: defaults.selection_exponent,
            progress_bonus_factor: defaults.progress_bonus_factor,
            archive_floor: defaults.archive_floor,
            decay_floor: defaults.decay_floor,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cycle_interval_ms: u64,
    pub listener_queue_capacity: usize,
    pub stagnation_threshold: u32,
    pub derivation_interval: u64,
    pub freshness_decay_interval: u64,
    pub priority: PriorityConfigSection,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let orchestrator_defaults = crate::services::orchestrator::OrchestratorConfig::default();
        Self {
            cycle_interval_ms: 30_000,
            listener_queue_capacity: crate::services::state_machine::DEFAULT_LISTENER_CAPACITY,
            stagnation_threshold: crate::services::progress_monitor::DEFAULT_STAGNATION_THRESHOLD,
            derivation_interval: orchestrator_defaults.derivation_interval,
            freshness_decay_interval: orchestrator_defaults.freshness_decay_interval,
            priority: PriorityConfigSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn priority_config(&self) -> PriorityConfig {
        PriorityConfig {
            user_base_range: (self.priority.user_base_min, self.priority.user_base_max),
            ai_base_range: (self.priority.ai_base_min, self.priority.ai_base_max),
            active_decay_rate: self.priority.active_decay_rate,
            queued_decay_rate: self.priority.queued_decay_rate,
            strengthening_range: (self.priority.strengthening_min, self.priority.strengthening_max),
            selection_exponent: self.priority.selection_exponent,
            progress_bonus_factor: self.priority.progress_bonus_factor,
            archive_floor: self.priority.archive_floor,
            decay_floor: self.priority.decay_floor,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging. Always project-local
    /// (`pwd/.goalkeeper/`) so multiple engines can run with different
    /// projects on the same machine.
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(".goalkeeper/config.yaml"))
            .merge(Yaml::file(".goalkeeper/local.yaml"))
            .merge(Env::prefixed("GOALKEEPER_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.listener_queue_capacity == 0 {
            return Err(ConfigError::InvalidListenerCapacity(config.listener_queue_capacity));
        }

        if config.stagnation_threshold == 0 {
            return Err(ConfigError::InvalidStagnationThreshold(config.stagnation_threshold));
        }

        if config.cycle_interval_ms == 0 {
            return Err(ConfigError::InvalidCycleInterval(config.cycle_interval_ms));
        }

        if config.derivation_interval == 0 {
            return Err(ConfigError::InvalidDerivationInterval(config.derivation_interval));
        }

        if config.freshness_decay_interval == 0 {
            return Err(ConfigError::InvalidFreshnessDecayInterval(config.freshness_decay_interval));
        }

        let p = &config.priority;
        if p.user_base_min >= p.user_base_max {
            return Err(ConfigError::InvalidPriorityRange("user_base", p.user_base_min, p.user_base_max));
        }
        if p.ai_base_min >= p.ai_base_max {
            return Err(ConfigError::InvalidPriorityRange("ai_base", p.ai_base_min, p.ai_base_max));
        }
        if p.strengthening_min >= p.strengthening_max {
            return Err(ConfigError::InvalidPriorityRange("strengthening", p.strengthening_min, p.strengthening_max));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_parsing_overrides_defaults() {
        let yaml = r"
cycle_interval_ms: 5000
logging:
  level: debug
  format: json
";
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .unwrap();

        assert_eq!(config.cycle_interval_ms, 5000);
        assert_eq!(config.logging.level, "debug");
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut config = EngineConfig::default();
        config.logging.level = "invalid".to_string();
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn rejects_inverted_priority_range() {
        let mut config = EngineConfig::default();
        config.priority.user_base_min = 100.0;
        config.priority.user_base_max = 80.0;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPriorityRange("user_base", _, _)));
    }

    #[test]
    fn rejects_zero_stagnation_threshold() {
        let mut config = EngineConfig::default();
        config.stagnation_threshold = 0;
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStagnationThreshold(0)));
    }

    #[test]
    fn priority_config_round_trips_ranges() {
        let config = EngineConfig::default();
        let priority = config.priority_config();
        assert_eq!(priority.user_base_range, (config.priority.user_base_min, config.priority.user_base_max));
    }
}
