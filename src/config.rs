//! # Engine Configuration
//!
//! Protocol, simulated-board and logging settings, loaded from a single TOML
//! file. Every field has a default so an empty file is a valid config.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [protocol]
//! sync_prefix = "::SYNC::"
//! queue_prefix = "::QUEUE::"
//! queue_capacity = 5
//! poll_attempts = 100
//! poll_interval_us = 1000
//! parse_cache_capacity = 16
//!
//! [board]
//! gpio_pins = 10
//! dac_channels = 4
//! dac_min_volts = -8.0
//! dac_max_volts = 8.0
//!
//! [logging]
//! level = "info"
//! ```

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sentinel wire protocol, bridge polling and queue sizing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProtocolConfig {
    #[serde(default = "default_sync_prefix")]
    pub sync_prefix: String,
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
    /// Zero disables the parse cache.
    #[serde(default = "default_parse_cache_capacity")]
    pub parse_cache_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sync_prefix: default_sync_prefix(),
            queue_prefix: default_queue_prefix(),
            queue_capacity: default_queue_capacity(),
            poll_attempts: default_poll_attempts(),
            poll_interval_us: default_poll_interval_us(),
            parse_cache_capacity: default_parse_cache_capacity(),
        }
    }
}

impl ProtocolConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

/// Limits of the simulated board used by the host binary and tests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BoardConfig {
    #[serde(default = "default_gpio_pins")]
    pub gpio_pins: u8,
    #[serde(default = "default_node_count")]
    pub node_count: u16,
    #[serde(default = "default_dac_channels")]
    pub dac_channels: u8,
    #[serde(default = "default_dac_min_volts")]
    pub dac_min_volts: f64,
    #[serde(default = "default_dac_max_volts")]
    pub dac_max_volts: f64,
    #[serde(default = "default_adc_channels")]
    pub adc_channels: u8,
    #[serde(default = "default_current_sensors")]
    pub current_sensors: u8,
    #[serde(default = "default_slots")]
    pub slots: u8,
    #[serde(default = "default_uart_baud")]
    pub uart_baud: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            gpio_pins: default_gpio_pins(),
            node_count: default_node_count(),
            dac_channels: default_dac_channels(),
            dac_min_volts: default_dac_min_volts(),
            dac_max_volts: default_dac_max_volts(),
            adc_channels: default_adc_channels(),
            current_sensors: default_current_sensors(),
            slots: default_slots(),
            uart_baud: default_uart_baud(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let protocol = &self.protocol;
        if protocol.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".to_string()));
        }
        if protocol.poll_attempts == 0 {
            return Err(ConfigError::Invalid("poll_attempts must be > 0".to_string()));
        }
        if protocol.sync_prefix.is_empty() || protocol.queue_prefix.is_empty() {
            return Err(ConfigError::Invalid("sentinel prefixes must not be empty".to_string()));
        }
        if protocol.sync_prefix.starts_with(&protocol.queue_prefix)
            || protocol.queue_prefix.starts_with(&protocol.sync_prefix)
        {
            return Err(ConfigError::Invalid(format!(
                "sentinel prefixes '{}' and '{}' overlap",
                protocol.sync_prefix, protocol.queue_prefix
            )));
        }
        if self.board.dac_min_volts >= self.board.dac_max_volts {
            return Err(ConfigError::Invalid(format!(
                "dac range {}..{} is empty",
                self.board.dac_min_volts, self.board.dac_max_volts
            )));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.logging.level)));
        }
        Ok(())
    }
}

fn default_sync_prefix() -> String { "::SYNC::".to_string() }
fn default_queue_prefix() -> String { "::QUEUE::".to_string() }
fn default_queue_capacity() -> usize { 5 }
fn default_poll_attempts() -> u32 { 100 }
fn default_poll_interval_us() -> u64 { 1_000 }
fn default_parse_cache_capacity() -> usize { 16 }
fn default_gpio_pins() -> u8 { 10 }
fn default_node_count() -> u16 { 120 }
fn default_dac_channels() -> u8 { 4 }
fn default_dac_min_volts() -> f64 { -8.0 }
fn default_dac_max_volts() -> f64 { 8.0 }
fn default_adc_channels() -> u8 { 5 }
fn default_current_sensors() -> u8 { 2 }
fn default_slots() -> u8 { 8 }
fn default_uart_baud() -> u32 { 115_200 }
fn default_log_level() -> String { "info".to_string() }

pub fn load_config(path: &str) -> Result<EngineConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    let config: EngineConfig = match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse config TOML: {}", e);
            return Err(ConfigError::Toml(e));
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.protocol.queue_capacity, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str("[protocol]\nqueue_capacity = 9\n").unwrap();
        assert_eq!(config.protocol.queue_capacity, 9);
        assert_eq!(config.protocol.sync_prefix, "::SYNC::");
        assert_eq!(config.board.dac_channels, 4);
    }

    #[test]
    fn overlapping_prefixes_rejected() {
        let mut config = EngineConfig::default();
        config.protocol.queue_prefix = "::SYNC::Q".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = EngineConfig::default();
        config.protocol.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
