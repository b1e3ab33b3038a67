//! # Configuration Management Module
//!
//! Loads, validates and writes the TOML configuration for the teleport engine.
//!
//! ## Configuration Structure
//!
//! - [`TeleportConfig`] - Request timeout, warmup, cooldown, safety and command costs
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waypoint::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("waypoint.toml").await?;
//!     config.validate()?;
//!     println!("requests time out after {:?}", config.teleport.request_timeout());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [teleport]
//! request_timeout_secs = 30
//! warmup_secs = 3
//! cooldown_secs = 0
//! cancel_on_move = true
//! safe_teleport = true
//! maintenance_interval_secs = 10
//!
//! [teleport.costs]
//! tpa = 150
//! tpahere = 150
//!
//! [logging]
//! level = "info"
//! file = "waypoint.log"
//! ```

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::fs;

use crate::teleport::requests::DEFAULT_REQUEST_TIMEOUT;
use crate::teleport::types::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleportConfig {
    /// Seconds a `tpa`-style request stays acceptable.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Delay between approval and the move. 0 teleports immediately.
    #[serde(default)]
    pub warmup_secs: u64,
    /// Minimum seconds between two completed teleports of one player.
    #[serde(default)]
    pub cooldown_secs: u64,
    /// Cancel (and refund) a warmup when the player moves.
    #[serde(default = "default_true")]
    pub cancel_on_move: bool,
    /// Adjust destinations to a safe standing spot by default.
    #[serde(default = "default_true")]
    pub safe_teleport: bool,
    /// Interval of the background sweep for expired requests and stale warmups.
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Command name -> cost in minor currency units.
    #[serde(default)]
    pub costs: HashMap<String, u64>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_maintenance_interval_secs() -> u64 {
    10
}

impl TeleportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    /// Configured cost of a command; unknown commands are free.
    pub fn cost_of(&self, command: &str) -> Money {
        Money(
            self.costs
                .get(&command.to_lowercase())
                .copied()
                .unwrap_or(0),
        )
    }
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            warmup_secs: 0,
            cooldown_secs: 0,
            cancel_on_move: true,
            safe_teleport: true,
            maintenance_interval_secs: default_maintenance_interval_secs(),
            costs: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("waypoint.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub teleport: TeleportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let mut config = Config::default();
        config.teleport.costs.insert("tpa".to_string(), 0);
        config.teleport.costs.insert("tpahere".to_string(), 0);
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let tp = &self.teleport;
        if tp.request_timeout_secs == 0 {
            bail!("teleport.request_timeout_secs must be greater than 0");
        }
        if tp.maintenance_interval_secs == 0 {
            bail!("teleport.maintenance_interval_secs must be greater than 0");
        }
        if let Some(name) = tp.costs.keys().find(|k| k.trim().is_empty()) {
            bail!("teleport.costs contains an empty command name {:?}", name);
        }
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            other => bail!("logging.level '{}' is not a log level", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_timeout_is_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.teleport.request_timeout(), Duration::from_secs(30));
        assert!(config.teleport.cancel_on_move);
        assert!(config.teleport.safe_teleport);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [teleport]
            warmup_secs = 5

            [teleport.costs]
            TPA = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.teleport.warmup(), Duration::from_secs(5));
        assert_eq!(config.teleport.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        // keys are matched lower-case
        assert_eq!(config.teleport.cost_of("tpa"), Money(0));
        assert_eq!(config.teleport.cost_of("unknown"), Money::ZERO);
    }

    #[test]
    fn test_cost_lookup_is_case_insensitive_on_command() {
        let mut config = TeleportConfig::default();
        config.costs.insert("tpahere".to_string(), 25);
        assert_eq!(config.cost_of("TPAHERE"), Money(25));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.teleport.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.teleport.costs.insert(" ".to_string(), 1);
        assert!(config.validate().is_err());
    }
}
