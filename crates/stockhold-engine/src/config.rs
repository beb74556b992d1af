//! # Engine Configuration
//!
//! Configuration management for the reservation engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKHOLD_REQUEUE_POSITION=tail                                    │
//! │     STOCKHOLD_REAPER_INTERVAL_SECS=10                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockhold/stockhold.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockhold.stockhold/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     300/180/60s tiers, head re-queue, 5s reaper sweep                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockhold.toml
//! [fairness]
//! high_trust_threshold = 0.7
//! medium_trust_threshold = 0.4
//! high_trust_ttl_secs = 300
//! medium_trust_ttl_secs = 180
//! low_trust_ttl_secs = 60
//!
//! [waitlist]
//! requeue_position = "head"   # head | tail
//! max_promotions_per_release = 16
//!
//! [reaper]
//! enabled = true
//! sweep_interval_secs = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use stockhold_core::FairnessPolicy;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::waitlist::RequeuePosition;

// =============================================================================
// Waitlist Settings
// =============================================================================

/// How queued demand is promoted when capacity frees up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistSettings {
    /// Where an entry goes back when its promotion fails.
    #[serde(default)]
    pub requeue_position: RequeuePosition,

    /// Upper bound on promotions triggered by a single release.
    ///
    /// Caps the promote → reserve chain when many small requests wait
    /// behind one large cancellation.
    #[serde(default = "default_max_promotions")]
    pub max_promotions_per_release: usize,
}

fn default_max_promotions() -> usize {
    16
}

impl Default for WaitlistSettings {
    fn default() -> Self {
        WaitlistSettings {
            requeue_position: RequeuePosition::default(),
            max_promotions_per_release: default_max_promotions(),
        }
    }
}

// =============================================================================
// Reaper Settings
// =============================================================================

/// Background expiry sweep.
///
/// Without the reaper, an abandoned hold only releases stock when someone
/// touches it. Leave it enabled outside of tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    5
}

impl Default for ReaperSettings {
    fn default() -> Self {
        ReaperSettings {
            enabled: true,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ReaperSettings {
    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trust tiers and hold durations.
    #[serde(default)]
    pub fairness: FairnessPolicy,

    /// Waitlist promotion behavior.
    #[serde(default)]
    pub waitlist: WaitlistSettings,

    /// Background expiry sweep.
    #[serde(default)]
    pub reaper: ReaperSettings,
}

impl EngineConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockhold.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        let fairness = &self.fairness;

        for (name, value) in [
            ("high_trust_threshold", fairness.high_trust_threshold),
            ("medium_trust_threshold", fairness.medium_trust_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        if fairness.medium_trust_threshold > fairness.high_trust_threshold {
            return Err(EngineError::InvalidConfig(
                "medium_trust_threshold must not exceed high_trust_threshold".into(),
            ));
        }

        if fairness.low_trust_ttl_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "low_trust_ttl_secs must be greater than 0".into(),
            ));
        }

        // More trust never means a shorter hold
        if fairness.low_trust_ttl_secs > fairness.medium_trust_ttl_secs
            || fairness.medium_trust_ttl_secs > fairness.high_trust_ttl_secs
        {
            return Err(EngineError::InvalidConfig(
                "hold durations must not decrease as trust increases".into(),
            ));
        }

        if self.waitlist.max_promotions_per_release == 0 {
            return Err(EngineError::InvalidConfig(
                "max_promotions_per_release must be greater than 0".into(),
            ));
        }

        if self.reaper.sweep_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(position) = std::env::var("STOCKHOLD_REQUEUE_POSITION") {
            match position.parse() {
                Ok(parsed) => {
                    debug!(position = %position, "Overriding requeue position from environment");
                    self.waitlist.requeue_position = parsed;
                }
                Err(_) => warn!(position = %position, "Unknown requeue position in environment"),
            }
        }

        if let Ok(max) = std::env::var("STOCKHOLD_MAX_PROMOTIONS") {
            if let Ok(m) = max.parse::<usize>() {
                self.waitlist.max_promotions_per_release = m;
            }
        }

        if let Ok(enabled) = std::env::var("STOCKHOLD_REAPER_ENABLED") {
            if let Ok(e) = enabled.parse::<bool>() {
                debug!(enabled = e, "Overriding reaper toggle from environment");
                self.reaper.enabled = e;
            }
        }

        if let Ok(secs) = std::env::var("STOCKHOLD_REAPER_INTERVAL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                debug!(interval_secs = s, "Overriding reaper interval from environment");
                self.reaper.sweep_interval_secs = s;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockhold", "stockhold")
            .map(|dirs| dirs.config_dir().join("stockhold.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.fairness.high_trust_ttl_secs, 300);
        assert_eq!(config.waitlist.requeue_position, RequeuePosition::Head);
        assert_eq!(config.waitlist.max_promotions_per_release, 16);
        assert!(config.reaper.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.fairness.medium_trust_threshold = 0.9;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.fairness.high_trust_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.fairness.low_trust_ttl_secs = 600;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.waitlist.max_promotions_per_release = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.reaper.sweep_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [waitlist]
            requeue_position = "tail"

            [fairness]
            low_trust_ttl_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.waitlist.requeue_position, RequeuePosition::Tail);
        assert_eq!(config.waitlist.max_promotions_per_release, 16);
        assert_eq!(config.fairness.low_trust_ttl_secs, 30);
        assert_eq!(config.fairness.high_trust_ttl_secs, 300);
        assert_eq!(config.reaper.sweep_interval_secs, 5);
    }

    #[test]
    fn test_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[fairness]"));
        assert!(toml_str.contains("[waitlist]"));
        assert!(toml_str.contains("requeue_position = \"head\""));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "stockhold-config-{}.toml",
            uuid::Uuid::new_v4()
        ));

        let mut config = EngineConfig::default();
        config.reaper.sweep_interval_secs = 42;
        config.save(Some(path.clone())).unwrap();

        let loaded = EngineConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.reaper.sweep_interval_secs, 42);

        std::fs::remove_file(path).unwrap();
    }
}
