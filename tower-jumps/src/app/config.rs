//! Configuration Management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Miles-per-hour to kilometers-per-hour
pub const MPH_TO_KMH: f64 = 1.60934;

/// Longest supported window (one day, minutes)
pub const MAX_WINDOW_MINUTES: u32 = 1440;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis thresholds and weights
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parameters for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Window width (minutes)
    pub window_minutes: u32,
    /// Highest plausible travel speed (km/h)
    pub max_speed_kmh: f64,
    /// Minimum distance that may indicate a jump (km)
    pub min_jump_distance_km: f64,
    /// Minimum anomaly window (minutes); informational only
    pub min_anomaly_window_minutes: f64,
    /// Confidence weight for region consistency
    pub consistency_weight: f64,
    /// Confidence weight for sample density
    pub sample_count_weight: f64,
    /// Confidence weight for the anomaly penalty
    pub anomaly_weight: f64,
    /// Confidence below which callers treat an interval as uncertain
    pub min_confidence_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_minutes: 15,
            max_speed_kmh: 128.0,
            min_jump_distance_km: 5.0,
            min_anomaly_window_minutes: 5.0,
            consistency_weight: 0.4,
            sample_count_weight: 0.3,
            anomaly_weight: 0.3,
            min_confidence_threshold: 0.5,
        }
    }
}

impl AnalysisConfig {
    /// Set the speed limit from miles per hour
    pub fn with_max_speed_mph(mut self, mph: f64) -> Self {
        self.max_speed_kmh = mph * MPH_TO_KMH;
        self
    }

    pub fn with_window_minutes(mut self, minutes: u32) -> Self {
        self.window_minutes = minutes;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.min_confidence_threshold = threshold;
        self
    }

    /// Speed limit expressed in miles per hour
    pub fn max_speed_mph(&self) -> f64 {
        self.max_speed_kmh / MPH_TO_KMH
    }

    /// Validate values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err describing the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.window_minutes == 0 || self.window_minutes > MAX_WINDOW_MINUTES {
            return Err(crate::Error::Config(format!(
                "window_minutes must be in [1, {}], got {}",
                MAX_WINDOW_MINUTES, self.window_minutes
            )));
        }
        if !self.max_speed_kmh.is_finite() || self.max_speed_kmh <= 0.0 {
            return Err(crate::Error::Config(format!(
                "max_speed_kmh must be positive, got {}", self.max_speed_kmh
            )));
        }
        if !self.min_jump_distance_km.is_finite() || self.min_jump_distance_km < 0.0 {
            return Err(crate::Error::Config(format!(
                "min_jump_distance_km must be >= 0, got {}", self.min_jump_distance_km
            )));
        }
        if !self.min_anomaly_window_minutes.is_finite() || self.min_anomaly_window_minutes < 0.0 {
            return Err(crate::Error::Config(format!(
                "min_anomaly_window_minutes must be >= 0, got {}", self.min_anomaly_window_minutes
            )));
        }
        for (name, weight) in [
            ("consistency_weight", self.consistency_weight),
            ("sample_count_weight", self.sample_count_weight),
            ("anomaly_weight", self.anomaly_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(crate::Error::Config(format!(
                    "{} must be >= 0, got {}", name, weight
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(crate::Error::Config(format!(
                "min_confidence_threshold must be in [0, 1], got {}", self.min_confidence_threshold
            )));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Events buffered between the analysis worker and a client
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            channel_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Apply `HOST` / `PORT` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                self.host = host;
            }
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.analysis.validate()?;
        if self.server.channel_capacity == 0 {
            return Err(crate::Error::Config("channel_capacity must be > 0".to_string()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(crate::Error::Config("logging level must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".tower_jumps").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Look up a value by dotted key, e.g. `analysis.window_minutes`
    pub fn lookup(&self, key: &str) -> Result<Option<toml::Value>, crate::Error> {
        let root = toml::Value::try_from(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        let mut current = &root;
        for part in key.split('.') {
            match current.get(part) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }
}
