use crate::data::places::is_known_region;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Default world topology (Natural Earth 1:50m, TopoJSON)
pub const DEFAULT_TOPOLOGY_URL: &str = "https://unpkg.com/world-atlas@2.0.2/countries-50m.json";

/// Attack animation speed preset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    #[default]
    Normal,
    Fast,
}

impl Speed {
    /// Line travel time before `speed_factor` is applied
    pub fn travel_ms(self) -> f64 {
        match self {
            Speed::Normal => 2000.0,
            Speed::Fast => 500.0,
        }
    }

    /// Generator period multiplier
    pub fn tick_factor(self) -> f64 {
        match self {
            Speed::Normal => 1.0,
            Speed::Fast => 0.5,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Speed::Normal => Speed::Fast,
            Speed::Fast => Speed::Normal,
        }
    }
}

/// Backend threat feed settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            poll_interval_ms: 5000,
            timeout_ms: 5000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Everything the map panel needs at construction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Logical viewport width
    pub width: f64,
    /// Logical viewport height
    pub height: f64,
    pub projection_scale: f64,
    pub speed: Speed,
    /// Scales every attack animation duration
    pub speed_factor: f64,
    pub tick_interval_ms: f64,
    pub show_ambient_pulses: bool,
    pub show_labels: bool,
    pub show_all_cities: bool,
    /// Region ids (`USA`, `CHINA`, ...); empty means every region
    pub region_filter: BTreeSet<String>,
    /// Zoom clamp `[min, max]`
    pub scale_bounds: [f64; 2],
    /// Probability a tick draws from the high-intensity countries
    pub high_intensity_ratio: f64,
    /// Upper bound of extra events fired in a high-intensity tick
    pub max_burst: usize,
    pub seed: Option<u64>,
    pub topology_url: String,
    /// Local TopoJSON file, used instead of `topology_url` when set
    pub topology_path: Option<PathBuf>,
    pub feed: Option<FeedConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
            projection_scale: 170.0,
            speed: Speed::Normal,
            speed_factor: 1.0,
            tick_interval_ms: 500.0,
            show_ambient_pulses: true,
            show_labels: false,
            show_all_cities: false,
            region_filter: BTreeSet::new(),
            scale_bounds: [1.0, 8.0],
            high_intensity_ratio: 0.7,
            max_burst: 3,
            seed: None,
            topology_url: DEFAULT_TOPOLOGY_URL.to_string(),
            topology_path: None,
            feed: None,
        }
    }
}

impl MapConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(invalid("width/height", "viewport must be positive"));
        }
        if !(self.projection_scale > 0.0) {
            return Err(invalid("projection_scale", "must be positive"));
        }
        if !(self.tick_interval_ms > 0.0) {
            return Err(invalid("tick_interval_ms", "must be positive"));
        }
        if !(self.speed_factor > 0.0) {
            return Err(invalid("speed_factor", "must be positive"));
        }
        let [min, max] = self.scale_bounds;
        if !(min >= 1.0 && min <= max && max.is_finite()) {
            return Err(invalid(
                "scale_bounds",
                format!("expected 1 <= min <= max, got [{min}, {max}]"),
            ));
        }
        if !(0.0..=1.0).contains(&self.high_intensity_ratio) {
            return Err(invalid("high_intensity_ratio", "must be within [0, 1]"));
        }
        if let Some(unknown) = self.region_filter.iter().find(|r| !is_known_region(r)) {
            return Err(invalid("region_filter", format!("unknown region `{unknown}`")));
        }
        Ok(())
    }

    /// Travel time of an attack line at the current speed
    pub fn travel_ms(&self) -> f64 {
        self.speed.travel_ms() * self.speed_factor
    }

    /// Generator period at the current speed
    pub fn tick_ms(&self) -> f64 {
        self.tick_interval_ms * self.speed.tick_factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = MapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scale_bounds, [1.0, 8.0]);
        assert_eq!(config.travel_ms(), 2000.0);
    }

    #[test]
    fn test_partial_toml() {
        let config = MapConfig::from_toml(
            r#"
            tick_interval_ms = 1000.0
            show_ambient_pulses = false
            region_filter = ["USA", "CHINA"]
            speed = "fast"
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_interval_ms, 1000.0);
        assert!(!config.show_ambient_pulses);
        assert_eq!(config.region_filter.len(), 2);
        assert_eq!(config.travel_ms(), 500.0);
        assert_eq!(config.tick_ms(), 500.0);
        // Untouched keys keep defaults
        assert_eq!(config.projection_scale, 170.0);
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let err = MapConfig::from_toml("scale_bounds = [4.0, 2.0]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "scale_bounds", .. }));
        assert!(MapConfig::from_toml("scale_bounds = [0.5, 2.0]").is_err());
    }

    #[test]
    fn test_rejects_unknown_region() {
        let err = MapConfig::from_toml(r#"region_filter = ["ATLANTIS"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "region_filter", .. }));
    }

    #[test]
    fn test_rejects_bad_ratio() {
        assert!(MapConfig::from_toml("high_intensity_ratio = 1.5").is_err());
    }

    #[test]
    fn test_feed_section() {
        let config = MapConfig::from_toml(
            r#"
            [feed]
            base_url = "http://10.0.0.5:8002"
            "#,
        )
        .unwrap();
        let feed = config.feed.unwrap();
        assert_eq!(feed.base_url, "http://10.0.0.5:8002");
        assert_eq!(feed.max_retries, 3);
    }
}
