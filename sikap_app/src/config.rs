use std::{path::{Path, PathBuf}, str::FromStr};

use chrono::Duration;
use sikap_lib::sikap_summary::DistanceUnit;

use crate::SikapError;

#[derive(Debug, Clone, PartialEq)]
pub struct SikapConfig {
    /// Fixes must report a horizontal accuracy below this, in meters.
    pub max_horizontal_accuracy: f64,
    /// Fixes older (or newer) than this are dropped.
    pub max_fix_age_secs: i64,
    /// Minimum movement between reported fixes.
    pub distance_filter_meters: f64,
    pub recenter_span_meters: f64,
    pub search_span_degrees: f64,
    pub world_span_meters: f64,
    pub distance_unit: DistanceUnit,
    /// None means `data/sikap.db` under the project root.
    pub database: Option<PathBuf>,
}

impl Default for SikapConfig {
    fn default() -> Self {
        Self {
            max_horizontal_accuracy: 20.,
            max_fix_age_secs: 10,
            distance_filter_meters: 8.,
            recenter_span_meters: 200.,
            search_span_degrees: 0.1,
            world_span_meters: 19_903_100.,
            distance_unit: DistanceUnit::Miles,
            database: None,
        }
    }
}

impl SikapConfig {
    /// Parses `key = value` lines on top of the defaults.
    pub fn parse(text: &str) -> Result<Self, SikapError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(SikapError::Config(format!("Line {}: expected key = value", number + 1)));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "max_horizontal_accuracy" => config.max_horizontal_accuracy = parse_value(key, value)?,
                "max_fix_age_secs" => config.max_fix_age_secs = parse_age(key, value)?,
                "distance_filter_meters" => config.distance_filter_meters = parse_value(key, value)?,
                "recenter_span_meters" => config.recenter_span_meters = parse_value(key, value)?,
                "search_span_degrees" => config.search_span_degrees = parse_value(key, value)?,
                "world_span_meters" => config.world_span_meters = parse_value(key, value)?,
                "distance_unit" => config.distance_unit = value.parse().map_err(SikapError::Config)?,
                "database" => config.database = Some(PathBuf::from(value)),
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SikapError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SikapError::Config(format!("Failed to read {path:?}: {e}")))?;
        Self::parse(&text)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, SikapError> {
    value
        .parse()
        .map_err(|_| SikapError::Config(format!("Invalid value for {key}: {value:?}")))
}

/// Whole seconds, positive and small enough to be a `chrono::Duration`.
fn parse_age(key: &str, value: &str) -> Result<i64, SikapError> {
    let secs: i64 = parse_value(key, value)?;
    if secs <= 0 || Duration::try_seconds(secs).is_none() {
        return Err(SikapError::Config(format!("{key} out of range: {secs}")));
    }
    Ok(secs)
}
