//! Inventory severity classification and display colors.
//!
//! Threshold policy and color lookup are deliberately separate: the palette
//! can change without touching the tier boundaries.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{DisplayColor, InventoryLevel, SeverityTier};

/// Levels strictly below this percentage are critical
pub const CRITICAL_BELOW: f64 = 20.0;

/// Levels strictly below this percentage (and not critical) are a warning
pub const WARNING_BELOW: f64 = 40.0;

/// Classify a percentage-of-target with the default thresholds
pub fn classify_severity(percentage_of_target: f64) -> SeverityTier {
    SeverityThresholds::default().classify(percentage_of_target)
}

/// Color token for a tier
pub fn severity_color(tier: SeverityTier) -> DisplayColor {
    match tier {
        SeverityTier::Critical => DisplayColor::Red,
        SeverityTier::Warning => DisplayColor::Amber,
        SeverityTier::Healthy => DisplayColor::Green,
    }
}

/// Clamp to [0, 100]. NaN maps to 0.
pub fn clamp_percentage(percentage: f64) -> f64 {
    if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 100.0)
    }
}

/// Tier boundaries, lower bound inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub critical_below: f64,
    pub warning_below: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical_below: CRITICAL_BELOW,
            warning_below: WARNING_BELOW,
        }
    }
}

impl SeverityThresholds {
    pub fn new(critical_below: f64, warning_below: f64) -> Result<Self, ConfigError> {
        let thresholds = Self {
            critical_below,
            warning_below,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |value: f64| (0.0..=100.0).contains(&value);

        if !in_range(self.critical_below)
            || !in_range(self.warning_below)
            || self.critical_below > self.warning_below
        {
            return Err(ConfigError::InvalidThresholds {
                critical_below: self.critical_below,
                warning_below: self.warning_below,
            });
        }

        Ok(())
    }

    pub fn classify(&self, percentage_of_target: f64) -> SeverityTier {
        match clamp_percentage(percentage_of_target) {
            p if p < self.critical_below => SeverityTier::Critical,
            p if p < self.warning_below => SeverityTier::Warning,
            _ => SeverityTier::Healthy,
        }
    }

    pub fn classify_level(&self, level: &InventoryLevel) -> SeverityTier {
        self.classify(level.percentage_of_target)
    }
}

/// Hex colors used when rendering each tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub critical: String,
    pub warning: String,
    pub healthy: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            critical: severity_color(SeverityTier::Critical).hex().to_string(),
            warning: severity_color(SeverityTier::Warning).hex().to_string(),
            healthy: severity_color(SeverityTier::Healthy).hex().to_string(),
        }
    }
}

impl Palette {
    pub fn hex_for(&self, tier: SeverityTier) -> &str {
        match tier {
            SeverityTier::Critical => &self.critical,
            SeverityTier::Warning => &self.warning,
            SeverityTier::Healthy => &self.healthy,
        }
    }
}
