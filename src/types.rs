use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CompatibilityError;

lazy_static! {
    static ref LABEL_PATTERN: Regex =
        Regex::new(r"^(AB|A|B|O)\s*(\+|-|POS|NEG|POSITIVE|NEGATIVE)$")
            .expect("blood type label pattern is valid");
}

/// ABO blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AboGroup {
    O,
    A,
    B,
    AB,
}

/// Rh factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhFactor {
    Negative,
    Positive,
}

/// Clinical ABO/Rh blood type.
///
/// This enumeration is the single source of truth for valid blood types.
/// Declaration order is the canonical order used by every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "O-")]
    ONeg = 0,
    #[serde(rename = "O+")]
    OPos = 1,
    #[serde(rename = "A-")]
    ANeg = 2,
    #[serde(rename = "A+")]
    APos = 3,
    #[serde(rename = "B-")]
    BNeg = 4,
    #[serde(rename = "B+")]
    BPos = 5,
    #[serde(rename = "AB-")]
    AbNeg = 6,
    #[serde(rename = "AB+")]
    AbPos = 7,
}

impl BloodType {
    pub const COUNT: usize = 8;

    pub const ALL: [BloodType; Self::COUNT] = [
        BloodType::ONeg,
        BloodType::OPos,
        BloodType::ANeg,
        BloodType::APos,
        BloodType::BNeg,
        BloodType::BPos,
        BloodType::AbNeg,
        BloodType::AbPos,
    ];

    pub const fn from_parts(group: AboGroup, rh: RhFactor) -> Self {
        match (group, rh) {
            (AboGroup::O, RhFactor::Negative) => BloodType::ONeg,
            (AboGroup::O, RhFactor::Positive) => BloodType::OPos,
            (AboGroup::A, RhFactor::Negative) => BloodType::ANeg,
            (AboGroup::A, RhFactor::Positive) => BloodType::APos,
            (AboGroup::B, RhFactor::Negative) => BloodType::BNeg,
            (AboGroup::B, RhFactor::Positive) => BloodType::BPos,
            (AboGroup::AB, RhFactor::Negative) => BloodType::AbNeg,
            (AboGroup::AB, RhFactor::Positive) => BloodType::AbPos,
        }
    }

    /// Position in [`BloodType::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            BloodType::ONeg => "O-",
            BloodType::OPos => "O+",
            BloodType::ANeg => "A-",
            BloodType::APos => "A+",
            BloodType::BNeg => "B-",
            BloodType::BPos => "B+",
            BloodType::AbNeg => "AB-",
            BloodType::AbPos => "AB+",
        }
    }

    pub const fn abo_group(self) -> AboGroup {
        match self {
            BloodType::ONeg | BloodType::OPos => AboGroup::O,
            BloodType::ANeg | BloodType::APos => AboGroup::A,
            BloodType::BNeg | BloodType::BPos => AboGroup::B,
            BloodType::AbNeg | BloodType::AbPos => AboGroup::AB,
        }
    }

    pub const fn rh(self) -> RhFactor {
        match self {
            BloodType::ONeg | BloodType::ANeg | BloodType::BNeg | BloodType::AbNeg => {
                RhFactor::Negative
            }
            _ => RhFactor::Positive,
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodType {
    type Err = CompatibilityError;

    /// Accepts `O-`, `ab+`, `A pos`, `B negative` and the Unicode minus sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.replace('\u{2212}', "-").to_ascii_uppercase();

        let caps = LABEL_PATTERN
            .captures(&normalized)
            .ok_or_else(|| CompatibilityError::InvalidBloodType(trimmed.to_string()))?;

        let group = match &caps[1] {
            "O" => AboGroup::O,
            "A" => AboGroup::A,
            "B" => AboGroup::B,
            _ => AboGroup::AB,
        };
        let rh = match &caps[2] {
            "+" | "POS" | "POSITIVE" => RhFactor::Positive,
            _ => RhFactor::Negative,
        };

        Ok(BloodType::from_parts(group, rh))
    }
}

/// Coarse inventory health, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityTier {
    Critical,
    Warning,
    Healthy,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 3] = [
        SeverityTier::Critical,
        SeverityTier::Warning,
        SeverityTier::Healthy,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SeverityTier::Critical => "Critical",
            SeverityTier::Warning => "Warning",
            SeverityTier::Healthy => "Healthy",
        }
    }

    pub fn needs_attention(self) -> bool {
        !matches!(self, SeverityTier::Healthy)
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque display color token handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayColor {
    Red,
    Amber,
    Green,
}

impl DisplayColor {
    pub const fn token(self) -> &'static str {
        match self {
            DisplayColor::Red => "red",
            DisplayColor::Amber => "amber",
            DisplayColor::Green => "green",
        }
    }

    /// Default hex rendering of the token
    pub const fn hex(self) -> &'static str {
        match self {
            DisplayColor::Red => "#dc3545",
            DisplayColor::Amber => "#ffc107",
            DisplayColor::Green => "#28a745",
        }
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Stock level of one blood type, derived upstream from aggregated inventory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub units_on_hand: u32,
    pub percentage_of_target: f64,
}

impl InventoryLevel {
    pub fn new(units_on_hand: u32, percentage_of_target: f64) -> Self {
        Self {
            units_on_hand,
            percentage_of_target,
        }
    }

    /// Derive the percentage from a target stock. A zero target counts as fully stocked.
    pub fn from_target(units_on_hand: u32, target_units: u32) -> Self {
        let percentage_of_target = if target_units == 0 {
            100.0
        } else {
            units_on_hand as f64 / target_units as f64 * 100.0
        };

        Self::new(units_on_hand, percentage_of_target)
    }
}

/// One inventory row: a hospital's stock of a single blood type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub hospital: String,
    pub blood_type: BloodType,
    pub level: InventoryLevel,
}

impl InventoryRecord {
    pub fn new(hospital: impl Into<String>, blood_type: BloodType, level: InventoryLevel) -> Self {
        Self {
            hospital: hospital.into(),
            blood_type,
            level,
        }
    }
}
