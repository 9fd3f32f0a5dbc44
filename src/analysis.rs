use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::classification::{severity_color, SeverityThresholds};
use crate::compatibility::compatible_donors_for;
use crate::types::*;

/// Container for all analysis results
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub classified: Vec<ClassifiedRecord>,
    pub alerts: Vec<InventoryAlert>,
    pub summary: InventorySummary,
}

impl AnalysisResults {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An inventory row together with its tier and color token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: InventoryRecord,
    pub tier: SeverityTier,
    pub color: DisplayColor,
}

/// Shortage raised for a non-healthy row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub hospital: String,
    pub blood_type: BloodType,
    pub tier: SeverityTier,
    pub units_on_hand: u32,
    pub percentage_of_target: f64,
    pub message: String,
    /// Healthy compatible donor types stocked at the same hospital
    pub substitutes: Vec<BloodType>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub critical: usize,
    pub warning: usize,
    pub healthy: usize,
    pub total_units: u64,
    pub units_by_type: BTreeMap<BloodType, u64>,
}

impl InventorySummary {
    pub fn count(&self, tier: SeverityTier) -> usize {
        match tier {
            SeverityTier::Critical => self.critical,
            SeverityTier::Warning => self.warning,
            SeverityTier::Healthy => self.healthy,
        }
    }
}

/// Classifies inventory rows and derives alerts from them
pub struct InventoryAnalyzer {
    thresholds: SeverityThresholds,
}

impl InventoryAnalyzer {
    pub fn new(thresholds: SeverityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, records: &[InventoryRecord]) -> AnalysisResults {
        let classified: Vec<ClassifiedRecord> = records
            .par_iter()
            .map(|record| self.classify_record(record))
            .collect();

        let alerts = self.build_alerts(&classified);
        let summary = self.summarize(&classified);

        info!(
            "Classified {} rows: {} critical, {} warning, {} healthy",
            classified.len(),
            summary.critical,
            summary.warning,
            summary.healthy
        );

        AnalysisResults {
            classified,
            alerts,
            summary,
        }
    }

    pub fn classify_record(&self, record: &InventoryRecord) -> ClassifiedRecord {
        let tier = self.thresholds.classify_level(&record.level);

        ClassifiedRecord {
            record: record.clone(),
            tier,
            color: severity_color(tier),
        }
    }

    /// Alerts for every non-healthy row, most urgent first
    fn build_alerts(&self, classified: &[ClassifiedRecord]) -> Vec<InventoryAlert> {
        let healthy: HashSet<(&str, BloodType)> = classified
            .iter()
            .filter(|c| c.tier == SeverityTier::Healthy)
            .map(|c| (c.record.hospital.as_str(), c.record.blood_type))
            .collect();

        let mut alerts: Vec<InventoryAlert> = classified
            .iter()
            .filter(|c| c.tier.needs_attention())
            .map(|c| {
                let record = &c.record;
                let substitutes = find_substitutes(record, &healthy);

                InventoryAlert {
                    hospital: record.hospital.clone(),
                    blood_type: record.blood_type,
                    tier: c.tier,
                    units_on_hand: record.level.units_on_hand,
                    percentage_of_target: record.level.percentage_of_target,
                    message: alert_message(record, c.tier, &substitutes),
                    substitutes,
                }
            })
            .collect();

        alerts.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then(a.percentage_of_target.total_cmp(&b.percentage_of_target))
                .then_with(|| a.hospital.cmp(&b.hospital))
                .then(a.blood_type.cmp(&b.blood_type))
        });

        alerts
    }

    fn summarize(&self, classified: &[ClassifiedRecord]) -> InventorySummary {
        let mut summary = InventorySummary::default();

        for c in classified {
            match c.tier {
                SeverityTier::Critical => summary.critical += 1,
                SeverityTier::Warning => summary.warning += 1,
                SeverityTier::Healthy => summary.healthy += 1,
            }

            let units = u64::from(c.record.level.units_on_hand);
            summary.total_units += units;
            *summary.units_by_type.entry(c.record.blood_type).or_default() += units;
        }

        summary
    }
}

impl Default for InventoryAnalyzer {
    fn default() -> Self {
        Self::new(SeverityThresholds::default())
    }
}

/// Compatible donor types, in preference order, that are healthy at the record's hospital
fn find_substitutes<'a>(
    record: &'a InventoryRecord,
    healthy: &HashSet<(&'a str, BloodType)>,
) -> Vec<BloodType> {
    compatible_donors_for(record.blood_type)
        .iter()
        .copied()
        .filter(|&donor| donor != record.blood_type)
        .filter(|&donor| healthy.contains(&(record.hospital.as_str(), donor)))
        .collect()
}

fn alert_message(
    record: &InventoryRecord,
    tier: SeverityTier,
    substitutes: &[BloodType],
) -> String {
    let mut message = format!(
        "{} stock of {} at {}: {} units ({:.1}% of target)",
        tier,
        record.blood_type,
        record.hospital,
        record.level.units_on_hand,
        record.level.percentage_of_target
    );

    if substitutes.is_empty() {
        message.push_str("; no healthy compatible substitute on site");
    } else {
        let labels: Vec<&str> = substitutes.iter().map(|t| t.label()).collect();
        message.push_str(&format!("; substitutes available: {}", labels.join(", ")));
    }

    message
}
