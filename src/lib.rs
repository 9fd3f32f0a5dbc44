//! # Blood Compatibility Toolkit
//!
//! Blood-type compatibility lookups and inventory severity classification for
//! blood-bank dashboards.
//!
//! ## Features
//!
//! - Static ABO/Rh compatibility table with donor and recipient queries
//! - Severity tiers (Critical / Warning / Healthy) from percentage-of-target stock
//! - Display color tokens kept separate from the threshold policy
//! - Inventory snapshot parsing (CSV/TSV) and parallel classification
//! - Shortage alerts with healthy compatible substitutes
//! - Multiple output formats (HTML, CSV, TSV, JSON)
//!
//! ```
//! use blood_compatibility::{classify_severity, is_compatible, BloodType, SeverityTier};
//!
//! assert!(is_compatible(BloodType::ONeg, BloodType::AbPos));
//! assert!(!is_compatible(BloodType::AbPos, BloodType::ONeg));
//! assert_eq!(classify_severity(20.0), SeverityTier::Warning);
//! ```

pub mod analysis;
pub mod classification;
pub mod compatibility;
pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod output;
pub mod types;

// Re-export key types
pub use analysis::{AnalysisResults, InventoryAlert, InventoryAnalyzer, InventorySummary};
pub use classification::{classify_severity, severity_color, Palette, SeverityThresholds};
pub use compatibility::{
    compatible_donors_for, compatible_donors_for_label, compatible_recipients_for,
    compatible_recipients_for_label, is_compatible, is_compatible_labels, CompatibilityTable,
};
pub use config::Config;
pub use discovery::FileDiscovery;
pub use error::{CompatibilityError, ConfigError};
pub use inventory::{InventoryParser, InventorySnapshot};
pub use output::{ReportFormat, ReportGenerator};
pub use types::*;
