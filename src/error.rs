use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the compatibility queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompatibilityError {
    /// A label passed to a pairwise check is not one of the eight blood types
    #[error("invalid blood type '{0}': expected one of O-, O+, A-, A+, B-, B+, AB-, AB+")]
    InvalidBloodType(String),

    /// A label passed to a donor/recipient listing is not one of the eight blood types
    #[error("unknown blood type '{0}'")]
    UnknownBloodType(String),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "invalid severity thresholds: critical_below={critical_below}, warning_below={warning_below} \
         (both must lie in [0, 100] with critical_below <= warning_below)"
    )]
    InvalidThresholds {
        critical_below: f64,
        warning_below: f64,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}
