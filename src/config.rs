//! Configuration with layered hierarchy: defaults, TOML file, environment, CLI flags

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::classification::{Palette, SeverityThresholds};
use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "BLOOD_COMPAT_CONFIG";

/// Config file picked up from the working directory when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = "blood-compat.toml";

const CRITICAL_BELOW_ENV: &str = "BLOOD_COMPAT_CRITICAL_BELOW";
const WARNING_BELOW_ENV: &str = "BLOOD_COMPAT_WARNING_BELOW";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: SeverityThresholds,
    pub palette: Palette,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./reports"),
        }
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order.
    ///
    /// An explicit path must exist; the implicit working-directory file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, Path::new(DEFAULT_CONFIG_FILE), |key| {
            std::env::var(key).ok()
        })
    }

    /// [`Config::load`] with the fallback file and the environment supplied by the caller.
    ///
    /// File precedence: `explicit`, then the path in `BLOOD_COMPAT_CONFIG`, then
    /// `local` if it exists. Environment overrides are applied on top and the merged
    /// thresholds are validated.
    pub fn load_with<F>(
        explicit: Option<&Path>,
        local: &Path,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_path = lookup(CONFIG_PATH_ENV).map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None if local.is_file() => Self::from_file(local)?,
            None => Self::default(),
        };

        config.apply_env_with(&lookup)?;
        config.thresholds.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {}", path.display());

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides, reading variables through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CRITICAL_BELOW_ENV) {
            self.thresholds.critical_below = parse_percentage(CRITICAL_BELOW_ENV, &value)?;
        }
        if let Some(value) = lookup(WARNING_BELOW_ENV) {
            self.thresholds.warning_below = parse_percentage(WARNING_BELOW_ENV, &value)?;
        }

        Ok(())
    }

    /// Apply command-line overrides, which take precedence over everything else
    pub fn apply_overrides(
        &mut self,
        critical_below: Option<f64>,
        warning_below: Option<f64>,
        output_dir: Option<PathBuf>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = critical_below {
            self.thresholds.critical_below = value;
        }
        if let Some(value) = warning_below {
            self.thresholds.warning_below = value;
        }
        if let Some(dir) = output_dir {
            self.report.output_dir = dir;
        }

        self.thresholds.validate()
    }
}

fn parse_percentage(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(path: &Path, critical_below: f64) -> anyhow::Result<()> {
        let mut file = fs::File::create(path)?;
        writeln!(file, "[thresholds]")?;
        writeln!(file, "critical_below = {:.1}", critical_below)?;
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.thresholds, SeverityThresholds::default());
        assert_eq!(config.palette, Palette::default());
        assert_eq!(config.report.output_dir, PathBuf::from("./reports"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[thresholds]")?;
        writeln!(file, "critical_below = 15.0")?;
        writeln!(file, "[palette]")?;
        writeln!(file, "warning = \"orange\"")?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.thresholds.critical_below, 15.0);
        assert_eq!(config.thresholds.warning_below, 40.0);
        assert_eq!(config.palette.warning, "orange");
        assert_eq!(config.palette.critical, Palette::default().critical);

        Ok(())
    }

    #[test]
    fn test_malformed_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[thresholds")?;

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::from_file(Path::new("/nonexistent/blood-compat.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BLOOD_COMPAT_CRITICAL_BELOW", "10"),
            ("BLOOD_COMPAT_WARNING_BELOW", " 55.5 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.thresholds.critical_below, 10.0);
        assert_eq!(config.thresholds.warning_below, 55.5);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|key| (key == "BLOOD_COMPAT_CRITICAL_BELOW").then(|| "low".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_cli_overrides_are_validated() {
        let mut config = Config::default();
        config
            .apply_overrides(Some(5.0), None, Some(PathBuf::from("out")))
            .unwrap();
        assert_eq!(config.thresholds.critical_below, 5.0);
        assert_eq!(config.report.output_dir, PathBuf::from("out"));

        let err = config.apply_overrides(Some(60.0), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
    }

    #[test]
    fn test_load_file_precedence() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let explicit = temp_dir.path().join("explicit.toml");
        let from_env = temp_dir.path().join("from-env.toml");
        let local = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        write_config(&explicit, 11.0)?;
        write_config(&from_env, 12.0)?;
        write_config(&local, 13.0)?;

        let env_path = from_env.to_string_lossy().to_string();
        let with_env = |key: &str| (key == CONFIG_PATH_ENV).then(|| env_path.clone());

        let config = Config::load_with(Some(explicit.as_path()), &local, &with_env)?;
        assert_eq!(config.thresholds.critical_below, 11.0);

        let config = Config::load_with(None, &local, &with_env)?;
        assert_eq!(config.thresholds.critical_below, 12.0);

        let config = Config::load_with(None, &local, |_| None)?;
        assert_eq!(config.thresholds.critical_below, 13.0);

        let missing = temp_dir.path().join("missing.toml");
        let config = Config::load_with(None, &missing, |_| None)?;
        assert_eq!(config, Config::default());

        Ok(())
    }

    #[test]
    fn test_load_env_thresholds_override_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let local = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        write_config(&local, 15.0)?;

        let vars: HashMap<&str, &str> = [("BLOOD_COMPAT_CRITICAL_BELOW", "25")]
            .into_iter()
            .collect();
        let config =
            Config::load_with(None, &local, |key| vars.get(key).map(|v| v.to_string()))?;
        assert_eq!(config.thresholds.critical_below, 25.0);
        assert_eq!(config.thresholds.warning_below, 40.0);

        Ok(())
    }

    #[test]
    fn test_load_rejects_invalid_merged_thresholds() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let local = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        write_config(&local, 15.0)?;

        // Each layer is valid on its own; together warning falls below critical
        let err = Config::load_with(None, &local, |key| {
            (key == "BLOOD_COMPAT_WARNING_BELOW").then(|| "10".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));

        let absent = temp_dir.path().join("absent.toml");
        let err = Config::load_with(Some(absent.as_path()), &local, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        Ok(())
    }
}
