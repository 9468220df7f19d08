use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use unifill_core::DEFAULT_BATCH_BOUND;
use unifill_generate::DEFAULT_ATTEMPT_FACTOR;

/// File read when `--config` is not given, if present.
pub const DEFAULT_CONFIG_PATH: &str = "unifill.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid row override '{0}', expected table=count")]
    RowOverride(String),
}

/// `unifill.toml`. Every field is optional; flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FillConfig {
    pub connection: Option<String>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    pub attempt_factor: Option<u64>,
    pub tables: Vec<String>,
    /// Row count, or per-parent count for fan-out tables.
    pub rows: BTreeMap<String, u64>,
}

impl FillConfig {
    /// Read `path`, or the default file when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Flag values that override the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub connection: Option<String>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
    pub attempt_factor: Option<u64>,
    pub tables: Vec<String>,
    pub rows: Vec<(String, u64)>,
}

/// Effective settings of a `fill` run.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    #[serde(skip)]
    pub connection: Option<String>,
    pub batch_size: usize,
    pub seed: u64,
    pub attempt_factor: u64,
    /// Empty means every table.
    pub tables: Vec<String>,
    pub rows: BTreeMap<String, u64>,
}

impl Settings {
    /// Flags first, then the file, then `DATABASE_URL` for the connection.
    pub fn resolve(file: FillConfig, flags: Overrides, env_connection: Option<String>) -> Self {
        let mut rows = file.rows;
        rows.extend(flags.rows);
        Self {
            connection: flags.connection.or(file.connection).or(env_connection),
            batch_size: flags
                .batch_size
                .or(file.batch_size)
                .unwrap_or(DEFAULT_BATCH_BOUND),
            seed: flags.seed.or(file.seed).unwrap_or_default(),
            attempt_factor: flags
                .attempt_factor
                .or(file.attempt_factor)
                .unwrap_or(DEFAULT_ATTEMPT_FACTOR),
            tables: if flags.tables.is_empty() {
                file.tables
            } else {
                flags.tables
            },
            rows,
        }
    }
}

/// Parse a `--rows table=count` value.
pub fn parse_row_override(raw: &str) -> Result<(String, u64), ConfigError> {
    let invalid = || ConfigError::RowOverride(raw.to_string());
    let (table, count) = raw.split_once('=').ok_or_else(invalid)?;
    let table = table.trim();
    if table.is_empty() {
        return Err(invalid());
    }
    let count = count.trim().parse().map_err(|_| invalid())?;
    Ok((table.to_string(), count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_file() {
        let file: FillConfig = toml::from_str(
            r#"
            connection = "postgres://file@localhost/uni"
            batch_size = 500
            seed = 9
            tables = ["students"]

            [rows]
            students = 100
            grades = 3
            "#,
        )
        .unwrap();
        let flags = Overrides {
            batch_size: Some(2_000),
            rows: vec![("students".to_string(), 10)],
            ..Overrides::default()
        };

        let settings = Settings::resolve(file, flags, Some("postgres://env/uni".to_string()));
        assert_eq!(
            settings.connection.as_deref(),
            Some("postgres://file@localhost/uni")
        );
        assert_eq!(settings.batch_size, 2_000);
        assert_eq!(settings.seed, 9);
        assert_eq!(settings.attempt_factor, DEFAULT_ATTEMPT_FACTOR);
        assert_eq!(settings.tables, vec!["students"]);
        assert_eq!(settings.rows["students"], 10);
        assert_eq!(settings.rows["grades"], 3);
    }

    #[test]
    fn environment_is_the_last_resort() {
        let settings = Settings::resolve(
            FillConfig::default(),
            Overrides::default(),
            Some("postgres://env/uni".to_string()),
        );
        assert_eq!(settings.connection.as_deref(), Some("postgres://env/uni"));
        assert_eq!(settings.batch_size, DEFAULT_BATCH_BOUND);
        assert!(settings.tables.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FillConfig>("batch = 10").is_err());
    }

    #[test]
    fn row_overrides_parse() {
        assert_eq!(
            parse_row_override("grades=20").unwrap(),
            ("grades".to_string(), 20)
        );
        assert!(parse_row_override("grades").is_err());
        assert!(parse_row_override("=4").is_err());
        assert!(parse_row_override("grades=many").is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let explicit = FillConfig::load(Some(Path::new("does/not/exist.toml")));
        assert!(matches!(explicit, Err(ConfigError::Read { .. })));
    }
}
