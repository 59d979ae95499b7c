//! Configuration loading.
//!
//! A single YAML file, location given by `--config` (default `config.yaml`),
//! deserialized with `serde_yaml`. `deny_unknown_fields` is set on every
//! struct so a typo'd key is a startup error rather than a silently ignored
//! default.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chains: Vec<ChainConfig>,
    pub processor: ProcessorConfig,
    pub points: PointsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Accepted for fidelity with the source config shape. Only "postgres" is implemented.
    #[serde(default = "default_driver")]
    pub driver: String,
    pub dsn: String,
    #[serde(default = "default_max_open")]
    pub max_open: u32,
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,
    #[serde(default = "default_life_time_minutes")]
    pub life_time_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub name: String,
    pub id: u64,
    pub rpc_url: String,
    pub contract_addr: String,
    pub start_block: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessorConfig {
    #[serde(default = "default_block_batch_size")]
    pub block_batch_size: u64,
    #[serde(default = "default_reorg_threshold")]
    pub reorg_threshold: u64,
    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointsConfig {
    #[serde(default = "default_calculation_interval_minutes")]
    pub calculation_interval_minutes: u64,
    /// Passed through for config-shape fidelity; the award rate is hard-wired
    /// to 5% per hour (see points::window) and this field is currently unused.
    /// Changing it has no effect.
    #[serde(default)]
    pub rate: Option<String>,
}

fn default_driver() -> String {
    "postgres".to_string()
}
fn default_max_open() -> u32 {
    10
}
fn default_max_idle() -> u32 {
    5
}
fn default_life_time_minutes() -> u64 {
    30
}
fn default_block_batch_size() -> u64 {
    2_000
}
fn default_reorg_threshold() -> u64 {
    12
}
fn default_check_interval_seconds() -> u64 {
    15
}
fn default_calculation_interval_minutes() -> u64 {
    60
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.database.driver != "postgres" {
            return Err(Error::Config(format!(
                "unsupported database.driver {:?}; only \"postgres\" is implemented",
                self.database.driver
            )));
        }
        if self.chains.is_empty() {
            return Err(Error::Config("chains[] must not be empty".to_string()));
        }
        if let Some(rate) = &self.points.rate {
            if rate.parse::<f64>().map(|v| v <= 0.0).unwrap_or(true) {
                return Err(Error::Config(format!(
                    "points.rate {rate:?} must parse as a positive number"
                )));
            }
        }
        if self.processor.block_batch_size == 0 {
            return Err(Error::Config(
                "processor.block_batch_size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> tempfile_shim::TempPath {
        tempfile_shim::write(contents)
    }

    /// Minimal stand-in for a temp file so this module has no extra dev-dependency:
    /// writes to a unique path under std::env::temp_dir() and removes it on drop.
    mod tempfile_shim {
        use std::path::{Path, PathBuf};

        pub struct TempPath(pub PathBuf);

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }

        impl AsRef<Path> for TempPath {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }

        pub fn write(contents: &str) -> TempPath {
            let path = std::env::temp_dir().join(format!(
                "holding-points-config-test-{:?}.yaml",
                std::thread::current().id()
            ));
            std::fs::write(&path, contents).unwrap();
            TempPath(path)
        }
    }

    const VALID: &str = r#"
database:
  dsn: "postgres://localhost/points"
chains:
  - name: ethereum
    id: 1
    rpc_url: "https://rpc.example"
    contract_addr: "0x0000000000000000000000000000000000dead"
    start_block: 100
processor:
  block_batch_size: 500
  reorg_threshold: 12
  check_interval_seconds: 15
points:
  calculation_interval_minutes: 60
  rate: "1.0"
"#;

    #[test]
    fn loads_valid_config_with_defaults() {
        let path = write_temp(VALID);
        let cfg = Config::load(path.as_ref()).unwrap();
        assert_eq!(cfg.chains.len(), 1);
        assert_eq!(cfg.database.max_open, 10);
        assert_eq!(cfg.processor.block_batch_size, 500);
    }

    #[test]
    fn rejects_unknown_field() {
        let path = write_temp(&format!("{VALID}\nbogus: true\n"));
        assert!(Config::load(path.as_ref()).is_err());
    }

    #[test]
    fn rejects_empty_chains() {
        let path = write_temp(
            r#"
database:
  dsn: "postgres://localhost/points"
chains: []
processor: {}
points: {}
"#,
        );
        assert!(Config::load(path.as_ref()).is_err());
    }

    #[test]
    fn rejects_non_postgres_driver() {
        let path = write_temp(&VALID.replacen(
            "database:\n",
            "database:\n  driver: mysql\n",
            1,
        ));
        assert!(Config::load(path.as_ref()).is_err());
    }
}
